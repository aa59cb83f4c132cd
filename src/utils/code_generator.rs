//! Short code generation and custom alias validation.
//!
//! Generated codes are drawn uniformly from 62 alphanumeric symbols. The
//! generator never writes to the store: the caller supplies an occupancy check
//! and persists whichever code is returned.

use std::future::Future;

use rand::Rng;

use crate::error::LinkError;

/// Symbols a generated code is drawn from.
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated codes.
pub const CODE_LENGTH: usize = 6;

/// Candidates tried before giving up with [`LinkError::CapacityExhausted`].
pub const MAX_ATTEMPTS: usize = 1000;

/// Bounds for user-chosen aliases.
const ALIAS_MIN_LENGTH: usize = 3;
const ALIAS_MAX_LENGTH: usize = 32;

/// Aliases that would shadow fixed routes under `/links`.
pub const RESERVED_ALIASES: &[&str] = &["shorten", "search", "expired", "popular", "health"];

/// Random short code generator with collision avoidance.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
    max_attempts: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(CODE_LENGTH, MAX_ATTEMPTS)
    }
}

impl CodeGenerator {
    pub fn new(length: usize, max_attempts: usize) -> Self {
        Self {
            length,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Draws one candidate code.
    pub fn sample(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }

    /// Samples candidates until `is_taken` reports one as free.
    ///
    /// Reserved route words are skipped without consulting `is_taken`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::CapacityExhausted`] when every one of
    /// `max_attempts` candidates was taken or reserved, and propagates any
    /// error from `is_taken` unchanged.
    pub async fn generate<F, Fut>(&self, is_taken: F) -> Result<String, LinkError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, LinkError>>,
    {
        self.generate_from(|| self.sample(), is_taken).await
    }

    async fn generate_from<S, F, Fut>(
        &self,
        mut sample: S,
        mut is_taken: F,
    ) -> Result<String, LinkError>
    where
        S: FnMut() -> String,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, LinkError>>,
    {
        for _ in 0..self.max_attempts {
            let candidate = sample();
            if is_reserved(&candidate) {
                continue;
            }

            if !is_taken(candidate.clone()).await? {
                return Ok(candidate);
            }
        }

        Err(LinkError::CapacityExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Returns true if `code` would shadow a fixed route.
pub fn is_reserved(code: &str) -> bool {
    RESERVED_ALIASES.contains(&code)
}

/// Returns true if `code` could have been produced by the generator.
pub fn is_generated_shape(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Validates a user-provided custom alias.
///
/// # Rules
///
/// - Length: 3-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot be a reserved route word
///
/// # Errors
///
/// Returns [`LinkError::InvalidAlias`] if any rule is violated.
pub fn validate_custom_alias(alias: &str) -> Result<(), LinkError> {
    if alias.len() < ALIAS_MIN_LENGTH || alias.len() > ALIAS_MAX_LENGTH {
        return Err(LinkError::InvalidAlias {
            reason: format!(
                "Alias must be {}-{} characters",
                ALIAS_MIN_LENGTH, ALIAS_MAX_LENGTH
            ),
        });
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LinkError::InvalidAlias {
            reason: "Alias can only contain letters, digits, hyphens and underscores".to_string(),
        });
    }

    if is_reserved(alias) {
        return Err(LinkError::InvalidAlias {
            reason: format!("'{}' is reserved", alias),
        });
    }

    Ok(())
}
