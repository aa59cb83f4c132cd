//! Authentication service for API token validation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

use crate::domain::caller::Caller;
use crate::error::AppError;
use serde_json::json;

type HmacSha256 = Hmac<Sha256>;

/// Maps Bearer tokens to caller identities.
///
/// Configured tokens are kept only as HMAC-SHA256 digests (keyed by
/// `signing_secret`), so a memory dump does not reveal usable credentials.
/// Each token is identified in logs by a short digest prefix.
pub struct AuthService {
    digests: HashMap<String, String>,
    signing_secret: String,
}

impl AuthService {
    /// Creates a service accepting exactly `tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the signing secret cannot key the MAC.
    pub fn new<I, S>(tokens: I, signing_secret: String) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut service = Self {
            digests: HashMap::new(),
            signing_secret,
        };

        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            let digest = service.hash_token(token)?;
            let subject = format!("token-{}", &digest[..8]);
            service.digests.insert(digest, subject);
        }

        Ok(service)
    }

    /// Number of accepted tokens.
    pub fn token_count(&self) -> usize {
        self.digests.len()
    }

    /// Hashes a raw token with HMAC-SHA256 using the server signing secret.
    ///
    /// Returns a 64-character lowercase hex-encoded MAC.
    fn hash_token(&self, token: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes()).map_err(|e| {
            AppError::internal("Token hashing failed", json!({ "reason": e.to_string() }))
        })?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Resolves a raw Bearer token to the caller it identifies.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is not one of the
    /// configured tokens.
    pub fn identify(&self, token: &str) -> Result<Caller, AppError> {
        let digest = self.hash_token(token)?;

        self.digests
            .get(&digest)
            .map(Caller::authenticated)
            .ok_or_else(|| {
                AppError::unauthorized("Unauthorized", json!({"reason": "Invalid token"}))
            })
    }
}
