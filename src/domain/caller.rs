//! Caller identity and the capability check applied before mutations.
//!
//! Identity is passed explicitly into each mutating operation; there is no
//! process-wide "current user".

/// Who is issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Caller {
    /// Anonymous request without credentials.
    #[default]
    Guest,
    /// Request carrying a recognised credential.
    Authenticated { subject: String },
}

impl Caller {
    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self::Authenticated {
            subject: subject.into(),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Caller::Guest)
    }

    /// Name used in logs.
    pub fn subject(&self) -> &str {
        match self {
            Caller::Guest => "guest",
            Caller::Authenticated { subject } => subject,
        }
    }
}

/// Decides whether a caller may update, regenerate or delete links.
pub trait AccessPolicy: Send + Sync {
    fn can_mutate(&self, caller: &Caller) -> bool;
}

/// Only authenticated callers may mutate existing links.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedOnly;

impl AccessPolicy for AuthenticatedOnly {
    fn can_mutate(&self, caller: &Caller) -> bool {
        !caller.is_guest()
    }
}

/// Every caller may mutate links.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_mutate(&self, _caller: &Caller) -> bool {
        true
    }
}
