//! Error types shared across layers.
//!
//! - [`LinkError`] - typed outcomes of the link core (store, cache, service)
//! - [`AppError`] - HTTP-facing error rendered as a JSON body

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Failures reported by the link core.
///
/// Every operation returns one of these to its caller; none is logged and
/// dropped inside the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Short link not found: {code}")]
    NotFound { code: String },

    /// The link existed but its deadline has passed; it has been purged.
    #[error("Short link has expired: {code}")]
    Expired { code: String },

    #[error("Short code already exists: {code}")]
    AlreadyExists { code: String },

    #[error("Custom alias is already taken: {alias}")]
    AliasTaken { alias: String },

    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Invalid custom alias: {reason}")]
    InvalidAlias { reason: String },

    #[error("Custom alias cannot be regenerated: {code}")]
    AliasProtected { code: String },

    #[error("No free short code found after {attempts} attempts")]
    CapacityExhausted { attempts: usize },

    #[error("Caller is not allowed to modify links")]
    Forbidden,

    #[error("Link store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl LinkError {
    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound { code: code.into() }
    }

    pub fn expired(code: impl Into<String>) -> Self {
        Self::Expired { code: code.into() }
    }

    pub fn already_exists(code: impl Into<String>) -> Self {
        Self::AlreadyExists { code: code.into() }
    }

    pub fn invalid_url(reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Machine-readable error payload.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    Unauthorized { message: String, details: Value },
    #[error("{message}")]
    Forbidden { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Gone { message: String, details: Value },
    #[error("{message}")]
    Conflict { message: String, details: Value },
    #[error("{message}")]
    Unavailable { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str, &Value) {
        match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.as_str(),
                details,
            ),
            AppError::Unauthorized { message, details } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message.as_str(), details)
            }
            AppError::Forbidden { message, details } => {
                (StatusCode::FORBIDDEN, "forbidden", message.as_str(), details)
            }
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message.as_str(), details)
            }
            AppError::Gone { message, details } => {
                (StatusCode::GONE, "expired", message.as_str(), details)
            }
            AppError::Conflict { message, details } => {
                (StatusCode::CONFLICT, "conflict", message.as_str(), details)
            }
            AppError::Unavailable { message, details } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                message.as_str(),
                details,
            ),
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message.as_str(),
                details,
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    /// Converts the error into its serializable payload.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code, message, details) = self.parts();
        ErrorInfo {
            code,
            message: message.to_string(),
            details: details.clone(),
        }
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        let message = err.to_string();
        match err {
            LinkError::NotFound { code } => AppError::NotFound {
                message: "Short link not found".to_string(),
                details: json!({ "code": code }),
            },
            LinkError::Expired { code } => AppError::Gone {
                message: "Short link has expired".to_string(),
                details: json!({ "code": code }),
            },
            LinkError::AlreadyExists { code } => AppError::Conflict {
                message,
                details: json!({ "code": code }),
            },
            LinkError::AliasTaken { alias } => AppError::Conflict {
                message: "Custom alias already exists".to_string(),
                details: json!({ "alias": alias }),
            },
            LinkError::InvalidUrl { reason } => AppError::Validation {
                message: "Invalid URL format".to_string(),
                details: json!({ "reason": reason }),
            },
            LinkError::InvalidAlias { reason } => AppError::Validation {
                message: "Invalid custom alias".to_string(),
                details: json!({ "reason": reason }),
            },
            LinkError::AliasProtected { code } => AppError::Conflict {
                message,
                details: json!({ "code": code }),
            },
            LinkError::Forbidden => AppError::Forbidden {
                message,
                details: json!({}),
            },
            LinkError::CapacityExhausted { attempts } => AppError::Unavailable {
                message,
                details: json!({ "attempts": attempts }),
            },
            LinkError::StoreUnavailable(reason) | LinkError::CacheUnavailable(reason) => {
                tracing::error!(%reason, "Infrastructure failure");
                AppError::Unavailable {
                    message: "Service temporarily unavailable".to_string(),
                    details: json!({}),
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_request(
            "Request validation failed",
            serde_json::to_value(&errors).unwrap_or_else(|_| json!({})),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_maps_to_gone() {
        let err: AppError = LinkError::expired("abc123").into();
        assert_eq!(err.status_code(), StatusCode::GONE);
        assert_eq!(err.to_error_info().code, "expired");
    }

    #[test]
    fn test_not_found_distinct_from_expired() {
        let not_found: AppError = LinkError::not_found("abc123").into();
        let expired: AppError = LinkError::expired("abc123").into();
        assert_ne!(not_found.status_code(), expired.status_code());
    }

    #[test]
    fn test_alias_taken_maps_to_conflict() {
        let err: AppError = LinkError::AliasTaken {
            alias: "mine".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_error_info().details["alias"], "mine");
    }

    #[test]
    fn test_store_failure_hides_details() {
        let err: AppError = LinkError::StoreUnavailable("connection refused".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_forbidden() {
        let err: AppError = LinkError::Forbidden.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
