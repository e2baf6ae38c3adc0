use serde_json::Value;
use thiserror::Error;

use crate::domain::funding::ProviderId;

/// Errors surfaced to API callers.
///
/// `InvalidRequest` and `Auth` are never retried by the server. `Upstream`
/// carries the provider's status code and body so the response can mirror it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{} API error (status {status})", provider.label())]
    Upstream {
        provider: ProviderId,
        status: u16,
        details: Value,
    },

    #[error("Key management API error (status {status})")]
    KeyManagement { status: u16, details: Value },

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::Upstream { status, .. } | ApiError::KeyManagement { status, .. } => {
                mirrored_status(*status)
            }
            ApiError::Auth(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }
}

/// Upstream statuses are mirrored only when they are errors themselves
fn mirrored_status(status: u16) -> u16 {
    if (400..=599).contains(&status) {
        status
    } else {
        502
    }
}
