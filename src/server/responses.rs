use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::domain::error::ApiError;

/// Error body shared by all API responses: `{ "error": ..., "details"?: ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Upstream {
                provider, details, ..
            } => Self {
                error: format!("{} API error", provider.label()),
                details: Some(details.clone()),
            },
            ApiError::KeyManagement { details, .. } => Self {
                error: "Key management API error".to_string(),
                details: Some(details.clone()),
            },
            ApiError::InvalidRequest(msg)
            | ApiError::Auth(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => Self::new(msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
