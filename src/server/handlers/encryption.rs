use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::ApiError;
use crate::server::AppState;

pub const SIGNED_OUT_MESSAGE: &str =
    "You must be signed in to view the protected content on this page.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSessionRequest {
    #[serde(default)]
    pub is_prod: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionSessionResponse {
    pub session: String,
}

/// `POST /api/protected-create-encryption-session`
pub async fn create_encryption_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EncryptionSessionResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Auth(SIGNED_OUT_MESSAGE.to_string()))?;

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        EncryptionSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {e}")))?
    };

    let session = state
        .key_management
        .create_encryption_session(token, request.is_prod)
        .await?;
    Ok(Json(EncryptionSessionResponse { session }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
