use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde::Serialize;

use crate::domain::broker::OnrampSessionResult;
use crate::domain::error::ApiError;
use crate::domain::funding::{CreateSessionBody, FundingSession, OnrampRequest, ProviderListing};
use crate::server::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderListing>,
}

/// `POST /api/create-onramp-session`
///
/// The body is read raw so that malformed JSON is reported in the API's
/// error shape rather than as an extractor rejection.
pub async fn create_onramp_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OnrampSessionResult>, ApiError> {
    let body: CreateSessionBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {e}")))?;
    let request = OnrampRequest::from_body(body)?;

    let result = state.broker.create_session(request).await?;
    Ok(Json(result))
}

/// `GET /api/onramp-providers`
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.broker.quotes().await,
    })
}

/// `GET /api/onramp-session/{id}`
pub async fn get_onramp_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<FundingSession>, ApiError> {
    state
        .broker
        .session(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown session: {session_id}")))
}
