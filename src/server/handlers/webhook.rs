use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::inbound::webhook::EventEnvelope;
use crate::server::AppState;
use crate::server::responses::ErrorBody;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /webhook`
///
/// The body is taken as the raw string the provider signed. Nothing is
/// looked up or dispatched before the signature checks out.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: String,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.webhook.verify(signature, &payload) {
        warn!(error = %e, "Rejected webhook delivery");
        return bad_request(format!("Webhook Error: {e}"));
    }

    let envelope: EventEnvelope = match serde_json::from_str(&payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Unparsable webhook payload");
            return bad_request(format!("Webhook Error: {e}"));
        }
    };

    let event_type = envelope.event_type.clone();
    let event = match envelope.into_status_event() {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(event_type = %event_type, "Ignoring webhook event type");
            return received();
        }
        Err(e) => {
            warn!(event_type = %event_type, error = %e, "Onramp event without a usable session object");
            return bad_request(format!("Webhook Error: {e}"));
        }
    };

    info!(
        event_id = %event.event_id,
        event_type = %event_type,
        session_id = %event.session_id,
        status = %event.status,
        "Onramp session event"
    );

    state
        .broker
        .record_status(
            &event.session_id,
            event.status,
            event.transaction_details.clone(),
        )
        .await;
    let outcome = state
        .relay
        .dispatch(&event.session_id, event.to_message())
        .await;
    debug!(session_id = %event.session_id, ?outcome, "Webhook event dispatched");

    received()
}

fn received() -> Response {
    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}
