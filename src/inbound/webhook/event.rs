use serde::Deserialize;
use serde_json::Value;

use crate::domain::funding::FundingStatus;
use crate::domain::relay::RelayMessage;

/// Event types that carry onramp session updates
const ONRAMP_EVENT_PREFIX: &str = "crypto.onramp_session";

/// Provider event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// Kept loose until the event type is known
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// The session object embedded in an onramp event
#[derive(Debug, Clone, Deserialize)]
pub struct OnrampSessionObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_details: Option<Value>,
}

/// A verified status update ready for the relay
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatusEvent {
    pub event_id: String,
    pub session_id: String,
    pub status: FundingStatus,
    pub transaction_details: Option<Value>,
}

impl SessionStatusEvent {
    pub fn to_message(&self) -> RelayMessage {
        RelayMessage::new(self.status, self.transaction_details.clone())
    }
}

impl EventEnvelope {
    pub fn is_onramp_event(&self) -> bool {
        self.event_type.starts_with(ONRAMP_EVENT_PREFIX)
    }

    /// Convert to a status event; `Ok(None)` for event types the relay ignores
    pub fn into_status_event(self) -> Result<Option<SessionStatusEvent>, serde_json::Error> {
        if !self.is_onramp_event() {
            return Ok(None);
        }
        let object: OnrampSessionObject = serde_json::from_value(self.data.object)?;
        Ok(Some(SessionStatusEvent {
            event_id: self.id,
            status: map_status(object.status.as_deref()),
            session_id: object.id,
            transaction_details: object.transaction_details,
        }))
    }
}

/// Map the provider's status vocabulary onto [`FundingStatus`]
pub fn map_status(status: Option<&str>) -> FundingStatus {
    match status {
        Some("fulfillment_complete") => FundingStatus::Fulfilled,
        Some("rejected") => FundingStatus::Rejected,
        Some("initialized" | "requires_payment" | "fulfillment_processing") => {
            FundingStatus::Pending
        }
        _ => FundingStatus::Unknown,
    }
}
