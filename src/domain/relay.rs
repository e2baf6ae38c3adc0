use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::domain::funding::FundingStatus;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// Message pushed from the server to a waiting browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    pub status: FundingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_details: Option<Value>,
}

impl RelayMessage {
    pub fn new(status: FundingStatus, transaction_details: Option<Value>) -> Self {
        Self {
            status,
            transaction_details,
        }
    }
}

/// Subscribe message sent by the client.
///
/// `sessionId` must be a string; anything else is ignored by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeMessage {
    pub session_id: String,
}

/// Handle to one live browser connection.
///
/// Cloning yields another handle to the same connection; equality is by id.
#[derive(Debug, Clone)]
pub struct RelayConnection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<RelayMessage>,
    sessions: Arc<RwLock<HashSet<String>>>,
}

impl RelayConnection {
    /// Create a connection and the receiver its writer task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            id: Uuid::new_v4(),
            tx,
            sessions: Arc::new(RwLock::new(HashSet::new())),
        };
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message; fails once the writer side has gone away
    pub fn send(&self, message: RelayMessage) -> Result<(), RelayMessage> {
        self.tx.send(message).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn track(&self, session_id: &str) {
        self.sessions.write().await.insert(session_id.to_string());
    }

    pub(crate) async fn untrack(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub(crate) async fn take_sessions(&self) -> Vec<String> {
        self.sessions.write().await.drain().collect()
    }
}

impl PartialEq for RelayConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RelayConnection {}
