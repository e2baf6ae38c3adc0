use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::funding::{FundingSession, FundingStatus};
use crate::domain::ports::SessionStore;

/// Process-local store of issued funding sessions
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, FundingSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: FundingSession) {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
    }

    async fn get(&self, session_id: &str) -> Option<FundingSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: FundingStatus,
        transaction_details: Option<Value>,
    ) -> Option<FundingSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;

        // Terminal statuses are final
        if session.status.is_terminal() {
            debug!(
                session_id = %session_id,
                current = %session.status,
                ignored = %status,
                "Ignoring transition out of terminal status"
            );
        } else {
            session.status = status;
            if transaction_details.is_some() {
                session.transaction_details = transaction_details;
            }
        }

        Some(session.clone())
    }
}
