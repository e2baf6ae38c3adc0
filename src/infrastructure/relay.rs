//! Session event relay.
//!
//! Pushes webhook-driven status events to the browser tab waiting on a
//! session. Delivery is best effort and at most once: events for a session
//! nobody is subscribed to are dropped, and failed pushes are not retried.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::ports::SessionRegistry;
use crate::domain::relay::{RelayConnection, RelayMessage};

/// Result of a single dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    NoSubscriber,
    ConnectionClosed,
}

pub struct SessionRelay {
    registry: Arc<dyn SessionRegistry>,
}

impl SessionRelay {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Route events for `session_id` to `connection`, replacing whoever held it
    pub async fn subscribe(&self, connection: &RelayConnection, session_id: &str) {
        connection.track(session_id).await;
        let replaced = self.registry.register(session_id, connection.clone()).await;

        match replaced {
            Some(previous) if previous != *connection => {
                previous.untrack(session_id).await;
                debug!(
                    session_id = %session_id,
                    previous = %previous.id(),
                    connection = %connection.id(),
                    "Subscription replaced"
                );
            }
            _ => debug!(session_id = %session_id, connection = %connection.id(), "Subscribed"),
        }
    }

    /// Push `message` to the current subscriber of `session_id`, if any
    pub async fn dispatch(&self, session_id: &str, message: RelayMessage) -> DispatchOutcome {
        let Some(connection) = self.registry.lookup(session_id).await else {
            debug!(session_id = %session_id, status = %message.status, "No subscriber, dropping event");
            return DispatchOutcome::NoSubscriber;
        };

        let terminal = message.status.is_terminal();
        if connection.send(message).is_err() {
            warn!(
                session_id = %session_id,
                connection = %connection.id(),
                "Connection closed before delivery"
            );
            self.release(session_id, &connection).await;
            return DispatchOutcome::ConnectionClosed;
        }

        info!(session_id = %session_id, connection = %connection.id(), "Status delivered");
        if terminal {
            self.release(session_id, &connection).await;
        }
        DispatchOutcome::Delivered
    }

    /// Remove the registry entry and the connection's record of it together
    async fn release(&self, session_id: &str, connection: &RelayConnection) {
        if self.registry.remove(session_id, connection.id()).await {
            connection.untrack(session_id).await;
        }
    }

    /// Drop every registration still owned by `connection`
    pub async fn unsubscribe(&self, connection: &RelayConnection) {
        for session_id in connection.take_sessions().await {
            if self.registry.remove(&session_id, connection.id()).await {
                debug!(session_id = %session_id, connection = %connection.id(), "Unsubscribed");
            }
        }
    }

    pub async fn subscription_count(&self) -> usize {
        self.registry.len().await
    }
}
