use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::SessionRegistry;
use crate::domain::relay::{ConnectionId, RelayConnection};

/// Registry held in this process's memory; lost on restart
#[derive(Default)]
pub struct InMemorySessionRegistry {
    connections: RwLock<HashMap<String, RelayConnection>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(
        &self,
        session_id: &str,
        connection: RelayConnection,
    ) -> Option<RelayConnection> {
        self.connections
            .write()
            .await
            .insert(session_id.to_string(), connection)
    }

    async fn lookup(&self, session_id: &str) -> Option<RelayConnection> {
        self.connections.read().await.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(session_id) {
            Some(current) if current.id() == connection_id => {
                connections.remove(session_id);
                true
            }
            _ => false,
        }
    }

    async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
