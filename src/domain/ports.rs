/*
   This module specifies the API by which the broker and the relay talk to
   the outside world: funding providers, the session store and the
   connection registry.
*/

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::funding::{
    FundingSession, FundingStatus, OnrampRequest, ProviderDescriptor, ProviderId, ProviderQuote,
};
use crate::domain::relay::{ConnectionId, RelayConnection};

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider responded with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider unreachable: {0}")]
    Transport(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Normalized outcome of a provider session creation
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    /// Identifier used to correlate later webhook events
    pub session_id: Option<String>,
    /// Hosted checkout the client must open
    pub redirect_url: Option<String>,
    /// Provider JSON, passed through to the caller untouched
    pub raw: Map<String, Value>,
}

/// A funding provider reachable over HTTP
#[async_trait]
pub trait OnrampProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn descriptor(&self) -> &ProviderDescriptor;

    /// Issue exactly one upstream call creating a checkout session
    async fn create_session(&self, request: &OnrampRequest)
    -> Result<ProviderSession, ProviderError>;

    /// Best-effort quote for the configured reference purchase
    async fn fetch_quote(&self) -> Result<ProviderQuote, ProviderError>;
}

/// Funding sessions issued by this process, kept for the polling fallback
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: FundingSession);

    async fn get(&self, session_id: &str) -> Option<FundingSession>;

    /// Apply a webhook-driven transition.
    ///
    /// `transaction_details` replaces the stored details when present.
    /// Returns the session after the update, or `None` if the id is unknown.
    async fn update_status(
        &self,
        session_id: &str,
        status: FundingStatus,
        transaction_details: Option<Value>,
    ) -> Option<FundingSession>;
}

/// `sessionId → connection` mapping used by the relay.
///
/// The in-memory implementation lives in `infrastructure`; a shared store
/// could back multi-instance deployments later.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Register `connection`, returning the connection it replaced
    async fn register(&self, session_id: &str, connection: RelayConnection)
    -> Option<RelayConnection>;

    async fn lookup(&self, session_id: &str) -> Option<RelayConnection>;

    /// Remove the entry only if it still belongs to `connection_id`
    async fn remove(&self, session_id: &str, connection_id: ConnectionId) -> bool;

    async fn len(&self) -> usize;
}
