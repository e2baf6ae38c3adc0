//! Onramp session broker.
//!
//! Turns a uniform "add funds" request into a call to the selected provider
//! and reports the outcome in one result shape.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::domain::error::ApiError;
use crate::domain::funding::{
    FundingSession, FundingStatus, OnrampRequest, ProviderId, ProviderListing,
};
use crate::domain::ports::{OnrampProvider, ProviderError, ProviderSession, SessionStore};

/// Response of `POST /api/create-onramp-session`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnrampSessionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(flatten)]
    pub raw: Map<String, Value>,
}

impl From<ProviderSession> for OnrampSessionResult {
    fn from(session: ProviderSession) -> Self {
        let mut raw = session.raw;
        // The normalized fields win over same-named provider fields
        raw.remove("redirect_url");
        raw.remove("session");
        Self {
            redirect_url: session.redirect_url,
            session: session.session_id,
            raw,
        }
    }
}

pub struct OnrampBroker {
    providers: Vec<Arc<dyn OnrampProvider>>,
    sessions: Arc<dyn SessionStore>,
}

impl OnrampBroker {
    /// Providers are listed in the order given here
    pub fn new(providers: Vec<Arc<dyn OnrampProvider>>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            providers,
            sessions,
        }
    }

    pub fn provider(&self, id: ProviderId) -> Option<&Arc<dyn OnrampProvider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// Create a checkout session with the requested provider.
    ///
    /// Performs exactly one outbound call for a configured provider and none
    /// when the provider is not available.
    pub async fn create_session(
        &self,
        request: OnrampRequest,
    ) -> Result<OnrampSessionResult, ApiError> {
        let provider = self.provider(request.provider).ok_or_else(|| {
            ApiError::InvalidRequest(format!("Provider not available: {}", request.provider))
        })?;

        debug!(
            provider = %request.provider,
            address = %request.wallet_address,
            "Creating onramp session"
        );

        let session = provider
            .create_session(&request)
            .await
            .map_err(|e| upstream_error(request.provider, e))?;

        if let Some(session_id) = &session.session_id {
            self.sessions
                .insert(FundingSession::new(
                    session_id.clone(),
                    request.provider,
                    request.wallet_address.clone(),
                ))
                .await;
            info!(provider = %request.provider, session_id = %session_id, "Onramp session created");
        } else {
            warn!(provider = %request.provider, "Provider returned no session id");
        }

        Ok(session.into())
    }

    /// Quote every provider independently; a failing provider reports `None`
    pub async fn quotes(&self) -> Vec<ProviderListing> {
        let fetches = self.providers.iter().map(|provider| async move {
            let quote = match provider.fetch_quote().await {
                Ok(quote) => Some(quote),
                Err(e) => {
                    warn!(provider = %provider.id(), error = %e, "Quote unavailable");
                    None
                }
            };
            ProviderListing {
                descriptor: provider.descriptor().clone(),
                quote,
            }
        });

        join_all(fetches).await
    }

    pub async fn session(&self, session_id: &str) -> Option<FundingSession> {
        self.sessions.get(session_id).await
    }

    /// Record a webhook-driven status transition
    pub async fn record_status(
        &self,
        session_id: &str,
        status: FundingStatus,
        transaction_details: Option<Value>,
    ) -> Option<FundingSession> {
        let updated = self
            .sessions
            .update_status(session_id, status, transaction_details)
            .await;
        if updated.is_none() {
            debug!(session_id = %session_id, %status, "Status for a session not issued here");
        }
        updated
    }
}

fn upstream_error(provider: ProviderId, err: ProviderError) -> ApiError {
    warn!(provider = %provider, error = %err, "Provider call failed");
    let (status, details) = match err {
        ProviderError::Upstream { status, body } => {
            let details = serde_json::from_str(&body).unwrap_or(Value::String(body));
            (status, details)
        }
        ProviderError::Timeout(_) => (504, json!(err.to_string())),
        ProviderError::Transport(_) | ProviderError::Malformed(_) => (502, json!(err.to_string())),
    };
    ApiError::Upstream {
        provider,
        status,
        details,
    }
}
