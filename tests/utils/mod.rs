#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use wallet_backend::{
    config::Config,
    domain::ports::SessionRegistry,
    domain::relay::{ConnectionId, RelayConnection},
    inbound::webhook::{WebhookVerifier, hmac_signer::current_timestamp},
    infrastructure::{InMemorySessionRegistry, SessionRelay},
    server::{AppState, Server},
};

/// Upstream base URLs a test server should talk to
#[derive(Debug, Clone, Default)]
pub struct Upstreams {
    pub stripe: Option<String>,
    pub coinbase: Option<String>,
    pub openfort: Option<String>,
}

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn test_config(upstreams: &Upstreams, overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("server.host", "localhost"),
        ("server.port", "0"),
        ("providers.quote_timeout_secs", "1"),
        ("providers.request_timeout_secs", "5"),
        ("stripe.secret_key", "sk_test_123"),
        ("stripe.webhook_secret", WEBHOOK_SECRET),
        ("stripe.api_base_url", "http://127.0.0.1:9"),
        ("openfort.api_base_url", "http://127.0.0.1:9"),
        ("openfort.shield_base_url", "http://127.0.0.1:9"),
        ("openfort.development.secret_key", "dev_sk"),
        ("openfort.development.shield_public_key", "dev_shield_pk"),
        ("openfort.development.shield_secret_key", "dev_shield_sk"),
        ("openfort.development.encryption_share", "dev_share"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    if let Some(uri) = &upstreams.stripe {
        vars.insert("stripe.api_base_url".to_string(), uri.clone());
    }
    if let Some(uri) = &upstreams.coinbase {
        vars.insert("coinbase.api_key".to_string(), "cb_key".to_string());
        vars.insert("coinbase.api_base_url".to_string(), uri.clone());
    }
    if let Some(uri) = &upstreams.openfort {
        vars.insert("openfort.api_base_url".to_string(), uri.clone());
        vars.insert("openfort.shield_base_url".to_string(), uri.clone());
    }
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    Config::load_with_sources(Some(vars)).unwrap()
}

pub async fn spawn_server() -> String {
    spawn_server_with(&test_config(&Upstreams::default(), &[])).await
}

pub async fn spawn_server_with(config: &Config) -> String {
    let state = AppState::from_config(config).unwrap();
    spawn_server_with_state(config, state).await
}

pub async fn spawn_server_with_state(config: &Config, state: AppState) -> String {
    let server = Server::with_state(config, state).await.unwrap();

    let port = server.port().unwrap();
    tokio::spawn(server.run());

    format!("http://{}:{}", config.server.host, port)
}

/// `Stripe-Signature` header for `payload`, signed now with [`WEBHOOK_SECRET`]
pub fn sign_webhook(payload: &str) -> String {
    let verifier = WebhookVerifier::new(&SecretString::from(WEBHOOK_SECRET.to_string()), 300);
    verifier.sign(payload, current_timestamp().unwrap())
}

/// A `crypto.onramp_session_updated` event body
pub fn onramp_event(session_id: &str, status: &str) -> String {
    serde_json::json!({
        "id": format!("evt_{session_id}_{status}"),
        "type": "crypto.onramp_session_updated",
        "data": {"object": {
            "id": session_id,
            "object": "crypto.onramp_session",
            "status": status,
            "transaction_details": {
                "destination_amount": "10.00",
                "destination_currency": "usdc",
                "transaction_id": "0xfeed"
            }
        }}
    })
    .to_string()
}

/// Registry that counts lookups, so tests can tell whether the relay was consulted
#[derive(Default)]
pub struct SpyRegistry {
    inner: InMemorySessionRegistry,
    lookups: AtomicUsize,
}

impl SpyRegistry {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Wait until `expected` sessions are subscribed
    pub async fn wait_for_len(&self, expected: usize) {
        for _ in 0..200 {
            if self.inner.len().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached {expected} subscriptions");
    }
}

#[async_trait]
impl SessionRegistry for SpyRegistry {
    async fn register(
        &self,
        session_id: &str,
        connection: RelayConnection,
    ) -> Option<RelayConnection> {
        self.inner.register(session_id, connection).await
    }

    async fn lookup(&self, session_id: &str) -> Option<RelayConnection> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(session_id).await
    }

    async fn remove(
        &self,
        session_id: &str,
        connection_id: ConnectionId,
    ) -> bool {
        self.inner.remove(session_id, connection_id).await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

/// Spawn a server whose relay is backed by a [`SpyRegistry`]
pub async fn spawn_server_with_spy(config: &Config) -> (String, Arc<SpyRegistry>) {
    let registry = Arc::new(SpyRegistry::default());
    let mut state = AppState::from_config(config).unwrap();
    state.relay = Arc::new(SessionRelay::new(registry.clone()));

    (spawn_server_with_state(config, state).await, registry)
}
