mod handlers;
mod responses;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::domain::OnrampBroker;
use crate::domain::funding::{ProviderDescriptor, ProviderId};
use crate::domain::ports::{OnrampProvider, SessionStore};
use crate::inbound::WebhookVerifier;
use crate::infrastructure::{InMemorySessionRegistry, InMemorySessionStore, SessionRelay};
use crate::outbound::{CoinbaseOnramp, KeyManagementClient, ProviderHttpClient, StripeOnramp};
use crate::server::handlers::{
    encryption::create_encryption_session,
    health::health_check,
    onramp::{create_onramp_session, get_onramp_session, list_providers},
    relay::ws_handler,
    root::home,
    webhook::handle_webhook,
};
use axum::http::Method;
use axum::{
    Router,
    routing::{get, post},
};
use color_eyre::eyre::{Context, Result, eyre};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
/// The global application state shared between all request handlers.
pub struct AppState {
    pub broker: Arc<OnrampBroker>,
    pub relay: Arc<SessionRelay>,
    pub webhook: Arc<WebhookVerifier>,
    pub key_management: Arc<KeyManagementClient>,
}

impl AppState {
    /// Build every shared client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().wrap_err("Invalid configuration")?;

        let request_http = ProviderHttpClient::with_timeout(config.providers.request_timeout())
            .wrap_err("Failed to build provider HTTP client")?;
        let quote_http = ProviderHttpClient::with_timeout(config.providers.quote_timeout())
            .wrap_err("Failed to build quote HTTP client")?;

        let stripe_key = config
            .stripe
            .secret_key
            .clone()
            .ok_or_else(|| eyre!("stripe.secret_key is not set"))?;
        let mut providers: Vec<Arc<dyn OnrampProvider>> = vec![Arc::new(StripeOnramp::new(
            request_http.clone(),
            quote_http.clone(),
            config.stripe.api_base_url.clone(),
            stripe_key,
            config.providers.quote_amount.clone(),
            ProviderDescriptor {
                name: ProviderId::Stripe,
                display_name: config.stripe.display_name.clone(),
                logo_url: config.stripe.logo_url.clone(),
            },
        ))];

        if let Some(api_key) = config.coinbase_api_key() {
            providers.push(Arc::new(CoinbaseOnramp::new(
                request_http.clone(),
                quote_http,
                config.coinbase.api_base_url.clone(),
                config.coinbase.pay_base_url.clone(),
                api_key,
                config.providers.quote_amount.clone(),
                ProviderDescriptor {
                    name: ProviderId::Coinbase,
                    display_name: config.coinbase.display_name.clone(),
                    logo_url: config.coinbase.logo_url.clone(),
                },
            )));
        }

        let webhook_secret = config
            .stripe
            .webhook_secret
            .as_ref()
            .ok_or_else(|| eyre!("stripe.webhook_secret is not set"))?;
        let development = config
            .openfort
            .development
            .credentials()
            .ok_or_else(|| eyre!("openfort.development credentials are incomplete"))?;

        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        Ok(Self {
            broker: Arc::new(OnrampBroker::new(providers, sessions)),
            relay: Arc::new(SessionRelay::new(Arc::new(InMemorySessionRegistry::new()))),
            webhook: Arc::new(WebhookVerifier::new(
                webhook_secret,
                config.stripe.webhook_tolerance_secs,
            )),
            key_management: Arc::new(KeyManagementClient::new(
                request_http,
                config.openfort.api_base_url.clone(),
                config.openfort.shield_base_url.clone(),
                development,
                config.openfort.production.credentials(),
            )),
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("request", method = %request.method(), uri)
        });

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    Router::new()
        .route("/", get(home))
        .route("/api/healthz", get(health_check))
        .route("/api/create-onramp-session", post(create_onramp_session))
        .route("/api/onramp-providers", get(list_providers))
        .route("/api/onramp-session/{id}", get(get_onramp_session))
        .route(
            "/api/protected-create-encryption-session",
            post(create_encryption_session),
        )
        .route("/webhook", post(handle_webhook))
        .route("/ws", get(ws_handler))
        .layer(cors_layer)
        .layer(trace_layer)
        .with_state(state)
}

pub struct Server {
    router: Router,
    listener: TcpListener,
}

impl Server {
    /// Creates a new HTTP server with state built from `config`.
    pub async fn new(config: &Config) -> Result<Self> {
        let state = AppState::from_config(config)?;
        Self::with_state(config, state).await
    }

    /// Creates a new HTTP server around prepared state.
    pub async fn with_state(config: &Config, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await
            .wrap_err_with(|| format!("Failed to bind to port {}", config.server.port))?;

        Ok(Self {
            router: router(state),
            listener,
        })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Runs the HTTP server until ctrl-c.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Server listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
impl AppState {
    /// State with no onramp providers and unreachable key-management endpoints
    pub(crate) fn for_tests() -> Self {
        Self::with_store(Arc::new(InMemorySessionStore::new()))
    }

    pub(crate) fn with_store(sessions: Arc<dyn SessionStore>) -> Self {
        use crate::outbound::KeyManagementCredentials;
        use secrecy::SecretString;

        let secret = |value: &str| SecretString::from(value.to_string());
        let credentials = KeyManagementCredentials {
            secret_key: secret("dev_sk"),
            shield_public_key: secret("dev_pk"),
            shield_secret_key: secret("dev_shield_sk"),
            encryption_share: secret("dev_share"),
        };
        let http = ProviderHttpClient::with_timeout(std::time::Duration::from_secs(1))
            .expect("http client");

        Self {
            broker: Arc::new(OnrampBroker::new(Vec::new(), sessions)),
            relay: Arc::new(SessionRelay::new(Arc::new(InMemorySessionRegistry::new()))),
            webhook: Arc::new(WebhookVerifier::new(&secret("whsec_test"), 300)),
            key_management: Arc::new(KeyManagementClient::new(
                http,
                "http://127.0.0.1:9",
                "http://127.0.0.1:9",
                credentials,
                None,
            )),
        }
    }
}
