use std::collections::HashMap;
use std::time::Duration;

use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::outbound::KeyManagementCredentials;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub stripe: StripeConfig,
    pub coinbase: CoinbaseConfig,
    pub openfort: OpenfortConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings shared by every onramp provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub request_timeout_secs: u64,
    pub quote_timeout_secs: u64,
    /// Fiat amount (USD) used for the reference quotes
    pub quote_amount: String,
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub api_base_url: String,
    pub webhook_tolerance_secs: u64,
    pub display_name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseConfig {
    pub api_key: Option<SecretString>,
    pub api_base_url: String,
    pub pay_base_url: String,
    pub display_name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenfortConfig {
    pub api_base_url: String,
    pub shield_base_url: String,
    #[serde(default)]
    pub development: CredentialsConfig,
    #[serde(default)]
    pub production: CredentialsConfig,
}

/// One key-management credential set; every field is required for the set to be usable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    pub secret_key: Option<SecretString>,
    pub shield_public_key: Option<SecretString>,
    pub shield_secret_key: Option<SecretString>,
    pub encryption_share: Option<SecretString>,
}

impl CredentialsConfig {
    fn fields(&self) -> [(&'static str, Option<&SecretString>); 4] {
        [
            ("secret_key", self.secret_key.as_ref()),
            ("shield_public_key", self.shield_public_key.as_ref()),
            ("shield_secret_key", self.shield_secret_key.as_ref()),
            ("encryption_share", self.encryption_share.as_ref()),
        ]
    }

    fn missing(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !is_present(*value))
            .map(|(name, _)| name)
            .collect()
    }

    /// The complete credential set, or `None` when any field is missing
    pub fn credentials(&self) -> Option<KeyManagementCredentials> {
        let present = |value: &Option<SecretString>| value.clone().filter(|v| is_present(Some(v)));
        Some(KeyManagementCredentials {
            secret_key: present(&self.secret_key)?,
            shield_public_key: present(&self.shield_public_key)?,
            shield_secret_key: present(&self.shield_secret_key)?,
            encryption_share: present(&self.encryption_share)?,
        })
    }
}

fn is_present(value: Option<&SecretString>) -> bool {
    value.is_some_and(|v| !v.expose_secret().trim().is_empty())
}

impl Config {
    /// Load from defaults and `APP_*` environment variables, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_with_sources(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validation.
    ///
    /// If `env_vars` is provided it is used instead of the system environment,
    /// with keys in dotted form such as `stripe.secret_key`.
    pub fn load_with_sources(env_vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults()?;
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_SERVER__PORT or APP_STRIPE__SECRET_KEY
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Fail with one error naming every missing required key
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if !is_present(self.stripe.secret_key.as_ref()) {
            missing.push("stripe.secret_key".to_string());
        }
        if !is_present(self.stripe.webhook_secret.as_ref()) {
            missing.push("stripe.webhook_secret".to_string());
        }
        missing.extend(
            self.openfort
                .development
                .missing()
                .into_iter()
                .map(|field| format!("openfort.development.{field}")),
        );

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }

    /// Optional settings that are absent; reported as warnings at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !is_present(self.coinbase.api_key.as_ref()) {
            warnings.push("coinbase.api_key is not set, Coinbase onramp is disabled".to_string());
        }
        let missing = self.openfort.production.missing();
        if !missing.is_empty() {
            warnings.push(format!(
                "Production key-management credentials are incomplete (missing {}), production sessions will fail",
                missing.join(", ")
            ));
        }
        warnings
    }

    /// Coinbase key, if configured
    pub fn coinbase_api_key(&self) -> Option<SecretString> {
        self.coinbase
            .api_key
            .clone()
            .filter(|key| is_present(Some(key)))
    }

    /// Set default values for the configuration.
    /// This is used when no environment variables or config file are provided
    fn set_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("providers.request_timeout_secs", 30)?
            .set_default("providers.quote_timeout_secs", 5)?
            .set_default("providers.quote_amount", "100")?
            .set_default("stripe.api_base_url", "https://api.stripe.com")?
            .set_default("stripe.webhook_tolerance_secs", 300)?
            .set_default("stripe.display_name", "Stripe")?
            .set_default("stripe.logo_url", "https://stripe.com/favicon.ico")?
            .set_default("coinbase.api_base_url", "https://api.developer.coinbase.com")?
            .set_default("coinbase.pay_base_url", "https://pay.coinbase.com")?
            .set_default("coinbase.display_name", "Coinbase")?
            .set_default("coinbase.logo_url", "https://www.coinbase.com/favicon.ico")?
            .set_default("openfort.api_base_url", "https://api.openfort.xyz")?
            .set_default("openfort.shield_base_url", "https://shield.openfort.xyz")
    }
}
