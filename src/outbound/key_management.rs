//! Identity and key-management provider client.
//!
//! Verifies a user's access token with the identity API, then registers an
//! encryption session with the key-management (shield) API on the user's
//! behalf.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::domain::error::ApiError;
use crate::outbound::http_client::{HttpClientError, ProviderHttpClient};

/// One credential set: development or production
#[derive(Debug, Clone)]
pub struct KeyManagementCredentials {
    pub secret_key: SecretString,
    pub shield_public_key: SecretString,
    pub shield_secret_key: SecretString,
    pub encryption_share: SecretString,
}

pub struct KeyManagementClient {
    http: ProviderHttpClient,
    api_base_url: String,
    shield_base_url: String,
    development: KeyManagementCredentials,
    production: Option<KeyManagementCredentials>,
}

impl KeyManagementClient {
    pub fn new(
        http: ProviderHttpClient,
        api_base_url: impl Into<String>,
        shield_base_url: impl Into<String>,
        development: KeyManagementCredentials,
        production: Option<KeyManagementCredentials>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            shield_base_url: shield_base_url.into().trim_end_matches('/').to_string(),
            development,
            production,
        }
    }

    fn credentials(&self, production: bool) -> Result<&KeyManagementCredentials, ApiError> {
        if !production {
            return Ok(&self.development);
        }
        self.production.as_ref().ok_or_else(|| {
            ApiError::Internal(
                "Production environment variables are not configured properly.".to_string(),
            )
        })
    }

    /// Verify `access_token` and mint an encryption session id
    pub async fn create_encryption_session(
        &self,
        access_token: &str,
        production: bool,
    ) -> Result<String, ApiError> {
        let credentials = self.credentials(production)?;

        self.verify_token(access_token, credentials).await?;
        let session = self.register_session(credentials).await?;

        info!(production, "Encryption session created");
        Ok(session)
    }

    async fn verify_token(
        &self,
        access_token: &str,
        credentials: &KeyManagementCredentials,
    ) -> Result<(), ApiError> {
        let builder = self
            .http
            .client()
            .get(format!("{}/iam/v1/me", self.api_base_url))
            .bearer_auth(credentials.secret_key.expose_secret())
            .header("x-player-token", access_token);

        match self.http.send_json(builder).await {
            Ok(player) => {
                debug!(player = ?player.get("id"), "Access token verified");
                Ok(())
            }
            Err(HttpClientError::ResponseError { status, .. }) if status.is_client_error() => {
                warn!(status = %status.as_u16(), "Access token rejected");
                Err(ApiError::Auth("Invalid access token".to_string()))
            }
            Err(e) => Err(key_management_error(e)),
        }
    }

    async fn register_session(
        &self,
        credentials: &KeyManagementCredentials,
    ) -> Result<String, ApiError> {
        let builder = self
            .http
            .client()
            .post(format!("{}/project/encryption-session", self.shield_base_url))
            .header("x-api-key", credentials.shield_public_key.expose_secret())
            .header("x-api-secret", credentials.shield_secret_key.expose_secret())
            .json(&json!({ "encryption_part": credentials.encryption_share.expose_secret() }));

        let body = self
            .http
            .send_json(builder)
            .await
            .map_err(key_management_error)?;

        body.get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::KeyManagement {
                status: 502,
                details: json!("response is missing session_id"),
            })
    }
}

fn key_management_error(err: HttpClientError) -> ApiError {
    warn!(error = %err, "Key management call failed");
    match err {
        HttpClientError::ResponseError { status, body } => ApiError::KeyManagement {
            status: status.as_u16(),
            details: serde_json::from_str(&body).unwrap_or(Value::String(body)),
        },
        HttpClientError::Timeout(_) => ApiError::KeyManagement {
            status: 504,
            details: json!(err.to_string()),
        },
        other => ApiError::KeyManagement {
            status: 502,
            details: json!(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(prefix: &str) -> KeyManagementCredentials {
        KeyManagementCredentials {
            secret_key: SecretString::from(format!("{prefix}_sk")),
            shield_public_key: SecretString::from(format!("{prefix}_shield_pk")),
            shield_secret_key: SecretString::from(format!("{prefix}_shield_sk")),
            encryption_share: SecretString::from(format!("{prefix}_share")),
        }
    }

    fn client(server: &MockServer, production: Option<KeyManagementCredentials>) -> KeyManagementClient {
        KeyManagementClient::new(
            ProviderHttpClient::with_timeout(Duration::from_secs(5)).expect("client"),
            server.uri(),
            server.uri(),
            credentials("dev"),
            production,
        )
    }

    async fn mount_shield(server: &MockServer, prefix: &str) {
        Mock::given(method("POST"))
            .and(path("/project/encryption-session"))
            .and(header("x-api-key", format!("{prefix}_shield_pk").as_str()))
            .and(header("x-api-secret", format!("{prefix}_shield_sk").as_str()))
            .and(body_json(json!({"encryption_part": format!("{prefix}_share")})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "enc_1"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_creates_session_with_development_credentials() -> Result<(), ApiError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iam/v1/me"))
            .and(header("authorization", "Bearer dev_sk"))
            .and(header("x-player-token", "user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pla_1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_shield(&server, "dev").await;

        let session = client(&server, None)
            .create_encryption_session("user-token", false)
            .await?;
        assert_eq!(session, "enc_1");
        Ok(())
    }

    #[tokio::test]
    async fn test_production_uses_production_credentials() -> Result<(), ApiError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iam/v1/me"))
            .and(header("authorization", "Bearer prod_sk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pla_1"})))
            .mount(&server)
            .await;
        mount_shield(&server, "prod").await;

        let session = client(&server, Some(credentials("prod")))
            .create_encryption_session("user-token", true)
            .await?;
        assert_eq!(session, "enc_1");
        Ok(())
    }

    #[tokio::test]
    async fn test_production_without_credentials_fails() {
        let server = MockServer::start().await;
        let result = client(&server, None)
            .create_encryption_session("user-token", true)
            .await;
        assert!(matches!(result, Err(ApiError::Internal(msg)) if msg.contains("Production")));
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iam/v1/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server, None)
            .create_encryption_session("stale", false)
            .await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }
}
