use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::ports::ProviderError;

/// Error type for HTTP client operations
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response error: status={status}, body={body}")]
    ResponseError { status: StatusCode, body: String },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("Response body exceeds {max} bytes (got at least {size})")]
    BodyTooLarge { size: u64, max: usize },
}

impl HttpClientError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            HttpClientError::Timeout(timeout)
        } else if err.is_connect() {
            HttpClientError::NetworkError(err.to_string())
        } else {
            HttpClientError::RequestFailed(err.to_string())
        }
    }
}

impl From<HttpClientError> for ProviderError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Timeout(timeout) => ProviderError::Timeout(timeout),
            HttpClientError::ResponseError { status, body } => ProviderError::Upstream {
                status: status.as_u16(),
                body,
            },
            HttpClientError::InvalidBody(msg) => ProviderError::Malformed(msg),
            HttpClientError::BodyTooLarge { size, max } => ProviderError::Malformed(format!(
                "response body exceeds {max} bytes (got at least {size})"
            )),
            HttpClientError::NetworkError(msg) | HttpClientError::RequestFailed(msg) => {
                ProviderError::Transport(msg)
            }
        }
    }
}

/// Largest upstream response body accepted (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

fn body_too_large(size: u64) -> HttpClientError {
    warn!(size, max_size = MAX_BODY_SIZE, "Response body too large");
    HttpClientError::BodyTooLarge {
        size,
        max: MAX_BODY_SIZE,
    }
}

/// HTTP client wrapper shared by the provider adapters
#[derive(Debug, Clone)]
pub struct ProviderHttpClient {
    client: Client,
    timeout: Duration,
}

impl ProviderHttpClient {
    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("WalletBackend/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Underlying client, for building requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request and parse a successful JSON response.
    ///
    /// Non-2xx responses become [`HttpClientError::ResponseError`] carrying
    /// the raw body.
    pub async fn send_json(&self, request: RequestBuilder) -> Result<Value, HttpClientError> {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Provider request failed");
            HttpClientError::from_reqwest(e, self.timeout)
        })?;

        let status = response.status();
        let url = response.url().clone();
        debug!(
            url = %url,
            status = %status.as_u16(),
            response_time_ms = %start.elapsed().as_millis(),
            "Provider response received"
        );

        let body = self.read_response_body(response).await?;

        if !status.is_success() {
            return Err(HttpClientError::ResponseError { status, body });
        }

        serde_json::from_str(&body).map_err(|e| HttpClientError::InvalidBody(e.to_string()))
    }

    /// Read response body, rejecting anything over [`MAX_BODY_SIZE`]
    async fn read_response_body(&self, mut response: Response) -> Result<String, HttpClientError> {
        if let Some(size) = response.content_length() {
            if size > MAX_BODY_SIZE as u64 {
                return Err(body_too_large(size));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HttpClientError::from_reqwest(e, self.timeout))?
        {
            if bytes.len() + chunk.len() > MAX_BODY_SIZE {
                return Err(body_too_large((bytes.len() + chunk.len()) as u64));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Get configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
