//! Stripe crypto onramp adapter.
//!
//! Sessions are created with a form-encoded POST; quotes come from the
//! onramp quotes endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::funding::{OnrampRequest, ProviderDescriptor, ProviderId, ProviderQuote};
use crate::domain::ports::{OnrampProvider, ProviderError, ProviderSession};
use crate::outbound::http_client::ProviderHttpClient;

const SOURCE_CURRENCY: &str = "usd";
const DESTINATION_CURRENCY: &str = "usdc";
const DESTINATION_NETWORK: &str = "ethereum";

pub struct StripeOnramp {
    http: ProviderHttpClient,
    quote_http: ProviderHttpClient,
    api_base_url: String,
    secret_key: SecretString,
    quote_amount: String,
    descriptor: ProviderDescriptor,
}

impl StripeOnramp {
    pub fn new(
        http: ProviderHttpClient,
        quote_http: ProviderHttpClient,
        api_base_url: impl Into<String>,
        secret_key: SecretString,
        quote_amount: impl Into<String>,
        descriptor: ProviderDescriptor,
    ) -> Self {
        Self {
            http,
            quote_http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            secret_key,
            quote_amount: quote_amount.into(),
            descriptor,
        }
    }

    fn session_form(request: &OnrampRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("source_currency", SOURCE_CURRENCY.to_string()),
            ("wallet_address", request.wallet_address.to_string()),
            ("lock_wallet_address", "true".to_string()),
            ("destination_networks[]", DESTINATION_NETWORK.to_string()),
            ("destination_network", DESTINATION_NETWORK.to_string()),
            ("destination_currency", DESTINATION_CURRENCY.to_string()),
        ];
        if let Some(amount) = &request.amount {
            form.push(("source_amount", amount.clone()));
        }
        form
    }
}

#[async_trait]
impl OnrampProvider for StripeOnramp {
    fn id(&self) -> ProviderId {
        ProviderId::Stripe
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn create_session(
        &self,
        request: &OnrampRequest,
    ) -> Result<ProviderSession, ProviderError> {
        let url = format!("{}/v1/crypto/onramp_sessions", self.api_base_url);
        let builder = self
            .http
            .client()
            .post(url)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&Self::session_form(request));

        let Value::Object(raw) = self.http.send_json(builder).await? else {
            return Err(ProviderError::Malformed(
                "expected a JSON object from Stripe".to_string(),
            ));
        };

        Ok(ProviderSession {
            session_id: raw.get("id").and_then(Value::as_str).map(str::to_string),
            redirect_url: raw
                .get("redirect_url")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw,
        })
    }

    async fn fetch_quote(&self) -> Result<ProviderQuote, ProviderError> {
        let url = format!("{}/v1/crypto/onramp/quotes", self.api_base_url);
        let builder = self
            .quote_http
            .client()
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .query(&[
                ("source_currency", SOURCE_CURRENCY),
                ("source_amount", self.quote_amount.as_str()),
                ("destination_currencies[]", DESTINATION_CURRENCY),
                ("destination_networks[]", DESTINATION_NETWORK),
            ]);

        let body = self.quote_http.send_json(builder).await?;
        parse_quote(&body)
    }
}

fn parse_quote(body: &Value) -> Result<ProviderQuote, ProviderError> {
    let quote = body
        .pointer(&format!("/destination_network_quotes/{DESTINATION_NETWORK}/0"))
        .ok_or_else(|| ProviderError::Malformed("no quote for destination network".to_string()))?;

    let field = |name: &str| {
        quote
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed(format!("quote is missing {name}")))
    };

    Ok(ProviderQuote {
        price: field("source_total_amount")?,
        amount: field("destination_amount")?,
    })
}
