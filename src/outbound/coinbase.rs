//! Coinbase onramp adapter.
//!
//! Coinbase issues a short-lived session token that is embedded in the
//! hosted checkout URL. The correlation id is generated locally and passed
//! along as `partnerUserRef`.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::domain::funding::{OnrampRequest, ProviderDescriptor, ProviderId, ProviderQuote};
use crate::domain::ports::{OnrampProvider, ProviderError, ProviderSession};
use crate::outbound::http_client::ProviderHttpClient;

const ASSET: &str = "USDC";
const NETWORK: &str = "ethereum";

pub struct CoinbaseOnramp {
    http: ProviderHttpClient,
    quote_http: ProviderHttpClient,
    api_base_url: String,
    pay_base_url: String,
    api_key: SecretString,
    quote_amount: String,
    descriptor: ProviderDescriptor,
}

impl CoinbaseOnramp {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: ProviderHttpClient,
        quote_http: ProviderHttpClient,
        api_base_url: impl Into<String>,
        pay_base_url: impl Into<String>,
        api_key: SecretString,
        quote_amount: impl Into<String>,
        descriptor: ProviderDescriptor,
    ) -> Self {
        Self {
            http,
            quote_http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            pay_base_url: pay_base_url.into().trim_end_matches('/').to_string(),
            api_key,
            quote_amount: quote_amount.into(),
            descriptor,
        }
    }

    fn checkout_url(
        &self,
        token: &str,
        session_id: &str,
        amount: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut url = Url::parse(&format!("{}/buy/select-asset", self.pay_base_url))
            .map_err(|e| ProviderError::Malformed(format!("invalid pay base URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("sessionToken", token)
                .append_pair("partnerUserRef", session_id)
                .append_pair("defaultAsset", ASSET)
                .append_pair("defaultNetwork", NETWORK);
            if let Some(amount) = amount {
                query.append_pair("presetFiatAmount", amount);
            }
        }
        Ok(url.into())
    }
}

#[async_trait]
impl OnrampProvider for CoinbaseOnramp {
    fn id(&self) -> ProviderId {
        ProviderId::Coinbase
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn create_session(
        &self,
        request: &OnrampRequest,
    ) -> Result<ProviderSession, ProviderError> {
        let url = format!("{}/onramp/v1/token", self.api_base_url);
        let payload = json!({
            "addresses": [{
                "address": request.wallet_address.as_str(),
                "blockchains": [NETWORK],
            }],
            "assets": [ASSET],
        });
        let builder = self
            .http
            .client()
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload);

        let Value::Object(raw) = self.http.send_json(builder).await? else {
            return Err(ProviderError::Malformed(
                "expected a JSON object from Coinbase".to_string(),
            ));
        };

        let token = raw
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Malformed("missing session token".to_string()))?;

        let session_id = Uuid::new_v4().to_string();
        let redirect_url = self.checkout_url(token, &session_id, request.amount.as_deref())?;

        Ok(ProviderSession {
            session_id: Some(session_id),
            redirect_url: Some(redirect_url),
            raw,
        })
    }

    async fn fetch_quote(&self) -> Result<ProviderQuote, ProviderError> {
        let url = format!("{}/onramp/v1/buy/quote", self.api_base_url);
        let payload = json!({
            "purchase_currency": ASSET,
            "purchase_network": NETWORK,
            "payment_amount": self.quote_amount,
            "payment_currency": "USD",
            "payment_method": "CARD",
            "country": "US",
        });
        let builder = self
            .quote_http
            .client()
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload);

        let body = self.quote_http.send_json(builder).await?;
        let Value::Object(body) = body else {
            return Err(ProviderError::Malformed("quote is not an object".to_string()));
        };
        parse_quote(&body)
    }
}

fn parse_quote(body: &Map<String, Value>) -> Result<ProviderQuote, ProviderError> {
    let value = |field: &str| {
        body.get(field)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed(format!("quote is missing {field}.value")))
    };

    Ok(ProviderQuote {
        price: value("payment_total")?,
        amount: value("purchase_amount")?,
    })
}
