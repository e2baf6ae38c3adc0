use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ApiError;

/// Funding providers the broker knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Stripe,
    Coinbase,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Stripe => "stripe",
            ProviderId::Coinbase => "coinbase",
        }
    }

    /// Human readable name used in error bodies ("Stripe API error")
    pub fn label(&self) -> &'static str {
        match self {
            ProviderId::Stripe => "Stripe",
            ProviderId::Coinbase => "Coinbase",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(ProviderId::Stripe),
            "coinbase" => Ok(ProviderId::Coinbase),
            other => Err(ApiError::InvalidRequest(format!(
                "Unsupported provider: {other}"
            ))),
        }
    }
}

/// Lifecycle of a funding session as seen by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingStatus {
    Pending,
    Fulfilled,
    Rejected,
    Unknown,
}

impl FundingStatus {
    /// Fulfilled and rejected sessions never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, FundingStatus::Fulfilled | FundingStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundingStatus::Pending => "pending",
            FundingStatus::Fulfilled => "fulfilled",
            FundingStatus::Rejected => "rejected",
            FundingStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FundingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checksum-agnostic EVM address: `0x` followed by 40 hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| invalid_address(trimmed))?;

        if digits.len() != 40 || hex::decode(digits).is_err() {
            return Err(invalid_address(trimmed));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid_address(raw: &str) -> ApiError {
    ApiError::InvalidRequest(format!("Invalid wallet address: {raw}"))
}

impl TryFrom<String> for WalletAddress {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw body of `POST /api/create-onramp-session`.
///
/// Every field is optional so that missing values surface as
/// [`ApiError::InvalidRequest`] instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionBody {
    pub provider: Option<String>,
    pub address: Option<String>,
    pub amount: Option<String>,
}

/// A validated "add funds" request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnrampRequest {
    pub provider: ProviderId,
    pub wallet_address: WalletAddress,
    pub amount: Option<String>,
}

impl OnrampRequest {
    /// Validate a raw request body.
    ///
    /// A body without `provider` is the older single-provider shape and
    /// selects Stripe.
    pub fn from_body(body: CreateSessionBody) -> Result<Self, ApiError> {
        let provider = match body.provider.as_deref() {
            Some(raw) => raw.parse()?,
            None => ProviderId::Stripe,
        };

        let address = body
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("Missing required field: address".into()))?;
        let wallet_address = WalletAddress::parse(address)?;

        let amount = match body.amount {
            Some(amount) if !amount.trim().is_empty() => Some(validate_amount(amount.trim())?),
            _ => None,
        };

        Ok(Self {
            provider,
            wallet_address,
            amount,
        })
    }
}

fn validate_amount(amount: &str) -> Result<String, ApiError> {
    match amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(amount.to_string()),
        _ => Err(ApiError::InvalidRequest(format!("Invalid amount: {amount}"))),
    }
}

/// One attempt to acquire external funds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSession {
    pub session_id: String,
    pub provider: ProviderId,
    pub wallet_address: WalletAddress,
    pub status: FundingStatus,
    pub created_at: DateTime<Utc>,
    /// Provider transaction details from the latest status event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_details: Option<Value>,
}

impl FundingSession {
    pub fn new(session_id: String, provider: ProviderId, wallet_address: WalletAddress) -> Self {
        Self {
            session_id,
            provider,
            wallet_address,
            status: FundingStatus::Pending,
            created_at: Utc::now(),
            transaction_details: None,
        }
    }
}

/// Price quote for the configured reference purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuote {
    /// Total fiat cost, fees included
    pub price: String,
    /// Crypto amount delivered
    pub amount: String,
}

/// Static presentation data for a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: ProviderId,
    pub display_name: String,
    pub logo_url: String,
}

/// Entry of `GET /api/onramp-providers`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderListing {
    #[serde(flatten)]
    pub descriptor: ProviderDescriptor,
    pub quote: Option<ProviderQuote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xabc0000000000000000000000000000000000123";

    #[test]
    fn test_provider_parsing() {
        assert_eq!("stripe".parse::<ProviderId>().ok(), Some(ProviderId::Stripe));
        assert_eq!(
            " Coinbase ".parse::<ProviderId>().ok(),
            Some(ProviderId::Coinbase)
        );
        assert!(matches!(
            "paypal".parse::<ProviderId>(),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_wallet_address_validation() {
        assert!(WalletAddress::parse(ADDRESS).is_ok());
        assert!(WalletAddress::parse("0xABC0000000000000000000000000000000000123").is_ok());
        assert!(WalletAddress::parse("abc0000000000000000000000000000000000123").is_err());
        assert!(WalletAddress::parse("0x123").is_err());
        assert!(WalletAddress::parse("0xzzz0000000000000000000000000000000000123").is_err());
    }

    #[test]
    fn test_request_defaults_to_stripe() -> Result<(), ApiError> {
        let request = OnrampRequest::from_body(CreateSessionBody {
            provider: None,
            address: Some(ADDRESS.to_string()),
            amount: Some("25".to_string()),
        })?;

        assert_eq!(request.provider, ProviderId::Stripe);
        assert_eq!(request.wallet_address.as_str(), ADDRESS);
        assert_eq!(request.amount.as_deref(), Some("25"));
        Ok(())
    }

    #[test]
    fn test_request_rejects_missing_address() {
        let result = OnrampRequest::from_body(CreateSessionBody {
            provider: Some("stripe".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ApiError::InvalidRequest(msg)) if msg.contains("address")));
    }

    #[test]
    fn test_request_rejects_bad_amount() {
        for amount in ["-5", "0", "ten", "NaN"] {
            let result = OnrampRequest::from_body(CreateSessionBody {
                provider: Some("coinbase".to_string()),
                address: Some(ADDRESS.to_string()),
                amount: Some(amount.to_string()),
            });
            assert!(result.is_err(), "amount {amount} should be rejected");
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(FundingStatus::Fulfilled.is_terminal());
        assert!(FundingStatus::Rejected.is_terminal());
        assert!(!FundingStatus::Pending.is_terminal());
        assert!(!FundingStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_listing_serialization() -> Result<(), serde_json::Error> {
        let listing = ProviderListing {
            descriptor: ProviderDescriptor {
                name: ProviderId::Stripe,
                display_name: "Stripe".to_string(),
                logo_url: "https://example.com/stripe.svg".to_string(),
            },
            quote: None,
        };

        let json = serde_json::to_value(&listing)?;
        assert_eq!(json["name"], "stripe");
        assert_eq!(json["display_name"], "Stripe");
        assert!(json["quote"].is_null());
        Ok(())
    }
}
