use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Allowed clock skew for timestamps in the future
const MAX_FUTURE_SKEW_SECS: u64 = 60;

/// Why a webhook signature was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Invalid signature header format: {0}")]
    MalformedHeader(String),

    #[error("Timestamp too old: {age} seconds (max: {max_age})")]
    Expired { age: u64, max_age: u64 },

    #[error("Timestamp is in the future: {0} seconds ahead")]
    FromTheFuture(u64),

    #[error("Invalid signature")]
    Mismatch,

    #[error("System clock error: {0}")]
    Clock(String),
}

/// HMAC-SHA256 signer over `"{timestamp}.{payload}"`
pub struct HmacSigner {
    secret: String,
}

impl HmacSigner {
    /// New HMAC signer with the given secret
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Sign a payload with a specific timestamp
    pub fn sign_with_timestamp(&self, payload: &str, timestamp: u64) -> String {
        hex::encode(self.mac(payload, timestamp).finalize().into_bytes())
    }

    /// Verify any of `signatures` (hex) against the payload.
    ///
    /// The timestamp is checked for freshness first, then each candidate is
    /// compared in constant time.
    pub fn verify(
        &self,
        payload: &str,
        signatures: &[&str],
        timestamp: u64,
        max_age_secs: u64,
    ) -> Result<(), SignatureError> {
        let current = current_timestamp()?;
        let age = current.saturating_sub(timestamp);

        if age > max_age_secs {
            return Err(SignatureError::Expired {
                age,
                max_age: max_age_secs,
            });
        }

        if timestamp > current + MAX_FUTURE_SKEW_SECS {
            return Err(SignatureError::FromTheFuture(timestamp - current));
        }

        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| self.mac(payload, timestamp).verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn mac(&self, payload: &str, timestamp: u64) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC key can be of any size, as per crate documentation"),
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac
    }
}

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> Result<u64, SignatureError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| SignatureError::Clock(e.to_string()))
}

/// Parsed `Stripe-Signature` header: `t=<unix>,v1=<hex>[,v1=<hex>...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    pub timestamp: u64,
    pub signatures: Vec<&'a str>,
}

/// Parse a signature header; unknown schemes (e.g. `v0`) are skipped
pub fn parse_signature_header(header: &str) -> Result<SignatureHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader(header.to_string()));
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| SignatureError::MalformedHeader(header.to_string()))?,
                );
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    match (timestamp, signatures.is_empty()) {
        (Some(timestamp), false) => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader(header.to_string())),
    }
}

/// Format a header the way the provider sends it; used by tests and tooling
pub fn format_signature_header(signature: &str, timestamp: u64) -> String {
    format!("t={timestamp},v1={signature}")
}
