pub mod event;
pub mod hmac_signer;

pub use event::{EventEnvelope, SessionStatusEvent, map_status};
pub use hmac_signer::{
    HmacSigner, SignatureError, format_signature_header, parse_signature_header,
};

use secrecy::{ExposeSecret, SecretString};

/// Verifies provider-signed webhook deliveries
pub struct WebhookVerifier {
    signer: HmacSigner,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    pub fn new(secret: &SecretString, tolerance_secs: u64) -> Self {
        Self {
            signer: HmacSigner::new(secret.expose_secret().to_string()),
            tolerance_secs,
        }
    }

    /// Check the raw body against the signature header value
    pub fn verify(&self, header: Option<&str>, payload: &str) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;
        let parsed = parse_signature_header(header)?;
        self.signer.verify(
            payload,
            &parsed.signatures,
            parsed.timestamp,
            self.tolerance_secs,
        )
    }

    /// Produce a header value for `payload` signed at `timestamp`
    pub fn sign(&self, payload: &str, timestamp: u64) -> String {
        format_signature_header(&self.signer.sign_with_timestamp(payload, timestamp), timestamp)
    }
}
