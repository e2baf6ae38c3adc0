// Inbound adapters
//
// webhook – signature verification and event parsing for provider callbacks

pub mod webhook;

pub use webhook::{SessionStatusEvent, WebhookVerifier};
