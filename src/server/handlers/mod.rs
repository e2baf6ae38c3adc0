pub mod encryption;
pub mod health;
pub mod onramp;
pub mod relay;
pub mod root;
pub mod webhook;
