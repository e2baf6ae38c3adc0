// Outbound adapters
//
// Provider clients for the onramp broker:
//   http_client – shared reqwest wrapper with timeouts and error mapping
//   stripe, coinbase – OnrampProvider implementations
//
// key_management – identity verification and encryption sessions

pub mod coinbase;
pub mod http_client;
pub mod key_management;
pub mod stripe;

pub use coinbase::CoinbaseOnramp;
pub use http_client::{HttpClientError, ProviderHttpClient};
pub use key_management::{KeyManagementClient, KeyManagementCredentials};
pub use stripe::StripeOnramp;
