pub mod broker;
pub mod error;
pub mod funding;
pub mod ports;
pub mod relay;

pub use broker::{OnrampBroker, OnrampSessionResult};
pub use error::ApiError;
pub use funding::{
    CreateSessionBody, FundingSession, FundingStatus, OnrampRequest, ProviderDescriptor,
    ProviderId, ProviderListing, ProviderQuote, WalletAddress,
};
