pub mod relay;
pub mod session_registry;
pub mod session_store;

pub use relay::{DispatchOutcome, SessionRelay};
pub use session_registry::InMemorySessionRegistry;
pub use session_store::InMemorySessionStore;
