use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is not set
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
