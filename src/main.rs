use wallet_backend::config::Config;
use wallet_backend::server::Server;
use wallet_backend::telemetry;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // A missing .env file is fine, the environment may be set directly
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Loaded configuration"
    );
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    // Create and run server
    let server = Server::new(&config).await?;
    server.run().await
}
