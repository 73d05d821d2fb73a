//! mock-control-plane: a mock control-plane server for integration tests
//!
//! Serves paginated "cell mapping" snapshots so that clients which walk
//! cursor-paginated result sets can be tested end to end.
//!
//! Features:
//! - One snapshot endpoint per entity kind (organizations, project keys)
//! - Opaque keyset cursors that stay valid if records come and go
//! - An echo mode that reflects requests back, for proxy tests
//! - Configuration via CLI arguments or TOML file

mod config;
mod cursor;
mod http;
mod pagination;
mod projection;
mod server;
mod services;
mod store;

use config::Config;
use server::Server;
use services::Service;
use tracing::info;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        mode = ?config.mode,
        page_size = config.page_size,
        total_results = config.total_results,
        start_time = ?config.start_time,
        "Starting mock control plane"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), BoxError> {
    let service = Service::from_config(&config)?;
    let server = Server::bind(&config, service).await?;
    server.run().await
}
