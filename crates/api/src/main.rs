//! AQI Service - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level)?;

    info!("=== AQI Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Store: {} (capacity {})",
        config.storage.db_path.display(),
        config.storage.capacity
    );

    run_server(config).await
}
