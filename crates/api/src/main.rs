//! Fruit Ripeness Service - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config);

    info!("=== Fruit Ripeness Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Model: {}, labels: {}, gate {} at {:.1}%",
        config.model_path.display(),
        config.labels_path.display(),
        if config.gate_enabled { "enabled" } else { "disabled" },
        config.gate_threshold
    );

    run_server(config).await
}
