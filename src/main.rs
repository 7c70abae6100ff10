// src/main.rs
use packaging_optimizer::{api, config::AppConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from the file applies to the subscriber.
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let optimizer = app_config.optimizer.build_optimizer();

    info!(
        templates = optimizer.catalog().len(),
        parallel_threshold = optimizer.parallel_threshold(),
        "🚀 Packaging optimizer starting..."
    );
    api::start_api_server(app_config.api, optimizer).await?;
    Ok(())
}
