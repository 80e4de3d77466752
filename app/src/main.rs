//! Keybridge entry point: load configuration, start the server, run until
//! interrupted.

use kb_config::AppConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let (_state, mut handle, port) = kb_server::start_server(config).await?;

    info!(port, "Keybridge started");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            handle.abort();
        }
        result = &mut handle => {
            result?;
        }
    }

    Ok(())
}
