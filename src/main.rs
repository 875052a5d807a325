//! Reveal Grid Server
//!
//! Boots the board from the data directory and serves it over WebSocket.
//! Configured through `REVEAL_GRID_*` environment variables; log level
//! through `RUST_LOG`.

use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reveal_grid::{
    VERSION,
    engine::{BotDriver, GridConfig, GridService},
    grid::BotDelayRange,
    network::{GridServer, ServerConfig},
    store::FileStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = ServerConfig::from_env();
    info!("Reveal Grid Server v{}", VERSION);
    info!("Data directory: {}", config.data_dir.display());

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    let store = FileStore::in_dir(&config.data_dir);
    let grid_config = GridConfig {
        default_seed: config.boot_seed,
        ..GridConfig::default()
    };
    let service = Arc::new(GridService::new(grid_config, store));

    let kind = service.boot(None).await.context("boot failed")?;
    let digest = service.digest().await?;
    info!(?kind, digest = %hex::encode(&digest[..8]), "board ready");

    let server = Arc::new(GridServer::new(config.clone(), service.clone()));

    let driver = config.autoplay_interval.map(|every| {
        info!("Autoplay every {} ms", every.as_millis());
        let service = service.clone();
        let shutdown = server.subscribe_shutdown();
        tokio::spawn(async move {
            service
                .replace_bot_delay_range(BotDelayRange::around_interval(every.as_millis() as u64))
                .await;
            BotDriver::new(service, every).run(shutdown).await
        })
    });

    let ctrl_c_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            ctrl_c_server.shutdown();
        }
    });

    server.run().await.context("server failed")?;

    if let Some(handle) = driver {
        match handle.await {
            Ok(summary) => info!(steps = summary.steps, finished = summary.finished, "autoplay summary"),
            Err(e) => warn!("autoplay task failed: {}", e),
        }
    }

    info!("Server stopped");
    Ok(())
}
