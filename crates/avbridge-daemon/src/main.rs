//! avbridge Daemon - receiver/player synchronization service.
//!
//! Watches the music-player service's event bus and keeps an AV
//! receiver's power, volume, and input source in step with playback,
//! relaying user volume changes back the other way.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bridge;
mod config;
mod signals;

use avbridge_db::Database;
use bridge::Bridge;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("avbridge=info".parse()?)
                .add_directive("avbridge_daemon=debug".parse()?)
                .add_directive("avbridge_avr=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting avbridge daemon");

    // Load configuration
    let config = config::load_config()?;
    info!("Configuration loaded");

    // Open the settings store
    let db = match &config.database.path {
        Some(path) => Database::open_at(path.clone()),
        None => Database::open(),
    }
    .context("Failed to open settings store")?;
    info!("Settings store initialized");

    // Set up signal handling
    let signal_rx = signals::setup_signal_handlers()?;

    let bridge = Bridge::new(db, config.player.address.clone(), signal_rx);
    bridge.run().await?;

    info!("avbridge daemon stopped");
    Ok(())
}
