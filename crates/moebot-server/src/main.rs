//! MoeBot integration host
//!
//! Loads `configuration.yaml`, sets up every configured mower and logs entity
//! state changes until interrupted. Devices are simulated in memory.
//!
//! The config directory is the first argument, else `MOEBOT_CONFIG_DIR`,
//! else the working directory. Log filtering follows `RUST_LOG`.

use anyhow::{Context, Result};
use moebot_config::load_config;
use moebot_device::sim::SimulatedConnector;
use moebot_integration::{EntityStates, MoebotIntegration};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_DIR_ENV: &str = "MOEBOT_CONFIG_DIR";

fn config_dir() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Log every entity state value change
async fn log_state_changes(states: Arc<EntityStates>) {
    let mut changes = states.subscribe();
    loop {
        match changes.recv().await {
            Ok(change) if change.is_value_change() => {
                let state = change.new_state.as_ref().map(|s| s.state.as_str());
                info!(entity_id = %change.entity_id, state = ?state, "State changed");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "State change log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting MoeBot host");

    let config_dir = config_dir();
    let config = load_config(&config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;
    if config.entries.is_empty() {
        warn!(dir = %config_dir.display(), "No MoeBot devices configured");
    }

    let integration = MoebotIntegration::new(Arc::new(SimulatedConnector::new()));
    let logger = tokio::spawn(log_state_changes(integration.states().clone()));

    for data in config.entries {
        let device_id = data.device_id.clone();
        match integration.add_entry(data).await {
            Ok(entry_id) => info!(%device_id, %entry_id, "Configured MoeBot"),
            Err(error) => warn!(%device_id, %error, "Skipping MoeBot"),
        }
    }

    info!(entries = integration.entries().len(), "MoeBot host is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    integration.shutdown().await;
    logger.abort();
    Ok(())
}
