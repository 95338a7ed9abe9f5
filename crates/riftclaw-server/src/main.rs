//! RiftClaw world relay binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$RIFTCLAW_CONFIG`, else
//!    `riftclaw-relay.yaml`, else built-in defaults
//! 2. Initialize structured logging (tracing)
//! 3. Serve the relay until `Ctrl-C`, then close every connection with
//!    code 1001

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use riftclaw_relay::config::LoggingConfig;
use riftclaw_relay::{Relay, RelayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "riftclaw-relay.yaml";

/// Environment variable naming an explicit config file.
const CONFIG_PATH_ENV: &str = "RIFTCLAW_CONFIG";

#[tokio::main]
async fn main() -> Result<(), ServerBinError> {
    let (config, source) = load_config()?;
    init_logging(&config.logging);

    info!(
        config = source.as_deref().unwrap_or("defaults"),
        host = %config.server.host,
        port = config.server.port,
        static_worlds = config.worlds.len(),
        max_connections = ?config.limits.max_connections,
        rate_limited = config.limits.rate_limit.is_some(),
        "Configuration loaded"
    );

    let relay = Arc::new(Relay::new(config));
    riftclaw_relay::start_server(relay).await?;

    info!("riftclaw-relay exiting");
    Ok(())
}

/// Load configuration, returning it with the path it came from.
///
/// An explicitly named file must exist; the default file is optional.
fn load_config() -> Result<(RelayConfig, Option<String>), ServerBinError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let config = RelayConfig::from_file(&PathBuf::from(&path))?;
        return Ok((config, Some(path)));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        let config = RelayConfig::from_file(&default_path)?;
        return Ok((config, Some(DEFAULT_CONFIG_PATH.to_owned())));
    }

    let mut config = RelayConfig::default();
    config.server.apply_env_overrides();
    Ok((config, None))
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
