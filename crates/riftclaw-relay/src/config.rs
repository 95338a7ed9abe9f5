//! Configuration loading and typed config structures for the relay.
//!
//! The relay reads an optional YAML file (see [`RelayConfig::from_file`]).
//! Every section and field has a default, so an empty or missing file
//! yields a working baseline relay: dynamic world registration only, no
//! connection cap and no rate limiting.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Relay identity and housekeeping intervals.
    #[serde(default)]
    pub relay: RelayIdentityConfig,

    /// Handoff timing.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Optional hardening limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Static `world_id -> URL` table advertised alongside live worlds.
    #[serde(default)]
    pub worlds: BTreeMap<String, String>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `HOST` overrides `server.host`
    /// - `PORT` overrides `server.port`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        Ok(config)
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Override the listener with the `HOST` and `PORT` environment
    /// variables when set. An unparseable `PORT` is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
    }

    /// The `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Relay identity announced in `welcome`, plus housekeeping intervals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayIdentityConfig {
    /// Display name sent as `welcome.world_name`.
    #[serde(default = "default_relay_name")]
    pub name: String,

    /// Protocol version sent in `welcome`.
    #[serde(default = "default_relay_version")]
    pub version: String,

    /// Capabilities advertised in `welcome`.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,

    /// Seconds between stats log lines (0 disables).
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    /// Seconds between server-initiated WebSocket pings (0 disables).
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
}

impl RelayIdentityConfig {
    /// Stats interval, or `None` when disabled.
    pub const fn stats_interval(&self) -> Option<Duration> {
        non_zero_secs(self.stats_interval_secs)
    }

    /// Keepalive interval, or `None` when disabled.
    pub const fn keepalive_interval(&self) -> Option<Duration> {
        non_zero_secs(self.keepalive_interval_secs)
    }
}

impl Default for RelayIdentityConfig {
    fn default() -> Self {
        Self {
            name: default_relay_name(),
            version: default_relay_version(),
            capabilities: default_capabilities(),
            stats_interval_secs: default_stats_interval_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

/// Handoff timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandoffConfig {
    /// Milliseconds between forwarding a handoff and confirming it to the
    /// requester.
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
}

impl HandoffConfig {
    /// The confirm delay as a [`Duration`].
    pub const fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            confirm_delay_ms: default_confirm_delay_ms(),
        }
    }
}

/// Hardening limits. Both are off unless configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Reject new connections with `SERVER_FULL` beyond this many.
    #[serde(default)]
    pub max_connections: Option<usize>,

    /// Per-connection sliding-window request budget.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Sliding-window rate limit parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub window_ms: u64,

    /// Requests allowed per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: usize,
}

impl RateLimitConfig {
    /// The window as a [`Duration`].
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_rate_limit_window_ms(),
            max_requests: default_rate_limit_max_requests(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn non_zero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8765
}

fn default_relay_name() -> String {
    "RiftClaw Relay".to_owned()
}

fn default_relay_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_capabilities() -> Vec<String> {
    vec!["portals".to_owned(), "relay".to_owned()]
}

const fn default_stats_interval_secs() -> u64 {
    60
}

const fn default_keepalive_interval_secs() -> u64 {
    30
}

const fn default_confirm_delay_ms() -> u64 {
    500
}

const fn default_rate_limit_window_ms() -> u64 {
    60_000
}

const fn default_rate_limit_max_requests() -> usize {
    30
}

fn default_log_level() -> String {
    "info".to_owned()
}
