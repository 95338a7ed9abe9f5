//! Mutable relay state.
//!
//! [`RelayState`] bundles every shared map the relay mutates: sessions,
//! world records and rate windows. It is owned by one
//! [`Relay`](crate::relay::Relay) behind a single mutex, and each inbound
//! frame is handled to completion while holding it, so handlers never see
//! another connection's half-applied update.

use serde::Serialize;

use crate::config::RelayConfig;
use crate::directory::WorldDirectory;
use crate::rate_limit::RateLimiter;
use crate::registry::ConnectionRegistry;

/// Everything the relay mutates while handling messages.
#[derive(Debug)]
pub struct RelayState {
    /// Live connections.
    pub registry: ConnectionRegistry,
    /// Registered and static worlds.
    pub directory: WorldDirectory,
    /// Present only when rate limiting is configured.
    pub limiter: Option<RateLimiter>,
}

impl RelayState {
    /// Build empty state shaped by the configuration.
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory: WorldDirectory::with_static_worlds(config.worlds.clone()),
            limiter: config.limits.rate_limit.as_ref().map(RateLimiter::from_config),
        }
    }
}

/// Point-in-time counters, logged periodically and served on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Live connections.
    pub connections: usize,
    /// Live world records.
    pub worlds: usize,
    /// Distinct bound agent ids.
    pub agents: usize,
    /// Seconds since the relay was created.
    pub uptime_secs: u64,
}
