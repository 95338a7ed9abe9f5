//! HTTP endpoint handlers that sit alongside the relay socket.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe with relay counters |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::relay::Relay;
use crate::state::RelayStats;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the relay is serving.
    pub status: &'static str,
    /// Configured relay name.
    pub relay: String,
    /// Relay version.
    pub version: String,
    /// Live counters.
    #[serde(flatten)]
    pub stats: RelayStats,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report that the relay is up, with its current counters.
pub async fn health(State(relay): State<Arc<Relay>>) -> Json<HealthResponse> {
    let stats = relay.stats().await;
    let identity = &relay.config().relay;
    Json(HealthResponse {
        status: "ok",
        relay: identity.name.clone(),
        version: identity.version.clone(),
        stats,
    })
}
