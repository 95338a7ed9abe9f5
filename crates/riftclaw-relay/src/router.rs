//! Axum router construction for the relay.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::relay::Relay;
use crate::ws;

/// Build the complete Axum router for a relay.
///
/// The router includes:
/// - `GET /` -- relay `WebSocket` endpoint
/// - `GET /ws` -- the same endpoint under an explicit path
/// - `GET /health` -- liveness probe with counters
///
/// The `WebSocket` routes extract the peer address, so the router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(relay: Arc<Relay>) -> Router {
    Router::new()
        // WebSocket
        .route("/", get(ws::ws_relay))
        .route("/ws", get(ws::ws_relay))
        // Probes
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}
