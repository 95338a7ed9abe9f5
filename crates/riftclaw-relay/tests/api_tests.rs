//! Integration tests for the relay's HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use riftclaw_relay::{Relay, RelayConfig, Transport, build_router};
use serde_json::Value;
use tower::ServiceExt;

async fn get_json(relay: Arc<Relay>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(relay)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_identity_and_counters() {
    let relay = Arc::new(Relay::new(RelayConfig::default()));
    let (transport, _rx) = Transport::channel();
    let id = relay
        .connect(transport, SocketAddr::from(([127, 0, 0, 1], 9000)))
        .await
        .unwrap();
    relay
        .handle_frame(
            id,
            br#"{"type":"register_world","world_name":"arena","world_url":"wss://arena/ws"}"#,
        )
        .await;

    let (status, body) = get_json(Arc::clone(&relay), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["relay"], "RiftClaw Relay");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["connections"], 1);
    assert_eq!(body["worlds"], 1);
    assert_eq!(body["agents"], 0);
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let relay = Arc::new(Relay::new(RelayConfig::default()));
    let response = build_router(relay)
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
