//! Protocol tests for the relay core.
//!
//! Connections are in-memory [`Transport`] channels, so every test drives
//! the same code paths as the `WebSocket` layer without a listener.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use riftclaw_relay::config::{LimitsConfig, RateLimitConfig};
use riftclaw_relay::{Frame, Relay, RelayConfig, RelayError, Transport};
use riftclaw_types::ConnectionId;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Client {
    id: ConnectionId,
    rx: UnboundedReceiver<Frame>,
}

impl Client {
    async fn send(&self, relay: &Relay, message: &Value) {
        relay.handle_frame(self.id, message.to_string().as_bytes()).await;
    }

    /// Next queued frame, decoded. Close frames come back as
    /// `{"close": code, "reason": ...}`.
    fn next(&mut self) -> Value {
        frame_json(self.rx.try_recv().unwrap())
    }

    async fn next_within(&mut self, limit: Duration) -> Value {
        frame_json(tokio::time::timeout(limit, self.rx.recv()).await.unwrap().unwrap())
    }

    fn is_idle(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

fn frame_json(frame: Frame) -> Value {
    match frame {
        Frame::Text(text) => serde_json::from_str(&text).unwrap(),
        Frame::Close { code, reason } => json!({ "close": code, "reason": reason }),
    }
}

fn addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50_000))
}

/// Connect and consume the `welcome`.
async fn connect(relay: &Relay) -> Client {
    let (transport, rx) = Transport::channel();
    let id = relay.connect(transport, addr()).await.unwrap();
    let mut client = Client { id, rx };
    assert_eq!(client.next()["type"], "welcome");
    client
}

/// Connect and register a world, consuming `welcome` and `register_confirm`.
async fn connect_world(relay: &Relay, world: &str) -> Client {
    let mut client = connect(relay).await;
    client
        .send(
            relay,
            &json!({
                "type": "register_world",
                "world_name": world,
                "world_url": format!("wss://{world}.example/ws"),
            }),
        )
        .await;
    assert_eq!(client.next()["type"], "register_confirm");
    client
}

async fn discover(relay: &Relay, client: &mut Client) -> Value {
    client.send(relay, &json!({ "type": "discover" })).await;
    let response = client.next();
    assert_eq!(response["type"], "discover_response");
    response
}

fn portal_worlds(response: &Value) -> Vec<String> {
    response["portals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["destination_world"].as_str().unwrap().to_owned())
        .collect()
}

fn handoff_to(target: &str) -> Value {
    json!({
        "type": "handoff_request",
        "agent_id": "agent-7",
        "portal_id": format!("portal_{target}_01"),
        "passport": { "target_world": target, "agent_name": "Scout" },
    })
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn welcome_announces_relay_identity() {
    let relay = Relay::new(RelayConfig::default());
    let (transport, rx) = Transport::channel();
    let id = relay.connect(transport, addr()).await.unwrap();
    let mut client = Client { id, rx };

    let welcome = client.next();
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["world_name"], "RiftClaw Relay");
    assert_eq!(welcome["capabilities"], json!(["portals", "relay"]));
    assert_eq!(welcome["relay_id"], id.to_string());
    assert!(welcome["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn registry_tracks_open_connections() {
    let relay = Relay::new(RelayConfig::default());
    let a = connect(&relay).await;
    let b = connect(&relay).await;
    assert_eq!(relay.stats().await.connections, 2);

    relay.disconnect(a.id).await;
    assert_eq!(relay.stats().await.connections, 1);

    // Disconnecting twice is harmless.
    relay.disconnect(a.id).await;
    relay.disconnect(b.id).await;
    assert_eq!(relay.stats().await.connections, 0);
}

#[tokio::test]
async fn frames_after_disconnect_are_dropped() {
    let relay = Relay::new(RelayConfig::default());
    let mut client = connect(&relay).await;
    relay.disconnect(client.id).await;

    client.send(&relay, &json!({ "type": "ping" })).await;
    assert!(client.is_idle());
}

#[tokio::test]
async fn connection_beyond_cap_is_refused() {
    let config = RelayConfig {
        limits: LimitsConfig {
            max_connections: Some(1),
            rate_limit: None,
        },
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);
    let _first = connect(&relay).await;

    let (transport, mut rx) = Transport::channel();
    let refused = relay.connect(transport, addr()).await;
    assert!(matches!(refused, Err(RelayError::ServerFull)));

    let error = frame_json(rx.try_recv().unwrap());
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "SERVER_FULL");
    assert_eq!(frame_json(rx.try_recv().unwrap())["close"], 1013);
    assert_eq!(relay.stats().await.connections, 1);
}

#[tokio::test]
async fn shutdown_closes_every_connection_with_going_away() {
    let relay = Relay::new(RelayConfig::default());
    let mut a = connect(&relay).await;
    let mut b = connect_world(&relay, "arena").await;

    assert_eq!(relay.shutdown().await, 2);
    for client in [&mut a, &mut b] {
        let close = client.next();
        assert_eq!(close["close"], 1001);
        assert_eq!(close["reason"], "Server shutting down");
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_json_is_malformed_and_connection_survives() {
    let relay = Relay::new(RelayConfig::default());
    let mut client = connect(&relay).await;

    relay.handle_frame(client.id, b"definitely not json").await;
    let error = client.next();
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "MALFORMED_MESSAGE");

    client.send(&relay, &json!({ "type": "ping" })).await;
    assert_eq!(client.next()["type"], "pong");
}

#[tokio::test]
async fn unknown_type_is_reported() {
    let relay = Relay::new(RelayConfig::default());
    let mut client = connect(&relay).await;

    client.send(&relay, &json!({ "type": "teleport" })).await;
    let error = client.next();
    assert_eq!(error["code"], "UNKNOWN_TYPE");
    assert_eq!(error["message"], "Unknown message type: teleport");
    assert!(client.is_idle());
}

#[tokio::test]
async fn known_type_with_bad_fields_is_malformed() {
    let relay = Relay::new(RelayConfig::default());
    let mut client = connect(&relay).await;

    client
        .send(&relay, &json!({ "type": "register_world", "world_name": 42 }))
        .await;
    assert_eq!(client.next()["code"], "MALFORMED_MESSAGE");
    assert_eq!(relay.stats().await.worlds, 0);
}

// ---------------------------------------------------------------------------
// World directory and discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registered_world_is_discoverable() {
    let relay = Relay::new(RelayConfig::default());
    let _arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    let response = discover(&relay, &mut agent).await;
    assert_eq!(response["registered_worlds"], 1);
    let portal = &response["portals"][0];
    assert_eq!(portal["portal_id"], "portal_arena_01");
    assert_eq!(portal["destination_world"], "arena");
    assert_eq!(portal["destination_url"], "wss://arena.example/ws");
    assert_eq!(portal["requires_auth"], false);
    assert_eq!(portal["metadata"]["registered"], true);
}

#[tokio::test]
async fn discovery_excludes_the_requesting_world() {
    let relay = Relay::new(RelayConfig::default());
    let mut arena = connect_world(&relay, "arena").await;
    let _forest = connect_world(&relay, "forest").await;
    let mut agent = connect(&relay).await;

    assert_eq!(portal_worlds(&discover(&relay, &mut arena).await), ["forest"]);
    assert_eq!(
        portal_worlds(&discover(&relay, &mut agent).await),
        ["arena", "forest"]
    );
}

#[tokio::test]
async fn closing_a_world_removes_it_from_discovery() {
    let relay = Relay::new(RelayConfig::default());
    let arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    relay.disconnect(arena.id).await;
    let response = discover(&relay, &mut agent).await;
    assert_eq!(response["registered_worlds"], 0);
    assert!(portal_worlds(&response).is_empty());
}

#[tokio::test]
async fn last_registration_wins_and_survives_the_first_close() {
    let relay = Relay::new(RelayConfig::default());
    let first = connect_world(&relay, "arena").await;

    let mut second = connect(&relay).await;
    second
        .send(
            &relay,
            &json!({
                "type": "register_world",
                "world_name": "arena",
                "world_url": "wss://arena-2.example/ws",
            }),
        )
        .await;
    assert_eq!(second.next()["status"], "registered");

    relay.disconnect(first.id).await;

    let mut agent = connect(&relay).await;
    let response = discover(&relay, &mut agent).await;
    assert_eq!(response["registered_worlds"], 1);
    assert_eq!(
        response["portals"][0]["destination_url"],
        "wss://arena-2.example/ws"
    );

    relay.disconnect(second.id).await;
    assert_eq!(discover(&relay, &mut agent).await["registered_worlds"], 0);
}

#[tokio::test]
async fn renaming_a_world_releases_the_old_id() {
    let relay = Relay::new(RelayConfig::default());
    let mut world = connect_world(&relay, "arena").await;
    world
        .send(
            &relay,
            &json!({
                "type": "register_world",
                "world_name": "colosseum",
                "world_url": "wss://colosseum.example/ws",
            }),
        )
        .await;
    assert_eq!(world.next()["world_name"], "colosseum");

    let mut agent = connect(&relay).await;
    assert_eq!(
        portal_worlds(&discover(&relay, &mut agent).await),
        ["colosseum"]
    );
}

#[tokio::test]
async fn static_worlds_are_listed_until_shadowed() {
    let config = RelayConfig {
        worlds: BTreeMap::from([("lobby".to_owned(), "wss://lobby.example".to_owned())]),
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);
    let mut agent = connect(&relay).await;

    let response = discover(&relay, &mut agent).await;
    assert_eq!(response["registered_worlds"], 0);
    assert_eq!(response["portals"][0]["metadata"]["registered"], false);

    let _lobby = connect_world(&relay, "lobby").await;
    let response = discover(&relay, &mut agent).await;
    assert_eq!(response["portals"].as_array().unwrap().len(), 1);
    assert_eq!(
        response["portals"][0]["destination_url"],
        "wss://lobby.example/ws"
    );
}

// ---------------------------------------------------------------------------
// Handoff
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handoff_to_live_world_forwards_then_confirms() {
    let relay = Relay::new(RelayConfig::default());
    let mut arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    let started = Instant::now();
    agent.send(&relay, &handoff_to("arena")).await;

    let forwarded = arena.next();
    assert_eq!(forwarded["type"], "handoff_request");
    assert_eq!(forwarded["from_agent"], "agent-7");
    assert_eq!(forwarded["portal_id"], "portal_arena_01");
    assert_eq!(forwarded["passport"]["agent_name"], "Scout");

    assert!(agent.is_idle());
    let confirm = agent.next_within(RECV_TIMEOUT).await;
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(confirm["type"], "handoff_confirm");
    assert_eq!(confirm["target_url"], "wss://arena.example/ws");
    assert_eq!(confirm["passport"]["target_world"], "arena");
}

#[tokio::test]
async fn handoff_to_unknown_world_is_rejected_once() {
    let relay = Relay::new(RelayConfig::default());
    let mut arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    agent.send(&relay, &handoff_to("atlantis")).await;
    let rejected = agent.next();
    assert_eq!(rejected["type"], "handoff_rejected");
    assert_eq!(rejected["reason"], "unknown_destination");
    assert_eq!(rejected["details"], "World 'atlantis' not found");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(agent.is_idle());
    assert!(arena.is_idle());
}

#[tokio::test]
async fn handoff_falls_back_to_bound_agent_id() {
    let relay = Relay::new(RelayConfig::default());
    let mut arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    agent
        .send(&relay, &json!({ "type": "discover", "agent_id": "agent-9" }))
        .await;
    agent.next();
    assert_eq!(relay.stats().await.agents, 1);

    agent
        .send(
            &relay,
            &json!({ "type": "handoff_request", "passport": { "target_world": "arena" } }),
        )
        .await;
    assert_eq!(arena.next()["from_agent"], "agent-9");
}

#[tokio::test]
async fn handoff_to_static_world_is_simulated() {
    let config = RelayConfig {
        worlds: BTreeMap::from([("lobby".to_owned(), "wss://lobby.example".to_owned())]),
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);
    let mut agent = connect(&relay).await;

    agent.send(&relay, &handoff_to("lobby")).await;
    let confirm = agent.next_within(RECV_TIMEOUT).await;
    assert_eq!(confirm["type"], "handoff_confirm");
    assert_eq!(confirm["new_pos"], json!({ "x": 0.0, "y": 1.0, "z": 0.0 }));
    assert_eq!(
        confirm["granted_capabilities"],
        json!(["movement", "inventory", "trade"])
    );
}

#[tokio::test]
async fn target_confirm_is_only_acknowledged() {
    let relay = Relay::new(RelayConfig::default());
    let mut arena = connect_world(&relay, "arena").await;
    let mut agent = connect(&relay).await;

    arena.send(&relay, &json!({ "type": "handoff_confirm" })).await;
    assert!(arena.is_idle());
    assert!(agent.is_idle());
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_beyond_budget_is_rate_limited() {
    let config = RelayConfig {
        limits: LimitsConfig {
            max_connections: None,
            rate_limit: Some(RateLimitConfig::default()),
        },
        ..RelayConfig::default()
    };
    let relay = Relay::new(config);
    let mut noisy = connect(&relay).await;
    let mut quiet = connect(&relay).await;

    for _ in 0..30 {
        noisy.send(&relay, &json!({ "type": "ping" })).await;
        assert_eq!(noisy.next()["type"], "pong");
    }

    noisy.send(&relay, &json!({ "type": "ping" })).await;
    let limited = noisy.next();
    assert_eq!(limited["type"], "error");
    assert_eq!(limited["code"], "RATE_LIMITED");
    assert!(noisy.is_idle());

    // Budgets are per connection.
    quiet.send(&relay, &json!({ "type": "ping" })).await;
    assert_eq!(quiet.next()["type"], "pong");
}
