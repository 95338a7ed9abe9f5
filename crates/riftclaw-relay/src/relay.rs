//! The relay: frame handling and per-message handlers.
//!
//! [`Relay`] owns the configuration and the [`RelayState`] mutex. The
//! WebSocket layer calls [`Relay::connect`], [`Relay::handle_frame`] and
//! [`Relay::disconnect`] for each connection, in that order and never
//! concurrently for the same connection.
//!
//! Per-frame pipeline: rate limit → decode → bind agent id → dispatch on
//! the message kind. Every failure is reported to the sender only and the
//! connection stays open.

use std::time::Instant;

use riftclaw_types::{ConnectionId, InboundMessage, OutboundMessage};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::dispatch::{self, ParsedFrame};
use crate::error::RelayError;
use crate::handoff::HandoffRequest;
use crate::state::{RelayState, RelayStats};
use crate::transport::Transport;

/// A single relay instance and all of its state.
#[derive(Debug)]
pub struct Relay {
    config: RelayConfig,
    pub(crate) state: Mutex<RelayState>,
    started_at: Instant,
}

impl Relay {
    /// Create a relay with empty state.
    pub fn new(config: RelayConfig) -> Self {
        let state = RelayState::new(&config);
        Self {
            config,
            state: Mutex::new(state),
            started_at: Instant::now(),
        }
    }

    /// The relay's configuration.
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Current counters.
    pub async fn stats(&self) -> RelayStats {
        let state = self.state.lock().await;
        RelayStats {
            connections: state.registry.len(),
            worlds: state.directory.len(),
            agents: state.registry.agent_count(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Handle one inbound frame from a registered connection.
    ///
    /// Frames for connections that are no longer registered are dropped.
    pub async fn handle_frame(&self, id: ConnectionId, frame: &[u8]) {
        let mut state = self.state.lock().await;

        let Some(transport) = state.registry.transport(id).cloned() else {
            debug!(connection_id = %id, "Dropping frame for unregistered connection");
            return;
        };

        if let Some(limiter) = state.limiter.as_mut() {
            if !limiter.check(id) {
                warn!(connection_id = %id, "Rate limit exceeded, dropping request");
                reply(&transport, RelayError::RateLimited.to_message());
                return;
            }
        }

        let ParsedFrame { message, agent_id } = match dispatch::parse_frame(frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Rejected inbound frame");
                reply(&transport, e.to_message());
                return;
            }
        };

        if let Some(agent_id) = agent_id.as_deref() {
            if state.registry.bind_agent_id(id, agent_id) {
                debug!(connection_id = %id, agent_id, "Agent id bound");
            }
        }

        debug!(connection_id = %id, kind = ?message.kind(), "Message received");

        match message {
            InboundMessage::RegisterWorld {
                world_name,
                world_url,
                display_name,
            } => register_world(
                &mut state,
                id,
                &transport,
                &world_name,
                &world_url,
                display_name.as_deref(),
            ),
            InboundMessage::Discover { agent_id } => {
                discover(&state, id, &transport, agent_id.as_deref());
            }
            InboundMessage::HandoffRequest {
                agent_id,
                portal_id,
                passport,
            } => {
                let request = HandoffRequest {
                    agent_id,
                    portal_id,
                    passport,
                };
                self.handoff_request(&state, id, transport, &request);
            }
            InboundMessage::HandoffConfirm => {
                let world = state
                    .registry
                    .get(id)
                    .and_then(|s| s.world_name.as_deref())
                    .unwrap_or("unknown");
                info!(connection_id = %id, world, "Handoff acknowledged by target world");
            }
            InboundMessage::Ping => reply(&transport, OutboundMessage::Pong),
        }
    }
}

/// Send a message to a connection, logging instead of failing if it has
/// gone away.
pub(crate) fn reply(transport: &Transport, message: OutboundMessage) {
    if let Err(e) = transport.send(message) {
        debug!(error = %e, "Reply dropped");
    }
}

fn register_world(
    state: &mut RelayState,
    id: ConnectionId,
    transport: &Transport,
    world_name: &str,
    world_url: &str,
    display_name: Option<&str>,
) {
    info!(connection_id = %id, world = world_name, url = world_url, "World registering");

    // A connection owns at most one world; switching names releases the old one.
    if let Some(previous) = state.registry.bind_world(id, world_name) {
        if state.directory.remove_world(&previous, id) {
            info!(connection_id = %id, world = %previous, "Previous world released");
        }
    }

    if let Some(replaced) = state
        .directory
        .register_world(id, world_name, world_url, display_name)
    {
        if replaced.owner != id {
            warn!(
                world = world_name,
                previous_owner = %replaced.owner,
                new_owner = %id,
                "World id taken over by a new registration"
            );
        }
    }

    reply(
        transport,
        OutboundMessage::RegisterConfirm {
            world_name: world_name.to_owned(),
            status: "registered".to_owned(),
        },
    );

    info!(
        world = world_name,
        total_worlds = state.directory.len(),
        "World available for discovery"
    );
}

fn discover(state: &RelayState, id: ConnectionId, transport: &Transport, agent_id: Option<&str>) {
    let requesting_world = state.registry.get(id).and_then(|s| s.world_name.as_deref());
    let portals = state
        .directory
        .list_portals(requesting_world, |owner| state.registry.is_open(owner));

    info!(
        connection_id = %id,
        agent_id = agent_id.unwrap_or("anonymous"),
        world = requesting_world.unwrap_or("agent"),
        portals = portals.len(),
        "Discovery"
    );

    reply(
        transport,
        OutboundMessage::DiscoverResponse {
            portals,
            registered_worlds: state.directory.len(),
        },
    );
}
