//! Connection lifecycle: welcome on accept, cascading cleanup on close.

use std::net::SocketAddr;

use riftclaw_types::{ConnectionId, OutboundMessage};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::relay::{Relay, reply};
use crate::transport::{CLOSE_GOING_AWAY, CLOSE_TRY_AGAIN_LATER, Transport};

impl Relay {
    /// Register a newly accepted transport and send it `welcome`.
    ///
    /// With a connection cap configured and reached, the transport receives
    /// a `SERVER_FULL` error followed by close code 1013 and is never
    /// registered.
    pub async fn connect(
        &self,
        transport: Transport,
        remote_addr: SocketAddr,
    ) -> Result<ConnectionId, RelayError> {
        let mut state = self.state.lock().await;

        if let Some(max) = self.config().limits.max_connections {
            if state.registry.len() >= max {
                warn!(%remote_addr, max_connections = max, "Relay full, refusing connection");
                let err = RelayError::ServerFull;
                reply(&transport, err.to_message());
                if let Err(e) = transport.close(CLOSE_TRY_AGAIN_LATER, "Server Full") {
                    debug!(error = %e, "Refused connection already gone");
                }
                return Err(err);
            }
        }

        let id = state.registry.register(transport.clone(), remote_addr);
        info!(
            connection_id = %id,
            %remote_addr,
            connections = state.registry.len(),
            "Connected"
        );

        let relay = &self.config().relay;
        reply(
            &transport,
            OutboundMessage::Welcome {
                world_name: relay.name.clone(),
                version: relay.version.clone(),
                capabilities: relay.capabilities.clone(),
                relay_id: id,
            },
        );

        Ok(id)
    }

    /// Remove a connection and everything it owned.
    ///
    /// Drops the session, its rate window, and its world record if it still
    /// owns one. Calling this twice for the same id is a no-op.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut state = self.state.lock().await;

        let Some(session) = state.registry.unregister(id) else {
            debug!(connection_id = %id, "Disconnect for unknown connection");
            return;
        };

        if let Some(limiter) = state.limiter.as_mut() {
            limiter.remove(id);
        }

        if let Some(world) = session.world_name.as_deref() {
            if state.directory.remove_world(world, id) {
                info!(connection_id = %id, world, "World unregistered");
            } else {
                debug!(connection_id = %id, world, "World record owned by a newer registration, kept");
            }
        }

        let connected_secs = chrono::Utc::now()
            .signed_duration_since(session.connected_at)
            .num_seconds();
        info!(
            connection_id = %id,
            remote_addr = %session.remote_addr,
            connected_secs,
            connections = state.registry.len(),
            worlds = state.directory.len(),
            "Disconnected"
        );
    }

    /// Ask every live connection to close with code 1001.
    ///
    /// Sessions are removed by the normal disconnect path as each
    /// connection's socket closes. Returns the number of close frames
    /// queued.
    pub async fn shutdown(&self) -> usize {
        let state = self.state.lock().await;
        let closed = state
            .registry
            .sessions()
            .filter(|s| {
                s.transport
                    .close(CLOSE_GOING_AWAY, "Server shutting down")
                    .is_ok()
            })
            .count();
        info!(closed, "Closing relay connections");
        closed
    }
}
