//! Connection registry: the sole source of truth for who is connected.
//!
//! Each accepted transport gets one [`Session`] keyed by a fresh
//! [`ConnectionId`]. The session owns the connection's [`Transport`]; every
//! other component refers to the connection by id and looks the transport
//! up here, so a removed session can no longer be written to through the
//! relay.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use riftclaw_types::{ConnectionId, ConnectionRole};

use crate::transport::Transport;

/// Metadata for one live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// The connection's id.
    pub id: ConnectionId,
    /// Write handle for the connection.
    pub transport: Transport,
    /// Peer address reported by the listener.
    pub remote_addr: SocketAddr,
    /// Agent id from the first message that carried one.
    pub agent_id: Option<String>,
    /// World id this connection registered, if any.
    pub world_name: Option<String>,
    /// Whether the connection is an agent or a registered world.
    pub role: ConnectionRole,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

/// All live sessions, plus an index of bound agent ids.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    agents: HashMap<String, ConnectionId>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a newly accepted transport.
    pub fn register(&mut self, transport: Transport, remote_addr: SocketAddr) -> ConnectionId {
        let id = ConnectionId::new();
        self.sessions.insert(
            id,
            Session {
                id,
                transport,
                remote_addr,
                agent_id: None,
                world_name: None,
                role: ConnectionRole::Agent,
                connected_at: Utc::now(),
            },
        );
        id
    }

    /// Look up a session.
    pub fn get(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The write handle for a connection, if it is still registered.
    pub fn transport(&self, id: ConnectionId) -> Option<&Transport> {
        self.sessions.get(&id).map(|s| &s.transport)
    }

    /// Whether the connection is registered and its transport still open.
    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.transport(id).is_some_and(Transport::is_open)
    }

    /// Record the agent id for a connection.
    ///
    /// Only the first id sticks; later, different ids on the same
    /// connection are ignored. Returns `true` if this call bound the id.
    pub fn bind_agent_id(&mut self, id: ConnectionId, agent_id: &str) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        if session.agent_id.is_some() {
            return false;
        }
        session.agent_id = Some(agent_id.to_owned());
        self.agents.insert(agent_id.to_owned(), id);
        true
    }

    /// Mark a connection as the owner of `world_name`.
    ///
    /// Returns the world the connection owned before, if it differs.
    pub fn bind_world(&mut self, id: ConnectionId, world_name: &str) -> Option<String> {
        let session = self.sessions.get_mut(&id)?;
        session.role = ConnectionRole::World;
        let previous = session.world_name.replace(world_name.to_owned());
        previous.filter(|prev| prev != world_name)
    }

    /// Remove a session, returning it so the caller can cascade cleanup.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if let Some(agent_id) = &session.agent_id {
            if let Entry::Occupied(entry) = self.agents.entry(agent_id.clone()) {
                if *entry.get() == id {
                    entry.remove();
                }
            }
        }
        Some(session)
    }

    /// The connection an agent id was last bound on.
    pub fn agent_connection(&self, agent_id: &str) -> Option<ConnectionId> {
        self.agents.get(agent_id).copied()
    }

    /// Iterate over all live sessions.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no connections are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of distinct bound agent ids.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}
