//! RiftClaw world relay.
//!
//! A `WebSocket` relay that lets independently hosted virtual worlds find
//! each other and pass agents between them. Worlds connect and register
//! under an id; agents connect and ask which worlds exist; an agent in one
//! world asks to travel to another and the relay forwards the request to
//! the destination world's connection and confirms to the requester.
//!
//! # Architecture
//!
//! - [`registry`] tracks every live connection and its bound identity.
//! - [`directory`] maps world ids to the connection that registered them,
//!   plus an optional static table of well-known worlds.
//! - [`relay`] decodes inbound frames and dispatches them to handlers;
//!   [`handoff`] routes travel requests; [`lifecycle`] admits and cleans
//!   up connections.
//! - [`ws`], [`router`] and [`server`] put the relay on an Axum listener.
//!
//! The relay core never touches a socket. Each connection is represented
//! by a [`Transport`], an outbound channel drained by that connection's
//! writer task, so the whole protocol can be driven in tests without a
//! network.

pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod handoff;
pub mod lifecycle;
pub mod rate_limit;
pub mod registry;
pub mod relay;
pub mod router;
pub mod server;
pub mod state;
pub mod transport;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{ConfigError, RelayConfig};
pub use error::{RelayError, TransportError};
pub use relay::Relay;
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::RelayStats;
pub use transport::{Frame, Transport};
