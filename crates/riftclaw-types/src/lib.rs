//! Wire protocol types for the RiftClaw world relay.
//!
//! This crate is the single source of truth for the JSON messages that
//! worlds, agents and the relay exchange. Types flow downstream to
//! `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for connection identifiers
//! - [`enums`] -- Connection roles, error codes, rejection reasons
//! - [`structs`] -- Portals, positions and passports
//! - [`messages`] -- Inbound/outbound message unions and the envelope

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ConnectionRole, ErrorCode, HandoffRejectReason};
pub use ids::ConnectionId;
pub use messages::{
    Envelope, HandoffConfirmation, InboundKind, InboundMessage, OutboundMessage, unix_timestamp,
};
pub use structs::{Passport, Portal, Position};
