//! Inbound and outbound message unions for the relay protocol.
//!
//! Every frame is one UTF-8 JSON object tagged by a `type` field. Inbound
//! frames are decoded into [`InboundMessage`]; outbound frames are built as
//! [`OutboundMessage`] and stamped with a wall-clock timestamp by
//! [`Envelope`] at send time.
//!
//! The two unions are closed: adding a message kind means adding a variant,
//! and every `match` over them must handle it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ErrorCode, HandoffRejectReason};
use crate::ids::ConnectionId;
use crate::structs::{Passport, Portal, Position};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The message kinds the relay accepts, keyed by their `type` tag.
///
/// Decoding a frame is two-step: the tag is looked up here first so an
/// unrecognized tag can be told apart from a recognized message with a
/// malformed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// `register_world`
    RegisterWorld,
    /// `discover`
    Discover,
    /// `handoff_request`
    HandoffRequest,
    /// `handoff_confirm`
    HandoffConfirm,
    /// `ping`
    Ping,
}

impl InboundKind {
    /// Resolve a `type` tag, returning `None` for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "register_world" => Some(Self::RegisterWorld),
            "discover" => Some(Self::Discover),
            "handoff_request" => Some(Self::HandoffRequest),
            "handoff_confirm" => Some(Self::HandoffConfirm),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A world announces itself for discovery.
    RegisterWorld {
        /// Directory key for the world.
        world_name: String,
        /// Public URL agents should connect to.
        world_url: String,
        /// Label shown on portals; defaults to `world_name`.
        display_name: Option<String>,
    },
    /// An agent or world asks for the current portal list.
    Discover {
        /// The requesting agent, used for logging only.
        agent_id: Option<String>,
    },
    /// An agent asks to travel into another world.
    HandoffRequest {
        /// The travelling agent.
        agent_id: Option<String>,
        /// The portal the agent stepped through.
        portal_id: Option<String>,
        /// Opaque travel document; `target_world` names the destination.
        passport: Passport,
    },
    /// A target world acknowledges a forwarded handoff. Logged only.
    HandoffConfirm,
    /// Application-level keepalive.
    Ping,
}

impl InboundMessage {
    /// The kind of this message.
    pub const fn kind(&self) -> InboundKind {
        match self {
            Self::RegisterWorld { .. } => InboundKind::RegisterWorld,
            Self::Discover { .. } => InboundKind::Discover,
            Self::HandoffRequest { .. } => InboundKind::HandoffRequest,
            Self::HandoffConfirm => InboundKind::HandoffConfirm,
            Self::Ping => InboundKind::Ping,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Payload of an outbound `handoff_confirm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(untagged)]
pub enum HandoffConfirmation {
    /// The request was forwarded to a live world; success is assumed.
    Relayed {
        /// The passport exactly as the requester sent it.
        passport: Passport,
        /// Public URL of the target world.
        target_url: String,
    },
    /// The target is only known from the static world table, so nothing
    /// was forwarded.
    Simulated {
        /// Where the agent appears in the target world.
        new_pos: Position,
        /// Capabilities the agent holds on arrival.
        granted_capabilities: Vec<String>,
        /// Opaque marker of the world state the agent arrives into.
        world_state_hash: String,
    },
}

/// A message the relay sends to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// First frame on every accepted connection.
    Welcome {
        /// The relay's display name.
        world_name: String,
        /// The relay's protocol version.
        version: String,
        /// Features this relay offers.
        capabilities: Vec<String>,
        /// The id assigned to the receiving connection.
        relay_id: ConnectionId,
    },
    /// Reply to `register_world`.
    RegisterConfirm {
        /// The registered world id.
        world_name: String,
        /// Always `registered`.
        status: String,
    },
    /// Reply to `discover`.
    DiscoverResponse {
        /// Portals visible to the requester.
        portals: Vec<Portal>,
        /// Number of records in the world directory.
        registered_worlds: usize,
    },
    /// A handoff forwarded to the target world's connection.
    HandoffRequest {
        /// The portal the agent stepped through.
        portal_id: Option<String>,
        /// The passport exactly as the requester sent it.
        passport: Passport,
        /// The agent that asked to travel.
        from_agent: Option<String>,
    },
    /// Sent to the requester once a handoff is considered done.
    HandoffConfirm(HandoffConfirmation),
    /// Sent to the requester when a handoff cannot proceed.
    HandoffRejected {
        /// Machine-readable reason.
        reason: HandoffRejectReason,
        /// Human-readable explanation.
        details: String,
    },
    /// Reply to `ping`. The envelope timestamp is the pong time.
    Pong,
    /// A request could not be handled.
    Error {
        /// Machine-readable code.
        code: ErrorCode,
        /// Human-readable explanation.
        message: String,
    },
}

impl OutboundMessage {
    /// Build an `error` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

/// An outbound message stamped with the wall-clock time it was built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// The message body; its `type` tag is flattened into the envelope.
    #[serde(flatten)]
    pub message: OutboundMessage,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub timestamp: f64,
}

impl Envelope {
    /// Stamp a message with the current time.
    pub fn new(message: OutboundMessage) -> Self {
        Self {
            message,
            timestamp: unix_timestamp(),
        }
    }

    /// Encode as a single JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current wall-clock time in fractional seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    Utc::now()
        .signed_duration_since(DateTime::<Utc>::UNIX_EPOCH)
        .to_std()
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}
