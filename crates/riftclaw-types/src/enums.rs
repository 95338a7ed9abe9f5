//! Enumeration types carried on the relay wire protocol.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What a connection is doing on the relay.
///
/// Every connection starts as an [`Agent`](Self::Agent) and becomes a
/// [`World`](Self::World) once it sends `register_world`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// A visiting identity that discovers portals and requests handoffs.
    #[default]
    Agent,
    /// A simulation instance that registered itself for discovery.
    World,
}

/// Machine-readable code carried by an outbound `error` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The `type` tag names no known message.
    UnknownType,
    /// The frame is not a JSON object, lacks a `type` tag, or has
    /// invalid fields for its type.
    MalformedMessage,
    /// The connection exceeded its request budget for the current window.
    RateLimited,
    /// The relay is at its configured connection capacity.
    ServerFull,
}

impl ErrorCode {
    /// The wire spelling of this code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::MalformedMessage => "MALFORMED_MESSAGE",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerFull => "SERVER_FULL",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a `handoff_request` was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum HandoffRejectReason {
    /// No open world is registered under the passport's `target_world`.
    UnknownDestination,
    /// The target world was known but writing to its transport failed.
    ForwardFailed,
}
