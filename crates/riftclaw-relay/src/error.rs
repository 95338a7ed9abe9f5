//! Error types for the relay.
//!
//! [`RelayError`] covers every way a single request can fail. None of them
//! are fatal to the process: each is turned into an envelope for the
//! offending connection (see [`RelayError::to_message`]), and only
//! [`RelayError::ServerFull`] also closes that connection.

use riftclaw_types::{ErrorCode, HandoffRejectReason, OutboundMessage};

/// Errors raised while handling one connection's traffic.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The frame is not a JSON object, lacks a string `type`, or its body
    /// does not match the declared type.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The `type` tag names no known message.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// The connection exceeded its request budget.
    #[error("Too many requests, please slow down")]
    RateLimited,

    /// The relay is at its configured connection cap.
    #[error("Relay at maximum capacity")]
    ServerFull,

    /// A handoff named a destination with no open world behind it.
    #[error("World '{0}' not found")]
    UnknownDestination(String),

    /// Writing a forwarded handoff to the target world failed.
    #[error("failed to forward handoff to '{world}': {source}")]
    Forward {
        /// The target world id.
        world: String,
        /// The underlying transport failure.
        source: TransportError,
    },
}

impl RelayError {
    /// Convert into the envelope body reported to the sender.
    pub fn to_message(&self) -> OutboundMessage {
        match self {
            Self::Malformed(_) => OutboundMessage::error(ErrorCode::MalformedMessage, self.to_string()),
            Self::UnknownType(_) => OutboundMessage::error(ErrorCode::UnknownType, self.to_string()),
            Self::RateLimited => OutboundMessage::error(ErrorCode::RateLimited, self.to_string()),
            Self::ServerFull => OutboundMessage::error(ErrorCode::ServerFull, self.to_string()),
            Self::UnknownDestination(_) => OutboundMessage::HandoffRejected {
                reason: HandoffRejectReason::UnknownDestination,
                details: self.to_string(),
            },
            Self::Forward { .. } => OutboundMessage::HandoffRejected {
                reason: HandoffRejectReason::ForwardFailed,
                details: self.to_string(),
            },
        }
    }
}

/// Errors writing to a connection's transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport's writer has gone away.
    #[error("transport closed")]
    Closed,

    /// The envelope could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}
