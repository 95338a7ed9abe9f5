//! Per-connection outbound transport handle.
//!
//! A [`Transport`] is the write side of one client connection. The relay
//! never touches sockets directly: it pushes [`Frame`]s into an unbounded
//! channel that the connection's writer task drains onto the WebSocket.
//! Once that writer is gone every send fails with
//! [`TransportError::Closed`], which is how the relay observes a closed
//! transport.

use riftclaw_types::{Envelope, OutboundMessage};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Close code sent to every client when the relay shuts down.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close code sent when the relay is at capacity.
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// A unit of work for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// One JSON envelope.
    Text(String),
    /// Close the connection with a code and reason, then stop writing.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable reason.
        reason: String,
    },
}

/// Cloneable write handle for one connection.
#[derive(Debug, Clone)]
pub struct Transport {
    tx: mpsc::UnboundedSender<Frame>,
}

impl Transport {
    /// Create a transport and the receiver its writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Stamp a message with the current time and queue it.
    pub fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let json = Envelope::new(message)
            .to_json()
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.tx
            .send(Frame::Text(json))
            .map_err(|_closed| TransportError::Closed)
    }

    /// Queue a close frame.
    pub fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.tx
            .send(Frame::Close {
                code,
                reason: reason.to_owned(),
            })
            .map_err(|_closed| TransportError::Closed)
    }

    /// Whether the writer side is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Whether two handles write to the same connection.
    pub fn same_channel(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }
}
