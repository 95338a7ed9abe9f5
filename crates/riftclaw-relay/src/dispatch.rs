//! Inbound frame decoding.
//!
//! A frame is decoded in two steps so the two protocol errors stay
//! distinct: first the raw JSON object and its `type` tag, then the typed
//! body. A tag the relay does not know is `UNKNOWN_TYPE`; anything else
//! that fails is `MALFORMED_MESSAGE`.

use riftclaw_types::{InboundKind, InboundMessage};
use serde_json::Value;

use crate::error::RelayError;

/// A decoded frame plus the agent id it carried, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    /// The typed message.
    pub message: InboundMessage,
    /// A string `agent_id` field present on the frame.
    pub agent_id: Option<String>,
}

/// Decode one inbound frame.
pub fn parse_frame(frame: &[u8]) -> Result<ParsedFrame, RelayError> {
    let value: Value =
        serde_json::from_slice(frame).map_err(|e| RelayError::Malformed(format!("Invalid JSON: {e}")))?;

    let Value::Object(fields) = &value else {
        return Err(RelayError::Malformed("expected a JSON object".to_owned()));
    };

    let tag = fields
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RelayError::Malformed("missing string field `type`".to_owned()))?;

    if InboundKind::from_tag(&tag).is_none() {
        return Err(RelayError::UnknownType(tag));
    }

    let agent_id = fields
        .get("agent_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);

    let message: InboundMessage = serde_json::from_value(value)
        .map_err(|e| RelayError::Malformed(format!("invalid {tag} message: {e}")))?;

    Ok(ParsedFrame { message, agent_id })
}
