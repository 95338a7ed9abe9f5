//! Handoff coordination: moving an agent from one world into another.
//!
//! The requester names its destination in `passport.target_world`. For a
//! live destination the relay forwards an equivalent `handoff_request`
//! (with `from_agent` set) to the target world's connection, then confirms
//! to the requester after a fixed delay. The confirmation does not wait
//! for, or correlate with, any reply from the target: success is assumed
//! once the forward has been queued. A `handoff_confirm` later sent by the
//! target is only logged.
//!
//! The deferred confirm is a detached task. It is not cancelled when the
//! requester disconnects; the send then fails against the closed transport
//! and is dropped.

use std::time::Duration;

use riftclaw_types::{
    ConnectionId, HandoffConfirmation, OutboundMessage, Passport, Position,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::directory::Destination;
use crate::error::{RelayError, TransportError};
use crate::relay::{Relay, reply};
use crate::state::RelayState;
use crate::transport::Transport;

/// Capabilities granted on arrival in a world known only from the static
/// table.
const STATIC_GRANTED_CAPABILITIES: [&str; 3] = ["movement", "inventory", "trade"];

/// A decoded `handoff_request`.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffRequest {
    /// The travelling agent as named on the request.
    pub agent_id: Option<String>,
    /// The portal the agent stepped through.
    pub portal_id: Option<String>,
    /// The travel document.
    pub passport: Passport,
}

impl Relay {
    /// Route a handoff and answer the requester.
    ///
    /// Rejections are sent immediately; confirmations after the configured
    /// delay.
    pub(crate) fn handoff_request(
        &self,
        state: &RelayState,
        requester_id: ConnectionId,
        requester: Transport,
        request: &HandoffRequest,
    ) {
        let from_agent = request.agent_id.clone().or_else(|| {
            state
                .registry
                .get(requester_id)
                .and_then(|s| s.agent_id.clone())
        });

        info!(
            connection_id = %requester_id,
            agent_id = from_agent.as_deref().unwrap_or("anonymous"),
            target_world = request.passport.target_world().unwrap_or("unspecified"),
            "Handoff requested"
        );

        match route_handoff(state, request, from_agent) {
            Ok(confirmation) => {
                schedule_confirm(requester, confirmation, self.config().handoff.confirm_delay());
            }
            Err(e) => {
                warn!(connection_id = %requester_id, error = %e, "Handoff rejected");
                reply(&requester, e.to_message());
            }
        }
    }
}

/// Resolve the destination and forward the request if it is live.
///
/// Returns the confirmation to deliver to the requester.
pub fn route_handoff(
    state: &RelayState,
    request: &HandoffRequest,
    from_agent: Option<String>,
) -> Result<HandoffConfirmation, RelayError> {
    let target = request
        .passport
        .target_world()
        .ok_or_else(|| RelayError::UnknownDestination("unspecified".to_owned()))?;

    let destination = state
        .directory
        .resolve(target, |owner| state.registry.is_open(owner))
        .ok_or_else(|| RelayError::UnknownDestination(target.to_owned()))?;

    match destination {
        Destination::Live { owner, url } => {
            let forward = OutboundMessage::HandoffRequest {
                portal_id: request.portal_id.clone(),
                passport: request.passport.clone(),
                from_agent,
            };
            state
                .registry
                .transport(owner)
                .ok_or(TransportError::Closed)
                .and_then(|transport| transport.send(forward))
                .map_err(|source| RelayError::Forward {
                    world: target.to_owned(),
                    source,
                })?;

            info!(target_world = target, target_connection = %owner, "Handoff forwarded");
            Ok(HandoffConfirmation::Relayed {
                passport: request.passport.clone(),
                target_url: url,
            })
        }
        Destination::Static { url } => {
            info!(target_world = target, url = %url, "Static destination, nothing to forward");
            Ok(simulated_confirmation())
        }
    }
}

/// Confirmation for a destination with no live connection.
fn simulated_confirmation() -> HandoffConfirmation {
    HandoffConfirmation::Simulated {
        new_pos: Position::new(0.0, 1.0, 0.0),
        granted_capabilities: STATIC_GRANTED_CAPABILITIES
            .iter()
            .map(|c| (*c).to_owned())
            .collect(),
        world_state_hash: format!("static:{}", chrono::Utc::now().timestamp_millis()),
    }
}

/// Deliver `confirmation` to `requester` after `delay`.
///
/// The envelope is stamped when it is sent, not when it is scheduled.
pub fn schedule_confirm(
    requester: Transport,
    confirmation: HandoffConfirmation,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = requester.send(OutboundMessage::HandoffConfirm(confirmation)) {
            debug!(error = %e, "Requester gone before handoff confirm");
        }
    })
}
