//! Payload structs embedded in relay messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point in a world's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// The world origin.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a position from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A discoverable travel option pointing at a registered world.
///
/// Portals are derived from the world directory at discovery time and are
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Portal {
    /// Synthesized as `portal_<world_id>_01`.
    pub portal_id: String,
    /// Human-readable portal label.
    pub name: String,
    /// World id the portal leads to.
    pub destination_world: String,
    /// Public URL of the destination world.
    pub destination_url: String,
    /// Where the portal appears. Clients read this key as `position`.
    #[serde(rename = "position")]
    pub spawn_position: Position,
    /// Whether the destination demands authentication.
    pub requires_auth: bool,
    /// Free-form annotations (e.g. whether the world registered live).
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Portal {
    /// Build the portal id for a world.
    pub fn id_for(world_id: &str) -> String {
        format!("portal_{world_id}_01")
    }
}

/// Caller-supplied description of a travelling agent.
///
/// The relay treats the passport as opaque apart from `target_world`; it
/// is forwarded and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Passport(pub BTreeMap<String, serde_json::Value>);

impl Passport {
    /// The world the agent wants to travel to, if the passport names one.
    pub fn target_world(&self) -> Option<&str> {
        self.0.get("target_world").and_then(serde_json::Value::as_str)
    }
}
