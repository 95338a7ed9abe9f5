//! World directory: which world ids are reachable, and through which
//! connection.
//!
//! Live records come from `register_world` and refer to their owning
//! connection by [`ConnectionId`] only; the transport itself stays in the
//! [`ConnectionRegistry`](crate::registry::ConnectionRegistry). Whether a
//! record's transport is open is therefore answered by the caller through
//! an `is_open` predicate.
//!
//! Registration is last-writer-wins: a second `register_world` under the
//! same id replaces the record and takes ownership. Removal is
//! owner-guarded so that the first connection closing later does not delete
//! the newer record.
//!
//! An optional static table (from config) supplies worlds that never
//! connect to the relay. Live records shadow static entries of the same id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use riftclaw_types::{ConnectionId, Portal, Position};
use serde_json::json;

/// One registered world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldRecord {
    /// Directory key.
    pub world_id: String,
    /// The connection that registered the world.
    pub owner: ConnectionId,
    /// Public URL agents should connect to.
    pub url: String,
    /// Portal label.
    pub display_name: String,
    /// When the record was written.
    pub registered_at: DateTime<Utc>,
}

/// Where a handoff for a world id should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A live world; forward to its owning connection.
    Live {
        /// The connection to forward to.
        owner: ConnectionId,
        /// The world's public URL.
        url: String,
    },
    /// A world known only from the static table.
    Static {
        /// The configured URL.
        url: String,
    },
}

impl Destination {
    /// The destination's public URL.
    pub fn url(&self) -> &str {
        match self {
            Self::Live { url, .. } | Self::Static { url } => url,
        }
    }
}

/// Live world records plus the static world table.
#[derive(Debug, Default)]
pub struct WorldDirectory {
    worlds: BTreeMap<String, WorldRecord>,
    static_worlds: BTreeMap<String, String>,
}

impl WorldDirectory {
    /// Create an empty directory with no static worlds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory seeded with a static `world_id -> URL` table.
    pub const fn with_static_worlds(static_worlds: BTreeMap<String, String>) -> Self {
        Self {
            worlds: BTreeMap::new(),
            static_worlds,
        }
    }

    /// Insert or replace the record for `world_id`.
    ///
    /// Returns the record that was replaced, if any.
    pub fn register_world(
        &mut self,
        owner: ConnectionId,
        world_id: &str,
        url: &str,
        display_name: Option<&str>,
    ) -> Option<WorldRecord> {
        let record = WorldRecord {
            world_id: world_id.to_owned(),
            owner,
            url: url.to_owned(),
            display_name: display_name.unwrap_or(world_id).to_owned(),
            registered_at: Utc::now(),
        };
        self.worlds.insert(world_id.to_owned(), record)
    }

    /// Look up a live record.
    pub fn get(&self, world_id: &str) -> Option<&WorldRecord> {
        self.worlds.get(world_id)
    }

    /// Remove `world_id` if `owner` still owns it.
    ///
    /// Returns `true` if a record was removed.
    pub fn remove_world(&mut self, world_id: &str, owner: ConnectionId) -> bool {
        if self.worlds.get(world_id).is_some_and(|r| r.owner == owner) {
            self.worlds.remove(world_id);
            true
        } else {
            false
        }
    }

    /// Portals visible to a requester bound to `requesting_world` (if any).
    ///
    /// Includes every live record whose owner is open and every static
    /// world not shadowed by a live record, excluding the requester's own
    /// world.
    pub fn list_portals(
        &self,
        requesting_world: Option<&str>,
        is_open: impl Fn(ConnectionId) -> bool,
    ) -> Vec<Portal> {
        let is_self = |id: &str| requesting_world == Some(id);

        let live = self
            .worlds
            .values()
            .filter(|r| !is_self(r.world_id.as_str()) && is_open(r.owner))
            .map(|r| Portal {
                portal_id: Portal::id_for(&r.world_id),
                name: r.display_name.clone(),
                destination_world: r.world_id.clone(),
                destination_url: r.url.clone(),
                spawn_position: Position::ORIGIN,
                requires_auth: false,
                metadata: BTreeMap::from([("registered".to_owned(), json!(true))]),
            });

        let fixed = self
            .static_worlds
            .iter()
            .filter(|(id, _)| !is_self(id.as_str()) && !self.worlds.contains_key(id.as_str()))
            .map(|(id, url)| Portal {
                portal_id: Portal::id_for(id),
                name: format!("{id} Gateway"),
                destination_world: id.clone(),
                destination_url: url.clone(),
                spawn_position: Position::ORIGIN,
                requires_auth: false,
                metadata: BTreeMap::from([
                    ("registered".to_owned(), json!(false)),
                    ("source".to_owned(), json!("static")),
                ]),
            });

        live.chain(fixed).collect()
    }

    /// Resolve a handoff target.
    ///
    /// A live record only resolves while its owner is open; otherwise the
    /// static table is consulted.
    pub fn resolve(
        &self,
        world_id: &str,
        is_open: impl Fn(ConnectionId) -> bool,
    ) -> Option<Destination> {
        if let Some(record) = self.worlds.get(world_id).filter(|r| is_open(r.owner)) {
            return Some(Destination::Live {
                owner: record.owner,
                url: record.url.clone(),
            });
        }
        self.static_worlds
            .get(world_id)
            .map(|url| Destination::Static { url: url.clone() })
    }

    /// Number of live records, regardless of transport state.
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Whether there are no live records.
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
