//! Room registry: lookup, lazy creation, and sweeping of empty rooms.
//!
//! DESIGN
//! ======
//! The map holds one `Arc<Mutex<RoomSlot>>` per room. Messages for a room
//! lock only that room, so different rooms proceed in parallel. The map lock
//! is taken for writing only to create, delete, or sweep.
//!
//! Lock order is always map first, then room. `join_with` holds the map write
//! lock while it mutates the slot, so a concurrent sweep can never evict a
//! room between its creation and its first member being added.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::room::Room;
use crate::services::broadcast::Peers;

/// Live room state paired with the outbound channels of its members.
#[derive(Debug)]
pub struct RoomSlot {
    pub room: Room,
    pub peers: Peers,
}

impl RoomSlot {
    #[must_use]
    pub fn new(room_id: &str) -> Self {
        Self { room: Room::new(room_id), peers: Peers::new() }
    }
}

pub type SharedRoom = Arc<Mutex<RoomSlot>>;

/// Operator-facing counts for one live room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub users: usize,
    pub operations: usize,
}

#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, SharedRoom>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room keyed by exactly `room_id`, creating an empty one if absent.
    pub async fn get_or_create(&self, room_id: &str) -> SharedRoom {
        let mut rooms = self.rooms.write().await;
        slot_for(&mut rooms, room_id)
    }

    /// Get-or-create and run `f` against the slot without letting a sweep in.
    pub async fn join_with<R>(&self, room_id: &str, f: impl FnOnce(&mut RoomSlot) -> R) -> (SharedRoom, R) {
        let mut rooms = self.rooms.write().await;
        let shared = slot_for(&mut rooms, room_id);
        let result = {
            let mut slot = shared.lock().await;
            f(&mut *slot)
        };
        drop(rooms);
        (shared, result)
    }

    #[cfg(test)]
    pub async fn get(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn delete(&self, room_id: &str) -> bool {
        self.rooms.write().await.remove(room_id).is_some()
    }

    /// Delete every room with no members. Returns how many were removed.
    pub async fn sweep_empty(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let mut empty = Vec::new();
        for (room_id, shared) in rooms.iter() {
            if shared.lock().await.room.user_count() == 0 {
                empty.push(room_id.clone());
            }
        }
        for room_id in &empty {
            rooms.remove(room_id);
            info!(%room_id, "swept empty room");
        }
        empty.len()
    }

    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Counts for every live room, sorted by room id.
    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        let mut out = Vec::with_capacity(rooms.len());
        for (room_id, shared) in rooms.iter() {
            let slot = shared.lock().await;
            out.push(RoomSummary {
                room_id: room_id.clone(),
                users: slot.room.user_count(),
                operations: slot.room.list_operations().len(),
            });
        }
        out.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        out
    }
}

fn slot_for(rooms: &mut HashMap<String, SharedRoom>, room_id: &str) -> SharedRoom {
    Arc::clone(rooms.entry(room_id.to_string()).or_insert_with(|| {
        info!(%room_id, "created room");
        Arc::new(Mutex::new(RoomSlot::new(room_id)))
    }))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
