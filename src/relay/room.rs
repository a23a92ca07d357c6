use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::connection::ConnId;

/// Deterministic id for the room shared by an unordered pair of users:
/// both ids sorted lexicographically, joined with `_`.
pub fn room_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}_{hi}")
}

/// Which connections are subscribed to which room. Rooms are derived
/// addressing, never persisted; an empty room simply disappears.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, HashSet<ConnId>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: &str, conn: ConnId) {
        self.rooms
            .lock()
            .unwrap()
            .entry(room.to_owned())
            .or_default()
            .insert(conn);
    }

    /// Snapshot of the room's subscribers; empty for unknown rooms.
    pub fn members(&self, room: &str) -> Vec<ConnId> {
        self.rooms
            .lock()
            .unwrap()
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drops `conn` from every room it joined. Connections never leave a
    /// room any other way.
    pub fn remove_connection(&self, conn: &ConnId) {
        self.rooms.lock().unwrap().retain(|_, members| {
            members.remove(conn);
            !members.is_empty()
        });
    }
}
