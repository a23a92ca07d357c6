use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::connection::ConnId;

#[derive(Default)]
struct PresenceInner {
    /// user id -> live connections. A user appears here iff the set is
    /// non-empty.
    users: HashMap<String, HashSet<ConnId>>,
    /// Reverse index so disconnects don't scan every user entry.
    by_conn: HashMap<ConnId, String>,
}

/// The authoritative map of online users to their live connections.
/// Multiple connections per user (devices, tabs) are normal.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<Mutex<PresenceInner>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes `conn` to `user`. Returns false for an empty user id,
    /// which is ignored rather than signaled.
    pub fn register(&self, user: &str, conn: ConnId) -> bool {
        if user.is_empty() {
            return false;
        }

        let mut inner = self.inner.lock().unwrap();

        // A connection re-registering under a new id moves, it never
        // belongs to two users at once.
        if let Some(prev) = inner.by_conn.insert(conn, user.to_owned()) {
            if prev != user {
                detach(&mut inner.users, &prev, &conn);
            }
        }
        inner.users.entry(user.to_owned()).or_default().insert(conn);
        true
    }

    /// Removes `conn` from whichever user owns it, deleting the user entry
    /// when its last connection goes. Returns the affected user, or `None`
    /// for a connection that never registered.
    pub fn deregister(&self, conn: &ConnId) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner.by_conn.remove(conn)?;
        detach(&mut inner.users, &user, conn);
        Some(user)
    }

    /// Snapshot of the user's live connections.
    pub fn connections(&self, user: &str) -> Vec<ConnId> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Unordered snapshot of every user with at least one live connection.
    pub fn online_users(&self) -> Vec<String> {
        self.inner.lock().unwrap().users.keys().cloned().collect()
    }
}

fn detach(users: &mut HashMap<String, HashSet<ConnId>>, user: &str, conn: &ConnId) {
    if let Some(set) = users.get_mut(user) {
        set.remove(conn);
        if set.is_empty() {
            users.remove(user);
        }
    }
}
