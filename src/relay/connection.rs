use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use super::event::ServerEvent;

/// Opaque id of one live transport link.
pub type ConnId = Uuid;

/// Bound of each connection's outbound queue. A full queue drops events
/// rather than blocking the relay.
pub(crate) const OUTBOUND_CAPACITY: usize = 64;

/// All live connections, keyed by id, each with its outbound queue.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    senders: Arc<Mutex<HashMap<ConnId, mpsc::Sender<ServerEvent>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conn: ConnId, tx: mpsc::Sender<ServerEvent>) {
        self.senders.lock().unwrap().insert(conn, tx);
    }

    pub fn remove(&self, conn: &ConnId) {
        self.senders.lock().unwrap().remove(conn);
    }

    pub fn len(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire-and-forget delivery to one connection. Unknown ids and full
    /// queues are both silent drops (the latter logged).
    pub fn send_to(&self, conn: &ConnId, event: ServerEvent) {
        let tx = self.senders.lock().unwrap().get(conn).cloned();
        if let Some(tx) = tx {
            if tx.try_send(event).is_err() {
                warn!(%conn, "outbound queue full, dropping event");
            }
        }
    }

    /// Fire-and-forget delivery to every connection.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let senders: Vec<(ConnId, mpsc::Sender<ServerEvent>)> = self
            .senders
            .lock()
            .unwrap()
            .iter()
            .map(|(conn, tx)| (*conn, tx.clone()))
            .collect();

        for (conn, tx) in senders {
            if tx.try_send(event.clone()).is_err() {
                warn!(%conn, "outbound queue full, dropping broadcast");
            }
        }
    }
}
