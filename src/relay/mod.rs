mod connection;
mod event;
mod presence;
mod room;
mod ws;

pub use connection::{ConnId, ConnectionRegistry};
pub use event::{ClientEvent, MessagePayload, ServerEvent};
pub use presence::PresenceRegistry;
pub use room::{RoomRegistry, room_id};

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::AppState;
use crate::store::MessageStore;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::relay_ws))
}

/// The realtime subsystem: who is online, who listens to which room, and
/// how events move between the two participants of a conversation.
///
/// Every handler drops malformed input silently; nothing here is fatal to
/// a connection or the process.
#[derive(Clone)]
pub struct Relay {
    connections: ConnectionRegistry,
    presence: PresenceRegistry,
    rooms: RoomRegistry,
    store: Arc<dyn MessageStore>,
}

impl Relay {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            presence: PresenceRegistry::new(),
            rooms: RoomRegistry::new(),
            store,
        }
    }

    /// Hands a freshly opened connection its outbound queue.
    pub(crate) fn attach(&self, conn: ConnId, tx: mpsc::Sender<ServerEvent>) {
        self.connections.insert(conn, tx);
    }

    pub async fn handle_event(&self, conn: ConnId, event: ClientEvent) {
        match event {
            ClientEvent::Register { user_id } => self.register(conn, &user_id),
            ClientEvent::Typing {
                sender_id,
                receiver_id,
            } => self.typing(&sender_id, &receiver_id),
            ClientEvent::JoinRoom {
                sender_id,
                receiver_id,
            } => self.join_room(conn, &sender_id, &receiver_id),
            ClientEvent::SendMessage {
                sender_id,
                receiver_id,
                message,
            } => self.send_message(&sender_id, &receiver_id, &message).await,
        }
    }

    /// The identity declaration is trusted as-is; binding it to a verified
    /// credential is the CRUD layer's token and out of scope here.
    fn register(&self, conn: ConnId, user_id: &str) {
        if !self.presence.register(user_id, conn) {
            debug!(%conn, "register without user id, dropping");
            return;
        }
        debug!(%conn, user_id, "registered");
        self.broadcast_online();
    }

    fn typing(&self, sender_id: &str, receiver_id: &str) {
        if sender_id.is_empty() || receiver_id.is_empty() {
            return;
        }
        let event = ServerEvent::Typing {
            from: sender_id.to_owned(),
        };
        for conn in self.rooms.members(&room_id(sender_id, receiver_id)) {
            self.connections.send_to(&conn, event.clone());
        }
    }

    fn join_room(&self, conn: ConnId, sender_id: &str, receiver_id: &str) {
        if sender_id.is_empty() || receiver_id.is_empty() {
            return;
        }
        self.rooms.join(&room_id(sender_id, receiver_id), conn);
    }

    async fn send_message(&self, sender_id: &str, receiver_id: &str, message: &str) {
        if sender_id.is_empty() || receiver_id.is_empty() || message.is_empty() {
            return;
        }

        // The only suspension point in the relay; no registry lock is held
        // across it, so registrations and disconnects interleave freely.
        let stored = match self.store.create(sender_id, receiver_id, message).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%err, sender_id, receiver_id, "persist failed, message dropped");
                return;
            }
        };

        // Membership and presence are read after the await: a party that
        // disconnected while we were persisting simply misses the fan-out.
        let delivery = ServerEvent::ReceiveMessage(MessagePayload::from(stored));
        for conn in self.rooms.members(&room_id(sender_id, receiver_id)) {
            self.connections.send_to(&conn, delivery.clone());
        }

        // Every receiver connection gets the counter bump, whether or not
        // it also sits in the room and already saw the delivery.
        let unread = ServerEvent::UnreadIncrement {
            from: sender_id.to_owned(),
        };
        for conn in self.presence.connections(receiver_id) {
            self.connections.send_to(&conn, unread.clone());
        }
    }

    /// The single cleanup path, run on transport close for every
    /// connection, registered or not.
    pub(crate) fn disconnect(&self, conn: ConnId) {
        self.rooms.remove_connection(&conn);
        let was_registered = self.presence.deregister(&conn).is_some();
        self.connections.remove(&conn);
        if was_registered {
            self.broadcast_online();
        }
    }

    fn broadcast_online(&self) {
        let snapshot = ServerEvent::OnlineUsers(self.presence.online_users());
        self.connections.broadcast_all(&snapshot);
    }
}
