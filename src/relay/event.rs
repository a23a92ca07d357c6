use serde::{Deserialize, Serialize};

use crate::store::Message;

/// Frames a client may send, as `{"event": ..., "data": {...}}`.
/// Frames that don't parse are skipped by the read loop.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Register { user_id: String },
    #[serde(rename_all = "camelCase")]
    Typing { sender_id: String, receiver_id: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom { sender_id: String, receiver_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        sender_id: String,
        receiver_id: String,
        message: String,
    },
}

/// Frames pushed to clients, same envelope as [`ClientEvent`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot of online user ids; replaces any prior state on receipt.
    OnlineUsers(Vec<String>),
    #[serde(rename_all = "camelCase")]
    Typing { from: String },
    ReceiveMessage(MessagePayload),
    #[serde(rename_all = "camelCase")]
    UnreadIncrement { from: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub created_at: String,
}

impl From<Message> for MessagePayload {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            message: msg.message,
            created_at: msg.created_at,
        }
    }
}
