use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::{ClientEvent, Relay, connection::OUTBOUND_CAPACITY};

pub(crate) async fn relay_ws(State(relay): State<Relay>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: Relay) {
    let conn = Uuid::now_v7();
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
    relay.attach(conn, tx);
    debug!(%conn, "connection open");

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::from(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
            debug!(%conn, "unparseable frame, skipping");
            continue;
        };
        relay.handle_event(conn, event).await;
    }

    // Reached on any close: clean disconnect, error, or dropped transport.
    relay.disconnect(conn);
    writer.abort();
    debug!(%conn, "connection closed");
}
