use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppResult, AppState, SharedStore};

/// Message history and unread bookkeeping next to the realtime channel.
/// Identity comes from explicit parameters; token checks live in the
/// external CRUD layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(messages))
        .route("/unread-summary", get(unread_summary))
        .route("/mark-read", post(mark_read))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationQuery {
    sender_id: Option<String>,
    receiver_id: Option<String>,
}

async fn messages(
    State(store): State<SharedStore>,
    Query(query): Query<ConversationQuery>,
) -> AppResult<Response> {
    let (Some(sender_id), Some(receiver_id)) = (query.sender_id, query.receiver_id) else {
        return Ok(bad_request("senderId and receiverId are required"));
    };

    let messages = store.conversation(&sender_id, &receiver_id).await?;
    Ok(Json(json!({ "messages": messages })).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadQuery {
    user_id: Option<String>,
}

async fn unread_summary(
    State(store): State<SharedStore>,
    Query(query): Query<UnreadQuery>,
) -> AppResult<Response> {
    let Some(user_id) = query.user_id else {
        return Ok(bad_request("userId is required"));
    };

    let counts = store.unread_by_sender(&user_id).await?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let by_friend: serde_json::Map<String, Value> = counts
        .into_iter()
        .map(|(sender, n)| (sender, n.into()))
        .collect();

    Ok(Json(json!({ "total": total, "byFriend": by_friend })).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadBody {
    user_id: Option<String>,
    sender_id: Option<String>,
}

async fn mark_read(
    State(store): State<SharedStore>,
    Json(body): Json<MarkReadBody>,
) -> AppResult<Response> {
    let (Some(user_id), Some(sender_id)) = (body.user_id, body.sender_id) else {
        return Ok(bad_request("userId and senderId are required"));
    };

    store.mark_read(&sender_id, &user_id).await?;
    Ok(Json(json!({ "message": "Marked as read" })).into_response())
}
