use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{db::Message, session::CurrentUser, AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessage {
    pub message: String,
}

/// Stores a message and fans it out to every connected socket.
pub async fn send_msg(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Message>,

    sender_id: i64,
    recipient_id: i64,

    SendMessage { message }: SendMessage,
) -> AppResult<Message> {
    if message.trim().is_empty() {
        return Err(AppError::bad_request("message is empty"));
    }
    if sender_id == recipient_id {
        return Err(AppError::bad_request("cannot message yourself"));
    }

    if sqlx::query("SELECT 1 FROM students WHERE id=?")
        .bind(recipient_id)
        .fetch_optional(db_pool)
        .await?
        .is_none() {
        return Err(AppError::not_found(format!("student {recipient_id}")));
    }

    let message: Message = sqlx::query_as(
        "INSERT INTO messages (id,sender_id,recipient_id,message,created_at) VALUES (?,?,?,?,?) \
         RETURNING id,sender_id,recipient_id,message,created_at,read_at",
    )
    .bind(Uuid::now_v7())
    .bind(sender_id)
    .bind(recipient_id)
    .bind(&message)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db_pool)
    .await?;

    // no subscribers is fine
    let _ = tx.send(message.clone());

    Ok(message)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Message>>,
    CurrentUser(user_id): CurrentUser,
    Path(peer_id): Path<i64>,
    Json(body): Json<SendMessage>,
) -> AppResult<Json<Message>> {
    send_msg(&db_pool, &tx, user_id, peer_id, body).await.map(Json)
}
