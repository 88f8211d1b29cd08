use std::sync::Arc;

use axum::{debug_handler, extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{config::Config, db::Message, session::CurrentUser, AppResult};

const MAX_PAGE: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Only messages older than this one.
    pub before: Option<Uuid>,
    pub limit: Option<i64>,
}

/// One page of the conversation with `peer_id`, newest first.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    CurrentUser(user_id): CurrentUser,
    Path(peer_id): Path<i64>,
    Query(HistoryQuery { before, limit }): Query<HistoryQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let limit = limit.unwrap_or(config.initial_messages).clamp(1, MAX_PAGE);

    let messages: Vec<Message> = sqlx::query_as(
        "SELECT id,sender_id,recipient_id,message,created_at,read_at FROM messages \
         WHERE ((sender_id=? AND recipient_id=?) OR (sender_id=? AND recipient_id=?)) \
         AND (? IS NULL OR id < ?) \
         ORDER BY id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(peer_id)
    .bind(peer_id)
    .bind(user_id)
    .bind(before)
    .bind(before)
    .bind(limit)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(messages))
}
