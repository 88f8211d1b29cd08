use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{session::CurrentUser, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub updated: u64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(peer_id): Path<i64>,
) -> AppResult<Json<ReadReceipt>> {
    let result = sqlx::query(
        "UPDATE messages SET read_at=? WHERE sender_id=? AND recipient_id=? AND read_at IS NULL",
    )
    .bind(OffsetDateTime::now_utc())
    .bind(peer_id)
    .bind(user_id)
    .execute(&db_pool)
    .await?;

    Ok(Json(ReadReceipt { updated: result.rows_affected() }))
}
