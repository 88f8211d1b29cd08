use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::{AppPermissionName, Event},
    orgs::require_permission,
    session::CurrentUser,
    AppError, AppResult,
};

use super::{stored_time, EventPayload, EVENT_COLUMNS};

#[debug_handler(state = crate::AppState)]
pub async fn new_event(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(organization_id): Path<i64>,
    Json(payload): Json<EventPayload>,
) -> AppResult<Json<Event>> {
    require_permission(&db_pool, user_id, organization_id, AppPermissionName::CreateEvent).await?;
    payload.validate().map_err(AppError::bad_request)?;

    let event: Event = sqlx::query_as(&format!(
        "INSERT INTO events (id,organization_id,created_by,title,description,location,start_time,end_time,is_public) \
         VALUES (?,?,?,?,?,?,?,?,?) RETURNING {EVENT_COLUMNS}"
    ))
    .bind(Uuid::now_v7())
    .bind(organization_id)
    .bind(user_id)
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.location.trim())
    .bind(stored_time(payload.start_time))
    .bind(stored_time(payload.end_time))
    .bind(payload.is_public)
    .fetch_one(&db_pool)
    .await?;

    info!("u/{user_id} scheduled {} ({})", event.title, event.id);
    Ok(Json(event))
}
