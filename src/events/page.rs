use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db::Event, render_markdown, session::USER_ID, AppError, AppResult};

use super::EVENT_COLUMNS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub description_html: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn public_events(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<Event>>> {
    let events: Vec<Event> = sqlx::query_as(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE is_public=1 ORDER BY start_time,id"
    ))
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(events))
}

/// Private events are only shown to members of the hosting organization.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn event(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventDetails>> {
    let sorry = || AppError::not_found(format!("event {id}"));

    let Some(event): Option<Event> =
        sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id=?"))
            .bind(id)
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(sorry());
    };

    if !event.is_public {
        let Some(user_id) = session.get::<i64>(USER_ID).await? else {
            return Err(sorry());
        };

        if sqlx::query("SELECT 1 FROM user_organization_roles WHERE user_id=? AND organization_id=?")
            .bind(user_id)
            .bind(event.organization_id)
            .fetch_optional(&db_pool)
            .await?
            .is_none() {
            return Err(sorry());
        }
    }

    let description_html = render_markdown(&event.description);
    Ok(Json(EventDetails { event, description_html }))
}
