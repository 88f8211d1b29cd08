use axum::{debug_handler, extract::State, routing::get, Json, Router};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{appresult::is_unique_violation, db::School, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(all_schools).post(new_school))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewSchool {
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_school(
    State(db_pool): State<SqlitePool>,
    Json(NewSchool { name }): Json<NewSchool>,
) -> AppResult<Json<School>> {
    if name.trim().is_empty() {
        return Err(AppError::bad_request("school name is required"));
    }

    let school: School = sqlx::query_as("INSERT INTO schools (name) VALUES (?) RETURNING id,name")
        .bind(&name)
        .fetch_one(&db_pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(format!("school {name} already exists"))
            } else {
                e.into()
            }
        })?;

    Ok(Json(school))
}

#[debug_handler(state = AppState)]
pub(crate) async fn all_schools(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<School>>> {
    let schools: Vec<School> = sqlx::query_as("SELECT id,name FROM schools ORDER BY name")
        .fetch_all(&db_pool)
        .await?;

    Ok(Json(schools))
}
