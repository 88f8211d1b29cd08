use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;

use crate::{db::Student, AppError, AppResult};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn student(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> AppResult<Json<Student>> {
    sqlx::query_as::<_, Student>("SELECT id,school_id,email,username,name FROM students WHERE id=?")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("student {id}")))
}
