use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use crate::{db::Student, AppResult};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn all_students(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<Student>>> {
    let students: Vec<Student> = sqlx::query_as("SELECT id,school_id,email,username,name FROM students ORDER BY id")
        .fetch_all(&db_pool)
        .await?;

    Ok(Json(students))
}
