use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{db::Student, session::USER_ID, AppError, AppResult};

use super::{password::PasswordError, verify_password};

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(LoginBody { email, password }): Json<LoginBody>,
) -> AppResult<Json<Student>> {
    let denied = || AppError::unauthorized(PasswordError::InvalidCredentials);

    let Some((id, hash)): Option<(i64, Option<String>)> =
        sqlx::query_as("SELECT id,password_hash FROM students WHERE email=?")
            .bind(email.trim())
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(denied());
    };

    let Some(hash) = hash else {
        return Err(denied());
    };

    match verify_password(&password, &hash) {
        Ok(()) => {}
        Err(PasswordError::InvalidCredentials) => return Err(denied()),
        Err(e) => return Err(e.into()),
    }

    let student: Student =
        sqlx::query_as("SELECT id,school_id,email,username,name FROM students WHERE id=?")
            .bind(id)
            .fetch_one(&db_pool)
            .await?;

    session.cycle_id().await?;
    session.insert(USER_ID, student.id).await?;

    info!("welcome @{}#{}", student.username, student.id);
    Ok(Json(student))
}
