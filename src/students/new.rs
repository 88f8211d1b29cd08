use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    appresult::is_unique_violation,
    auth::hash_password,
    db::Student,
    AppError, AppResult,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewStudent {
    school_name: String,
    email: String,
    username: String,
    name: String,
    password: Option<String>,
}

/// Signs a student up under the school named `schoolName`.
///
/// An unknown school is a 404, never a hanging request.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_student(
    State(db_pool): State<SqlitePool>,
    Json(NewStudent { school_name, email, username, name, password }): Json<NewStudent>,
) -> AppResult<Json<Student>> {
    for (field, value) in [("email", &email), ("username", &username), ("name", &name)] {
        if value.trim().is_empty() {
            return Err(AppError::bad_request(format!("{field} is required")));
        }
    }

    let Some((school_id,)): Option<(i64,)> = sqlx::query_as("SELECT id FROM schools WHERE name=?")
        .bind(&school_name)
        .fetch_optional(&db_pool)
        .await?
    else {
        return Err(AppError::not_found(format!("school {school_name} not found")));
    };

    let password_hash = match password {
        Some(password) if !password.is_empty() => Some(hash_password(&password)?),
        _ => None,
    };

    let student: Student = sqlx::query_as(
        "INSERT INTO students (school_id,email,username,name,password_hash) VALUES (?,?,?,?,?) \
         RETURNING id,school_id,email,username,name",
    )
    .bind(school_id)
    .bind(email.trim())
    .bind(username.trim())
    .bind(name.trim())
    .bind(password_hash)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("email or username already taken")
        } else {
            e.into()
        }
    })?;

    info!("adding @{}#{} to {school_name}", student.username, student.id);
    Ok(Json(student))
}
