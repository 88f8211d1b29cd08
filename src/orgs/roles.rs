use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    appresult::is_unique_violation,
    db::{AppPermissionName, Role},
    session::CurrentUser,
    AppError, AppResult,
};

use super::require_permission;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRole {
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_role(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(organization_id): Path<i64>,
    Json(NewRole { name, permissions }): Json<NewRole>,
) -> AppResult<Json<Role>> {
    require_permission(&db_pool, user_id, organization_id, AppPermissionName::ManageRoles).await?;

    let permissions = permissions
        .iter()
        .map(|p| p.parse::<AppPermissionName>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::bad_request)?;

    let mut tx = db_pool.begin().await?;

    let role: Role = sqlx::query_as(
        "INSERT INTO roles (organization_id,name) VALUES (?,?) RETURNING id,organization_id,name",
    )
    .bind(organization_id)
    .bind(name.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict(format!("role {name} already exists"))
        } else {
            e.into()
        }
    })?;

    for permission in permissions {
        sqlx::query(
            "INSERT OR IGNORE INTO organization_role_permissions (role_id,permission_id) \
             SELECT ?,id FROM permissions WHERE permission_name=?",
        )
        .bind(role.id)
        .bind(permission.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(role))
}
