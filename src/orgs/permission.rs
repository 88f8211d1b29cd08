use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{db::AppPermissionName, session::CurrentUser, AppError, AppResult};

/// Answers "may `user_id` do `required` in `organization_id`".
///
/// The effective permission set is the union over every role the user holds
/// in the organization. No role rows means no permissions.
pub async fn check_user_permission(
    db_pool: &SqlitePool,
    user_id: i64,
    organization_id: i64,
    required: AppPermissionName,
) -> AppResult<bool> {
    let wrap = |e: sqlx::Error| AppError::persistence(format!("Error checking permission: {e}"));

    let role_ids: Vec<(i64,)> =
        sqlx::query_as("SELECT role_id FROM user_organization_roles WHERE user_id=? AND organization_id=?")
            .bind(user_id)
            .bind(organization_id)
            .fetch_all(db_pool)
            .await
            .map_err(wrap)?;

    if role_ids.is_empty() {
        return Ok(false);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT p.permission_name FROM organization_role_permissions rp \
         JOIN permissions p ON p.id = rp.permission_id \
         WHERE rp.role_id IN (",
    );
    let mut ids = query.separated(",");
    for (role_id,) in &role_ids {
        ids.push_bind(*role_id);
    }
    ids.push_unseparated(")");

    let names: Vec<(String,)> = query
        .build_query_as()
        .fetch_all(db_pool)
        .await
        .map_err(wrap)?;

    Ok(names.iter().any(|(name,)| name == required.as_str()))
}

/// Like [`check_user_permission`] but turns a denial into a 403.
pub async fn require_permission(
    db_pool: &SqlitePool,
    user_id: i64,
    organization_id: i64,
    required: AppPermissionName,
) -> AppResult<()> {
    if check_user_permission(db_pool, user_id, organization_id, required).await? {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "missing {required} in organization {organization_id}"
        )))
    }
}

#[derive(Serialize)]
pub(crate) struct PermissionAnswer {
    allowed: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn permission(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((organization_id, permission)): Path<(i64, String)>,
) -> AppResult<Json<PermissionAnswer>> {
    let required: AppPermissionName = permission.parse().map_err(AppError::bad_request)?;
    let allowed = check_user_permission(&db_pool, user_id, organization_id, required).await?;
    Ok(Json(PermissionAnswer { allowed }))
}
