use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    db::{AppPermissionName, UserOrganizationRole},
    session::CurrentUser,
    AppError, AppResult,
};

use super::require_permission;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignRole {
    role_id: i64,
}

/// Replaces whatever roles the member held in the organization with `roleId`.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn assign_role(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((organization_id, member_id)): Path<(i64, i64)>,
    Json(AssignRole { role_id }): Json<AssignRole>,
) -> AppResult<Json<UserOrganizationRole>> {
    require_permission(&db_pool, user_id, organization_id, AppPermissionName::ManageMembers).await?;

    if sqlx::query("SELECT 1 FROM roles WHERE id=? AND organization_id=?")
        .bind(role_id)
        .bind(organization_id)
        .fetch_optional(&db_pool)
        .await?
        .is_none() {
        return Err(AppError::not_found(format!("role {role_id} in organization {organization_id}")));
    }

    if sqlx::query("SELECT 1 FROM students WHERE id=?")
        .bind(member_id)
        .fetch_optional(&db_pool)
        .await?
        .is_none() {
        return Err(AppError::not_found(format!("student {member_id}")));
    }

    let mut tx = db_pool.begin().await?;

    sqlx::query("DELETE FROM user_organization_roles WHERE user_id=? AND organization_id=?")
        .bind(member_id)
        .bind(organization_id)
        .execute(&mut *tx)
        .await?;

    let membership: UserOrganizationRole = sqlx::query_as(
        "INSERT INTO user_organization_roles (user_id,organization_id,role_id) VALUES (?,?,?) \
         RETURNING user_id,organization_id,role_id",
    )
    .bind(member_id)
    .bind(organization_id)
    .bind(role_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(membership))
}
