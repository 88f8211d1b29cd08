use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::{db::Organization, session::CurrentUser, AppError, AppResult};

pub(crate) const OWNER_ROLE: &str = "Owner";

#[derive(Debug, Deserialize)]
pub(crate) struct NewOrganization {
    name: String,
}

/// Creates the organization and makes the caller its `Owner`, a role holding
/// every permission.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_organization(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Json(NewOrganization { name }): Json<NewOrganization>,
) -> AppResult<Json<Organization>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("organization name is required"));
    }

    let mut tx = db_pool.begin().await?;

    let organization: Organization =
        sqlx::query_as("INSERT INTO organizations (name) VALUES (?) RETURNING id,name")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

    let (role_id,): (i64,) =
        sqlx::query_as("INSERT INTO roles (organization_id,name) VALUES (?,?) RETURNING id")
            .bind(organization.id)
            .bind(OWNER_ROLE)
            .fetch_one(&mut *tx)
            .await?;

    sqlx::query("INSERT INTO organization_role_permissions (role_id,permission_id) SELECT ?,id FROM permissions")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO user_organization_roles (user_id,organization_id,role_id) VALUES (?,?,?)")
        .bind(user_id)
        .bind(organization.id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("u/{user_id} founded {}#{}", organization.name, organization.id);
    Ok(Json(organization))
}
