mod members;
mod new;
mod permission;
mod roles;

use axum::{routing::{get, post, put}, Router};

use crate::AppState;

pub use permission::{check_user_permission, require_permission};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(new::new_organization))
        .route("/{id}/roles", post(roles::new_role))
        .route("/{id}/members/{user_id}", put(members::assign_role))
        .route("/{id}/permissions/{permission}", get(permission::permission))
        .route("/{id}/events", post(crate::events::new_event))
}
