mod login;
mod logout;
mod password;

use axum::{routing::post, Router};

use crate::AppState;

pub use password::{hash_password, verify_password, PasswordError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login::login))
        .route("/auth/logout", post(logout::logout))
}
