use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";

/// Student id of the logged-in session, or a 401.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::from(anyhow::Error::msg(msg)))?;

        current_user(&session).await.map(CurrentUser)
    }
}

pub async fn current_user(session: &Session) -> AppResult<i64> {
    session
        .get::<i64>(USER_ID)
        .await?
        .ok_or_else(|| AppError::unauthorized("login required"))
}
