use std::fmt;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorName {
    Persistence,
    NotFound,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    Internal,
}

impl AppErrorName {
    pub fn as_str(&self) -> &'static str {
        use AppErrorName::*;
        match self {
            Persistence => "PERSISTENCE_ERROR",
            NotFound => "NOT_FOUND",
            BadRequest => "BAD_REQUEST",
            Unauthorized => "UNAUTHORIZED",
            Forbidden => "FORBIDDEN",
            Conflict => "CONFLICT",
            Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for AppErrorName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every handler.
///
/// `trusted` marks operational failures we expect to happen (bad input,
/// missing rows, a database hiccup we already wrapped) as opposed to bugs.
#[derive(Debug)]
pub struct AppError {
    pub name: AppErrorName,
    pub status: StatusCode,
    pub trusted: bool,
    pub source: anyhow::Error,
}

impl AppError {
    pub fn new(name: AppErrorName, message: impl Into<String>, status: StatusCode, trusted: bool) -> Self {
        Self {
            name,
            status,
            trusted,
            source: anyhow::Error::msg(message.into()),
        }
    }

    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::Persistence, message.to_string(), StatusCode::INTERNAL_SERVER_ERROR, true)
    }

    pub fn not_found(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::NotFound, message.to_string(), StatusCode::NOT_FOUND, true)
    }

    pub fn bad_request(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::BadRequest, message.to_string(), StatusCode::BAD_REQUEST, true)
    }

    pub fn unauthorized(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::Unauthorized, message.to_string(), StatusCode::UNAUTHORIZED, true)
    }

    pub fn forbidden(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::Forbidden, message.to_string(), StatusCode::FORBIDDEN, true)
    }

    pub fn conflict(message: impl fmt::Display) -> Self {
        Self::new(AppErrorName::Conflict, message.to_string(), StatusCode::CONFLICT, true)
    }

    pub fn message(&self) -> String {
        self.source.to_string()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.trusted {
            tracing::warn!(error = %self.name, status = %self.status, "{}", self.source);
        } else {
            tracing::error!(error = %self.name, "{}\n{}", self.source, self.source.backtrace());
        }

        let message = if self.trusted {
            self.source.to_string()
        } else {
            "Internal server error".to_owned()
        };

        (
            self.status,
            Json(json!({
                "success": false,
                "error": self.name.as_str(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            name: AppErrorName::Internal,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            trusted: false,
            source: err.into(),
        }
    }
}

/// True when `err` is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
