pub mod appresult;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod db;
pub mod events;
pub mod orgs;
pub mod res;
pub mod schools;
pub mod session;
pub mod students;

use std::{ops::Deref, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header::CONTENT_TYPE, Method},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub tx: broadcast::Sender<db::Message>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            db_pool,
            config: Arc::new(config),
            tx: broadcast::channel(256).0,
        }
    }
}

/// The whole HTTP surface, sessions and CORS included.
pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(state.config.session_minutes)));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(res::landing))
        .route("/Test", get(students::student_test))
        .route("/api/posts", post(students::new_post))

        .merge(auth::router())
        .nest("/api/students", students::router())
        .nest("/api/schools", schools::router())
        .nest("/api/organizations", orgs::router())
        .nest("/api/events", events::router())
        .nest("/api/chat", chat::router())
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))

        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
        .layer(session_layer)
        .layer(cors)
}

pub fn render_markdown(source: &str) -> String {
    use pulldown_cmark::{Options, Parser};

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub struct Markdown<T>(pub T);

impl<T> IntoResponse for Markdown<T>
where
    T: Deref<Target = str>
{
    fn into_response(self) -> axum::response::Response {
        Html(render_markdown(&self.0)).into_response()
    }
}
