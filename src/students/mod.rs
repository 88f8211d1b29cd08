mod health;
mod list;
mod new;
mod page;
mod posts;

use axum::{routing::get, Router};

use crate::AppState;

pub use posts::new_post;
pub use health::student_test;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::all_students).post(new::new_student))
        .route("/{id}", get(page::student))
        .route("/{id}/posts", get(posts::student_posts))
}
