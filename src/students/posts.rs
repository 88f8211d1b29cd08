use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{db::Post, session::CurrentUser, AppError, AppResult};

/// What the profile screen lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub spots_left: i64,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            spots_left: post.spots_left,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    title: String,
    description: String,
    spots_left: i64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn student_posts(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<PostSummary>>> {
    let posts: Vec<Post> = sqlx::query_as(
        "SELECT id,author_id,title,description,spots_left,created_at FROM posts \
         WHERE author_id=? ORDER BY id DESC",
    )
    .bind(id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(posts.into_iter().map(PostSummary::from).collect()))
}

#[debug_handler(state = crate::AppState)]
pub async fn new_post(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Json(NewPost { title, description, spots_left }): Json<NewPost>,
) -> AppResult<Json<PostSummary>> {
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if spots_left < 0 {
        return Err(AppError::bad_request("spotsLeft cannot be negative"));
    }

    let post: Post = sqlx::query_as(
        "INSERT INTO posts (author_id,title,description,spots_left,created_at) VALUES (?,?,?,?,?) \
         RETURNING id,author_id,title,description,spots_left,created_at",
    )
    .bind(user_id)
    .bind(title.trim())
    .bind(description)
    .bind(spots_left)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(post.into()))
}
