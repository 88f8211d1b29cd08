use std::sync::Arc;

use axum::{debug_handler, extract::{Multipart, Path, State}, Json};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{AppPermissionName, Event},
    orgs::require_permission,
    session::CurrentUser,
    AppError, AppResult,
};

use super::{stored_time, EventPayload, EVENT_COLUMNS};

struct Image {
    extension: &'static str,
    bytes: Vec<u8>,
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `PATCH /api/events/{id}`: an optional `image` file part plus a `data`
/// part holding the JSON [`EventPayload`].
#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_event(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Event>> {
    let Some((organization_id,)): Option<(i64,)> =
        sqlx::query_as("SELECT organization_id FROM events WHERE id=?")
            .bind(id)
            .fetch_optional(&db_pool)
            .await?
    else {
        return Err(AppError::not_found(format!("event {id}")));
    };

    require_permission(&db_pool, user_id, organization_id, AppPermissionName::EditEvent).await?;

    let mut payload: Option<EventPayload> = None;
    let mut image: Option<Image> = None;

    while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("data") => {
                let bytes = field.bytes().await.map_err(AppError::bad_request)?;
                payload = Some(serde_json::from_slice(&bytes).map_err(AppError::bad_request)?);
            }
            Some("image") => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let Some(extension) = image_extension(&content_type) else {
                    return Err(AppError::bad_request(format!("unsupported image type {content_type:?}")));
                };
                let bytes = field.bytes().await.map_err(AppError::bad_request)?;
                image = Some(Image { extension, bytes: bytes.to_vec() });
            }
            _ => continue,
        }
    }

    let payload = payload.ok_or_else(|| AppError::bad_request("missing data part"))?;
    payload.validate().map_err(AppError::bad_request)?;

    let upload = image.map(|Image { extension, bytes }| {
        let file_name = format!("{id}-{}.{extension}", Uuid::now_v7().simple());
        (file_name, bytes)
    });

    // the file only lands on disk once the row is updated, and the row only
    // commits once the file is written
    let mut tx = db_pool.begin().await?;
    let event: Event = sqlx::query_as(&format!(
        "UPDATE events SET title=?,description=?,location=?,start_time=?,end_time=?,is_public=?,\
         image_url=COALESCE(?,image_url) WHERE id=? RETURNING {EVENT_COLUMNS}"
    ))
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.location.trim())
    .bind(stored_time(payload.start_time))
    .bind(stored_time(payload.end_time))
    .bind(payload.is_public)
    .bind(upload.as_ref().map(|(file_name, _)| format!("/uploads/{file_name}")))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some((file_name, bytes)) = upload {
        let path = config.upload_dir.join(&file_name);
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;

        if let Err(e) = tx.commit().await {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!("could not remove {}: {cleanup}", path.display());
            }
            return Err(e.into());
        }
    } else {
        tx.commit().await?;
    }

    info!("u/{user_id} updated event {id}");
    Ok(Json(event))
}

#[cfg(test)]
mod tests {
    use super::image_extension;

    #[test]
    fn only_images_have_extensions() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension(""), None);
    }
}
