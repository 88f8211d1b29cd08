mod new;
mod page;
mod schema;
mod update;

use axum::{routing::get, Router};

use crate::AppState;

pub use new::new_event;
pub use page::EventDetails;
pub use schema::{EventPayload, ValidationError};

use schema::stored_time;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::public_events))
        .route("/{id}", get(page::event).patch(update::update_event))
}

pub(crate) const EVENT_COLUMNS: &str =
    "id,organization_id,created_by,title,description,location,start_time,end_time,is_public,image_url";
