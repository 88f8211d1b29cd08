mod history;
mod msg;
mod read;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use history::HistoryQuery;
pub use msg::{send_msg, SendMessage};
pub use read::ReadReceipt;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
        .route("/{peer_id}/messages", get(history::messages).post(msg::send_message))
        .route("/{peer_id}/read", post(read::mark_read))
}
