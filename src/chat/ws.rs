use axum::{
    debug_handler,
    extract::{ws::Message as WsMessage, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{db::Message, session::CurrentUser};

use super::msg::{send_msg, SendMessage};

#[derive(Deserialize)]
struct Outgoing {
    to: i64,
    #[serde(flatten)]
    body: SendMessage,
}

/// Pushes every message the user sends or receives; accepts `{to, message}` frames.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Message>>,
    CurrentUser(user_id): CurrentUser,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| async move {
        let mut rx = tx.subscribe();
        let (mut sender, mut receiver) = stream.split();

        let broadcast_task = tokio::spawn(async move {
            loop {
                let msg = match rx.recv().await {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("u/{user_id} socket lagged {n} messages");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if msg.sender_id != user_id && msg.recipient_id != user_id {
                    continue;
                }
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if sender.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(frame)) = receiver.next().await {
            if let WsMessage::Close(_) = frame {
                break;
            }
            let Ok(Outgoing { to, body }) = serde_json::from_slice(&frame.into_data()) else {
                continue;
            };

            if let Err(e) = send_msg(&db_pool, &tx, user_id, to, body).await {
                debug!("u/{user_id} socket send failed: {e}");
            }
        }

        broadcast_task.abort();
    })
}
