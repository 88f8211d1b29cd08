use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use reqwest::Method;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    chat::{ReadReceipt, SendMessage},
    db::Message,
};

use super::{CbClient, ClientError, Params};

/// Where conversations come from. [`CbClient`] talks to the server; tests
/// plug in fakes.
pub trait ChatSource: Send + Sync {
    /// Newest-first page of at most `limit` messages older than `before`.
    fn fetch_messages(
        &self,
        peer_id: i64,
        before: Option<Uuid>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, ClientError>> + Send;

    fn send_message(
        &self,
        peer_id: i64,
        message: &str,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;

    fn mark_read(&self, peer_id: i64) -> impl Future<Output = Result<ReadReceipt, ClientError>> + Send;
}

impl ChatSource for CbClient {
    async fn fetch_messages(
        &self,
        peer_id: i64,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Message>, ClientError> {
        let mut params = Params::new().param("peerId", peer_id).query("limit", limit);
        if let Some(before) = before {
            params = params.query("before", before);
        }
        self.get_request("/api/chat/:peerId/messages", &params).await
    }

    async fn send_message(&self, peer_id: i64, message: &str) -> Result<Message, ClientError> {
        let body = SendMessage { message: message.to_owned() };
        self.request(
            Method::POST,
            "/api/chat/:peerId/messages",
            &Params::new().param("peerId", peer_id),
            Some(&body),
        )
        .await
    }

    async fn mark_read(&self, peer_id: i64) -> Result<ReadReceipt, ClientError> {
        self.request::<_, ()>(
            Method::POST,
            "/api/chat/:peerId/read",
            &Params::new().param("peerId", peer_id),
            None,
        )
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationStatus {
    #[default]
    NotOpened,
    Loaded,
}

/// Thread with one peer. `messages` is newest first.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub status: ConversationStatus,
    pub messages: Vec<Message>,
    pub unread: usize,
    /// Set once a page came back short, so there is nothing older to fetch.
    pub exhausted: bool,
}

/// Chat state for the logged-in viewer, shared by every screen that needs it.
pub struct ChatContext<S> {
    source: S,
    viewer_id: i64,
    page_size: usize,
    conversations: Mutex<HashMap<i64, Conversation>>,
}

impl<S: ChatSource> ChatContext<S> {
    pub fn new(source: S, viewer_id: i64, page_size: usize) -> Self {
        Self {
            source,
            viewer_id,
            page_size: page_size.max(1),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn viewer_id(&self) -> i64 {
        self.viewer_id
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<i64, Conversation>> {
        self.conversations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the conversation; unknown peers are `NotOpened`.
    pub fn get_conversation(&self, peer_id: i64) -> Conversation {
        self.conversations().get(&peer_id).cloned().unwrap_or_default()
    }

    /// Loads the first page and marks it read.
    pub async fn open_conversation(&self, peer_id: i64) -> Result<(), ClientError> {
        let messages = self.source.fetch_messages(peer_id, None, self.page_size).await?;
        let exhausted = messages.len() < self.page_size;

        {
            let mut conversations = self.conversations();
            let conversation = conversations.entry(peer_id).or_default();
            conversation.status = ConversationStatus::Loaded;
            conversation.messages = messages;
            conversation.exhausted = exhausted;
        }

        self.update_messages_read_status(peer_id).await?;
        Ok(())
    }

    /// Appends the page older than the oldest loaded message. Returns how
    /// many new messages landed.
    pub async fn fetch_more_messages(&self, peer_id: i64) -> Result<usize, ClientError> {
        let before = self
            .conversations()
            .get(&peer_id)
            .and_then(|c| c.messages.last())
            .map(|m| m.id);

        let page = self.source.fetch_messages(peer_id, before, self.page_size).await?;
        let short = page.len() < self.page_size;

        let appended = {
            let mut conversations = self.conversations();
            let conversation = conversations.entry(peer_id).or_default();
            conversation.status = ConversationStatus::Loaded;
            conversation.exhausted = short;

            let mut appended = 0;
            for message in page {
                if conversation.messages.iter().all(|m| m.id != message.id) {
                    conversation.messages.push(message);
                    appended += 1;
                }
            }
            appended
        };

        debug!("fetched {appended} older messages with u/{peer_id}");
        if appended > 0 {
            self.update_messages_read_status(peer_id).await?;
        }
        Ok(appended)
    }

    /// Sends `text` unless it is blank.
    pub async fn create_new_message(&self, peer_id: i64, text: &str) -> Result<Option<Message>, ClientError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let message = self.source.send_message(peer_id, text).await?;
        self.append_newest(peer_id, message.clone()).await?;
        Ok(Some(message))
    }

    /// Files a message pushed over the socket under the right peer. A loaded
    /// conversation is on screen, so the message is read as soon as it lands;
    /// otherwise it waits as unread until the conversation is opened.
    pub async fn receive(&self, message: Message) -> Result<(), ClientError> {
        let peer_id = if message.sender_id == self.viewer_id {
            message.recipient_id
        } else {
            message.sender_id
        };
        self.append_newest(peer_id, message).await
    }

    async fn append_newest(&self, peer_id: i64, message: Message) -> Result<(), ClientError> {
        let incoming = message.recipient_id == self.viewer_id && message.read_at.is_none();

        let loaded = {
            let mut conversations = self.conversations();
            let conversation = conversations.entry(peer_id).or_default();
            if conversation.messages.iter().any(|m| m.id == message.id) {
                return Ok(());
            }
            conversation.messages.insert(0, message);

            let loaded = conversation.status == ConversationStatus::Loaded;
            if incoming && !loaded {
                conversation.unread += 1;
            }
            loaded
        };

        if loaded {
            self.update_messages_read_status(peer_id).await?;
        }
        Ok(())
    }

    pub async fn update_messages_read_status(&self, peer_id: i64) -> Result<ReadReceipt, ClientError> {
        let receipt = self.source.mark_read(peer_id).await?;

        let now = OffsetDateTime::now_utc();
        if let Some(conversation) = self.conversations().get_mut(&peer_id) {
            conversation.unread = 0;
            for message in conversation
                .messages
                .iter_mut()
                .filter(|m| m.sender_id == peer_id && m.read_at.is_none())
            {
                message.read_at = Some(now);
            }
        }

        Ok(receipt)
    }
}
