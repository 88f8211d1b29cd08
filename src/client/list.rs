use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::Message;

use super::{ChatContext, ChatSource, ClientError, ConversationStatus};

/// One rendered bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub message: String,
    pub is_sender: bool,
    /// Grouped visually with the row before it.
    pub consecutive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    Loading,
    Rows(Vec<MessageRow>),
}

/// Rows for an inverted list (`messages[0]` is the newest).
///
/// A row is consecutive when its ownership matches the row before it; the
/// first row never is.
pub fn message_rows(messages: &[Message], viewer_id: i64) -> Vec<MessageRow> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let is_sender = message.sender_id == viewer_id;
            let consecutive = index
                .checked_sub(1)
                .map(|prev| (messages[prev].sender_id == viewer_id) == is_sender)
                .unwrap_or(false);

            MessageRow {
                message: message.message.clone(),
                is_sender,
                consecutive,
            }
        })
        .collect()
}

/// Scroll and paging state of the message list for one peer.
#[derive(Debug)]
pub struct ListArea {
    peer_id: i64,
    scrolled: AtomicBool,
    loading_more: AtomicBool,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ListArea {
    pub fn new(peer_id: i64) -> Self {
        Self {
            peer_id,
            scrolled: AtomicBool::new(false),
            loading_more: AtomicBool::new(false),
        }
    }

    pub fn peer_id(&self) -> i64 {
        self.peer_id
    }

    /// Latches on the first scroll and never resets.
    pub fn on_scroll(&self) {
        self.scrolled.store(true, Ordering::Release);
    }

    pub fn has_scrolled(&self) -> bool {
        self.scrolled.load(Ordering::Acquire)
    }

    /// Drives the footer spinner.
    pub fn is_loading_more(&self) -> bool {
        self.loading_more.load(Ordering::Acquire)
    }

    pub fn view<S: ChatSource>(&self, ctx: &ChatContext<S>) -> ListView {
        let conversation = ctx.get_conversation(self.peer_id);
        match conversation.status {
            ConversationStatus::NotOpened => ListView::Loading,
            ConversationStatus::Loaded => ListView::Rows(message_rows(&conversation.messages, ctx.viewer_id())),
        }
    }

    /// Handles the list reaching its (top) end. Fetches an older page only
    /// once the user has scrolled, the first page came back full, and no
    /// other fetch is in flight. Returns whether a fetch ran.
    pub async fn on_end_reached<S: ChatSource>(&self, ctx: &ChatContext<S>) -> Result<bool, ClientError> {
        let conversation = ctx.get_conversation(self.peer_id);
        if conversation.status != ConversationStatus::Loaded
            || conversation.exhausted
            || !self.has_scrolled()
            || conversation.messages.len() < ctx.page_size()
        {
            return Ok(false);
        }

        if self.loading_more.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        let _guard = LoadingGuard(&self.loading_more);

        ctx.fetch_more_messages(self.peer_id).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use pretty_assertions::assert_eq;
    use time::OffsetDateTime;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::*;
    use crate::chat::ReadReceipt;

    const VIEWER: i64 = 1;
    const PEER: i64 = 2;

    fn msg(sender_id: i64, text: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            sender_id,
            recipient_id: if sender_id == VIEWER { PEER } else { VIEWER },
            message: text.to_owned(),
            created_at: OffsetDateTime::now_utc(),
            read_at: None,
        }
    }

    /// Serves `history` (oldest first) in newest-first pages.
    #[derive(Default)]
    struct FakeSource {
        history: Mutex<Vec<Message>>,
        fetches: AtomicUsize,
        reads: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeSource {
        fn with_history(n: usize) -> Self {
            let history = (0..n)
                .map(|i| msg(if i % 2 == 0 { PEER } else { VIEWER }, &format!("m{i}")))
                .collect();
            Self { history: Mutex::new(history), ..Default::default() }
        }
    }

    impl ChatSource for FakeSource {
        async fn fetch_messages(
            &self,
            _peer_id: i64,
            before: Option<Uuid>,
            limit: usize,
        ) -> Result<Vec<Message>, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let history = self.history.lock().unwrap().clone();
            Ok(history
                .into_iter()
                .rev()
                .filter(|m| before.is_none_or(|b| m.id < b))
                .take(limit)
                .collect())
        }

        async fn send_message(&self, peer_id: i64, message: &str) -> Result<Message, ClientError> {
            let mut sent = msg(VIEWER, message);
            sent.recipient_id = peer_id;
            self.history.lock().unwrap().push(sent.clone());
            Ok(sent)
        }

        async fn mark_read(&self, _peer_id: i64) -> Result<ReadReceipt, ClientError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(ReadReceipt { updated: 0 })
        }
    }

    #[test]
    fn consecutive_follows_ownership_of_previous_row() {
        let same = message_rows(&[msg(VIEWER, "a"), msg(VIEWER, "b")], VIEWER);
        assert_eq!(same[0].consecutive, false);
        assert_eq!(same[1].consecutive, true);
        assert!(same[1].is_sender);

        let switched = message_rows(&[msg(VIEWER, "a"), msg(PEER, "b")], VIEWER);
        assert_eq!(switched[1].consecutive, false);
        assert!(!switched[1].is_sender);

        let peer_run = message_rows(&[msg(PEER, "a"), msg(PEER, "b"), msg(VIEWER, "c")], VIEWER);
        let flags: Vec<bool> = peer_run.iter().map(|r| r.consecutive).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn first_row_is_never_consecutive() {
        assert!(message_rows(&[], VIEWER).is_empty());
        assert!(!message_rows(&[msg(PEER, "only")], VIEWER)[0].consecutive);
    }

    #[tokio::test]
    async fn not_opened_conversation_renders_loading() {
        let ctx = ChatContext::new(FakeSource::with_history(3), VIEWER, 5);
        let list = ListArea::new(PEER);

        assert_eq!(list.view(&ctx), ListView::Loading);
        assert_eq!(list.on_end_reached(&ctx).await.unwrap(), false);
        assert_eq!(ctx.source().fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn opening_loads_a_page_and_marks_it_read() {
        let ctx = ChatContext::new(FakeSource::with_history(12), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();

        let ListView::Rows(rows) = ListArea::new(PEER).view(&ctx) else {
            panic!("conversation should be loaded");
        };
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].message, "m11");
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_fetch_before_first_scroll() {
        let ctx = ChatContext::new(FakeSource::with_history(30), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();
        let list = ListArea::new(PEER);

        assert_eq!(list.on_end_reached(&ctx).await.unwrap(), false);
        assert_eq!(ctx.source().fetches.load(Ordering::SeqCst), 1);

        list.on_scroll();
        assert_eq!(list.on_end_reached(&ctx).await.unwrap(), true);
        assert_eq!(ctx.get_conversation(PEER).messages.len(), 10);
        // every append marks the thread read again
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn small_conversations_never_page() {
        let ctx = ChatContext::new(FakeSource::with_history(3), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();
        let list = ListArea::new(PEER);
        list.on_scroll();

        assert_eq!(list.on_end_reached(&ctx).await.unwrap(), false);
        assert_eq!(ctx.source().fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn paging_stops_once_history_runs_out() {
        let ctx = ChatContext::new(FakeSource::with_history(7), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();
        let list = ListArea::new(PEER);
        list.on_scroll();

        assert!(list.on_end_reached(&ctx).await.unwrap());
        assert_eq!(ctx.get_conversation(PEER).messages.len(), 7);
        assert!(!list.on_end_reached(&ctx).await.unwrap());
        assert_eq!(ctx.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn in_flight_fetch_suppresses_duplicates() {
        let gate = Arc::new(Notify::new());
        let source = FakeSource {
            gate: Some(gate.clone()),
            ..FakeSource::with_history(20)
        };
        let ctx = ChatContext::new(source, VIEWER, 5);

        let open = ctx.open_conversation(PEER);
        gate.notify_one();
        open.await.unwrap();

        let list = ListArea::new(PEER);
        list.on_scroll();

        let first = list.on_end_reached(&ctx);
        let second = async {
            tokio::task::yield_now().await;
            assert!(list.is_loading_more());
            let ran = list.on_end_reached(&ctx).await.unwrap();
            gate.notify_one();
            ran
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap());
        assert!(!second);
        assert!(!list.is_loading_more());
        assert_eq!(ctx.source().fetches.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.get_conversation(PEER).messages.len(), 10);
    }

    #[tokio::test]
    async fn blank_messages_are_not_sent() {
        let ctx = ChatContext::new(FakeSource::with_history(0), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 1);

        assert_eq!(ctx.create_new_message(PEER, "   \n").await.unwrap(), None);
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 1);

        let sent = ctx.create_new_message(PEER, "hey").await.unwrap().unwrap();
        assert_eq!(ctx.get_conversation(PEER).messages[0].id, sent.id);
        // the list changed, so the thread is marked read again
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pushed_messages_in_an_open_thread_are_read_on_arrival() {
        let ctx = ChatContext::new(FakeSource::with_history(0), VIEWER, 5);
        ctx.open_conversation(PEER).await.unwrap();

        let incoming = msg(PEER, "you there?");
        ctx.receive(incoming.clone()).await.unwrap();
        let conversation = ctx.get_conversation(PEER);
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.unread, 0);
        assert!(conversation.messages[0].read_at.is_some());
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 2);

        // duplicates change nothing and issue no update
        ctx.receive(incoming).await.unwrap();
        assert_eq!(ctx.get_conversation(PEER).messages.len(), 1);
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 2);

        ctx.create_new_message(PEER, "yes").await.unwrap();
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn pushed_messages_stay_unread_until_the_thread_opens() {
        let ctx = ChatContext::new(FakeSource::with_history(0), VIEWER, 5);

        ctx.receive(msg(PEER, "you there?")).await.unwrap();
        ctx.receive(msg(PEER, "hello?")).await.unwrap();
        let conversation = ctx.get_conversation(PEER);
        assert_eq!(conversation.status, ConversationStatus::NotOpened);
        assert_eq!(conversation.unread, 2);
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 0);

        ctx.open_conversation(PEER).await.unwrap();
        assert_eq!(ctx.get_conversation(PEER).unread, 0);
        assert_eq!(ctx.source().reads.load(Ordering::SeqCst), 1);
    }
}
