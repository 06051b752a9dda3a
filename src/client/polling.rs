//! Polling fallback: periodic fetch and request/response posting.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::{MessageId, SessionKey};
use crate::ports::{ChatApi, ChatClientError, OutgoingMessage};

use super::events::ChatEvent;

/// Polls one session's message resource.
///
/// The first successful fetch of an activation is a full fetch reported as
/// `MessagesLoaded`; later fetches ask only for messages after the last one
/// seen and report each as `NewMessage`. Failures are reported as `Error`
/// and polling continues on the next tick.
pub struct PollingAdapter {
    api: Arc<dyn ChatApi>,
    session_key: SessionKey,
    interval: Duration,
    last_seen: Option<MessageId>,
    loaded: bool,
}

impl PollingAdapter {
    pub fn new(api: Arc<dyn ChatApi>, session_key: SessionKey, interval: Duration) -> Self {
        Self {
            api,
            session_key,
            interval,
            last_seen: None,
            loaded: false,
        }
    }

    /// Highest message id delivered so far.
    pub fn last_seen(&self) -> Option<MessageId> {
        self.last_seen
    }

    /// Poll until the surrounding task is cancelled. The first fetch happens
    /// immediately.
    pub async fn run(mut self, emit: impl Fn(ChatEvent)) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once(&emit).await;
        }
    }

    /// One fetch.
    pub async fn poll_once(&mut self, emit: &impl Fn(ChatEvent)) {
        let since = if self.loaded { self.last_seen } else { None };

        let messages = match self.api.fetch_messages(&self.session_key, since).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(session_key = %self.session_key, error = %e, "poll failed");
                emit(ChatEvent::Error(e));
                return;
            }
        };

        // Guard against a resource that ignores since_id.
        let fresh: Vec<ChatMessage> = match (self.loaded, self.last_seen) {
            (true, Some(last)) => messages.into_iter().filter(|m| m.id > last).collect(),
            _ => messages,
        };

        if let Some(last) = fresh.last() {
            self.last_seen = Some(last.id);
        }

        if !self.loaded {
            self.loaded = true;
            tracing::debug!(session_key = %self.session_key, count = fresh.len(), "initial poll");
            emit(ChatEvent::MessagesLoaded(fresh));
        } else {
            for message in fresh {
                emit(ChatEvent::NewMessage(message));
            }
        }
    }

    /// Post a message over the request/response path.
    pub async fn send(
        api: &dyn ChatApi,
        session_key: &SessionKey,
        message: &OutgoingMessage,
    ) -> Result<ChatMessage, ChatClientError> {
        api.post_message(session_key, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{message, FakeChatApi};
    use std::sync::Mutex;

    fn collector() -> (Arc<Mutex<Vec<ChatEvent>>>, impl Fn(ChatEvent)) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |e: ChatEvent| sink.lock().unwrap().push(e))
    }

    fn key() -> SessionKey {
        SessionKey::new("S1").unwrap()
    }

    #[tokio::test]
    async fn first_poll_loads_then_later_polls_stream_new_messages() {
        let api = Arc::new(FakeChatApi::new());
        api.push_message(message(1, "hello"));
        let mut adapter = PollingAdapter::new(api.clone(), key(), Duration::from_secs(3));
        let (events, emit) = collector();

        adapter.poll_once(&emit).await;
        api.push_message(message(2, "again"));
        api.push_message(message(3, "and again"));
        adapter.poll_once(&emit).await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], ChatEvent::MessagesLoaded(m) if m.len() == 1));
        assert!(matches!(&events[1], ChatEvent::NewMessage(m) if m.id == MessageId::new(2)));
        assert!(matches!(&events[2], ChatEvent::NewMessage(m) if m.id == MessageId::new(3)));
        assert_eq!(api.fetch_sinces(), vec![None, Some(MessageId::new(1))]);
    }

    #[tokio::test]
    async fn fetch_failure_emits_error_and_keeps_state() {
        let api = Arc::new(FakeChatApi::new());
        api.push_message(message(1, "hello"));
        let mut adapter = PollingAdapter::new(api.clone(), key(), Duration::from_secs(3));
        let (events, emit) = collector();

        api.fail_next_fetch(ChatClientError::transport("503"));
        adapter.poll_once(&emit).await;
        adapter.poll_once(&emit).await;

        let events = events.lock().unwrap();
        assert!(matches!(events[0], ChatEvent::Error(_)));
        assert!(matches!(&events[1], ChatEvent::MessagesLoaded(m) if m.len() == 1));
        assert_eq!(adapter.last_seen(), Some(MessageId::new(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_immediately_and_on_interval() {
        let api = Arc::new(FakeChatApi::new());
        let adapter = PollingAdapter::new(api.clone(), key(), Duration::from_secs(3));
        let (_events, emit) = collector();

        let task = tokio::spawn(adapter.run(emit));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.fetch_sinces().len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(api.fetch_sinces().len(), 3);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_polling_through_failures() {
        let api = Arc::new(FakeChatApi::new());
        api.fail_next_fetch(ChatClientError::transport("down"));
        api.fail_next_fetch(ChatClientError::transport("down"));
        let adapter = PollingAdapter::new(api.clone(), key(), Duration::from_secs(3));
        let (events, emit) = collector();

        let task = tokio::spawn(adapter.run(emit));
        tokio::time::sleep(Duration::from_millis(6_010)).await;
        task.abort();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], ChatEvent::MessagesLoaded(_)));
    }
}
