//! Hand-written transport fakes for client tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::chat::{ChatMessage, ChatSession, ClientFrame, SenderType, ServerFrame, Visitor};
use crate::domain::foundation::{ChatSessionId, MessageId, SessionKey, Timestamp};
use crate::ports::{
    ChatApi, ChatClientError, OutgoingMessage, SocketChannel, SocketConnector, SocketEvent,
};

use super::event_bus::EventBus;
use super::events::{ChatEvent, ChatEventKind};

pub fn message(id: i64, body: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::new(id),
        session_id: ChatSessionId::new(1),
        body: body.to_string(),
        sender_type: SenderType::User,
        sender_id: None,
        created_at: Timestamp::now(),
        is_read: false,
        client_message_id: None,
    }
}

pub fn session(key: &str) -> ChatSession {
    ChatSession::new(
        ChatSessionId::new(1),
        SessionKey::new(key).unwrap(),
        Visitor::anonymous("10.0.0.1"),
    )
}

/// Records every event emitted on `bus`.
pub fn record(bus: &EventBus) -> Arc<Mutex<Vec<ChatEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    for kind in ChatEventKind::ALL {
        let sink = events.clone();
        bus.on(
            kind,
            Arc::new(move |e: &ChatEvent| sink.lock().unwrap().push(e.clone())),
        );
    }
    events
}

// ════════════════════════════════════════════════════════════════════════════
// Polling API
// ════════════════════════════════════════════════════════════════════════════

/// In-memory message resource.
#[derive(Default)]
pub struct FakeChatApi {
    messages: Mutex<Vec<ChatMessage>>,
    fetch_sinces: Mutex<Vec<Option<MessageId>>>,
    fetch_failures: Mutex<VecDeque<ChatClientError>>,
    posts: Mutex<Vec<OutgoingMessage>>,
    post_failure: Mutex<Option<ChatClientError>>,
    post_latency: Mutex<Option<Duration>>,
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&self, message: ChatMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn fail_next_fetch(&self, error: ChatClientError) {
        self.fetch_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_posts(&self, error: ChatClientError) {
        *self.post_failure.lock().unwrap() = Some(error);
    }

    /// Posts are stored at once but answered only after `latency`.
    pub fn delay_posts(&self, latency: Duration) {
        *self.post_latency.lock().unwrap() = Some(latency);
    }

    pub fn fetch_sinces(&self) -> Vec<Option<MessageId>> {
        self.fetch_sinces.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<OutgoingMessage> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn fetch_messages(
        &self,
        _session_key: &SessionKey,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, ChatClientError> {
        self.fetch_sinces.lock().unwrap().push(since);
        if let Some(error) = self.fetch_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| since.map_or(true, |s| m.id > s))
            .cloned()
            .collect())
    }

    async fn post_message(
        &self,
        _session_key: &SessionKey,
        outgoing: &OutgoingMessage,
    ) -> Result<ChatMessage, ChatClientError> {
        if let Some(error) = self.post_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.posts.lock().unwrap().push(outgoing.clone());

        let stored = {
            let mut messages = self.messages.lock().unwrap();
            let id = messages.last().map(|m| m.id.value() + 1).unwrap_or(1);
            let stored = ChatMessage {
                sender_type: SenderType::from_is_agent(outgoing.is_agent),
                sender_id: outgoing.sender_id,
                client_message_id: outgoing.client_message_id,
                ..message(id, &outgoing.message)
            };
            messages.push(stored.clone());
            stored
        };

        let latency = *self.post_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(stored)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Socket
// ════════════════════════════════════════════════════════════════════════════

/// What the next `open` does.
#[derive(Debug, Clone)]
pub enum SocketScript {
    /// Fail at once.
    Refuse,
    /// Never resolve.
    Hang,
    /// Open but never acknowledge the join.
    Silent,
    /// Open and acknowledge the join with this backlog.
    Accept(Vec<ChatMessage>),
}

/// Server end of a fake socket.
pub struct FakeServer {
    events: mpsc::UnboundedSender<SocketEvent>,
    outbound: Mutex<mpsc::UnboundedReceiver<ClientFrame>>,
    received: Mutex<Vec<ClientFrame>>,
}

impl FakeServer {
    pub fn push(&self, frame: ServerFrame) {
        let _ = self.events.send(SocketEvent::Frame(frame));
    }

    pub fn close(&self, reason: Option<&str>) {
        let _ = self
            .events
            .send(SocketEvent::Closed(reason.map(str::to_string)));
    }

    /// Stop reading client frames; later sends fail on the client side.
    pub fn stop_reading(&self) {
        self.outbound.lock().unwrap().close();
    }

    /// Frames the client has sent so far.
    pub fn received(&self) -> Vec<ClientFrame> {
        let mut outbound = self.outbound.lock().unwrap();
        let mut received = self.received.lock().unwrap();
        while let Ok(frame) = outbound.try_recv() {
            received.push(frame);
        }
        received.clone()
    }
}

/// Scripted `SocketConnector`. Opens beyond the script are refused.
pub struct FakeConnector {
    session: ChatSession,
    script: Mutex<VecDeque<SocketScript>>,
    servers: Mutex<Vec<Arc<FakeServer>>>,
    opens: Mutex<usize>,
}

impl FakeConnector {
    pub fn new(script: impl IntoIterator<Item = SocketScript>) -> Self {
        Self {
            session: session("S1"),
            script: Mutex::new(script.into_iter().collect()),
            servers: Mutex::new(Vec::new()),
            opens: Mutex::new(0),
        }
    }

    pub fn push_script(&self, step: SocketScript) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn open_count(&self) -> usize {
        *self.opens.lock().unwrap()
    }

    /// The most recently opened socket.
    pub fn server(&self) -> Arc<FakeServer> {
        self.servers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no socket opened")
    }
}

#[async_trait]
impl SocketConnector for FakeConnector {
    async fn open(&self) -> Result<SocketChannel, ChatClientError> {
        *self.opens.lock().unwrap() += 1;
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SocketScript::Refuse);

        let backlog = match step {
            SocketScript::Refuse => return Err(ChatClientError::transport("connection refused")),
            SocketScript::Hang => std::future::pending().await,
            SocketScript::Silent => None,
            SocketScript::Accept(messages) => Some(messages),
        };

        let (events_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        if let Some(messages) = backlog {
            let _ = events_tx.send(SocketEvent::Frame(ServerFrame::SessionJoined {
                session: self.session.clone(),
                messages,
                persistent: true,
            }));
        }
        self.servers.lock().unwrap().push(Arc::new(FakeServer {
            events: events_tx,
            outbound: Mutex::new(outbound_rx),
            received: Mutex::new(Vec::new()),
        }));

        Ok(SocketChannel { outbound, inbound })
    }
}
