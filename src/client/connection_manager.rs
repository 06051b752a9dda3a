//! Chat connection manager.
//!
//! Owns at most one session attachment at a time and decides which transport
//! carries it. The persistent socket is preferred; when it cannot be
//! established within the connect timeout, or the reconnect budget runs out
//! after a loss, the attachment falls back to polling for good.
//!
//! All transport work runs on a single driver task per attachment. Every
//! attachment gets a generation number; `disconnect` and session switches
//! bump it and abort the driver, and nothing tagged with an old generation
//! reaches the event bus or the shared state. Dispatch happens under an
//! emission gate that `disconnect` waits on, so once it returns no listener
//! can still be running for the old attachment.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use parking_lot::ReentrantMutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::chat::{ChatMessage, ChatSession, ClientFrame, ServerFrame};
use crate::domain::foundation::{ClientMessageId, SessionKey, StateMachine, UserId};
use crate::ports::{
    ChatApi, ChatClientError, OutgoingMessage, SocketChannel, SocketConnector, SocketEvent,
};

use super::event_bus::EventBus;
use super::events::ChatEvent;
use super::polling::PollingAdapter;
use super::state::ConnectionState;

// ════════════════════════════════════════════════════════════════════════════
// Configuration
// ════════════════════════════════════════════════════════════════════════════

/// Timers and budgets of the connection manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Covers socket open and the join acknowledgement.
    pub connect_timeout_ms: u64,

    /// Reconnect attempt `n` waits `n` times this long.
    pub reconnect_base_delay_ms: u64,

    pub max_reconnect_attempts: u32,

    pub poll_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            reconnect_base_delay_ms: 1_000,
            max_reconnect_attempts: 5,
            poll_interval_ms: 3_000,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Linear backoff: `base × attempt`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Shared state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    session_key: SessionKey,
    caller_id: Option<UserId>,
    is_agent: bool,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    generation: u64,
    target: Option<Target>,
    /// Present only while `state` is `OpenSocket`.
    outbound: Option<mpsc::UnboundedSender<ClientFrame>>,
    driver: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Held across the generation check and the dispatch. Reentrant so a
    /// listener may call `disconnect` or `connect`.
    emission: ReentrantMutex<()>,
    bus: Arc<EventBus>,
    connector: Arc<dyn SocketConnector>,
    api: Arc<dyn ChatApi>,
    config: ConnectionConfig,
}

/// A socket that has completed the join handshake.
struct Established {
    channel: SocketChannel,
    session: ChatSession,
    messages: Vec<ChatMessage>,
}

enum Route {
    Socket(mpsc::UnboundedSender<ClientFrame>, Target),
    Polling(Target),
    Unavailable,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    fn emit(&self, generation: u64, event: ChatEvent) {
        let _gate = self.emission.lock();
        if self.is_current(generation) {
            self.bus.emit(&event);
        }
    }

    /// Waits for a dispatch already past its generation check. Must not be
    /// called with `inner` locked.
    fn quiesce(&self) {
        drop(self.emission.lock());
    }

    /// Moves to `next` if `generation` still owns the manager.
    fn enter(
        &self,
        generation: u64,
        next: ConnectionState,
        outbound: Option<mpsc::UnboundedSender<ClientFrame>>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        if !inner.state.can_transition_to(&next) {
            tracing::warn!(from = %inner.state, to = %next, "unexpected connection state transition");
        }
        tracing::debug!(from = %inner.state, to = %next, "connection state changed");
        inner.state = next;
        inner.outbound = outbound;
        true
    }

    async fn drive(self: Arc<Self>, generation: u64, target: Target) {
        tracing::info!(session_key = %target.session_key, "connecting");

        let mut established = match self.establish_within_timeout(&target).await {
            Ok(established) => established,
            Err(e) => {
                tracing::info!(
                    session_key = %target.session_key,
                    error = %e,
                    "persistent channel unavailable, falling back to polling"
                );
                if matches!(e, ChatClientError::Rejected { .. }) {
                    self.emit(generation, ChatEvent::Error(e));
                }
                return self.poll(generation, &target).await;
            }
        };

        loop {
            let Established {
                mut channel,
                session,
                messages,
            } = established;

            if !self.enter(
                generation,
                ConnectionState::OpenSocket,
                Some(channel.outbound.clone()),
            ) {
                return;
            }
            tracing::info!(session_key = %target.session_key, backlog = messages.len(), "socket open");
            self.emit(
                generation,
                ChatEvent::Open {
                    session: Some(session),
                    messages,
                    fallback: false,
                },
            );

            let reason = self.pump(generation, &mut channel.inbound).await;
            drop(channel);

            if !self.enter(generation, ConnectionState::Reconnecting, None) {
                return;
            }
            tracing::warn!(
                session_key = %target.session_key,
                reason = reason.as_deref().unwrap_or("none"),
                "socket lost"
            );
            self.emit(generation, ChatEvent::Close { reason });

            established = match self.reconnect(generation, &target).await {
                Some(established) => established,
                None => return self.poll(generation, &target).await,
            };
        }
    }

    async fn establish_within_timeout(
        &self,
        target: &Target,
    ) -> Result<Established, ChatClientError> {
        match tokio::time::timeout(self.config.connect_timeout(), self.establish(target)).await {
            Ok(result) => result,
            Err(_) => Err(ChatClientError::transport(
                "timed out waiting for join acknowledgement",
            )),
        }
    }

    async fn establish(&self, target: &Target) -> Result<Established, ChatClientError> {
        let mut channel = self.connector.open().await?;
        channel
            .outbound
            .send(ClientFrame::JoinSession {
                session_id: target.session_key.clone(),
                user_id: target.caller_id,
                is_agent: target.is_agent,
            })
            .map_err(|_| ChatClientError::transport("socket closed before join"))?;

        loop {
            match channel.inbound.recv().await {
                Some(SocketEvent::Frame(ServerFrame::SessionJoined {
                    session, messages, ..
                })) => {
                    return Ok(Established {
                        channel,
                        session,
                        messages,
                    })
                }
                Some(SocketEvent::Frame(ServerFrame::Error { code, message })) => {
                    return Err(ChatClientError::rejected(code, message))
                }
                Some(SocketEvent::Frame(other)) => {
                    tracing::debug!(kind = other.kind(), "frame before join acknowledgement")
                }
                Some(SocketEvent::Closed(reason)) => {
                    return Err(ChatClientError::transport(format!(
                        "socket closed during join: {}",
                        reason.unwrap_or_default()
                    )))
                }
                None => return Err(ChatClientError::transport("socket closed during join")),
            }
        }
    }

    /// Forwards inbound frames until the socket closes.
    async fn pump(
        &self,
        generation: u64,
        inbound: &mut mpsc::UnboundedReceiver<SocketEvent>,
    ) -> Option<String> {
        while let Some(event) = inbound.recv().await {
            match event {
                SocketEvent::Frame(frame) => {
                    if let Some(event) = event_from_frame(frame) {
                        self.emit(generation, event);
                    }
                }
                SocketEvent::Closed(reason) => return reason,
            }
        }
        None
    }

    /// Runs the reconnect budget. `None` means it was exhausted.
    async fn reconnect(&self, generation: u64, target: &Target) -> Option<Established> {
        for attempt in 1..=self.config.max_reconnect_attempts {
            let delay = self.config.reconnect_delay(attempt);
            tracing::info!(
                session_key = %target.session_key,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting"
            );
            tokio::time::sleep(delay).await;

            match self.establish_within_timeout(target).await {
                Ok(established) => return Some(established),
                Err(e) => {
                    tracing::warn!(session_key = %target.session_key, attempt, error = %e, "reconnect failed");
                    if !self.enter(generation, ConnectionState::Reconnecting, None) {
                        return None;
                    }
                }
            }
        }

        tracing::warn!(
            session_key = %target.session_key,
            attempts = self.config.max_reconnect_attempts,
            "reconnect budget exhausted, falling back to polling"
        );
        None
    }

    /// Polls until the driver is aborted.
    async fn poll(&self, generation: u64, target: &Target) {
        if !self.enter(generation, ConnectionState::OpenPolling, None) {
            return;
        }
        self.emit(
            generation,
            ChatEvent::Open {
                session: None,
                messages: Vec::new(),
                fallback: true,
            },
        );

        let adapter = PollingAdapter::new(
            self.api.clone(),
            target.session_key.clone(),
            self.config.poll_interval(),
        );
        adapter.run(|event| self.emit(generation, event)).await;
    }
}

fn event_from_frame(frame: ServerFrame) -> Option<ChatEvent> {
    match frame {
        ServerFrame::NewMessage { message } => Some(ChatEvent::NewMessage(message)),
        ServerFrame::TypingStatus {
            user_id,
            is_agent,
            is_typing,
        } => Some(ChatEvent::Typing {
            user_id,
            is_agent,
            is_typing,
        }),
        ServerFrame::UserJoined { user_id, is_agent } => {
            Some(ChatEvent::UserJoined { user_id, is_agent })
        }
        ServerFrame::UserLeft { user_id, is_agent } => Some(ChatEvent::UserLeft { user_id, is_agent }),
        ServerFrame::Error { code, message } => {
            Some(ChatEvent::Error(ChatClientError::rejected(code, message)))
        }
        ServerFrame::SessionJoined { .. } => {
            tracing::debug!("ignoring repeated join acknowledgement");
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Manager
// ════════════════════════════════════════════════════════════════════════════

/// Client-side owner of one chat session attachment.
///
/// Must be used from within a tokio runtime.
pub struct ChatConnectionManager {
    shared: Arc<Shared>,
}

impl ChatConnectionManager {
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        api: Arc<dyn ChatApi>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                emission: ReentrantMutex::new(()),
                bus: Arc::new(EventBus::new()),
                connector,
                api,
                config,
            }),
        }
    }

    /// The bus every transport publishes to.
    pub fn events(&self) -> Arc<EventBus> {
        self.shared.bus.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn session_key(&self) -> Option<SessionKey> {
        self.shared.lock().target.as_ref().map(|t| t.session_key.clone())
    }

    /// Attach to `session_key`.
    ///
    /// A no-op while already attached to the same session. Attaching to a
    /// different session tears the current attachment down first.
    pub fn connect(&self, session_key: SessionKey, caller_id: Option<UserId>, is_agent: bool) {
        let mut inner = self.shared.lock();
        let same_session = inner
            .target
            .as_ref()
            .is_some_and(|t| t.session_key == session_key);
        if inner.state.is_attached() && same_session {
            tracing::debug!(session_key = %session_key, state = %inner.state, "already attached");
            return;
        }

        if let Some(driver) = inner.driver.take() {
            tracing::info!(state = %inner.state, "switching session");
            driver.abort();
        }

        let target = Target {
            session_key,
            caller_id,
            is_agent,
        };
        inner.generation += 1;
        inner.state = ConnectionState::Connecting;
        inner.outbound = None;
        inner.target = Some(target.clone());

        let generation = inner.generation;
        let shared = self.shared.clone();
        inner.driver = Some(tokio::spawn(shared.drive(generation, target)));
        drop(inner);
        self.shared.quiesce();
    }

    /// Send a chat message under a fresh client id and return that id.
    ///
    /// The broker's echo may reach the bus before this returns. A caller that
    /// shows an optimistic copy should mint the id itself and use
    /// [`send_message_with_id`](Self::send_message_with_id).
    pub async fn send_message(&self, body: &str) -> Result<ClientMessageId, ChatClientError> {
        let client_message_id = ClientMessageId::new();
        self.send_message_with_id(body, client_message_id).await?;
        Ok(client_message_id)
    }

    /// Send a chat message over whichever transport is open, tagged with
    /// `client_message_id` for echo correlation.
    ///
    /// Nothing is queued: without an open transport this fails at once and an
    /// `Error` event is emitted, except after `disconnect`, which silences the
    /// bus.
    pub async fn send_message_with_id(
        &self,
        body: &str,
        client_message_id: ClientMessageId,
    ) -> Result<(), ChatClientError> {
        let (generation, route) = {
            let inner = self.shared.lock();
            if inner.state == ConnectionState::Closed {
                return Err(ChatClientError::NotConnected);
            }
            let route = match (inner.state, &inner.target, &inner.outbound) {
                (ConnectionState::OpenSocket, Some(target), Some(outbound)) => {
                    Route::Socket(outbound.clone(), target.clone())
                }
                (ConnectionState::OpenPolling, Some(target), _) => Route::Polling(target.clone()),
                _ => Route::Unavailable,
            };
            (inner.generation, route)
        };

        let result = match route {
            Route::Socket(outbound, target) => outbound
                .send(ClientFrame::Chat {
                    message: body.to_string(),
                    is_agent: target.is_agent,
                    sender_id: target.caller_id,
                    client_message_id: Some(client_message_id),
                })
                .map_err(|_| ChatClientError::transport("socket closed")),
            Route::Polling(target) => {
                let outgoing = OutgoingMessage {
                    message: body.to_string(),
                    is_agent: target.is_agent,
                    sender_id: target.caller_id,
                    client_message_id: Some(client_message_id),
                };
                PollingAdapter::send(self.shared.api.as_ref(), &target.session_key, &outgoing)
                    .await
                    .map(|_| ())
            }
            Route::Unavailable => Err(ChatClientError::NotConnected),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "send failed");
                self.shared.emit(generation, ChatEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    /// Best effort. Ignored unless the socket is open.
    pub fn send_typing(&self, is_typing: bool) {
        let inner = self.shared.lock();
        if let (ConnectionState::OpenSocket, Some(outbound)) = (inner.state, &inner.outbound) {
            if outbound.send(ClientFrame::Typing { is_typing }).is_err() {
                tracing::debug!(is_typing, "typing frame dropped, socket closing");
            }
        }
    }

    /// Tear down the attachment. Safe from any state, listeners included; no
    /// event follows once this returns.
    pub fn disconnect(&self) {
        {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            if let Some(driver) = inner.driver.take() {
                driver.abort();
            }
            if inner.state != ConnectionState::Closed {
                tracing::info!(from = %inner.state, "disconnected");
            }
            inner.state = ConnectionState::Closed;
            inner.outbound = None;
            inner.target = None;
        }
        self.shared.quiesce();
    }

    /// A transport can carry messages right now.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    pub fn is_using_persistent_channel(&self) -> bool {
        self.state() == ConnectionState::OpenSocket
    }
}

impl Drop for ChatConnectionManager {
    fn drop(&mut self) {
        if let Some(driver) = self.shared.lock().driver.take() {
            driver.abort();
        }
    }
}
