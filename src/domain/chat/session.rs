//! Chat session aggregate.
//!
//! A session is the conversation between one visitor and, eventually, an
//! agent. The broker is its single source of truth: it assigns message ids,
//! tracks the assigned agent and owns the status lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AuthenticatedUser, ChatSessionId, MessageId, SessionKey, StateMachine, Timestamp, UserId,
};

use super::{ChatError, ChatMessage, ChatSessionStatus, SenderType, Visitor};

/// Outcome of an agent assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAssignment {
    /// The agent was already assigned; nothing changed.
    Unchanged,
    /// First agent on an unassigned session.
    Assigned,
    /// The session moved from `previous` to the new agent.
    Transferred { previous: UserId },
}

/// Chat session aggregate.
///
/// # Invariants
///
/// - `visitor` never changes after creation
/// - `ended_at` is set exactly when `status` is `Ended`
/// - `last_message_id` only grows, by one per recorded message
/// - ended sessions accept no messages and no assignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    id: ChatSessionId,
    session_key: SessionKey,
    visitor: Visitor,
    status: ChatSessionStatus,
    assigned_agent: Option<UserId>,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    last_message_id: Option<MessageId>,
    last_activity_at: Timestamp,
}

impl ChatSession {
    /// Create a new active, unassigned session.
    pub fn new(id: ChatSessionId, session_key: SessionKey, visitor: Visitor) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            session_key,
            visitor,
            status: ChatSessionStatus::Active,
            assigned_agent: None,
            started_at: now,
            ended_at: None,
            last_message_id: None,
            last_activity_at: now,
        }
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ChatSessionId,
        session_key: SessionKey,
        visitor: Visitor,
        status: ChatSessionStatus,
        assigned_agent: Option<UserId>,
        started_at: Timestamp,
        ended_at: Option<Timestamp>,
        last_message_id: Option<MessageId>,
        last_activity_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_key,
            visitor,
            status,
            assigned_agent,
            started_at,
            ended_at,
            last_message_id,
            last_activity_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ChatSessionId {
        self.id
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    pub fn status(&self) -> ChatSessionStatus {
        self.status
    }

    pub fn assigned_agent(&self) -> Option<UserId> {
        self.assigned_agent
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn ended_at(&self) -> Option<&Timestamp> {
        self.ended_at.as_ref()
    }

    /// Id of the newest message, if any was posted.
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.last_message_id
    }

    /// Creation time or time of the newest message.
    pub fn last_activity_at(&self) -> &Timestamp {
        &self.last_activity_at
    }

    /// Returns true if the session can still receive messages.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Returns true if the session is open and saw activity at or after `cutoff`.
    pub fn is_active_since(&self, cutoff: &Timestamp) -> bool {
        self.is_open() && !self.last_activity_at.is_before(cutoff)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates that the caller may read from and write to this session.
    ///
    /// Agents may access every session. A session opened by a known user is
    /// private to that user. Anonymous sessions are reachable by anyone who
    /// holds the key.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is neither an agent nor the visitor
    pub fn authorize(&self, caller: Option<&AuthenticatedUser>) -> Result<(), ChatError> {
        if caller.map(|c| c.is_agent()).unwrap_or(false) {
            return Ok(());
        }
        match (&self.visitor, caller) {
            (Visitor::Anonymous { .. }, _) => Ok(()),
            (Visitor::User { user_id }, Some(c)) if c.id == *user_id => Ok(()),
            _ => Err(ChatError::forbidden(
                "caller is not a participant of this chat session",
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// The id the next message must carry.
    pub fn next_message_id(&self) -> MessageId {
        self.last_message_id
            .map(|id| id.next())
            .unwrap_or_else(MessageId::first)
    }

    /// Timestamp for the next message, never earlier than the last activity.
    pub fn next_message_timestamp(&self, now: Timestamp) -> Timestamp {
        now.max(self.last_activity_at)
    }

    /// Records a numbered message against the session.
    ///
    /// An agent message from the newly assigned agent completes a transfer.
    ///
    /// # Errors
    ///
    /// - `SessionEnded` if the session has ended
    /// - `InvalidState` if the message id is not the next in sequence
    pub fn record_message(&mut self, message: &ChatMessage) -> Result<(), ChatError> {
        self.ensure_open()?;
        let expected = self.next_message_id();
        if message.id != expected {
            return Err(ChatError::invalid_state(format!(
                "expected message id {}, got {}",
                expected, message.id
            )));
        }

        self.last_message_id = Some(message.id);
        self.last_activity_at = self.last_activity_at.max(message.created_at);

        if self.status == ChatSessionStatus::Transferred
            && message.sender_type == SenderType::Agent
            && message.sender_id.is_some()
            && message.sender_id == self.assigned_agent
        {
            self.status = self.status.transition_to(ChatSessionStatus::Active)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Assigns (or re-assigns) an agent.
    ///
    /// # Errors
    ///
    /// - `SessionEnded` if the session has ended
    pub fn assign_agent(&mut self, agent_id: UserId) -> Result<AgentAssignment, ChatError> {
        self.ensure_open()?;

        match self.assigned_agent {
            Some(current) if current == agent_id => Ok(AgentAssignment::Unchanged),
            None => {
                self.assigned_agent = Some(agent_id);
                Ok(AgentAssignment::Assigned)
            }
            Some(previous) => {
                self.status = self.status.transition_to(ChatSessionStatus::Transferred)?;
                self.assigned_agent = Some(agent_id);
                Ok(AgentAssignment::Transferred { previous })
            }
        }
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// - `SessionEnded` if already ended
    pub fn end(&mut self) -> Result<(), ChatError> {
        self.ensure_open()?;
        self.status = self.status.transition_to(ChatSessionStatus::Ended)?;
        self.ended_at = Some(Timestamp::now().max(self.last_activity_at));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ChatError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ChatError::session_ended(self.session_key.clone()))
        }
    }
}

/// Row of the agent-facing session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    #[serde(flatten)]
    pub session: ChatSession,
    /// Visitor messages the agent side has not acknowledged.
    pub unread_count: u64,
}
