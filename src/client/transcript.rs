//! Client-side transcript with optimistic echoes.
//!
//! A message the user sends is shown at once under its client-generated id.
//! When the broker's copy arrives carrying that id, it replaces the optimistic
//! entry in place. Broker messages are otherwise de-duplicated by id, so a
//! backlog replayed after a reconnect does not double up. Client ids already
//! confirmed are remembered, so an echo that overtakes the local copy leaves
//! a single entry.

use std::collections::HashSet;

use crate::domain::chat::{ChatMessage, SenderType};
use crate::domain::foundation::{ClientMessageId, MessageId, UserId};

use super::events::ChatEvent;

/// One row of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// Sent locally, not yet confirmed by the broker.
    Pending {
        client_message_id: ClientMessageId,
        body: String,
        sender_type: SenderType,
        sender_id: Option<UserId>,
    },
    Confirmed(ChatMessage),
}

impl TranscriptEntry {
    pub fn body(&self) -> &str {
        match self {
            TranscriptEntry::Pending { body, .. } => body,
            TranscriptEntry::Confirmed(message) => &message.body,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TranscriptEntry::Pending { .. })
    }
}

/// Ordered messages of one session as the UI shows them.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    seen: HashSet<MessageId>,
    confirmed: HashSet<ClientMessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a message the user just sent. Returns false, adding nothing, if
    /// the broker's copy has already been merged.
    pub fn push_pending(
        &mut self,
        client_message_id: ClientMessageId,
        body: impl Into<String>,
        sender_type: SenderType,
        sender_id: Option<UserId>,
    ) -> bool {
        if self.confirmed.contains(&client_message_id) {
            return false;
        }
        self.entries.push(TranscriptEntry::Pending {
            client_message_id,
            body: body.into(),
            sender_type,
            sender_id,
        });
        true
    }

    /// Drop a pending entry whose send failed. Returns false if none matched.
    pub fn discard_pending(&mut self, client_message_id: ClientMessageId) -> bool {
        match self.pending_index(client_message_id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Merge one authoritative message. Returns false if it was already known.
    pub fn apply(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        if let Some(client_message_id) = message.client_message_id {
            self.confirmed.insert(client_message_id);
        }

        let pending = message
            .client_message_id
            .and_then(|id| self.pending_index(id));
        match pending {
            Some(index) => self.entries[index] = TranscriptEntry::Confirmed(message),
            None => self.entries.push(TranscriptEntry::Confirmed(message)),
        }
        true
    }

    /// Merge whatever messages a bus event carries. Returns how many were new.
    pub fn apply_event(&mut self, event: &ChatEvent) -> usize {
        match event {
            ChatEvent::Open { messages, .. } | ChatEvent::MessagesLoaded(messages) => messages
                .iter()
                .filter(|m| self.apply((*m).clone()))
                .count(),
            ChatEvent::NewMessage(message) => usize::from(self.apply(message.clone())),
            _ => 0,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Highest broker id merged so far.
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.seen.iter().max().copied()
    }

    fn pending_index(&self, client_message_id: ClientMessageId) -> Option<usize> {
        self.entries.iter().position(|e| {
            matches!(e, TranscriptEntry::Pending { client_message_id: id, .. } if *id == client_message_id)
        })
    }
}
