//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Maximum length accepted for a session key.
pub const MAX_SESSION_KEY_LENGTH: usize = 128;

/// Broker-assigned numeric identifier of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatSessionId(i64);

impl ChatSessionId {
    /// Creates a ChatSessionId from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque correlation string shared by client and server.
///
/// Used as the routing key for every message of a session and as the
/// polling resource path, so it is restricted to URL-safe characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Generates a fresh random session key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Creates a SessionKey from an existing string, validating its shape.
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ValidationError::empty_field("session_key"));
        }
        if key.len() > MAX_SESSION_KEY_LENGTH {
            return Err(ValidationError::invalid_format(
                "session_key",
                format!("longer than {} characters", MAX_SESSION_KEY_LENGTH),
            ));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "session_key",
                "only ASCII letters, digits, '-' and '_' are allowed",
            ));
        }
        Ok(Self(key))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

/// Identifier of a chat message within its session.
///
/// Ids form a per-session sequence starting at 1 with no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Creates a MessageId from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The id assigned to the first message of a session.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the id following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a storefront user (visitor, agent or admin).
///
/// Supplied by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a UserId from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Client-generated temporary id of an optimistic message.
///
/// Travels with an outbound message and is echoed back by the broker so the
/// sender can swap its local copy for the authoritative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientMessageId(Uuid);

impl ClientMessageId {
    /// Creates a new random ClientMessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ClientMessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientMessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_keys_are_unique_and_valid() {
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        assert_ne!(a, b);
        assert!(SessionKey::new(a.as_str()).is_ok());
    }

    #[test]
    fn session_key_rejects_empty() {
        assert!(SessionKey::new("").is_err());
    }

    #[test]
    fn session_key_rejects_path_characters() {
        assert!(SessionKey::new("abc/def").is_err());
        assert!(SessionKey::new("abc?x=1").is_err());
    }

    #[test]
    fn session_key_rejects_overlong_value() {
        let key = "a".repeat(MAX_SESSION_KEY_LENGTH + 1);
        assert!(SessionKey::new(key).is_err());
    }

    #[test]
    fn session_key_deserializes_with_validation() {
        let key: SessionKey = serde_json::from_str("\"S1\"").unwrap();
        assert_eq!(key.as_str(), "S1");

        let bad: Result<SessionKey, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn message_id_sequence_starts_at_one() {
        let first = MessageId::first();
        assert_eq!(first.value(), 1);
        assert_eq!(first.next().value(), 2);
        assert!(first < first.next());
    }

    #[test]
    fn user_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&UserId::new(42)).unwrap(), "42");
        let parsed: UserId = "7".parse().unwrap();
        assert_eq!(parsed, UserId::new(7));
    }

    #[test]
    fn client_message_id_display_is_uuid() {
        let id = ClientMessageId::new();
        assert_eq!(format!("{}", id).len(), 36);
    }
}
