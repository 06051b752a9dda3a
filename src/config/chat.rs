//! Limits of the chat broker.

use serde::Deserialize;

use crate::application::handlers::chat::ChatPolicy;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Seconds after its last activity an open session is still resumed.
    pub activity_window_secs: u64,

    /// Frames buffered per session room before a slow socket is dropped.
    pub room_capacity: usize,

    /// Longest accepted message, in characters.
    pub max_message_length: usize,
}

impl ChatConfig {
    /// Broker limits derived from this configuration.
    pub fn policy(&self) -> ChatPolicy {
        ChatPolicy {
            activity_window_secs: self.activity_window_secs,
            max_message_length: self.max_message_length,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.activity_window_secs == 0 {
            return Err(ValidationError::NonPositiveChatSetting("activity_window_secs"));
        }
        if self.room_capacity == 0 {
            return Err(ValidationError::NonPositiveChatSetting("room_capacity"));
        }
        if self.max_message_length == 0 {
            return Err(ValidationError::NonPositiveChatSetting("max_message_length"));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            activity_window_secs: 30 * 60,
            room_capacity: 128,
            max_message_length: crate::domain::chat::DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}
