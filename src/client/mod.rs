//! Chat client - the widget-side half of the chat channel.
//!
//! # Key Types
//!
//! - `ChatConnectionManager` - Owns one session attachment and picks its transport
//! - `PollingAdapter` - Request/response fallback transport
//! - `EventBus` / `ChatEvent` - What both transports publish to UI consumers
//! - `ConnectionState` - Lifecycle of the attachment
//! - `Transcript` - Optimistic entries reconciled against broker echoes
//!
//! The concrete transports live in `adapters::client`; tests drive the
//! manager through hand-written fakes of the same ports.

mod connection_manager;
mod event_bus;
mod events;
mod polling;
mod state;
mod transcript;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection_manager::{ChatConnectionManager, ConnectionConfig};
pub use event_bus::{EventBus, Listener};
pub use events::{ChatEvent, ChatEventKind};
pub use polling::PollingAdapter;
pub use state::ConnectionState;
pub use transcript::{Transcript, TranscriptEntry};
