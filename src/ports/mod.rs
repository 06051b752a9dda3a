//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Broker Ports
//!
//! - `ChatRepository` - Session and message persistence
//! - `SessionNotifier` - Fan-out to listeners attached to a session
//! - `SessionValidator` - Bearer credential to caller identity
//!
//! ## Client Ports
//!
//! - `CredentialProvider` - Bearer credential for outgoing requests
//! - `SocketConnector` - Opens the persistent channel
//! - `ChatApi` - Polling fetch/post resource

mod chat_repository;
mod chat_transport;
mod credential_provider;
mod session_notifier;
mod session_validator;

pub use chat_repository::ChatRepository;
pub use chat_transport::{
    ChatApi, ChatClientError, OutgoingMessage, SocketChannel, SocketConnector, SocketEvent,
};
pub use credential_provider::CredentialProvider;
pub use session_notifier::SessionNotifier;
pub use session_validator::SessionValidator;
