//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresChatRepository` - Chat sessions and messages

mod chat_repository;

pub use chat_repository::PostgresChatRepository;
