//! In-memory adapters.

mod chat_repository;

pub use chat_repository::InMemoryChatRepository;
