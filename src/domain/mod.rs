//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `chat` - Chat session aggregate, messages and lifecycle rules

pub mod chat;
pub mod foundation;
