//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Bearer credential validation and client credentials
//! - `client` - Socket and polling transports used by the chat client
//! - `http` - REST endpoints and router assembly
//! - `memory` - In-process chat repository
//! - `postgres` - PostgreSQL chat repository
//! - `websocket` - Session rooms and the socket upgrade handler

pub mod auth;
pub mod client;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;
