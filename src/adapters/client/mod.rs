//! Client-side transport adapters.
//!
//! - [`socket`] - Persistent socket over tokio-tungstenite
//! - [`api`] - Polling resource over reqwest

pub mod api;
pub mod socket;

pub use api::ReqwestChatApi;
pub use socket::TungsteniteConnector;
