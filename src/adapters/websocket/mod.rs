//! WebSocket adapter for the persistent chat channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ChatBroker                             │
//! │   post_message / assign_agent / end_session                   │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ SessionNotifier::message_posted
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RoomManager                             │
//! │   Room: 3f2a…           Room: 9c1e…                           │
//! │   ├── visitor socket    ├── visitor socket                    │
//! │   └── agent socket      └── agent socket                      │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ RoomFrame
//!                               ▼
//!                     ws_handler (one task pair per socket)
//! ```
//!
//! - [`rooms`] - Room management and broadcast fan-out
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, ChatWsState};
pub use rooms::{ClientId, RoomFrame, RoomManager};
