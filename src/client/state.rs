//! Connection state of the chat client.

use std::fmt;

use crate::domain::foundation::StateMachine;

/// Where the connection manager is in its lifecycle.
///
/// ```text
/// Idle → Connecting ─┬→ OpenSocket ⇄ Reconnecting
///                    └→ OpenPolling ←──────┘ (budget exhausted)
/// any → Closed (disconnect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    OpenSocket,
    OpenPolling,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    /// A transport can carry messages.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::OpenSocket | ConnectionState::OpenPolling)
    }

    /// The manager is attached to a session, whether or not a transport is
    /// currently usable.
    pub fn is_attached(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::OpenSocket
                | ConnectionState::OpenPolling
                | ConnectionState::Reconnecting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::OpenSocket => "open_socket",
            ConnectionState::OpenPolling => "open_polling",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl StateMachine for ConnectionState {
    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Idle => vec![Connecting, Closed],
            Connecting => vec![OpenSocket, OpenPolling, Closed],
            OpenSocket => vec![Reconnecting, Closed],
            OpenPolling => vec![Reconnecting, Closed],
            Reconnecting => vec![Reconnecting, OpenSocket, OpenPolling, Closed],
            // A closed manager may be connected again.
            Closed => vec![Connecting, Closed],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
