//! Connection state machine values.

use std::fmt;
use std::time::Duration;

/// Where the push channel is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and no pending attempt.
    #[default]
    Disconnected,
    /// Opening a socket.
    Connecting,
    /// Socket open and receiving.
    Connected,
    /// Reconnect ceiling reached; only an explicit `connect` revives it.
    Dead,
}

impl ConnectionState {
    /// Lowercase name for logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published on the manager's status bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The state changed.
    StateChanged(ConnectionState),
    /// A reconnect was scheduled.
    ReconnectScheduled {
        /// 1-indexed attempt number.
        attempt: u32,
        /// Wait before the attempt.
        delay: Duration,
    },
}
