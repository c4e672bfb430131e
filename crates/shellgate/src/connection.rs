//! Connection lifecycle tracking

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl ConnectionState {
    /// `Error` and `Disconnected` end the session for good
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Error | ConnectionState::Disconnected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine, already classified by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    ChannelOpened,
    /// Status text from the remote; `established` when it carries the session marker
    Status { text: String, established: bool },
    /// Remote refused or killed the session while the channel is still up
    SessionRejected(String),
    ChannelClosed(String),
    TransportError(String),
}

/// Connection state plus the human-readable status that goes with it
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    status: String,
    channel_lost: bool,
    session_rejected: bool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            status: "Connecting...".to_string(),
            channel_lost: false,
            session_rejected: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn may_accept_input(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The transport itself went away
    pub fn channel_lost(&self) -> bool {
        self.channel_lost
    }

    /// The remote refused the session over a live channel
    pub fn session_rejected(&self) -> bool {
        self.session_rejected
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn reconnect_allowed(&self) -> bool {
        !self.is_terminal()
    }

    /// Feed one event; returns the new state if it changed.
    ///
    /// Terminal states absorb everything. The first terminal status message
    /// is kept, but a later channel loss is still recorded.
    pub fn apply(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        if self.is_terminal() {
            if let ConnectionEvent::ChannelClosed(_) = event {
                self.channel_lost = true;
            }
            log::debug!("Ignoring {:?} in terminal state {}", event, self.state);
            return None;
        }

        let next = match event {
            ConnectionEvent::ChannelOpened => {
                if self.state == ConnectionState::Connecting {
                    ConnectionState::Connected
                } else {
                    self.state
                }
            }
            ConnectionEvent::Status { text, established } => {
                self.status = text;
                if established {
                    ConnectionState::Connected
                } else {
                    self.state
                }
            }
            ConnectionEvent::SessionRejected(message) => {
                self.status = message;
                self.session_rejected = true;
                ConnectionState::Error
            }
            ConnectionEvent::ChannelClosed(reason) => {
                self.status = format!("WEBSOCKET SERVER DISCONNECTED: {}", reason);
                self.channel_lost = true;
                ConnectionState::Disconnected
            }
            ConnectionEvent::TransportError(error) => {
                self.status = format!("ERROR: {}", error);
                self.channel_lost = true;
                ConnectionState::Error
            }
        };

        if next == self.state {
            return None;
        }
        log::info!("Connection {} -> {}", self.state, next);
        self.state = next;
        Some(next)
    }

    /// Local teardown; leaves an earlier terminal state and message in place
    pub fn shut_down(&mut self) -> Option<ConnectionState> {
        if self.is_terminal() {
            return None;
        }
        log::info!("Connection {} -> {} (closed locally)", self.state, ConnectionState::Disconnected);
        self.state = ConnectionState::Disconnected;
        self.status = "Session closed".to_string();
        Some(self.state)
    }
}
