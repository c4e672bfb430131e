use serde::Serialize;
use shellgate_protocol::SessionGeometry;
use shellgate_terminal::Modifiers;

use crate::connection::ConnectionState;

/// Read-only snapshot of a session, published after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub state: ConnectionState,
    pub status: String,
    pub status_background: Option<String>,
    /// Transport lost (as opposed to the remote rejecting the session)
    pub channel_lost: bool,
    pub session_rejected: bool,
    pub reconnect_allowed: bool,
    pub title: Option<String>,
    pub header: Option<String>,
    pub header_background: Option<String>,
    pub footer: Option<String>,
    pub shutdown_countdown: Option<u32>,
    pub allow_reauth: bool,
    pub allow_replay: bool,
    pub logging: bool,
    pub transcript_available: bool,
    pub font_size: u16,
    pub geometry: SessionGeometry,
    pub modifiers: Modifiers,
    /// Last user-facing notice, e.g. a rejected action
    pub notice: Option<String>,
    /// Set when the presentation layer should navigate for reauthentication
    pub redirect: Option<String>,
}

impl SessionView {
    pub(crate) fn new(font_size: u16, geometry: SessionGeometry) -> Self {
        Self {
            state: ConnectionState::Connecting,
            status: String::new(),
            status_background: None,
            channel_lost: false,
            session_rejected: false,
            reconnect_allowed: true,
            title: None,
            header: None,
            header_background: None,
            footer: None,
            shutdown_countdown: None,
            allow_reauth: false,
            allow_replay: false,
            logging: false,
            transcript_available: false,
            font_size,
            geometry,
            modifiers: Modifiers::NONE,
            notice: None,
            redirect: None,
        }
    }

    pub fn may_accept_input(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn countdown_message(&self) -> Option<String> {
        self.shutdown_countdown
            .map(|seconds| format!("Shutting down in {}s", seconds))
    }
}
