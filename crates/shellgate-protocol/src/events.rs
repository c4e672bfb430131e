use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::fmt;

use crate::{ProtocolError, SessionGeometry};

// ============================================================================
// Outbound
// ============================================================================

/// Control requests the client may send, subject to remote permission flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlAction {
    Reauth,
    ReplayCredentials,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Reauth => "reauth",
            ControlAction::ReplayCredentials => "replayCredentials",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events sent from the client to the remote session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Raw bytes for the remote process
    Data(String),
    /// Initial geometry, sent once the channel opens
    Geometry(SessionGeometry),
    /// Geometry after a refit
    Resize(SessionGeometry),
    Control(ControlAction),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Data(_) => "data",
            ClientEvent::Geometry(_) => "geometry",
            ClientEvent::Resize(_) => "resize",
            ClientEvent::Control(_) => "control",
        }
    }

    pub fn to_frame(&self) -> Frame {
        let payload = match self {
            ClientEvent::Data(data) => Value::String(data.clone()),
            ClientEvent::Geometry(geometry) | ClientEvent::Resize(geometry) => {
                json!({ "cols": geometry.columns, "rows": geometry.rows })
            }
            ClientEvent::Control(action) => Value::String(action.as_str().to_string()),
        };
        Frame {
            event: self.name().to_string(),
            payload,
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Output bytes from the remote, either already text or raw binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPayload {
    Text(String),
    Binary(Vec<u8>),
}

impl DataPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DataPayload::Text(text) => text.as_bytes(),
            DataPayload::Binary(bytes) => bytes,
        }
    }

    /// Text form used for the transcript; invalid UTF-8 is replaced
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            DataPayload::Text(text) => Cow::Borrowed(text),
            DataPayload::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

/// Terminal options pushed by the remote side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_blink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrollback: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_stop_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bell_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
}

/// Events received from the remote session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "data")]
    Data(DataPayload),
    /// Human-readable status; may carry the session-established marker
    #[serde(rename = "status")]
    Status(String),
    /// Fatal session error reported by the remote
    #[serde(rename = "ssherror")]
    SshError(String),
    #[serde(rename = "title")]
    Title(String),
    /// Banner text; empty or absent hides the banner
    #[serde(rename = "header")]
    Header(Option<String>),
    #[serde(rename = "footer")]
    Footer(Option<String>),
    #[serde(rename = "headerBackground")]
    HeaderBackground(String),
    #[serde(rename = "statusBackground")]
    StatusBackground(String),
    #[serde(rename = "allowreauth")]
    AllowReauth(bool),
    #[serde(rename = "allowreplay")]
    AllowReplay(bool),
    #[serde(rename = "disconnect")]
    Disconnect(String),
    #[serde(rename = "error")]
    Error(String),
    /// Seconds left before the server shuts the session down
    #[serde(rename = "shutdownCountdownUpdate")]
    ShutdownCountdown(u32),
    #[serde(rename = "setTerminalOpts")]
    SetTerminalOptions(TerminalOptions),
    #[serde(rename = "menu")]
    Menu,
    #[serde(rename = "reauth")]
    Reauth,
}

impl ServerEvent {
    /// Every inbound event kind a client registers for
    pub const EVENT_NAMES: &'static [&'static str] = &[
        "data",
        "status",
        "ssherror",
        "title",
        "header",
        "footer",
        "headerBackground",
        "statusBackground",
        "allowreauth",
        "allowreplay",
        "disconnect",
        "error",
        "shutdownCountdownUpdate",
        "setTerminalOpts",
        "menu",
        "reauth",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Data(_) => "data",
            ServerEvent::Status(_) => "status",
            ServerEvent::SshError(_) => "ssherror",
            ServerEvent::Title(_) => "title",
            ServerEvent::Header(_) => "header",
            ServerEvent::Footer(_) => "footer",
            ServerEvent::HeaderBackground(_) => "headerBackground",
            ServerEvent::StatusBackground(_) => "statusBackground",
            ServerEvent::AllowReauth(_) => "allowreauth",
            ServerEvent::AllowReplay(_) => "allowreplay",
            ServerEvent::Disconnect(_) => "disconnect",
            ServerEvent::Error(_) => "error",
            ServerEvent::ShutdownCountdown(_) => "shutdownCountdownUpdate",
            ServerEvent::SetTerminalOptions(_) => "setTerminalOpts",
            ServerEvent::Menu => "menu",
            ServerEvent::Reauth => "reauth",
        }
    }

    /// Decode and validate a named frame received from the channel
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let Frame { event, payload } = frame;
        if !Self::EVENT_NAMES.contains(&event.as_str()) {
            return Err(ProtocolError::UnknownEvent(event));
        }

        // Diagnostics arrive as whatever the transport had at hand
        let payload = match (event.as_str(), payload) {
            ("disconnect" | "error", Value::Null) => Value::String(String::new()),
            ("disconnect" | "error", Value::String(text)) => Value::String(text),
            ("disconnect" | "error", other) => Value::String(other.to_string()),
            (_, other) => other,
        };

        serde_json::from_value(json!({ "event": event.as_str(), "payload": payload }))
            .map_err(|source| ProtocolError::MalformedPayload { event, source })
    }
}

/// A named event with its JSON payload, as carried by the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Parse a frame from one line of JSON
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }
}
