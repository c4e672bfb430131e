use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("a logging window for '{0}' is already open")]
    AlreadyRecording(String),
    #[error("no logging window is open")]
    NotRecording,
}

#[derive(Debug, Clone)]
struct LogWindow {
    label: String,
    started_at: DateTime<Local>,
    /// `None` while the window is open
    stopped_at: Option<DateTime<Local>>,
}

impl LogWindow {
    fn is_open(&self) -> bool {
        self.stopped_at.is_none()
    }
}

/// Session transcript for the user's "start log / stop log / download" flow.
///
/// Bytes are only kept while a logging window is open. Starting a window
/// begins a fresh transcript.
#[derive(Debug, Default)]
pub struct TranscriptRecorder {
    content: String,
    /// Most recent window, open or closed
    last: Option<LogWindow>,
    captured_bytes: u64,
}

impl TranscriptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a logging window
    pub fn start(&mut self, label: &str) -> Result<(), TranscriptError> {
        self.start_at(label, Local::now())
    }

    pub fn start_at(&mut self, label: &str, now: DateTime<Local>) -> Result<(), TranscriptError> {
        if let Some(window) = self.open_window() {
            return Err(TranscriptError::AlreadyRecording(window.label.clone()));
        }

        self.content = format!("Log Start for {}: {}\r\n\r\n", label, marker_time(&now));
        self.last = Some(LogWindow {
            label: label.to_string(),
            started_at: now,
            stopped_at: None,
        });
        self.captured_bytes = 0;
        Ok(())
    }

    /// Record a chunk of session traffic; returns false when no window is open
    pub fn append(&mut self, chunk: &str) -> bool {
        if self.open_window().is_none() {
            return false;
        }
        self.content.push_str(chunk);
        self.captured_bytes += chunk.len() as u64;
        true
    }

    /// Close the logging window and return its end timestamp
    pub fn stop(&mut self) -> Result<DateTime<Local>, TranscriptError> {
        self.stop_at(Local::now())
    }

    pub fn stop_at(&mut self, now: DateTime<Local>) -> Result<DateTime<Local>, TranscriptError> {
        let window = self
            .last
            .as_mut()
            .filter(|window| window.is_open())
            .ok_or(TranscriptError::NotRecording)?;
        window.stopped_at = Some(now);
        self.content.push_str(&format!(
            "\r\n\r\nLog End for {}: {}\r\n",
            window.label,
            marker_time(&now)
        ));
        log::debug!(
            "Transcript '{}' closed after {}s, {} bytes",
            window.label,
            now.signed_duration_since(window.started_at).num_seconds(),
            self.captured_bytes
        );
        Ok(now)
    }

    fn open_window(&self) -> Option<&LogWindow> {
        self.last.as_ref().filter(|window| window.is_open())
    }

    pub fn is_recording(&self) -> bool {
        self.open_window().is_some()
    }

    /// Whether any window has been opened, i.e. there is something to export
    pub fn has_content(&self) -> bool {
        self.last.is_some()
    }

    /// Label of the most recent window
    pub fn label(&self) -> Option<&str> {
        self.last.as_ref().map(|window| window.label.as_str())
    }

    pub fn captured_bytes(&self) -> u64 {
        self.captured_bytes
    }

    /// Transcript exactly as recorded, control sequences included
    pub fn raw(&self) -> &str {
        &self.content
    }

    /// Plain-text transcript. Does not clear the buffer.
    pub fn export(&self) -> String {
        strip_control_sequences(&self.content)
    }

    /// `{prefix}-{label}-{YYYYMMDD_HHMMSS}.log`, stamped with the stop time
    /// (or the start time while the window is still open).
    ///
    /// The label is used as-is; callers writing to disk sanitise the name.
    pub fn artifact_name(&self, prefix: &str) -> Option<String> {
        let window = self.last.as_ref()?;
        let stamp = window.stopped_at.unwrap_or(window.started_at);
        Some(format!("{}-{}-{}.log", prefix, window.label, stamp.format("%Y%m%d_%H%M%S")))
    }
}

fn marker_time(at: &DateTime<Local>) -> String {
    at.format("%Y/%-m/%-d @ %-H:%-M:%-S").to_string()
}

fn control_sequence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x1b\x{9b}][\[\]()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><;]")
            .expect("control sequence pattern is valid")
    })
}

/// Remove ESC / CSI introduced terminal control sequences, keeping text and newlines
pub fn strip_control_sequences(text: &str) -> String {
    control_sequence_pattern().replace_all(text, "").into_owned()
}
