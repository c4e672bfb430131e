use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shellgate_terminal::{Viewport, DEFAULT_FONT_SIZE, DEFAULT_SCROLLBACK_LINES};
use std::path::Path;
use std::time::Duration;

/// Bridge configuration, loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Initial (and reset) font size
    pub font_size: u16,
    pub min_font_size: u16,
    pub max_font_size: u16,
    /// Delay between a font change and the geometry recomputation
    pub refit_debounce_ms: u64,
    /// Status text that signals the remote session is up (case-insensitive)
    pub established_marker: String,
    /// Where the presentation layer navigates for reauthentication
    pub reauth_path: String,
    /// Keep virtual Shift latched across keystrokes
    pub sticky_shift: bool,
    pub transcript_prefix: String,
    /// Log label used when no footer text is known
    pub default_log_label: String,
    /// Status background once the session is in a terminal state
    pub error_background: String,
    pub scrollback: usize,
    pub initial_viewport: Viewport,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            min_font_size: 8,
            max_font_size: 28,
            refit_debounce_ms: 150,
            established_marker: "CONNECTION ESTABLISHED".to_string(),
            reauth_path: "/ssh/reauth".to_string(),
            sticky_shift: true,
            transcript_prefix: "shellgate".to_string(),
            default_log_label: "session".to_string(),
            error_background: "red".to_string(),
            scrollback: DEFAULT_SCROLLBACK_LINES,
            initial_viewport: Viewport::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.min_font_size == 0 || self.min_font_size > self.max_font_size {
            anyhow::bail!(
                "Invalid font size range {}..={}",
                self.min_font_size,
                self.max_font_size
            );
        }
        Ok(())
    }

    /// Clamp into the configured range; a reversed range is treated as swapped
    pub fn clamp_font_size(&self, size: i32) -> u16 {
        let low = self.min_font_size.min(self.max_font_size);
        let high = self.min_font_size.max(self.max_font_size);
        size.clamp(i32::from(low), i32::from(high)) as u16
    }

    /// Configured default font, clamped into range
    pub fn initial_font_size(&self) -> u16 {
        self.clamp_font_size(i32::from(self.font_size))
    }

    pub fn refit_debounce(&self) -> Duration {
        Duration::from_millis(self.refit_debounce_ms)
    }

    pub fn is_established(&self, status: &str) -> bool {
        !self.established_marker.is_empty()
            && status
                .to_lowercase()
                .contains(&self.established_marker.to_lowercase())
    }
}
