/// Terminal surface abstraction for whatever renders the remote screen
use serde::{Deserialize, Serialize};
use shellgate_protocol::{SessionGeometry, TerminalOptions};

/// Pixel size of the area the terminal is laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(640, 384)
    }
}

/// Rendering side of a session.
///
/// The bridge owns exactly one surface for the lifetime of a session and
/// disposes it on teardown.
pub trait TerminalSurface {
    /// Render bytes received from the remote shell
    fn write(&mut self, data: &[u8]);

    /// Recompute rows/columns for the current viewport and font, returning the result
    fn fit(&mut self) -> SessionGeometry;

    fn set_font_size(&mut self, size: u16);

    /// Apply server-supplied rendering options
    fn apply_options(&mut self, options: &TerminalOptions);

    /// Record a new viewport size; takes effect on the next `fit`
    fn set_viewport(&mut self, _viewport: Viewport) {}

    /// Release rendering resources
    fn dispose(&mut self);
}
