use shellgate_protocol::{SessionGeometry, TerminalOptions};
use vt100::Parser;

use super::surface::{TerminalSurface, Viewport};
use super::{DEFAULT_FONT_SIZE, DEFAULT_SCROLLBACK_LINES};

const MIN_COLUMNS: u16 = 2;
const MIN_ROWS: u16 = 1;

/// vt100-backed surface with no real renderer
///
/// Cells are sized from the font: 0.6em wide, 1.2em tall (times `line_height`).
pub struct HeadlessSurface {
    parser: Parser,
    viewport: Viewport,
    font_size: u16,
    options: TerminalOptions,
    scrollback_lines: usize,
    geometry: SessionGeometry,
    disposed: bool,
}

impl HeadlessSurface {
    pub fn new(viewport: Viewport) -> Self {
        let mut surface = Self {
            parser: Parser::new(MIN_ROWS, MIN_COLUMNS, DEFAULT_SCROLLBACK_LINES),
            viewport,
            font_size: DEFAULT_FONT_SIZE,
            options: TerminalOptions::default(),
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            geometry: SessionGeometry::new(MIN_COLUMNS, MIN_ROWS),
            disposed: false,
        };
        surface.fit();
        surface
    }

    pub fn with_scrollback(mut self, lines: usize) -> Self {
        self.scrollback_lines = lines;
        self.rebuild();
        self
    }

    /// Plain text currently on screen
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    pub fn geometry(&self) -> SessionGeometry {
        self.geometry
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    pub fn options(&self) -> &TerminalOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Cell size in pixels (width, height)
    fn cell_size(&self) -> (u32, u32) {
        let font = u32::from(self.font_size);
        let width = (font * 3 / 5).max(1);
        let height = match self.options.line_height {
            Some(factor) if factor > 0.0 => ((font * 6) as f32 / 5.0 * factor) as u32,
            _ => font * 6 / 5,
        };
        (width, height.max(1))
    }

    // Create a new parser with the current size, replaying what was on screen
    fn rebuild(&mut self) {
        let previous = self.parser.screen().contents_formatted();
        self.parser = Parser::new(self.geometry.rows, self.geometry.columns, self.scrollback_lines);
        self.parser.process(&previous);
    }
}

impl TerminalSurface for HeadlessSurface {
    fn write(&mut self, data: &[u8]) {
        if self.disposed {
            return;
        }
        self.parser.process(data);
    }

    fn fit(&mut self) -> SessionGeometry {
        let (cell_width, cell_height) = self.cell_size();
        let columns = (self.viewport.width / cell_width).clamp(u32::from(MIN_COLUMNS), u32::from(u16::MAX));
        let rows = (self.viewport.height / cell_height).clamp(u32::from(MIN_ROWS), u32::from(u16::MAX));
        let geometry = SessionGeometry::new(columns as u16, rows as u16);

        if geometry != self.geometry {
            log::trace!("Headless surface refit {} -> {}", self.geometry, geometry);
            self.geometry = geometry;
            self.rebuild();
        }
        geometry
    }

    fn set_font_size(&mut self, size: u16) {
        self.font_size = size.max(1);
    }

    fn apply_options(&mut self, options: &TerminalOptions) {
        if let Some(lines) = options.scrollback {
            if lines != self.scrollback_lines {
                self.scrollback_lines = lines;
                self.rebuild();
            }
        }
        if let Some(size) = options.font_size {
            self.set_font_size(size);
        }

        let merged = TerminalOptions {
            cursor_blink: options.cursor_blink.or(self.options.cursor_blink),
            scrollback: options.scrollback.or(self.options.scrollback),
            tab_stop_width: options.tab_stop_width.or(self.options.tab_stop_width),
            bell_style: options.bell_style.clone().or_else(|| self.options.bell_style.take()),
            font_size: options.font_size.or(self.options.font_size),
            font_family: options.font_family.clone().or_else(|| self.options.font_family.take()),
            letter_spacing: options.letter_spacing.or(self.options.letter_spacing),
            line_height: options.line_height.or(self.options.line_height),
        };
        self.options = merged;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport_fits_80x24() {
        let surface = HeadlessSurface::new(Viewport::default());
        assert_eq!(surface.geometry(), SessionGeometry::new(80, 24));
    }

    #[test]
    fn test_larger_font_means_fewer_cells() {
        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.set_font_size(20);
        let geometry = surface.fit();
        assert_eq!(geometry, SessionGeometry::new(53, 16));
    }

    #[test]
    fn test_tiny_viewport_keeps_minimum() {
        let mut surface = HeadlessSurface::new(Viewport::new(1, 1));
        assert_eq!(surface.fit(), SessionGeometry::new(MIN_COLUMNS, MIN_ROWS));
    }

    #[test]
    fn test_write_renders_and_survives_refit() {
        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.write(b"\x1b[32mhello\x1b[0m world");
        assert!(surface.contents().contains("hello world"));

        surface.set_viewport(Viewport::new(1280, 768));
        assert_eq!(surface.fit(), SessionGeometry::new(160, 48));
        assert!(surface.contents().contains("hello world"));
    }

    #[test]
    fn test_apply_options_merges() {
        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.apply_options(&TerminalOptions {
            cursor_blink: Some(true),
            ..TerminalOptions::default()
        });
        surface.apply_options(&TerminalOptions {
            font_size: Some(16),
            ..TerminalOptions::default()
        });
        assert_eq!(surface.options().cursor_blink, Some(true));
        assert_eq!(surface.font_size(), 16);
    }

    #[test]
    fn test_disposed_surface_ignores_writes() {
        let mut surface = HeadlessSurface::new(Viewport::default());
        surface.dispose();
        surface.write(b"late");
        assert!(surface.is_disposed());
        assert!(!surface.contents().contains("late"));
    }
}
