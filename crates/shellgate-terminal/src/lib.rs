// Terminal-side building blocks for a remote shell session
//
// Key translation for the on-screen keyboard, the session transcript, and the
// seam to whatever renders the terminal (plus a vt100-backed headless one).

pub mod keys;
pub mod modifiers;
pub mod transcript;
pub mod surface;
mod headless;

// Re-export public API
pub use keys::{translate, KeyAction, KeyKind, Modifiers, NamedKey, WirePayload};
pub use modifiers::{Modifier, ModifierLatch};
pub use transcript::{strip_control_sequences, TranscriptError, TranscriptRecorder};
pub use surface::{TerminalSurface, Viewport};
pub use headless::HeadlessSurface;

// Constants
pub const DEFAULT_SCROLLBACK_LINES: usize = 1000;
pub const DEFAULT_FONT_SIZE: u16 = 14;
