//! Translation of logical key actions into the bytes sent to the remote
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

const ESC: char = '\x1b';

/// Shifted symbols of the number row and punctuation on a US layout
const SHIFT_MAP: &[(char, char)] = &[
    ('1', '!'), ('2', '@'), ('3', '#'), ('4', '$'), ('5', '%'),
    ('6', '^'), ('7', '&'), ('8', '*'), ('9', '('), ('0', ')'),
    ('-', '_'), ('=', '+'), ('[', '{'), (']', '}'), ('\\', '|'),
    (';', ':'), ('\'', '"'), (',', '<'), ('.', '>'), ('/', '?'),
];

/// Modifier state attached to a single key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false };

    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt)
    }

    pub fn union(self, other: Modifiers) -> Modifiers {
        Modifiers {
            shift: self.shift || other.shift,
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A printable character (or short string) as labelled on the key
    Char,
    /// A named key such as `ArrowUp` or `F5`
    Special,
    /// A character combined with Control
    Control,
}

/// A logical keystroke from the on-screen keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAction {
    pub kind: KeyKind,
    pub value: String,
    pub modifiers: Modifiers,
}

impl KeyAction {
    pub fn char(value: impl Into<String>) -> Self {
        Self::new(KeyKind::Char, value)
    }

    pub fn special(name: impl Into<String>) -> Self {
        Self::new(KeyKind::Special, name)
    }

    pub fn control(value: impl Into<String>) -> Self {
        Self::new(KeyKind::Control, value)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    fn new(kind: KeyKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            modifiers: Modifiers::NONE,
        }
    }
}

/// The exact string sent outbound for one key action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePayload(String);

impl WirePayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Printable form with control bytes shown as `\xNN`
    pub fn escaped(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for c in self.0.chars() {
            if c.is_control() {
                out.push_str(&format!("\\x{:02x}", c as u32));
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for WirePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<WirePayload> for String {
    fn from(payload: WirePayload) -> Self {
        payload.0
    }
}

/// Keys with a fixed escape sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Escape,
    Tab,
    Enter,
    Backspace,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    F(u8),
}

impl NamedKey {
    pub fn sequence(&self) -> Option<&'static str> {
        let seq = match self {
            NamedKey::Escape => "\x1b",
            NamedKey::Tab => "\t",
            NamedKey::Enter => "\r",
            NamedKey::Backspace => "\x7f",
            NamedKey::Insert => "\x1b[2~",
            NamedKey::Delete => "\x1b[3~",
            NamedKey::Home => "\x1b[H",
            NamedKey::End => "\x1b[F",
            NamedKey::PageUp => "\x1b[5~",
            NamedKey::PageDown => "\x1b[6~",
            NamedKey::ArrowUp => "\x1b[A",
            NamedKey::ArrowDown => "\x1b[B",
            NamedKey::ArrowRight => "\x1b[C",
            NamedKey::ArrowLeft => "\x1b[D",
            NamedKey::F(1) => "\x1bOP",
            NamedKey::F(2) => "\x1bOQ",
            NamedKey::F(3) => "\x1bOR",
            NamedKey::F(4) => "\x1bOS",
            NamedKey::F(5) => "\x1b[15~",
            NamedKey::F(6) => "\x1b[17~",
            NamedKey::F(7) => "\x1b[18~",
            NamedKey::F(8) => "\x1b[19~",
            NamedKey::F(9) => "\x1b[20~",
            NamedKey::F(10) => "\x1b[21~",
            NamedKey::F(11) => "\x1b[23~",
            NamedKey::F(12) => "\x1b[24~",
            NamedKey::F(_) => return None,
        };
        Some(seq)
    }
}

impl FromStr for NamedKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "Escape" | "Esc" => NamedKey::Escape,
            "Tab" => NamedKey::Tab,
            "Enter" | "Return" => NamedKey::Enter,
            "Backspace" => NamedKey::Backspace,
            "Insert" | "Ins" => NamedKey::Insert,
            "Delete" | "Del" => NamedKey::Delete,
            "Home" => NamedKey::Home,
            "End" => NamedKey::End,
            "PageUp" | "PgUp" => NamedKey::PageUp,
            "PageDown" | "PgDn" => NamedKey::PageDown,
            "ArrowUp" | "Up" => NamedKey::ArrowUp,
            "ArrowDown" | "Down" => NamedKey::ArrowDown,
            "ArrowLeft" | "Left" => NamedKey::ArrowLeft,
            "ArrowRight" | "Right" => NamedKey::ArrowRight,
            other => {
                let n: u8 = other.strip_prefix('F').and_then(|n| n.parse().ok()).ok_or(())?;
                if !(1..=12).contains(&n) {
                    return Err(());
                }
                NamedKey::F(n)
            }
        };
        Ok(key)
    }
}

/// Map a key action to its wire payload.
///
/// Total over its input: anything without a known mapping is sent as its
/// literal value. Modifier one-shot behaviour is the caller's concern, see
/// [`crate::ModifierLatch`].
pub fn translate(action: &KeyAction) -> WirePayload {
    let modifiers = action.modifiers;
    let payload = match action.kind {
        KeyKind::Special => match action.value.parse::<NamedKey>().ok().and_then(|k| k.sequence()) {
            Some(seq) => seq.to_string(),
            None => action.value.clone(),
        },
        KeyKind::Char => {
            let shifted = if modifiers.shift {
                shift_symbol(&action.value)
            } else {
                Cow::Borrowed(action.value.as_str())
            };
            let base = if modifiers.ctrl {
                control_code(&shifted)
            } else {
                shifted.into_owned()
            };
            alt_prefix(base, modifiers.alt)
        }
        KeyKind::Control => alt_prefix(control_code(&action.value), modifiers.alt),
    };
    WirePayload(payload)
}

/// `uppercase(c) - 0x40` for characters in `@..=_`, literal otherwise
fn control_code(value: &str) -> String {
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let upper = c.to_ascii_uppercase();
        if ('@'..='_').contains(&upper) {
            return char::from(upper as u8 - 0x40).to_string();
        }
    }
    value.to_string()
}

fn shift_symbol(value: &str) -> Cow<'_, str> {
    let mut chars = value.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Cow::Borrowed(value),
    };
    if c.is_ascii_lowercase() {
        return Cow::Owned(c.to_ascii_uppercase().to_string());
    }
    match SHIFT_MAP.iter().find(|(plain, _)| *plain == c) {
        Some((_, shifted)) => Cow::Owned(shifted.to_string()),
        None => Cow::Borrowed(value),
    }
}

fn alt_prefix(payload: String, alt: bool) -> String {
    if alt {
        let mut prefixed = String::with_capacity(payload.len() + 1);
        prefixed.push(ESC);
        prefixed.push_str(&payload);
        prefixed
    } else {
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Modifiers::NONE }
    }

    fn alt() -> Modifiers {
        Modifiers { alt: true, ..Modifiers::NONE }
    }

    fn shift() -> Modifiers {
        Modifiers { shift: true, ..Modifiers::NONE }
    }

    #[test]
    fn test_named_keys() {
        let cases = [
            ("ArrowUp", "\x1b[A"),
            ("ArrowDown", "\x1b[B"),
            ("ArrowRight", "\x1b[C"),
            ("ArrowLeft", "\x1b[D"),
            ("Tab", "\t"),
            ("Enter", "\r"),
            ("Escape", "\x1b"),
            ("Backspace", "\x7f"),
            ("Home", "\x1b[H"),
            ("End", "\x1b[F"),
            ("PageUp", "\x1b[5~"),
            ("PageDown", "\x1b[6~"),
            ("Delete", "\x1b[3~"),
            ("F1", "\x1bOP"),
            ("F12", "\x1b[24~"),
        ];
        for (name, expected) in cases {
            assert_eq!(translate(&KeyAction::special(name)).as_str(), expected, "key {}", name);
        }
    }

    #[test]
    fn test_unknown_special_passes_through() {
        assert_eq!(translate(&KeyAction::special("F13")).as_str(), "F13");
        assert_eq!(translate(&KeyAction::special("Hyper")).as_str(), "Hyper");
    }

    #[test]
    fn test_control_codes() {
        assert_eq!(translate(&KeyAction::control("C")).as_str(), "\x03");
        assert_eq!(translate(&KeyAction::control("d")).as_str(), "\x04");
        assert_eq!(translate(&KeyAction::control("[")).as_str(), "\x1b");
        assert_eq!(translate(&KeyAction::char("l").with_modifiers(ctrl())).as_str(), "\x0c");
    }

    #[test]
    fn test_unrecognized_control_degrades_to_literal() {
        assert_eq!(translate(&KeyAction::control("1")).as_str(), "1");
        assert_eq!(translate(&KeyAction::control("ض")).as_str(), "ض");
        assert_eq!(translate(&KeyAction::control("ab")).as_str(), "ab");
    }

    #[test]
    fn test_shift_map() {
        assert_eq!(translate(&KeyAction::char("1").with_modifiers(shift())).as_str(), "!");
        assert_eq!(translate(&KeyAction::char("/").with_modifiers(shift())).as_str(), "?");
        assert_eq!(translate(&KeyAction::char("q").with_modifiers(shift())).as_str(), "Q");
        // outside the letter and number-row sets shift does nothing
        assert_eq!(translate(&KeyAction::char("ث").with_modifiers(shift())).as_str(), "ث");
        assert_eq!(translate(&KeyAction::special("Tab").with_modifiers(shift())).as_str(), "\t");
    }

    #[test]
    fn test_combined_modifiers() {
        let ctrl_alt = ctrl().union(alt());
        assert_eq!(translate(&KeyAction::char("c").with_modifiers(ctrl_alt)).as_str(), "\x1b\x03");
        assert_eq!(translate(&KeyAction::control("x").with_modifiers(alt())).as_str(), "\x1b\x18");
    }

    #[test]
    fn test_escaped() {
        let payload = translate(&KeyAction::special("ArrowUp"));
        assert_eq!(payload.escaped(), "\\x1b[A");
        assert_eq!(translate(&KeyAction::special("Backspace")).escaped(), "\\x7f");
    }

    proptest! {
        #[test]
        fn prop_printable_without_modifiers_is_unchanged(c in any::<char>().prop_filter("printable", |c| !c.is_control())) {
            let value = c.to_string();
            prop_assert_eq!(translate(&KeyAction::char(value.clone())).into_string(), value);
        }

        #[test]
        fn prop_ctrl_letter_is_control_code(c in proptest::char::range('a', 'z'), upper in any::<bool>()) {
            let letter = if upper { c.to_ascii_uppercase() } else { c };
            let expected = char::from(c.to_ascii_uppercase() as u8 - 0x40).to_string();
            prop_assert_eq!(translate(&KeyAction::char(letter.to_string()).with_modifiers(ctrl())).into_string(), expected.clone());
            prop_assert_eq!(translate(&KeyAction::control(letter.to_string())).into_string(), expected);
        }

        #[test]
        fn prop_alt_prefixes_escape(c in any::<char>()) {
            let value = c.to_string();
            let expected = format!("\x1b{}", value);
            prop_assert_eq!(translate(&KeyAction::char(value).with_modifiers(alt())).into_string(), expected);
        }
    }
}
