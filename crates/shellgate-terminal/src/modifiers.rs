use crate::keys::{KeyAction, KeyKind, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
}

/// Latched modifier buttons of the on-screen keyboard.
///
/// Ctrl and Alt are one-shot: they apply to the next character and then
/// release. Shift stays latched unless `sticky_shift` is off.
#[derive(Debug, Clone, Default)]
pub struct ModifierLatch {
    active: Modifiers,
    sticky_shift: bool,
}

impl ModifierLatch {
    pub fn new(sticky_shift: bool) -> Self {
        Self {
            active: Modifiers::NONE,
            sticky_shift,
        }
    }

    pub fn active(&self) -> Modifiers {
        self.active
    }

    /// Flip one modifier; Ctrl and Alt exclude each other
    pub fn toggle(&mut self, modifier: Modifier) {
        match modifier {
            Modifier::Shift => self.active.shift = !self.active.shift,
            Modifier::Ctrl => {
                self.active.ctrl = !self.active.ctrl;
                self.active.alt = false;
            }
            Modifier::Alt => {
                self.active.alt = !self.active.alt;
                self.active.ctrl = false;
            }
        }
    }

    pub fn clear(&mut self) {
        self.active = Modifiers::NONE;
    }

    /// Attach the latched modifiers to `action` and release the one-shot ones.
    ///
    /// Named keys neither receive nor consume the latch.
    pub fn apply(&mut self, mut action: KeyAction) -> KeyAction {
        if action.kind == KeyKind::Special {
            return action;
        }
        action.modifiers = action.modifiers.union(self.active);
        self.active.ctrl = false;
        self.active.alt = false;
        if !self.sticky_shift {
            self.active.shift = false;
        }
        action
    }
}
