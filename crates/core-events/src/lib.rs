//! Key vocabulary shared by every layer of the modal engine.
//!
//! Two representations live here:
//! * [`KeyEvent`]: a physical key press as reported by a host or terminal
//!   adapter (code + modifier bits, no normalization).
//! * [`KeyToken`]: the canonical logical key used by the mapping table, the
//!   interpreter, macro storage and dot-repeat payloads.
//!
//! The [`notation`] module converts between tokens and their textual
//! notation (`<C-w>`, `<Esc>`, `x`).

use std::fmt;

pub mod notation;

pub use notation::{NotationError, Tokens, parse_notation, to_notation, tokenize};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ModMask: u8 { const CTRL=1; const ALT=2; const SHIFT=4; const SUPER=8; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
}

/// Canonical logical key token.
///
/// `KeyToken::Chord` wraps a base token plus modifier mask. Construction through
/// [`KeyToken::chord`] keeps the representation normalized: shift over a plain
/// character folds into the character itself, control letters are stored lower
/// case, and an empty mask collapses to the base token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
    Chord { base: Box<KeyToken>, mods: ModMask },
}

impl KeyToken {
    pub fn chord(base: KeyToken, mut mods: ModMask) -> KeyToken {
        let base = match base {
            KeyToken::Chord {
                base: inner,
                mods: inner_mods,
            } => {
                mods |= inner_mods;
                *inner
            }
            other => other,
        };
        let base = match base {
            KeyToken::Char(c) if mods.contains(ModMask::SHIFT) && c.is_alphabetic() => {
                mods.remove(ModMask::SHIFT);
                KeyToken::Char(c.to_uppercase().next().unwrap_or(c))
            }
            KeyToken::Char(c) if mods.contains(ModMask::SHIFT) && !c.is_alphanumeric() => {
                // shifted punctuation is already the produced glyph
                mods.remove(ModMask::SHIFT);
                KeyToken::Char(c)
            }
            other => other,
        };
        let base = match base {
            KeyToken::Char(c) if mods.contains(ModMask::CTRL) => {
                mods.remove(ModMask::SHIFT);
                KeyToken::Char(c.to_ascii_lowercase())
            }
            other => other,
        };
        if mods.is_empty() {
            base
        } else {
            KeyToken::Chord {
                base: Box::new(base),
                mods,
            }
        }
    }

    pub fn ctrl(c: char) -> KeyToken {
        KeyToken::chord(KeyToken::Char(c), ModMask::CTRL)
    }

    /// Plain (unmodified) printable character, if this token is one.
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeyToken::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn mods(&self) -> ModMask {
        match self {
            KeyToken::Chord { mods, .. } => *mods,
            _ => ModMask::empty(),
        }
    }

    pub fn has_ctrl(&self) -> bool {
        self.mods().contains(ModMask::CTRL)
    }

    pub fn is_named(&self, key: NamedKey) -> bool {
        matches!(self, KeyToken::Named(k) if *k == key)
    }

    /// ASCII digit value for an unmodified digit key.
    pub fn digit(&self) -> Option<u32> {
        self.as_char().and_then(|c| c.to_digit(10))
    }
}

impl From<char> for KeyToken {
    fn from(c: char) -> Self {
        KeyToken::Char(c)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&notation::token_notation(self))
    }
}

/// Physical key press before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    BackTab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
        const SUPER= 0b0000_1000;
    }
}

impl KeyEvent {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::empty())
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.code, self.mods)
    }
}

impl From<KeyEvent> for KeyToken {
    fn from(ev: KeyEvent) -> Self {
        let mut mods = ModMask::empty();
        if ev.mods.contains(KeyModifiers::CTRL) {
            mods |= ModMask::CTRL;
        }
        if ev.mods.contains(KeyModifiers::ALT) {
            mods |= ModMask::ALT;
        }
        if ev.mods.contains(KeyModifiers::SHIFT) {
            mods |= ModMask::SHIFT;
        }
        if ev.mods.contains(KeyModifiers::SUPER) {
            mods |= ModMask::SUPER;
        }
        let base = match ev.code {
            KeyCode::Char(c) => KeyToken::Char(c),
            KeyCode::Enter => KeyToken::Named(NamedKey::Enter),
            KeyCode::Esc => KeyToken::Named(NamedKey::Esc),
            KeyCode::Backspace => KeyToken::Named(NamedKey::Backspace),
            KeyCode::Tab => KeyToken::Named(NamedKey::Tab),
            KeyCode::BackTab => {
                mods |= ModMask::SHIFT;
                KeyToken::Named(NamedKey::Tab)
            }
            KeyCode::Up => KeyToken::Named(NamedKey::Up),
            KeyCode::Down => KeyToken::Named(NamedKey::Down),
            KeyCode::Left => KeyToken::Named(NamedKey::Left),
            KeyCode::Right => KeyToken::Named(NamedKey::Right),
            KeyCode::Home => KeyToken::Named(NamedKey::Home),
            KeyCode::End => KeyToken::Named(NamedKey::End),
            KeyCode::PageUp => KeyToken::Named(NamedKey::PageUp),
            KeyCode::PageDown => KeyToken::Named(NamedKey::PageDown),
            KeyCode::Insert => KeyToken::Named(NamedKey::Insert),
            KeyCode::Delete => KeyToken::Named(NamedKey::Delete),
            KeyCode::F(n) => KeyToken::Named(NamedKey::F(n)),
        };
        KeyToken::chord(base, mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_display() {
        let k = KeyEvent {
            code: KeyCode::Char('x'),
            mods: KeyModifiers::CTRL,
        };
        let s = format!("{}", k);
        assert!(s.contains("Char"));
    }

    #[test]
    fn ctrl_letter_folds_case() {
        let upper = KeyToken::from(KeyEvent::new(
            KeyCode::Char('W'),
            KeyModifiers::CTRL | KeyModifiers::SHIFT,
        ));
        let lower = KeyToken::from(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CTRL));
        assert_eq!(upper, lower);
        assert_eq!(lower, KeyToken::ctrl('w'));
    }

    #[test]
    fn shift_letter_becomes_uppercase_char() {
        let tok = KeyToken::chord(KeyToken::Char('a'), ModMask::SHIFT);
        assert_eq!(tok, KeyToken::Char('A'));
    }

    #[test]
    fn back_tab_is_shift_tab_chord() {
        let tok = KeyToken::from(KeyEvent::new(KeyCode::BackTab, KeyModifiers::empty()));
        match tok {
            KeyToken::Chord { base, mods } => {
                assert_eq!(*base, KeyToken::Named(NamedKey::Tab));
                assert_eq!(mods, ModMask::SHIFT);
            }
            other => panic!("expected chord token, got {:?}", other),
        }
    }

    #[test]
    fn nested_chord_flattens() {
        let inner = KeyToken::chord(KeyToken::Named(NamedKey::Down), ModMask::CTRL);
        let outer = KeyToken::chord(inner, ModMask::ALT);
        assert_eq!(outer.mods(), ModMask::CTRL | ModMask::ALT);
    }

    #[test]
    fn digit_only_for_plain_keys() {
        assert_eq!(KeyToken::Char('7').digit(), Some(7));
        assert_eq!(KeyToken::ctrl('7').digit(), None);
        assert_eq!(KeyToken::Named(NamedKey::Esc).digit(), None);
    }
}
