use core_events::{KeyCode, KeyEvent, KeyModifiers, KeyToken};
use crossterm::event::{
    KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyEventKind as CKeyEventKind,
    KeyModifiers as CKeyModifiers,
};
use tracing::trace;

/// Map a crossterm key event into a physical [`KeyEvent`].
///
/// Returns `None` for release events and key codes without a notation
/// (media keys, lone modifiers, lock keys).
pub fn map_key_event(event: &CKeyEvent) -> Option<KeyEvent> {
    if matches!(event.kind, CKeyEventKind::Release) {
        return None;
    }
    let code = match event.code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::BackTab => KeyCode::BackTab,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::Insert => KeyCode::Insert,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::F(n) if (1..=12).contains(&n) => KeyCode::F(n),
        other => {
            trace!(target: "input.key", code = ?other, "unmapped_key_code");
            return None;
        }
    };
    Some(KeyEvent::new(code, map_mods(event.modifiers)))
}

/// Convert crossterm modifier flags into engine modifier bits. `META` folds into
/// `ALT`, matching how notation treats `<M-x>`.
pub fn map_mods(mods: CKeyModifiers) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if mods.contains(CKeyModifiers::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if mods.intersects(CKeyModifiers::ALT | CKeyModifiers::META) {
        out |= KeyModifiers::ALT;
    }
    if mods.contains(CKeyModifiers::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    if mods.contains(CKeyModifiers::SUPER) {
        out |= KeyModifiers::SUPER;
    }
    out
}

/// Normalized token for a crossterm key event.
pub fn token_for(event: &CKeyEvent) -> Option<KeyToken> {
    map_key_event(event).map(KeyToken::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{NamedKey, to_notation};
    use crossterm::event::KeyEventState as CKeyEventState;

    fn key_event(code: CKeyCode, modifiers: CKeyModifiers, kind: CKeyEventKind) -> CKeyEvent {
        CKeyEvent {
            code,
            modifiers,
            kind,
            state: CKeyEventState::empty(),
        }
    }

    #[test]
    fn maps_basic_char() {
        let ev = key_event(
            CKeyCode::Char('a'),
            CKeyModifiers::NONE,
            CKeyEventKind::Press,
        );
        assert_eq!(token_for(&ev), Some(KeyToken::Char('a')));
    }

    #[test]
    fn maps_named_key() {
        let ev = key_event(CKeyCode::Enter, CKeyModifiers::NONE, CKeyEventKind::Press);
        assert_eq!(token_for(&ev), Some(KeyToken::Named(NamedKey::Enter)));
    }

    #[test]
    fn release_is_dropped_repeat_is_kept() {
        let release = key_event(
            CKeyCode::Char('j'),
            CKeyModifiers::NONE,
            CKeyEventKind::Release,
        );
        assert_eq!(token_for(&release), None);
        let repeat = key_event(
            CKeyCode::Char('j'),
            CKeyModifiers::NONE,
            CKeyEventKind::Repeat,
        );
        assert_eq!(token_for(&repeat), Some(KeyToken::Char('j')));
    }

    #[test]
    fn ctrl_shift_letter_renders_lowercase_notation() {
        let ev = key_event(
            CKeyCode::Char('W'),
            CKeyModifiers::CONTROL | CKeyModifiers::SHIFT,
            CKeyEventKind::Press,
        );
        let tok = token_for(&ev).expect("ctrl-shift-w should map");
        assert_eq!(to_notation(&[tok]), "<C-w>");
    }

    #[test]
    fn meta_folds_into_alt() {
        let ev = key_event(
            CKeyCode::Char('x'),
            CKeyModifiers::META,
            CKeyEventKind::Press,
        );
        let tok = token_for(&ev).expect("meta-x should map");
        assert_eq!(to_notation(&[tok]), "<A-x>");
    }

    #[test]
    fn media_keys_have_no_token() {
        let ev = key_event(CKeyCode::CapsLock, CKeyModifiers::NONE, CKeyEventKind::Press);
        assert_eq!(token_for(&ev), None);
    }
}
