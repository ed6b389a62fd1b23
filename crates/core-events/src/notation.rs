//! Textual key notation.
//!
//! Grammar: a notation string is a sequence of plain characters and bracketed
//! key names. Bracketed names are case-insensitive and may carry modifier
//! prefixes (`C-`, `A-`/`M-`, `S-`, `D-`) in any order: `<Esc>`, `<c-W>`,
//! `<S-Tab>`, `<C-A-Down>`. A `<` that does not open a well-formed bracket
//! (no closing `>` or whitespace before it) is the literal `<`.
//!
//! Canonical output always folds control letters to lower case and orders
//! modifiers C, A, S, D. `<` and space render as `<lt>` and `<Space>` so that
//! any rendered string tokenizes back to the same tokens.

use crate::{KeyToken, ModMask, NamedKey};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("empty key name in `<>`")]
    Empty,
    #[error("unknown key name `<{0}>`")]
    UnknownKey(String),
    #[error("unknown modifier `{0}` in `<{1}>`")]
    UnknownModifier(String, String),
}

/// Lazy tokenizer over a notation string.
///
/// Finite and restartable only by calling [`tokenize`] again; once an error is
/// yielded the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
    failed: bool,
}

pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        rest: text,
        failed: false,
    }
}

/// Eagerly tokenize a whole notation string.
pub fn parse_notation(text: &str) -> Result<Vec<KeyToken>, NotationError> {
    tokenize(text).collect()
}

/// Render a token slice back to canonical notation.
pub fn to_notation(tokens: &[KeyToken]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(&token_notation(t));
    }
    out
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<KeyToken, NotationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut chars = self.rest.chars();
        let first = chars.next()?;
        if first == '<'
            && let Some(close) = bracket_end(self.rest)
        {
            let inner = &self.rest[1..close];
            self.rest = &self.rest[close + 1..];
            let res = parse_bracketed(inner);
            if res.is_err() {
                self.failed = true;
            }
            trace!(target: "input.notation", name = inner, ok = res.is_ok(), "bracketed_token");
            return Some(res);
        }
        self.rest = chars.as_str();
        Some(Ok(KeyToken::Char(first)))
    }
}

/// Byte index of the `>` closing a bracket that starts at index 0, if the
/// bracket is well formed (non-whitespace body, `>` present). `<>>` style
/// bodies are accepted only for the single char `>` after a modifier, e.g. `<S->>`.
fn bracket_end(s: &str) -> Option<usize> {
    let body = &s[1..];
    for (i, c) in body.char_indices() {
        if c == '>' {
            if i == 0 {
                return None;
            }
            // `<C->>` : modifier prefix followed by a literal '>'
            if body[..i].ends_with('-') && body[i + 1..].starts_with('>') {
                return Some(i + 2);
            }
            return Some(i + 1);
        }
        if c.is_whitespace() || c == '<' {
            return None;
        }
    }
    None
}

fn parse_bracketed(inner: &str) -> Result<KeyToken, NotationError> {
    if inner.is_empty() {
        return Err(NotationError::Empty);
    }
    let mut mods = ModMask::empty();
    let mut rest = inner;
    // Peel `X-` prefixes while something non-empty follows the dash.
    loop {
        let mut it = rest.char_indices();
        match (it.next(), it.next()) {
            (Some((_, m)), Some((dash, '-'))) if rest.len() > dash + 1 => {
                let flag = match m.to_ascii_lowercase() {
                    'c' => ModMask::CTRL,
                    'a' | 'm' => ModMask::ALT,
                    's' => ModMask::SHIFT,
                    'd' => ModMask::SUPER,
                    _ => {
                        return Err(NotationError::UnknownModifier(
                            m.to_string(),
                            inner.to_string(),
                        ));
                    }
                };
                mods |= flag;
                rest = &rest[dash + 1..];
            }
            _ => break,
        }
    }
    let base = key_name(rest).ok_or_else(|| NotationError::UnknownKey(inner.to_string()))?;
    if mods.is_empty() && matches!(base, KeyToken::Char(c) if c != ' ' && c != '<' && c != '|' && c != '\\')
    {
        // `<x>` with no modifiers is not a key name
        return Err(NotationError::UnknownKey(inner.to_string()));
    }
    Ok(KeyToken::chord(base, mods))
}

fn key_name(name: &str) -> Option<KeyToken> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyToken::Char(c));
    }
    let lower = name.to_ascii_lowercase();
    let named = match lower.as_str() {
        "esc" => NamedKey::Esc,
        "cr" | "enter" | "return" => NamedKey::Enter,
        "bs" | "backspace" => NamedKey::Backspace,
        "tab" => NamedKey::Tab,
        "del" | "delete" => NamedKey::Delete,
        "insert" | "ins" => NamedKey::Insert,
        "up" => NamedKey::Up,
        "down" => NamedKey::Down,
        "left" => NamedKey::Left,
        "right" => NamedKey::Right,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "pageup" => NamedKey::PageUp,
        "pagedown" => NamedKey::PageDown,
        "space" => return Some(KeyToken::Char(' ')),
        "lt" => return Some(KeyToken::Char('<')),
        "bar" => return Some(KeyToken::Char('|')),
        "bslash" => return Some(KeyToken::Char('\\')),
        f if f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            NamedKey::F(n)
        }
        _ => return None,
    };
    Some(KeyToken::Named(named))
}

fn named_str(key: NamedKey) -> String {
    match key {
        NamedKey::Enter => "CR".into(),
        NamedKey::Esc => "Esc".into(),
        NamedKey::Backspace => "BS".into(),
        NamedKey::Tab => "Tab".into(),
        NamedKey::F(n) => format!("F{n}"),
        NamedKey::Up => "Up".into(),
        NamedKey::Down => "Down".into(),
        NamedKey::Left => "Left".into(),
        NamedKey::Right => "Right".into(),
        NamedKey::Home => "Home".into(),
        NamedKey::End => "End".into(),
        NamedKey::PageUp => "PageUp".into(),
        NamedKey::PageDown => "PageDown".into(),
        NamedKey::Insert => "Insert".into(),
        NamedKey::Delete => "Del".into(),
    }
}

fn base_name(token: &KeyToken) -> String {
    match token {
        KeyToken::Char(' ') => "Space".into(),
        KeyToken::Char('<') => "lt".into(),
        KeyToken::Char(c) => c.to_string(),
        KeyToken::Named(n) => named_str(*n),
        KeyToken::Chord { base, .. } => base_name(base),
    }
}

pub(crate) fn token_notation(token: &KeyToken) -> String {
    match token {
        KeyToken::Char(' ') => "<Space>".into(),
        KeyToken::Char('<') => "<lt>".into(),
        KeyToken::Char(c) => c.to_string(),
        KeyToken::Named(n) => format!("<{}>", named_str(*n)),
        KeyToken::Chord { base, mods } => {
            let mut prefix = String::new();
            for (flag, tag) in [
                (ModMask::CTRL, "C-"),
                (ModMask::ALT, "A-"),
                (ModMask::SHIFT, "S-"),
                (ModMask::SUPER, "D-"),
            ] {
                if mods.contains(flag) {
                    prefix.push_str(tag);
                }
            }
            format!("<{}{}>", prefix, base_name(base))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn toks(s: &str) -> Vec<KeyToken> {
        parse_notation(s).unwrap()
    }

    #[test]
    fn plain_characters() {
        assert_eq!(
            toks("dw"),
            vec![KeyToken::Char('d'), KeyToken::Char('w')]
        );
    }

    #[test]
    fn control_synonyms_normalize() {
        assert_eq!(toks("<C-w>"), toks("<c-W>"));
        assert_eq!(toks("<C-W>"), vec![KeyToken::ctrl('w')]);
        assert_eq!(to_notation(&toks("<c-W>")), "<C-w>");
    }

    #[test]
    fn named_keys_and_aliases() {
        assert_eq!(toks("<Esc>"), vec![KeyToken::Named(NamedKey::Esc)]);
        assert_eq!(toks("<enter>"), toks("<CR>"));
        assert_eq!(toks("<Return>"), toks("<cr>"));
        assert_eq!(toks("<F12>"), vec![KeyToken::Named(NamedKey::F(12))]);
        assert_eq!(toks("<Space>"), vec![KeyToken::Char(' ')]);
        assert_eq!(toks("<lt>"), vec![KeyToken::Char('<')]);
    }

    #[test]
    fn stray_angle_is_literal() {
        assert_eq!(
            toks("a<b c"),
            vec![
                KeyToken::Char('a'),
                KeyToken::Char('<'),
                KeyToken::Char('b'),
                KeyToken::Char(' '),
                KeyToken::Char('c'),
            ]
        );
        assert_eq!(toks("<"), vec![KeyToken::Char('<')]);
        assert_eq!(toks("<<"), vec![KeyToken::Char('<'), KeyToken::Char('<')]);
    }

    #[test]
    fn modifier_order_is_canonical() {
        let t = toks("<S-C-Up>");
        assert_eq!(to_notation(&t), "<C-S-Up>");
        let alt = toks("<M-x>");
        assert_eq!(to_notation(&alt), "<A-x>");
    }

    #[test]
    fn unknown_names_are_errors() {
        assert_eq!(
            parse_notation("<Nope>"),
            Err(NotationError::UnknownKey("Nope".into()))
        );
        assert!(matches!(
            parse_notation("<Q-x>"),
            Err(NotationError::UnknownModifier(_, _))
        ));
        assert!(matches!(parse_notation("<x>"), Err(NotationError::UnknownKey(_))));
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut it = tokenize("a<Bogus>b");
        assert_eq!(it.next(), Some(Ok(KeyToken::Char('a'))));
        assert!(matches!(it.next(), Some(Err(_))));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn ctrl_angle_bracket() {
        let t = toks("<C->>");
        assert_eq!(t, vec![KeyToken::chord(KeyToken::Char('>'), ModMask::CTRL)]);
    }

    fn arb_token() -> impl Strategy<Value = KeyToken> {
        let plain = proptest::char::range(' ', '~').prop_map(KeyToken::Char);
        let named = prop_oneof![
            Just(NamedKey::Esc),
            Just(NamedKey::Enter),
            Just(NamedKey::Backspace),
            Just(NamedKey::Tab),
            Just(NamedKey::Up),
            Just(NamedKey::Delete),
            (1u8..=12).prop_map(NamedKey::F),
        ]
        .prop_map(KeyToken::Named);
        let ctrl = proptest::char::range('a', 'z').prop_map(KeyToken::ctrl);
        prop_oneof![plain, named, ctrl]
    }

    proptest! {
        #[test]
        fn rendered_notation_tokenizes_back(tokens in proptest::collection::vec(arb_token(), 0..16)) {
            let text = to_notation(&tokens);
            prop_assert_eq!(parse_notation(&text).unwrap(), tokens);
        }
    }
}
