//! Pattern search over a buffer (`/`, `?`, `n`, `N`, `*`, `#`).

use crate::motion::{CharClass, char_class};
use crate::{Buffer, Position};
use regex::{Regex, RegexBuilder};
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

/// Compile a user pattern. `ignore_case` applies unless the pattern carries an
/// uppercase letter (smartcase).
pub fn compile(pattern: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
    let smart = ignore_case && !pattern.chars().any(char::is_uppercase);
    RegexBuilder::new(pattern).case_insensitive(smart).build()
}

/// Start offset of the next match strictly after (forward) or before
/// (backward) `from`, wrapping around the buffer when `wrap` is set.
pub fn find_next(buf: &Buffer, from: usize, re: &Regex, forward: bool, wrap: bool) -> Option<usize> {
    let text = buf.text();
    let from = from.min(text.len());
    let hit = if forward {
        let step = text[from..].chars().next().map(char::len_utf8).unwrap_or(0);
        let after = from + step;
        re.find_at(&text, after)
            .map(|m| m.start())
            .or_else(|| {
                wrap.then(|| re.find(&text).map(|m| m.start()))
                    .flatten()
                    .filter(|s| *s <= from)
            })
    } else {
        let mut before = None;
        let mut last = None;
        for m in re.find_iter(&text) {
            if m.start() < from {
                before = Some(m.start());
            }
            last = Some(m.start());
        }
        before.or_else(|| if wrap { last.filter(|s| *s >= from) } else { None })
    };
    trace!(target: "text.search", pattern = re.as_str(), from, forward, hit = ?hit, "find_next");
    hit
}

/// Keyword under the caret, or the first keyword after it on the same line.
pub fn word_at(buf: &Buffer, pos: Position) -> Option<String> {
    let content = buf.line_content(pos.line);
    let mut current = String::new();
    for (b, g) in content.grapheme_indices(true) {
        if char_class(g, false) == CharClass::Word {
            current.push_str(g);
            continue;
        }
        // run ended at `b`; take it when the caret sits on or before it
        if !current.is_empty() && b > pos.byte {
            return Some(current);
        }
        current.clear();
    }
    (!current.is_empty()).then_some(current)
}

/// Whole-word, literal pattern for `*` and `#`.
pub fn word_pattern(word: &str) -> String {
    format!(r"\b{}\b", regex::escape(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn forward_search_wraps() {
        let buf = Buffer::from_str("t", "foo bar\nbaz foo\n").unwrap();
        let re = compile("foo", false).unwrap();
        assert_eq!(find_next(&buf, 0, &re, true, true), Some(12));
        assert_eq!(find_next(&buf, 12, &re, true, true), Some(0));
        assert_eq!(find_next(&buf, 12, &re, true, false), None);
    }

    #[test]
    fn backward_search_wraps() {
        let buf = Buffer::from_str("t", "foo bar foo").unwrap();
        let re = compile("foo", false).unwrap();
        assert_eq!(find_next(&buf, 8, &re, false, true), Some(0));
        assert_eq!(find_next(&buf, 0, &re, false, true), Some(8));
        assert_eq!(find_next(&buf, 0, &re, false, false), None);
    }

    #[test]
    fn smartcase_compile() {
        let re = compile("abc", true).unwrap();
        assert!(re.is_match("xABCx"));
        let strict = compile("Abc", true).unwrap();
        assert!(!strict.is_match("abc"));
        assert!(compile("(", false).is_err());
    }

    #[test]
    fn word_under_and_after_caret() {
        let buf = Buffer::from_str("t", "  foo_bar, baz").unwrap();
        assert_eq!(word_at(&buf, Position::new(0, 4)).as_deref(), Some("foo_bar"));
        assert_eq!(word_at(&buf, Position::new(0, 0)).as_deref(), Some("foo_bar"));
        assert_eq!(word_at(&buf, Position::new(0, 9)).as_deref(), Some("baz"));
        let pat = word_pattern("a.b");
        assert_eq!(pat, r"\ba\.b\b");
    }
}
