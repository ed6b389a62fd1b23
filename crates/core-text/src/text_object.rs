//! Text objects: semantic ranges selected with an inner/around scope.
//!
//! Resolution is relative to an absolute caret offset and yields an absolute
//! half-open byte range. Paragraph objects are linewise; every other object is
//! characterwise. `None` means the object does not exist at the caret (the
//! caller treats that as a failed motion).

use crate::motion::{CharClass, char_class};
use crate::{Buffer, Position};
use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextObjectKind {
    Word,
    BigWord,
    Sentence,
    Paragraph,
    /// Quoted string delimited by the given quote character.
    Quote(char),
    /// Bracketed pair given by its opening and closing characters.
    Bracket(char, char),
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectScope {
    Inner,
    Around,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectSpan {
    pub start: usize,
    pub end: usize,
    pub linewise: bool,
}

impl ObjectSpan {
    fn chars(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            linewise: false,
        }
    }
}

impl TextObjectKind {
    /// Stable identifier used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            TextObjectKind::Word => "word",
            TextObjectKind::BigWord => "big-word",
            TextObjectKind::Sentence => "sentence",
            TextObjectKind::Paragraph => "paragraph",
            TextObjectKind::Quote(_) => "quote",
            TextObjectKind::Bracket(..) => "bracket",
            TextObjectKind::Tag => "tag",
        }
    }

    pub fn resolve(
        &self,
        buf: &Buffer,
        caret: usize,
        scope: ObjectScope,
        count: u32,
    ) -> Option<ObjectSpan> {
        let count = count.max(1);
        match *self {
            TextObjectKind::Word => word(buf, caret, scope, count, false),
            TextObjectKind::BigWord => word(buf, caret, scope, count, true),
            TextObjectKind::Sentence => sentence(buf, caret, scope),
            TextObjectKind::Paragraph => paragraph(buf, caret, scope, count),
            TextObjectKind::Quote(q) => quote(buf, caret, scope, q),
            TextObjectKind::Bracket(open, close) => bracket(buf, caret, scope, open, close, count),
            TextObjectKind::Tag => tag(buf, caret, scope, count),
        }
    }
}

fn word(buf: &Buffer, caret: usize, scope: ObjectScope, count: u32, big: bool) -> Option<ObjectSpan> {
    let pos = buf.position_of(caret);
    let content = buf.line_content(pos.line);
    // contiguous class runs on the caret line: (start, end, class)
    let mut runs: Vec<(usize, usize, CharClass)> = Vec::new();
    for (b, g) in content.grapheme_indices(true) {
        let class = char_class(g, big);
        match runs.last_mut() {
            Some(last) if last.2 == class => last.1 = b + g.len(),
            _ => runs.push((b, b + g.len(), class)),
        }
    }
    let r = runs.iter().position(|run| pos.byte < run.1)?;
    let n = count as usize;
    let blank = |i: usize| runs[i].2 == CharClass::Blank;
    let (start, end) = match scope {
        ObjectScope::Inner => {
            let last = (r + n - 1).min(runs.len() - 1);
            (runs[r].0, runs[last].1)
        }
        ObjectScope::Around if blank(r) => {
            let last = (r + 2 * n - 1).min(runs.len() - 1);
            (runs[r].0, runs[last].1)
        }
        ObjectScope::Around => {
            let mut idx = r;
            let mut end = runs[r].1;
            let mut taken = 1;
            let trailing = loop {
                let trailing = idx + 1 < runs.len() && blank(idx + 1);
                if trailing {
                    idx += 1;
                    end = runs[idx].1;
                }
                if taken == n || idx + 1 >= runs.len() {
                    break trailing;
                }
                idx += 1;
                end = runs[idx].1;
                taken += 1;
            };
            let start = if !trailing && r > 0 && blank(r - 1) {
                runs[r - 1].0
            } else {
                runs[r].0
            };
            (start, end)
        }
    };
    let base = buf.line_start_offset(pos.line);
    Some(ObjectSpan::chars(base + start, base + end))
}

fn is_terminal(b: u8) -> bool {
    matches!(b, b'.' | b'!' | b'?')
}

fn sentence(buf: &Buffer, caret: usize, scope: ObjectScope) -> Option<ObjectSpan> {
    let text = buf.text();
    let t = text.as_bytes();
    if t.is_empty() {
        return None;
    }
    let caret = caret.min(t.len() - 1);
    let mut k = caret;
    while k > 0 {
        let p = k - 1;
        if t[p] == b'\n' && (p == 0 || t[p - 1] == b'\n') {
            break;
        }
        if is_terminal(t[p]) && t[k].is_ascii_whitespace() && p < caret {
            break;
        }
        k -= 1;
    }
    while k < caret && t[k].is_ascii_whitespace() {
        k += 1;
    }
    let start = k;
    let mut j = caret;
    let mut end = t.len();
    while j < t.len() {
        if is_terminal(t[j]) && (j + 1 == t.len() || t[j + 1].is_ascii_whitespace()) {
            end = j + 1;
            break;
        }
        if t[j] == b'\n' && (j + 1 == t.len() || t[j + 1] == b'\n') {
            end = j;
            break;
        }
        j += 1;
    }
    if end <= start {
        return None;
    }
    match scope {
        ObjectScope::Inner => Some(ObjectSpan::chars(start, end)),
        ObjectScope::Around => {
            let mut e = end;
            while e < t.len() && matches!(t[e], b' ' | b'\t') {
                e += 1;
            }
            let mut s = start;
            if e == end {
                while s > 0 && matches!(t[s - 1], b' ' | b'\t') {
                    s -= 1;
                }
            }
            Some(ObjectSpan::chars(s, e))
        }
    }
}

fn paragraph(buf: &Buffer, caret: usize, scope: ObjectScope, count: u32) -> Option<ObjectSpan> {
    let last = buf.last_line();
    let line = buf.position_of(caret).line.min(last);
    let extent = |from: usize| -> usize {
        let blank = buf.is_blank_line(from);
        let mut l = from;
        while l < last && buf.is_blank_line(l + 1) == blank {
            l += 1;
        }
        l
    };
    let mut first = line;
    let blank = buf.is_blank_line(line);
    while first > 0 && buf.is_blank_line(first - 1) == blank {
        first -= 1;
    }
    let mut end_line = extent(line);
    let mut blocks = 1;
    let wanted = match scope {
        ObjectScope::Inner => count,
        ObjectScope::Around => count * 2,
    };
    while blocks < wanted && end_line < last {
        end_line = extent(end_line + 1);
        blocks += 1;
    }
    if scope == ObjectScope::Around && blocks < wanted && !blank {
        // no trailing blank lines: take the blank lines above instead
        while first > 0 && buf.is_blank_line(first - 1) {
            first -= 1;
        }
    }
    Some(ObjectSpan {
        start: buf.line_start_offset(first),
        end: buf.line_end_offset_inclusive(end_line),
        linewise: true,
    })
}

fn quote(buf: &Buffer, caret: usize, scope: ObjectScope, q: char) -> Option<ObjectSpan> {
    let pos = buf.position_of(caret);
    let content = buf.line_content(pos.line);
    let mut marks = Vec::new();
    let mut escaped = false;
    for (i, c) in content.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == q {
            marks.push(i);
        }
    }
    let pairs: Vec<(usize, usize)> = marks.chunks_exact(2).map(|p| (p[0], p[1])).collect();
    let (open, close) = pairs
        .iter()
        .copied()
        .find(|(a, b)| *a <= pos.byte && pos.byte <= *b)
        .or_else(|| pairs.iter().copied().find(|(a, _)| *a > pos.byte))?;
    let qlen = q.len_utf8();
    let (start, end) = match scope {
        ObjectScope::Inner => (open + qlen, close),
        ObjectScope::Around => {
            let bytes = content.as_bytes();
            let mut e = close + qlen;
            while e < bytes.len() && matches!(bytes[e], b' ' | b'\t') {
                e += 1;
            }
            let mut s = open;
            if e == close + qlen {
                while s > 0 && matches!(bytes[s - 1], b' ' | b'\t') {
                    s -= 1;
                }
            }
            (s, e)
        }
    };
    let base = buf.line_start_offset(pos.line);
    Some(ObjectSpan::chars(base + start, base + end))
}

fn enclosing_open(t: &[u8], from: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=from.min(t.len().checked_sub(1)?)).rev() {
        if t[i] == close && i != from {
            depth += 1;
        } else if t[i] == open {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

fn matching_close(t: &[u8], open_at: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in t.iter().enumerate().skip(open_at) {
        if *b == open {
            depth += 1;
        } else if *b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn bracket(
    buf: &Buffer,
    caret: usize,
    scope: ObjectScope,
    open: char,
    close: char,
    count: u32,
) -> Option<ObjectSpan> {
    if !open.is_ascii() || !close.is_ascii() {
        return None;
    }
    let (o, c) = (open as u8, close as u8);
    let text = buf.text();
    let t = text.as_bytes();
    let mut at = enclosing_open(t, caret, o, c)?;
    for _ in 1..count {
        at = enclosing_open(t, at.checked_sub(1)?, o, c)?;
    }
    let end = matching_close(t, at, o, c)?;
    match scope {
        ObjectScope::Inner => Some(ObjectSpan::chars(at + 1, end)),
        ObjectScope::Around => Some(ObjectSpan::chars(at, end + 1)),
    }
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/)?([A-Za-z][\w:.-]*)[^<>]*?(/)?>").unwrap_or_else(|e| panic!("tag pattern: {e}"))
});

fn tag(buf: &Buffer, caret: usize, scope: ObjectScope, count: u32) -> Option<ObjectSpan> {
    let text = buf.text();
    let mut stack: Vec<(String, usize, usize)> = Vec::new();
    // (open_start, open_end, close_start, close_end)
    let mut pairs: Vec<(usize, usize, usize, usize)> = Vec::new();
    for cap in TAG_RE.captures_iter(&text) {
        let Some(whole) = cap.get(0) else { continue };
        let name = cap.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        if cap.get(3).is_some() {
            continue;
        }
        if cap.get(1).is_some() {
            if let Some(idx) = stack.iter().rposition(|(n, _, _)| *n == name) {
                let (_, os, oe) = stack[idx].clone();
                stack.truncate(idx);
                pairs.push((os, oe, whole.start(), whole.end()));
            }
        } else {
            stack.push((name, whole.start(), whole.end()));
        }
    }
    let mut containing: Vec<_> = pairs
        .into_iter()
        .filter(|(os, _, _, ce)| *os <= caret && caret < *ce)
        .collect();
    containing.sort_by(|a, b| b.0.cmp(&a.0));
    let (os, oe, cs, ce) = *containing.get(count as usize - 1)?;
    match scope {
        ObjectScope::Inner => Some(ObjectSpan::chars(oe, cs)),
        ObjectScope::Around => Some(ObjectSpan::chars(os, ce)),
    }
}

/// Absolute caret helper for callers holding a `Position`.
pub fn resolve_at(
    buf: &Buffer,
    caret: Position,
    kind: TextObjectKind,
    scope: ObjectScope,
    count: u32,
) -> Option<ObjectSpan> {
    kind.resolve(buf, buf.offset_of(caret), scope, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(text: &str, caret: usize, kind: TextObjectKind, scope: ObjectScope) -> Option<String> {
        let buf = Buffer::from_str("t", text).unwrap();
        kind.resolve(&buf, caret, scope, 1)
            .map(|s| buf.slice_bytes(s.start, s.end))
    }

    #[test]
    fn inner_and_around_word() {
        let t = "one two  three";
        assert_eq!(sel(t, 5, TextObjectKind::Word, ObjectScope::Inner).as_deref(), Some("two"));
        assert_eq!(sel(t, 5, TextObjectKind::Word, ObjectScope::Around).as_deref(), Some("two  "));
        // last word has no trailing blanks: leading blanks are taken instead
        assert_eq!(sel(t, 10, TextObjectKind::Word, ObjectScope::Around).as_deref(), Some("  three"));
        // on blanks: inner selects the blank run
        assert_eq!(sel(t, 7, TextObjectKind::Word, ObjectScope::Inner).as_deref(), Some("  "));
    }

    #[test]
    fn word_count_extends_runs() {
        let buf = Buffer::from_str("t", "a b c d").unwrap();
        let s = TextObjectKind::Word.resolve(&buf, 0, ObjectScope::Inner, 3).unwrap();
        assert_eq!(buf.slice_bytes(s.start, s.end), "a b");
        let a = TextObjectKind::Word.resolve(&buf, 0, ObjectScope::Around, 2).unwrap();
        assert_eq!(buf.slice_bytes(a.start, a.end), "a b ");
    }

    #[test]
    fn big_word_includes_punctuation() {
        let t = "x foo.bar y";
        assert_eq!(sel(t, 3, TextObjectKind::Word, ObjectScope::Inner).as_deref(), Some("foo"));
        assert_eq!(sel(t, 3, TextObjectKind::BigWord, ObjectScope::Inner).as_deref(), Some("foo.bar"));
    }

    #[test]
    fn word_on_empty_line_is_missing() {
        assert_eq!(sel("a\n\nb", 2, TextObjectKind::Word, ObjectScope::Inner), None);
    }

    #[test]
    fn quotes_inner_and_around() {
        let t = r#"say "hi \"x\" there" now"#;
        assert_eq!(
            sel(t, 6, TextObjectKind::Quote('"'), ObjectScope::Inner).as_deref(),
            Some(r#"hi \"x\" there"#)
        );
        assert_eq!(
            sel(t, 6, TextObjectKind::Quote('"'), ObjectScope::Around).as_deref(),
            Some(r#""hi \"x\" there" "#)
        );
        // caret before the first quote selects the next string on the line
        assert_eq!(
            sel(t, 0, TextObjectKind::Quote('"'), ObjectScope::Inner).as_deref(),
            Some(r#"hi \"x\" there"#)
        );
        assert_eq!(sel("no quotes", 0, TextObjectKind::Quote('\''), ObjectScope::Inner), None);
    }

    #[test]
    fn brackets_nested_and_counted() {
        let t = "f(a, [b, (c)], d)";
        let paren = TextObjectKind::Bracket('(', ')');
        assert_eq!(sel(t, 10, paren, ObjectScope::Inner).as_deref(), Some("c"));
        assert_eq!(sel(t, 3, paren, ObjectScope::Around).as_deref(), Some("(a, [b, (c)], d)"));
        let buf = Buffer::from_str("t", t).unwrap();
        let outer = paren.resolve(&buf, 10, ObjectScope::Inner, 2).unwrap();
        assert_eq!(buf.slice_bytes(outer.start, outer.end), "a, [b, (c)], d");
        // caret on the closing bracket still selects its pair
        assert_eq!(sel(t, 16, paren, ObjectScope::Inner).as_deref(), Some("a, [b, (c)], d"));
        assert_eq!(sel("abc", 1, paren, ObjectScope::Inner), None);
    }

    #[test]
    fn paragraph_inner_and_around_are_linewise() {
        let t = "a\nb\n\n\nc\n";
        let buf = Buffer::from_str("t", t).unwrap();
        let ip = TextObjectKind::Paragraph.resolve(&buf, 0, ObjectScope::Inner, 1).unwrap();
        assert!(ip.linewise);
        assert_eq!(buf.slice_bytes(ip.start, ip.end), "a\nb\n");
        let ap = TextObjectKind::Paragraph.resolve(&buf, 0, ObjectScope::Around, 1).unwrap();
        assert_eq!(buf.slice_bytes(ap.start, ap.end), "a\nb\n\n\n");
        // last paragraph has no trailing blank lines: take those above
        let last = TextObjectKind::Paragraph.resolve(&buf, 6, ObjectScope::Around, 1).unwrap();
        assert_eq!(buf.slice_bytes(last.start, last.end), "\n\nc\n");
    }

    #[test]
    fn sentences() {
        let t = "One two. Three four! Five";
        assert_eq!(sel(t, 11, TextObjectKind::Sentence, ObjectScope::Inner).as_deref(), Some("Three four!"));
        assert_eq!(sel(t, 11, TextObjectKind::Sentence, ObjectScope::Around).as_deref(), Some("Three four! "));
        assert_eq!(sel(t, 0, TextObjectKind::Sentence, ObjectScope::Inner).as_deref(), Some("One two."));
        assert_eq!(sel(t, 22, TextObjectKind::Sentence, ObjectScope::Inner).as_deref(), Some("Five"));
    }

    #[test]
    fn tags_inner_and_around() {
        let t = "<div><p>hi <b>there</b></p></div>";
        assert_eq!(sel(t, 15, TextObjectKind::Tag, ObjectScope::Inner).as_deref(), Some("there"));
        assert_eq!(sel(t, 9, TextObjectKind::Tag, ObjectScope::Inner).as_deref(), Some("hi <b>there</b>"));
        assert_eq!(sel(t, 9, TextObjectKind::Tag, ObjectScope::Around).as_deref(), Some("<p>hi <b>there</b></p>"));
        let buf = Buffer::from_str("t", t).unwrap();
        let outer = TextObjectKind::Tag.resolve(&buf, 15, ObjectScope::Inner, 3).unwrap();
        assert_eq!(buf.slice_bytes(outer.start, outer.end), "<p>hi <b>there</b></p>");
    }

    #[test]
    fn resolve_at_uses_position() {
        let buf = Buffer::from_str("t", "x\nfoo bar").unwrap();
        let s = resolve_at(&buf, Position::new(1, 5), TextObjectKind::Word, ObjectScope::Inner, 1).unwrap();
        assert_eq!(buf.slice_bytes(s.start, s.end), "bar");
    }
}
