//! Cursor motion geometry.
//!
//! These operate purely on a `Buffer` + `Position` pair and are free of editor
//! state. Each function performs a single step; callers apply counts. Word
//! motions treat the end of every line as a virtual newline cell and stop on
//! empty lines, matching vi.

use crate::{Buffer, Position, grapheme};
use unicode_segmentation::UnicodeSegmentation;

/// Character class used by word motions. `big` (WORD) motions fold
/// punctuation into `Word`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Blank,
    Word,
    Punct,
    Eol,
}

pub fn char_class(g: &str, big: bool) -> CharClass {
    match g.chars().next() {
        None => CharClass::Eol,
        Some(c) if c.is_whitespace() => CharClass::Blank,
        Some(_) if big => CharClass::Word,
        Some(c) if c == '_' || c.is_alphanumeric() => CharClass::Word,
        Some(_) => CharClass::Punct,
    }
}

/// Normalize a position for Normal-mode semantics: a caret resting past the last
/// grapheme of a non-empty line is pulled back onto that grapheme. Lines past the
/// last content line clamp to it.
pub fn normalize_normal_mode_position(buf: &Buffer, pos: &mut Position) {
    if pos.line > buf.last_line() {
        pos.line = buf.last_line();
    }
    let content = buf.line_content(pos.line);
    if pos.byte >= content.len() {
        pos.byte = grapheme::last_boundary(&content);
    }
}

/// Move left one grapheme boundary. Returns false at column 0.
pub fn left(buf: &Buffer, pos: &mut Position) -> bool {
    if pos.byte == 0 {
        return false;
    }
    let content = buf.line_content(pos.line);
    pos.byte = grapheme::prev_boundary(&content, pos.byte.min(content.len()));
    true
}

/// Move right one grapheme boundary. With `allow_eol` the caret may land just
/// past the last grapheme (Insert mode / exclusive operator targets).
pub fn right(buf: &Buffer, pos: &mut Position, allow_eol: bool) -> bool {
    let content = buf.line_content(pos.line);
    let next = grapheme::next_boundary(&content, pos.byte);
    if next == pos.byte || (!allow_eol && next >= content.len()) {
        return false;
    }
    pos.byte = next;
    true
}

/// Move to start of line.
pub fn line_start(pos: &mut Position) {
    pos.byte = 0;
}

/// Move to end of line (just past the last grapheme).
pub fn line_end(buf: &Buffer, pos: &mut Position) {
    pos.byte = buf.line_byte_len(pos.line);
}

/// Position of the first non-blank grapheme on `line` (line end when all blank).
pub fn first_non_blank(buf: &Buffer, line: usize) -> Position {
    let content = buf.line_content(line);
    let byte = content
        .grapheme_indices(true)
        .find(|(_, g)| !g.chars().all(char::is_whitespace))
        .map(|(b, _)| b)
        .unwrap_or(content.len());
    Position::new(line, byte)
}

/// Move up one line preserving a target visual column (sticky). Returns the updated sticky column.
/// Caller should maintain the returned sticky column across successive vertical motions. If `sticky_col`
/// is `None`, it will be computed from the current position's visual column.
pub fn up(
    buf: &Buffer,
    pos: &mut Position,
    sticky_col: Option<usize>,
    allow_eol: bool,
) -> Option<usize> {
    if pos.line == 0 {
        return sticky_col;
    }
    let sticky = sticky_col.unwrap_or_else(|| current_col(buf, pos));
    pos.line -= 1;
    pos.byte = grapheme::byte_for_visual_col(&buf.line_content(pos.line), sticky, allow_eol);
    Some(sticky)
}

/// Move down one line preserving sticky visual column.
pub fn down(
    buf: &Buffer,
    pos: &mut Position,
    sticky_col: Option<usize>,
    allow_eol: bool,
) -> Option<usize> {
    if pos.line >= buf.last_line() {
        return sticky_col;
    }
    let sticky = sticky_col.unwrap_or_else(|| current_col(buf, pos));
    pos.line += 1;
    pos.byte = grapheme::byte_for_visual_col(&buf.line_content(pos.line), sticky, allow_eol);
    Some(sticky)
}

/// Visual column of the caret, used to seed a sticky column.
pub fn current_col(buf: &Buffer, pos: &Position) -> usize {
    grapheme::visual_col(&buf.line_content(pos.line), pos.byte)
}

/// Cluster cursor spanning lines. The end of each line is an `Eol` cell.
#[derive(Clone)]
struct Walker<'a> {
    buf: &'a Buffer,
    last_line: usize,
    line: usize,
    content: String,
    byte: usize,
    big: bool,
}

impl<'a> Walker<'a> {
    fn new(buf: &'a Buffer, pos: Position, big: bool) -> Self {
        let last_line = buf.last_line();
        let line = pos.line.min(last_line);
        let content = buf.line_content(line);
        let byte = pos.byte.min(content.len());
        Self {
            buf,
            last_line,
            line,
            content,
            byte,
            big,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.byte)
    }

    fn class(&self) -> CharClass {
        if self.byte >= self.content.len() {
            return CharClass::Eol;
        }
        let next = grapheme::next_boundary(&self.content, self.byte);
        char_class(&self.content[self.byte..next], self.big)
    }

    fn on_empty_line(&self) -> bool {
        self.content.is_empty()
    }

    fn forward(&mut self) -> bool {
        if self.byte < self.content.len() {
            self.byte = grapheme::next_boundary(&self.content, self.byte);
            return true;
        }
        if self.line >= self.last_line {
            return false;
        }
        self.line += 1;
        self.content = self.buf.line_content(self.line);
        self.byte = 0;
        true
    }

    fn backward(&mut self) -> bool {
        if self.byte > 0 {
            self.byte = grapheme::prev_boundary(&self.content, self.byte);
            return true;
        }
        if self.line == 0 {
            return false;
        }
        self.line -= 1;
        self.content = self.buf.line_content(self.line);
        self.byte = self.content.len();
        true
    }
}

/// Move forward to the start of the next word (`w` / `W`). At the last word the
/// caret lands at the end of the buffer.
pub fn word_forward(buf: &Buffer, pos: &mut Position, big: bool) {
    let origin = *pos;
    let mut w = Walker::new(buf, *pos, big);
    let start = w.class();
    if matches!(start, CharClass::Word | CharClass::Punct) {
        while w.class() == start {
            if !w.forward() {
                *pos = w.pos();
                return;
            }
        }
    }
    loop {
        match w.class() {
            CharClass::Eol => {
                if w.on_empty_line() && w.pos() != origin {
                    break;
                }
                if !w.forward() {
                    break;
                }
            }
            CharClass::Blank => {
                if !w.forward() {
                    break;
                }
            }
            _ => break,
        }
    }
    *pos = w.pos();
}

/// Move backward to the start of the previous word (`b` / `B`).
pub fn word_backward(buf: &Buffer, pos: &mut Position, big: bool) {
    let mut w = Walker::new(buf, *pos, big);
    if !w.backward() {
        return;
    }
    loop {
        match w.class() {
            CharClass::Eol if w.on_empty_line() => {
                *pos = w.pos();
                return;
            }
            CharClass::Eol | CharClass::Blank => {
                if !w.backward() {
                    *pos = w.pos();
                    return;
                }
            }
            _ => break,
        }
    }
    let class = w.class();
    loop {
        let mut prev = w.clone();
        if !prev.backward() || prev.class() != class {
            break;
        }
        w = prev;
    }
    *pos = w.pos();
}

/// Move forward to the end of the current or next word (`e` / `E`).
pub fn word_end(buf: &Buffer, pos: &mut Position, big: bool) {
    let mut w = Walker::new(buf, *pos, big);
    if !w.forward() {
        return;
    }
    while matches!(w.class(), CharClass::Blank | CharClass::Eol) {
        if !w.forward() {
            *pos = w.pos();
            return;
        }
    }
    let class = w.class();
    loop {
        let mut next = w.clone();
        if !next.forward() || next.class() != class {
            break;
        }
        w = next;
    }
    *pos = w.pos();
}

/// Search the caret line for the `count`-th occurrence of `target` (`f F t T`).
///
/// `till` stops one grapheme short of the match. With `skip_adjacent` a till
/// search ignores a match directly next to the caret, so repeating `t` makes
/// progress. Returns `None` when the line holds fewer than `count` matches.
pub fn find_in_line(
    buf: &Buffer,
    pos: Position,
    target: char,
    forward: bool,
    till: bool,
    count: u32,
    skip_adjacent: bool,
) -> Option<Position> {
    let content = buf.line_content(pos.line);
    let clusters: Vec<(usize, &str)> = content.grapheme_indices(true).collect();
    let here = clusters.iter().position(|(b, _)| *b >= pos.byte)?;
    let want = target.to_string();
    let mut remaining = count.max(1);
    let hit = if forward {
        let start = here + if till && skip_adjacent { 2 } else { 1 };
        (start..clusters.len()).find(|&i| {
            if clusters[i].1 == want {
                remaining -= 1;
                remaining == 0
            } else {
                false
            }
        })?
    } else {
        let skip = if till && skip_adjacent { 2 } else { 1 };
        let end = here.checked_sub(skip - 1)?;
        (0..end).rev().find(|&i| {
            if clusters[i].1 == want {
                remaining -= 1;
                remaining == 0
            } else {
                false
            }
        })?
    };
    let idx = match (till, forward) {
        (false, _) => hit,
        (true, true) => hit - 1,
        (true, false) => hit + 1,
    };
    Some(Position::new(pos.line, clusters[idx].0))
}

const PAIRS: [(u8, u8); 3] = [(b'(', b')'), (b'[', b']'), (b'{', b'}')];

/// Jump to the bracket matching the first bracket at or after the caret on its
/// line (`%`).
pub fn match_pair(buf: &Buffer, pos: Position) -> Option<Position> {
    let content = buf.line_content(pos.line);
    let (rel, ch) = content
        .bytes()
        .enumerate()
        .skip(pos.byte)
        .find(|(_, b)| PAIRS.iter().any(|(o, c)| b == o || b == c))?;
    let text = buf.text();
    let bytes = text.as_bytes();
    let at = buf.line_start_offset(pos.line) + rel;
    let (open, close) = *PAIRS.iter().find(|(o, c)| ch == *o || ch == *c)?;
    let mut depth = 0usize;
    if ch == open {
        for (i, b) in bytes.iter().enumerate().skip(at) {
            if *b == open {
                depth += 1;
            } else if *b == close {
                depth -= 1;
                if depth == 0 {
                    return Some(buf.position_of(i));
                }
            }
        }
    } else {
        for i in (0..=at).rev() {
            if bytes[i] == close {
                depth += 1;
            } else if bytes[i] == open {
                depth -= 1;
                if depth == 0 {
                    return Some(buf.position_of(i));
                }
            }
        }
    }
    None
}

/// Move to the next blank line after the current paragraph (`}`); end of
/// buffer when none remains.
pub fn paragraph_forward(buf: &Buffer, pos: &mut Position) {
    let last = buf.last_line();
    let mut line = pos.line;
    while line < last && buf.is_blank_line(line) {
        line += 1;
    }
    while line <= last && !buf.is_blank_line(line) {
        line += 1;
    }
    if line > last {
        *pos = Position::new(last, buf.line_byte_len(last));
    } else {
        *pos = Position::new(line, 0);
    }
}

/// Move to the previous blank line before the current paragraph (`{`).
pub fn paragraph_backward(buf: &Buffer, pos: &mut Position) {
    let mut line = pos.line;
    while line > 0 && buf.is_blank_line(line) {
        line -= 1;
    }
    while line > 0 && !buf.is_blank_line(line) {
        line -= 1;
    }
    *pos = Position::new(line, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(s: &str) -> Buffer {
        Buffer::from_str("t", s).unwrap()
    }

    #[test]
    fn horizontal_and_line_boundaries() {
        let buf = buf("ab😀c");
        let mut pos = Position::origin();
        while right(&buf, &mut pos, false) {}
        assert_eq!(pos.byte, 6, "stops on last grapheme in Normal mode");
        assert!(right(&buf, &mut pos, true));
        assert_eq!(pos.byte, buf.line_byte_len(0));
        assert!(left(&buf, &mut pos));
        assert!(left(&buf, &mut pos));
        assert_eq!(pos.byte, 2);
        line_start(&mut pos);
        assert_eq!(pos.byte, 0);
        assert!(!left(&buf, &mut pos));
        line_end(&buf, &mut pos);
        assert_eq!(pos.byte, buf.line_byte_len(0));
    }

    #[test]
    fn vertical_motions_keep_sticky_column() {
        let buf = buf("abcdef\nxy\nlonger line\n");
        let mut pos = Position::new(0, 4);
        let mut sticky = None;
        sticky = down(&buf, &mut pos, sticky, false);
        assert_eq!(pos, Position::new(1, 1), "clamped to last char of short line");
        sticky = down(&buf, &mut pos, sticky, false);
        assert_eq!(pos, Position::new(2, 4), "sticky column restored");
        assert_eq!(sticky, Some(4));
        // last content line: trailing newline does not open another line
        let before = pos;
        down(&buf, &mut pos, sticky, false);
        assert_eq!(pos, before);
    }

    #[test]
    fn word_forward_crosses_newline_onto_next_word() {
        let buf = buf("abc\ndef\n");
        let mut pos = Position::origin();
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(1, 0));
    }

    #[test]
    fn word_forward_stops_on_punctuation_and_empty_lines() {
        let buf = buf("foo, bar\n\nbaz");
        let mut pos = Position::origin();
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(0, 3));
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(0, 5));
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(1, 0), "empty line is a word stop");
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(2, 0));
        word_forward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(2, 3), "last word runs to buffer end");
    }

    #[test]
    fn big_word_skips_punctuation() {
        let buf = buf("foo, bar");
        let mut pos = Position::origin();
        word_forward(&buf, &mut pos, true);
        assert_eq!(pos, Position::new(0, 5));
    }

    #[test]
    fn word_backward_and_end() {
        let buf = buf("one two.three\nfour");
        let mut pos = Position::new(1, 2);
        word_backward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(1, 0));
        word_backward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(0, 8));
        word_backward(&buf, &mut pos, false);
        assert_eq!(pos, Position::new(0, 7));
        word_backward(&buf, &mut pos, true);
        assert_eq!(pos, Position::new(0, 4));
        let mut e = Position::origin();
        word_end(&buf, &mut e, false);
        assert_eq!(e, Position::new(0, 2));
        word_end(&buf, &mut e, false);
        assert_eq!(e, Position::new(0, 6));
        word_end(&buf, &mut e, true);
        assert_eq!(e, Position::new(0, 12));
    }

    #[test]
    fn find_in_line_variants() {
        let buf = buf("a,b,c,d");
        let o = Position::origin();
        assert_eq!(
            find_in_line(&buf, o, ',', true, false, 2, false),
            Some(Position::new(0, 3))
        );
        assert_eq!(
            find_in_line(&buf, o, ',', true, true, 1, false),
            Some(Position::new(0, 0))
        );
        assert_eq!(find_in_line(&buf, o, 'z', true, false, 1, false), None);
        let end = Position::new(0, 6);
        assert_eq!(
            find_in_line(&buf, end, ',', false, false, 1, false),
            Some(Position::new(0, 5))
        );
        assert_eq!(
            find_in_line(&buf, end, ',', false, true, 1, false),
            Some(Position::new(0, 6))
        );
        // repeating a till search from just before a match moves past it
        assert_eq!(
            find_in_line(&buf, o, ',', true, true, 1, true),
            Some(Position::new(0, 2))
        );
    }

    #[test]
    fn match_pair_nested_across_lines() {
        let buf = buf("f(a, (b)\n  c)");
        assert_eq!(
            match_pair(&buf, Position::origin()),
            Some(Position::new(1, 3))
        );
        assert_eq!(
            match_pair(&buf, Position::new(1, 3)),
            Some(Position::new(0, 1))
        );
        assert_eq!(match_pair(&buf, Position::new(1, 4)), None);
    }

    #[test]
    fn paragraph_motions() {
        let buf = buf("a\nb\n\nc\nd\n");
        let mut pos = Position::origin();
        paragraph_forward(&buf, &mut pos);
        assert_eq!(pos, Position::new(2, 0));
        paragraph_forward(&buf, &mut pos);
        assert_eq!(pos, Position::new(4, 1));
        paragraph_backward(&buf, &mut pos);
        assert_eq!(pos, Position::new(2, 0));
        paragraph_backward(&buf, &mut pos);
        assert_eq!(pos, Position::origin());
    }

    #[test]
    fn first_non_blank_skips_indent() {
        let buf = buf("    x\n   \n");
        assert_eq!(first_non_blank(&buf, 0), Position::new(0, 4));
        assert_eq!(first_non_blank(&buf, 1), Position::new(1, 3));
    }

    #[test]
    fn normalize_pulls_caret_onto_last_grapheme() {
        let buf = buf("abc\n");
        let mut pos = Position::new(0, 3);
        normalize_normal_mode_position(&buf, &mut pos);
        assert_eq!(pos, Position::new(0, 2));
        let mut past = Position::new(5, 0);
        normalize_normal_mode_position(&buf, &mut past);
        assert_eq!(past, Position::new(0, 0));
    }
}
