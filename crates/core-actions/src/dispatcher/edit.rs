//! Text edits that are not operators: paste, join, single-character
//! replacement, insert-mode typing and surround pairs.

use super::operator::{map_case, range_value};
use super::{
    ExecError, OpRange, caret, caret_pos, indent_of, last_char_offset, normal_caret,
    normal_caret_at, place_caret, selection_range, set_caret,
};
use crate::Interpreter;
use core_state::{Host, Mode, OperatorKind, SessionState};
use core_text::motion::{self as text_motion, char_class};
use core_text::text_object::{ObjectScope, TextObjectKind};
use core_text::{Buffer, Position, grapheme};
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// End offset after `n` graphemes from `pos` on its line, or `None` when the
/// line holds fewer.
fn graphemes_end(buf: &Buffer, pos: Position, n: usize) -> Option<usize> {
    let content = buf.line_content(pos.line);
    let mut byte = pos.byte;
    for _ in 0..n {
        let next = grapheme::next_boundary(&content, byte);
        if next == byte {
            return None;
        }
        byte = next;
    }
    Some(buf.line_start_offset(pos.line) + byte)
}

fn join_separator(current: &str, next: &str) -> &'static str {
    if next.is_empty() || current.is_empty() || current.ends_with([' ', '\t']) || next.starts_with(')') {
        ""
    } else {
        " "
    }
}

impl Interpreter {
    pub(super) fn paste(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        before: bool,
        count: Option<usize>,
        register: Option<char>,
    ) -> Result<(), ExecError> {
        let reg = register.unwrap_or('"');
        let value = self
            .registers
            .read(reg)?
            .ok_or_else(|| ExecError::Message(format!("E353: Nothing in register {reg}")))?;
        let n = count.unwrap_or(1).max(1);
        let mut text = value.text.repeat(n);
        if value.linewise && !text.ends_with('\n') {
            text.push('\n');
        }

        if st.mode.has_selection() {
            let range = selection_range(st.mode, host);
            st.set_mode(Mode::Normal);
            return self.paste_over(host, range, &text, value.linewise);
        }

        let here = caret_pos(host);
        let buf = host.text();
        if value.linewise {
            let (at, inserted, line) = if before {
                (buf.line_start_offset(here.line), text, here.line)
            } else {
                let at = buf.line_end_offset_inclusive(here.line);
                let terminated = buf.line(here.line).is_some_and(|l| l.ends_with('\n'));
                if terminated {
                    (at, text, here.line + 1)
                } else {
                    let body = text.strip_suffix('\n').unwrap_or(&text);
                    (at, format!("\n{body}"), here.line + 1)
                }
            };
            host.insert(at, &inserted);
            let pos = text_motion::first_non_blank(host.text(), line);
            set_caret(host, pos);
        } else {
            let mut at = buf.offset_of(here);
            if !before {
                at += super::grapheme_len(buf, at);
            }
            host.insert(at, &text);
            let last = last_char_offset(host.text(), at + text.len());
            let pos = host.text().position_of(last);
            normal_caret(host, pos);
        }
        Ok(())
    }

    /// Replace a visual selection with register text. The replaced text
    /// becomes the unnamed register.
    fn paste_over(&mut self, host: &mut dyn Host, range: OpRange, text: &str, linewise: bool) -> Result<(), ExecError> {
        let buf = host.text();
        let old = range_value(buf, &range);
        let small = matches!(range, OpRange::Chars { .. }) && !old.text.contains('\n');
        let pos = match range {
            OpRange::Lines { first, last } => {
                let start = buf.line_start_offset(first);
                let end = buf.line_end_offset_inclusive(last);
                let terminated = buf.line(last).is_some_and(|l| l.ends_with('\n'));
                let mut body = text.to_string();
                if !linewise {
                    body.push('\n');
                }
                if !terminated {
                    body.pop();
                }
                host.replace(start..end, &body);
                text_motion::first_non_blank(host.text(), first)
            }
            OpRange::Chars { start, end } => {
                if linewise {
                    host.replace(start..end, &format!("\n{text}"));
                    let line = host.text().position_of(start).line + 1;
                    text_motion::first_non_blank(host.text(), line)
                } else {
                    host.replace(start..end, text);
                    host.text().position_of(last_char_offset(host.text(), start + text.len()))
                }
            }
            OpRange::Block { .. } => {
                let mut pieces = range.spans(buf);
                let top = pieces.first().map_or(caret(host), |p| p.start);
                pieces.reverse();
                for span in pieces {
                    host.erase(span);
                }
                host.insert(top, text.trim_end_matches('\n'));
                host.text().position_of(top)
            }
        };
        self.registers.write_delete(None, old, small)?;
        normal_caret(host, pos);
        Ok(())
    }

    pub(super) fn join_lines(&mut self, st: &mut SessionState, host: &mut dyn Host, count: Option<usize>) -> Result<(), ExecError> {
        let buf = host.text();
        let (first, joins) = if st.mode.has_selection() {
            let (first, last) = selection_range(st.mode, host).line_bounds(buf);
            st.set_mode(Mode::Normal);
            (first, (last - first).max(1))
        } else {
            (caret_pos(host).line, count.unwrap_or(2).max(2) - 1)
        };
        let joins = joins.min(buf.last_line().saturating_sub(first));
        if joins == 0 {
            return Err(ExecError::NoOp);
        }
        let mut join_at = 0;
        for _ in 0..joins {
            let buf = host.text();
            let current = buf.line_content(first);
            let next = buf.line_content(first + 1);
            let trimmed = next.trim_start_matches([' ', '\t']);
            let lead = next.len() - trimmed.len();
            let sep = join_separator(&current, trimmed);
            let end = buf.line_start_offset(first) + current.len();
            host.replace(end..end + 1 + lead, sep);
            join_at = end;
        }
        let pos = host.text().position_of(join_at);
        normal_caret(host, pos);
        Ok(())
    }

    pub(super) fn replace_char(&mut self, st: &mut SessionState, host: &mut dyn Host, c: char, count: Option<usize>) -> Result<(), ExecError> {
        let c = if c == '\r' { '\n' } else { c };
        if st.mode.has_selection() {
            let range = selection_range(st.mode, host);
            st.set_mode(Mode::Normal);
            let buf = host.text();
            let start = range.start(buf);
            for span in range.spans(buf).into_iter().rev() {
                let old = host.text().slice_bytes(span.start, span.end);
                let new: String = old
                    .graphemes(true)
                    .map(|g| if g == "\n" { "\n".to_string() } else { c.to_string() })
                    .collect();
                host.replace(span, &new);
            }
            normal_caret(host, start);
            return Ok(());
        }
        let n = count.unwrap_or(1).max(1);
        let pos = caret_pos(host);
        let buf = host.text();
        let end = graphemes_end(buf, pos, n).ok_or(ExecError::MotionFailed)?;
        let start = buf.offset_of(pos);
        if c == '\n' {
            host.replace(start..end, "\n");
            let line = pos.line + 1;
            set_caret(host, Position::new(line, 0));
        } else {
            let new = c.to_string().repeat(n);
            host.replace(start..end, &new);
            place_caret(host, start + new.len() - c.len_utf8());
        }
        Ok(())
    }

    pub(super) fn toggle_case_char(&mut self, host: &mut dyn Host, count: Option<usize>) -> Result<(), ExecError> {
        let pos = caret_pos(host);
        let buf = host.text();
        let content = buf.line_content(pos.line);
        if content.is_empty() {
            return Err(ExecError::NoOp);
        }
        let mut byte = pos.byte;
        for _ in 0..count.unwrap_or(1).max(1) {
            let next = grapheme::next_boundary(&content, byte);
            if next == byte {
                break;
            }
            byte = next;
        }
        let base = buf.line_start_offset(pos.line);
        let old = &content[pos.byte..byte];
        let new = map_case(OperatorKind::ToggleCase, old);
        if new != old {
            host.replace(base + pos.byte..base + byte, &new);
        }
        let end = base + pos.byte + new.len();
        normal_caret_at(host, end);
        Ok(())
    }

    fn typed(st: &mut SessionState, text: &str) {
        if let Some(session) = st.insert_session.as_mut() {
            session.dirty = true;
            session.typed.push_str(text);
        }
    }

    pub(super) fn insert_text(&mut self, st: &mut SessionState, host: &mut dyn Host, text: &str) -> Result<(), ExecError> {
        if st.mode == Mode::Select {
            let range = selection_range(st.mode, host);
            let start = match range {
                OpRange::Chars { start, .. } => start,
                _ => caret(host),
            };
            let buf = host.text();
            let old = range_value(buf, &range);
            self.registers.write_delete(None, old, true)?;
            if let OpRange::Chars { start, end } = range {
                host.erase(start..end);
            }
            let pos = host.text().position_of(start);
            self.begin_insert(st, host, Mode::Insert, pos, true);
        }
        match st.mode {
            Mode::Insert => {
                let at = caret(host);
                host.insert(at, text);
                place_caret(host, at + text.len());
            }
            Mode::Replace => {
                let pos = caret_pos(host);
                let buf = host.text();
                let at = buf.offset_of(pos);
                let want = text.graphemes(true).count();
                let content = buf.line_content(pos.line);
                let taken: usize = content[pos.byte..].graphemes(true).take(want).map(str::len).sum();
                host.replace(at..at + taken, text);
                place_caret(host, at + text.len());
            }
            other => panic!("text typed in {other} mode"),
        }
        Self::typed(st, text);
        Ok(())
    }

    pub(super) fn insert_newline(&mut self, st: &mut SessionState, host: &mut dyn Host) -> Result<(), ExecError> {
        let pos = caret_pos(host);
        let indent = if host.get_bool("autoindent", false) {
            let line_indent = indent_of(host.text(), pos.line);
            line_indent[..line_indent.len().min(pos.byte)].to_string()
        } else {
            String::new()
        };
        let at = host.text().offset_of(pos);
        let text = format!("\n{indent}");
        host.insert(at, &text);
        set_caret(host, Position::new(pos.line + 1, indent.len()));
        Self::typed(st, &text);
        Ok(())
    }

    pub(super) fn insert_tab(&mut self, st: &mut SessionState, host: &mut dyn Host) -> Result<(), ExecError> {
        let text = if host.get_bool("expandtab", true) {
            let sw = usize::try_from(host.get_int("shiftwidth", 4)).unwrap_or(4).max(1);
            let col = text_motion::current_col(host.text(), &caret_pos(host));
            " ".repeat(sw - col % sw)
        } else {
            "\t".to_string()
        };
        self.insert_text(st, host, &text)
    }

    pub(super) fn delete_backward(&mut self, st: &mut SessionState, host: &mut dyn Host) -> Result<(), ExecError> {
        let pos = caret_pos(host);
        let buf = host.text();
        let at = buf.offset_of(pos);
        let start = if pos.byte > 0 {
            let content = buf.line_content(pos.line);
            buf.line_start_offset(pos.line) + grapheme::prev_boundary(&content, pos.byte.min(content.len()))
        } else if pos.line > 0 {
            at - 1
        } else {
            return Err(ExecError::NoOp);
        };
        if st.mode == Mode::Replace {
            place_caret(host, start);
        } else {
            host.erase(start..at);
            place_caret(host, start);
        }
        if let Some(session) = st.insert_session.as_mut() {
            session.dirty = true;
            session.typed.pop();
        }
        Ok(())
    }

    pub(super) fn delete_forward(&mut self, st: &mut SessionState, host: &mut dyn Host) -> Result<(), ExecError> {
        let pos = caret_pos(host);
        let buf = host.text();
        let at = buf.offset_of(pos);
        let end = match graphemes_end(buf, pos, 1) {
            Some(end) => end,
            None if at < buf.len_bytes() => at + 1,
            None => return Err(ExecError::NoOp),
        };
        host.erase(at..end);
        place_caret(host, at);
        if let Some(session) = st.insert_session.as_mut() {
            session.dirty = true;
        }
        Ok(())
    }

    pub(super) fn delete_word_backward(&mut self, st: &mut SessionState, host: &mut dyn Host) -> Result<(), ExecError> {
        let pos = caret_pos(host);
        if pos.byte == 0 {
            return self.delete_backward(st, host);
        }
        let buf = host.text();
        let content = buf.line_content(pos.line);
        let before: Vec<(usize, &str)> = content[..pos.byte.min(content.len())].grapheme_indices(true).collect();
        let mut idx = before.len();
        while idx > 0 && before[idx - 1].1.trim().is_empty() {
            idx -= 1;
        }
        if idx > 0 {
            let class = char_class(before[idx - 1].1, false);
            while idx > 0 && char_class(before[idx - 1].1, false) == class {
                idx -= 1;
            }
        }
        let start_byte = before.get(idx).map_or(pos.byte, |(b, _)| *b);
        let base = buf.line_start_offset(pos.line);
        host.erase(base + start_byte..base + pos.byte);
        set_caret(host, Position::new(pos.line, start_byte));
        if let Some(session) = st.insert_session.as_mut() {
            session.dirty = true;
        }
        Ok(())
    }

    pub(super) fn surround_delete(&mut self, host: &mut dyn Host, target: char) -> Result<(), ExecError> {
        let (open, close) = delimiters(host.text(), caret(host), target).ok_or(ExecError::MotionFailed)?;
        host.erase(close);
        host.erase(open.clone());
        normal_caret_at(host, open.start);
        Ok(())
    }

    pub(super) fn surround_change(&mut self, host: &mut dyn Host, from: char, to: char) -> Result<(), ExecError> {
        let (open, close) = delimiters(host.text(), caret(host), from).ok_or(ExecError::MotionFailed)?;
        let (left, right) = replacement_pair(to);
        host.replace(close, &right);
        host.replace(open.clone(), &left);
        normal_caret_at(host, open.start);
        Ok(())
    }
}

fn surround_kind(c: char) -> Option<TextObjectKind> {
    Some(match c {
        '(' | ')' | 'b' => TextObjectKind::Bracket('(', ')'),
        '[' | ']' | 'r' => TextObjectKind::Bracket('[', ']'),
        '{' | '}' | 'B' => TextObjectKind::Bracket('{', '}'),
        '<' | '>' | 'a' => TextObjectKind::Bracket('<', '>'),
        '"' | '\'' | '`' => TextObjectKind::Quote(c),
        't' => TextObjectKind::Tag,
        _ => return None,
    })
}

/// Byte ranges of the opening and closing delimiters around `caret`.
fn delimiters(buf: &Buffer, caret: usize, target: char) -> Option<(Range<usize>, Range<usize>)> {
    let kind = surround_kind(target)?;
    let around = kind.resolve(buf, caret, ObjectScope::Around, 1)?;
    let text = buf.slice_bytes(around.start, around.end);
    let pair = match kind {
        TextObjectKind::Bracket(open, close) => Some((open, close)),
        TextObjectKind::Quote(q) => Some((q, q)),
        _ => None,
    };
    match pair {
        Some((open, close)) => {
            let o = text.find(open)?;
            let c = text.rfind(close)?;
            if c <= o {
                return None;
            }
            Some((
                around.start + o..around.start + o + open.len_utf8(),
                around.start + c..around.start + c + close.len_utf8(),
            ))
        }
        None => {
            let inner = kind.resolve(buf, caret, ObjectScope::Inner, 1)?;
            Some((around.start..inner.start, inner.end..around.end))
        }
    }
}

/// Text placed around the content when changing a surround pair. Opening
/// brackets pad with a space on the inside.
fn replacement_pair(c: char) -> (String, String) {
    let (l, r) = match c {
        '(' => ("( ", " )"),
        '[' => ("[ ", " ]"),
        '{' => ("{ ", " }"),
        ')' | 'b' => ("(", ")"),
        ']' | 'r' => ("[", "]"),
        '}' | 'B' => ("{", "}"),
        '<' | '>' | 'a' => ("<", ">"),
        other => return (other.to_string(), other.to_string()),
    };
    (l.to_string(), r.to_string())
}
