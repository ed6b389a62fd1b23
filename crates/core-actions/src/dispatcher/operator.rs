//! Operator ranges and their application.
//!
//! An operator acts on one of three range shapes: a charwise byte span, a
//! run of whole lines, or a rectangular block of visual columns. Motions
//! produce the first two; Visual Block produces the third.

use super::motion::{Context, land};
use super::{ExecError, caret_pos, grapheme_len, indent_of, normal_caret, set_caret};
use crate::Interpreter;
use core_state::{
    Host, Mode, MotionKind, MotionPolicy, NativeCommand, OperatorKind, RegisterValue, Registers,
    SessionState,
};
use core_text::motion::{self as text_motion, char_class};
use core_text::{Buffer, Position, grapheme};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpRange {
    /// Half-open byte span.
    Chars { start: usize, end: usize },
    /// Inclusive line span.
    Lines { first: usize, last: usize },
    /// Inclusive lines and inclusive visual columns.
    Block {
        first: usize,
        last: usize,
        left: usize,
        right: usize,
    },
}

impl OpRange {
    /// First and last line the range touches.
    pub(crate) fn line_bounds(&self, buf: &Buffer) -> (usize, usize) {
        match *self {
            OpRange::Chars { start, end } => {
                let first = buf.position_of(start).line;
                let last = buf.position_of(end.saturating_sub(1).max(start)).line;
                (first, last)
            }
            OpRange::Lines { first, last } | OpRange::Block { first, last, .. } => (first, last),
        }
    }

    /// Byte spans covered, top to bottom. Lines exclude their final newline.
    pub(super) fn spans(&self, buf: &Buffer) -> Vec<Range<usize>> {
        match *self {
            OpRange::Chars { start, end } => vec![start..end],
            OpRange::Lines { first, last } => {
                vec![buf.line_start_offset(first)..buf.line_start_offset(last) + buf.line_byte_len(last)]
            }
            OpRange::Block {
                first,
                last,
                left,
                right,
            } => block_pieces(buf, first, last, left, right),
        }
    }

    pub(super) fn start(&self, buf: &Buffer) -> Position {
        match *self {
            OpRange::Chars { start, .. } => buf.position_of(start),
            OpRange::Lines { first, .. } => Position::new(first, 0),
            OpRange::Block { first, left, .. } => {
                let line = buf.line_content(first);
                Position::new(first, grapheme::byte_for_visual_col(&line, left, true))
            }
        }
    }
}

/// Range covered by the live selection in `mode`.
pub(crate) fn selection_range(mode: Mode, host: &dyn Host) -> OpRange {
    let buf = host.text();
    let region = host.get_selections().first().copied().unwrap_or_default();
    let (a, b) = (buf.position_of(region.a), buf.position_of(region.b));
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    match mode {
        Mode::VisualLine => OpRange::Lines {
            first: lo.line,
            last: hi.line,
        },
        Mode::VisualBlock => {
            let cols = |p: Position| {
                let line = buf.line_content(p.line);
                let start = grapheme::visual_col(&line, p.byte);
                let width = buf.grapheme_at(p).map_or(1, |g| grapheme::cluster_width(&g));
                (start, start + width - 1)
            };
            let (a_left, a_right) = cols(a);
            let (b_left, b_right) = cols(b);
            OpRange::Block {
                first: lo.line,
                last: hi.line,
                left: a_left.min(b_left),
                right: a_right.max(b_right),
            }
        }
        _ => {
            let start = buf.offset_of(lo);
            let hi_off = buf.offset_of(hi);
            // A caret on an empty line selects its newline.
            let len = match buf.grapheme_at(hi) {
                Some(g) => g.len(),
                None => usize::from(hi_off < buf.len_bytes()),
            };
            OpRange::Chars {
                start,
                end: hi_off + len,
            }
        }
    }
}

/// Per-line byte spans of a block; lines too short to reach `left` are
/// skipped.
fn block_pieces(buf: &Buffer, first: usize, last: usize, left: usize, right: usize) -> Vec<Range<usize>> {
    (first..=last)
        .filter_map(|line| {
            let content = buf.line_content(line);
            if grapheme::visual_col(&content, content.len()) <= left {
                return None;
            }
            let start = grapheme::byte_for_visual_col(&content, left, true);
            let end = grapheme::next_boundary(&content, grapheme::byte_for_visual_col(&content, right, true));
            let base = buf.line_start_offset(line);
            Some(base + start..base + end.max(start))
        })
        .collect()
}

/// Bytes removed when deleting whole lines. A final line without a newline
/// takes the newline before it instead.
fn line_span(buf: &Buffer, first: usize, last: usize) -> Range<usize> {
    let mut start = buf.line_start_offset(first);
    let end = buf.line_end_offset_inclusive(last);
    let terminated = buf.line(last).is_some_and(|l| l.ends_with('\n'));
    if !terminated && first > 0 {
        start -= 1;
    }
    start..end
}

pub(crate) fn range_value(buf: &Buffer, range: &OpRange) -> RegisterValue {
    match *range {
        OpRange::Chars { start, end } => RegisterValue::new(buf.slice_bytes(start, end), false),
        OpRange::Lines { first, last } => {
            let mut text = buf.slice_bytes(buf.line_start_offset(first), buf.line_end_offset_inclusive(last));
            if !text.ends_with('\n') {
                text.push('\n');
            }
            RegisterValue::new(text, true)
        }
        OpRange::Block { .. } => {
            let pieces: Vec<String> = range.spans(buf).into_iter().map(|r| buf.slice_bytes(r.start, r.end)).collect();
            RegisterValue::new(pieces.join("\n"), false)
        }
    }
}

fn writes_register(op: OperatorKind) -> bool {
    matches!(op, OperatorKind::Delete | OperatorKind::Change | OperatorKind::Yank)
}

fn toggle_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_lowercase() {
            out.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn map_case(op: OperatorKind, text: &str) -> String {
    match op {
        OperatorKind::Lowercase => text.to_lowercase(),
        OperatorKind::Uppercase => text.to_uppercase(),
        _ => toggle_case(text),
    }
}

fn at_non_blank(buf: &Buffer, pos: Position) -> bool {
    buf.grapheme_at(pos).is_some_and(|g| !g.trim().is_empty())
}

fn at_word_end(buf: &Buffer, pos: Position, big: bool) -> bool {
    let Some(here) = buf.grapheme_at(pos) else {
        return true;
    };
    let line = buf.line_content(pos.line);
    let next = Position::new(pos.line, grapheme::next_boundary(&line, pos.byte));
    match buf.grapheme_at(next) {
        Some(g) => char_class(&g, big) != char_class(&here, big),
        None => true,
    }
}

/// Last grapheme changed by `cw` on a non-blank: the end of the current
/// word rather than the start of the next one.
fn change_word_end(buf: &Buffer, from: Position, big: bool, count: usize) -> Position {
    let mut pos = from;
    for i in 0..count {
        if i == 0 && at_word_end(buf, pos, big) {
            continue;
        }
        text_motion::word_end(buf, &mut pos, big);
    }
    pos
}

impl Interpreter {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn exec_operate(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        op: OperatorKind,
        motion: &MotionKind,
        count: Option<usize>,
        register: Option<char>,
        xpos: Option<usize>,
    ) -> Result<(), ExecError> {
        if st.mode.has_selection() || st.mode.is_typing() {
            panic!("operator `{}` executed over a motion in {} mode", op.name(), st.mode);
        }
        if let Some(reg) = register
            && writes_register(op)
        {
            Registers::validate_write(reg)?;
        }
        let from = caret_pos(host);
        let range = self.motion_range(st, host, op, motion, count, from, xpos)?;
        st.set_mode(Mode::Normal);
        tracing::debug!(target: "actions.dispatch", op = op.name(), range = ?range, "operate");
        self.apply_operator(st, host, op, range, register, 1, from)
    }

    pub(super) fn exec_operate_selection(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        op: OperatorKind,
        count: Option<usize>,
        register: Option<char>,
    ) -> Result<(), ExecError> {
        if !st.mode.has_selection() {
            panic!("selection operator `{}` executed in {} mode", op.name(), st.mode);
        }
        if let Some(reg) = register
            && writes_register(op)
        {
            Registers::validate_write(reg)?;
        }
        let range = selection_range(st.mode, host);
        let origin = range.start(host.text());
        st.set_mode(Mode::Normal);
        tracing::debug!(target: "actions.dispatch", op = op.name(), range = ?range, "operate selection");
        self.apply_operator(st, host, op, range, register, count.unwrap_or(1), origin)
    }

    /// Range an operator covers when paired with `motion` from `from`. Fails
    /// when the motion leaves the caret where it was.
    #[allow(clippy::too_many_arguments)]
    fn motion_range(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        op: OperatorKind,
        motion: &MotionKind,
        count: Option<usize>,
        from: Position,
        xpos: Option<usize>,
    ) -> Result<OpRange, ExecError> {
        let n = count.unwrap_or(1).max(1);
        let buf = host.text();
        match motion {
            MotionKind::CurrentLine { .. } => Ok(OpRange::Lines {
                first: from.line,
                last: (from.line + n - 1).min(buf.last_line()),
            }),
            MotionKind::Object { kind, scope } => {
                let times = u32::try_from(n).unwrap_or(u32::MAX);
                let span = kind
                    .resolve(buf, buf.offset_of(from), *scope, times)
                    .ok_or(ExecError::MotionFailed)?;
                if span.linewise {
                    let last = buf.position_of(span.end.saturating_sub(1).max(span.start)).line;
                    return Ok(OpRange::Lines {
                        first: buf.position_of(span.start).line,
                        last,
                    });
                }
                if span.start == span.end && op != OperatorKind::Change {
                    return Err(ExecError::MotionFailed);
                }
                Ok(OpRange::Chars {
                    start: span.start,
                    end: span.end,
                })
            }
            MotionKind::WordForward { big } if op == OperatorKind::Change && at_non_blank(buf, from) => {
                let end = change_word_end(buf, from, *big, n);
                let end = buf.offset_of(end);
                Ok(OpRange::Chars {
                    start: buf.offset_of(from),
                    end: end + grapheme_len(buf, end),
                })
            }
            _ => {
                st.set_mode(Mode::InternalNormal);
                let landing = land(st, host, motion, count, from, xpos.or(st.xpos), Context::Operator);
                st.set_mode(Mode::OperatorPending);
                let landing = landing?;
                if landing.pos == from {
                    return Err(ExecError::MotionFailed);
                }
                let buf = host.text();
                let (lo, hi) = if landing.pos < from {
                    (landing.pos, from)
                } else {
                    (from, landing.pos)
                };
                Ok(match motion.policy() {
                    MotionPolicy::Exclusive => OpRange::Chars {
                        start: buf.offset_of(lo),
                        end: buf.offset_of(hi),
                    },
                    MotionPolicy::Inclusive => {
                        let end = buf.offset_of(hi);
                        OpRange::Chars {
                            start: buf.offset_of(lo),
                            end: end + grapheme_len(buf, end),
                        }
                    }
                    MotionPolicy::Linewise => OpRange::Lines {
                        first: lo.line,
                        last: hi.line,
                    },
                })
            }
        }
    }

    /// Apply `op` to `range`. `times` repeats shifts; `origin` is where the
    /// caret stood before the motion.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn apply_operator(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        op: OperatorKind,
        range: OpRange,
        register: Option<char>,
        times: usize,
        origin: Position,
    ) -> Result<(), ExecError> {
        match op {
            OperatorKind::Yank => {
                let value = range_value(host.text(), &range);
                self.registers.write_yank(register, value)?;
                let pos = match range {
                    OpRange::Lines { first, .. } if origin.line == first => origin,
                    other => other.start(host.text()),
                };
                normal_caret(host, pos);
                Ok(())
            }
            OperatorKind::Delete => {
                self.cut(host, &range, register)?;
                let buf = host.text();
                let pos = match range {
                    OpRange::Lines { first, .. } => {
                        text_motion::first_non_blank(buf, first.min(buf.last_line()))
                    }
                    other => other.start(buf),
                };
                normal_caret(host, pos);
                Ok(())
            }
            OperatorKind::Change => self.change(st, host, range, register),
            OperatorKind::Indent | OperatorKind::Unindent => {
                let (first, last) = range.line_bounds(host.text());
                shift_lines(host, first, last, op == OperatorKind::Indent, times);
                Ok(())
            }
            OperatorKind::Reindent => native_lines(host, "reindent", range),
            OperatorKind::Comment => native_lines(host, "toggle_comment", range),
            OperatorKind::ToggleCase | OperatorKind::Lowercase | OperatorKind::Uppercase => {
                let buf = host.text();
                let start = range.start(buf);
                let spans = range.spans(buf);
                for span in spans.into_iter().rev() {
                    let text = host.text().slice_bytes(span.start, span.end);
                    let mapped = map_case(op, &text);
                    if mapped != text {
                        host.replace(span, &mapped);
                    }
                }
                normal_caret(host, start);
                Ok(())
            }
        }
    }

    /// Store the range in the registers, then erase it.
    fn cut(&mut self, host: &mut dyn Host, range: &OpRange, register: Option<char>) -> Result<(), ExecError> {
        let buf = host.text();
        let value = range_value(buf, range);
        let small = matches!(range, OpRange::Chars { .. }) && !value.text.contains('\n');
        self.registers.write_delete(register, value, small)?;
        match *range {
            OpRange::Chars { start, end } => host.erase(start..end),
            OpRange::Lines { first, last } => {
                let span = line_span(buf, first, last);
                host.erase(span);
            }
            OpRange::Block { .. } => {
                for span in range.spans(buf).into_iter().rev() {
                    host.erase(span);
                }
            }
        }
        Ok(())
    }

    /// Delete the range and enter Insert mode where it was. Whole lines
    /// leave one line behind that keeps the first line's indent.
    fn change(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        range: OpRange,
        register: Option<char>,
    ) -> Result<(), ExecError> {
        let pos = match range {
            OpRange::Lines { first, last } => {
                let buf = host.text();
                let value = range_value(buf, &range);
                self.registers.write_delete(register, value, false)?;
                let indent = indent_of(buf, first);
                let start = buf.line_start_offset(first);
                let end = buf.line_start_offset(last) + buf.line_byte_len(last);
                host.replace(start..end, &indent);
                Position::new(first, indent.len())
            }
            other => {
                let start = other.start(host.text());
                self.cut(host, &other, register)?;
                start
            }
        };
        self.begin_insert(st, host, Mode::Insert, pos, true);
        Ok(())
    }
}

/// Shift lines by `times` shiftwidths. Blank lines are left alone.
fn shift_lines(host: &mut dyn Host, first: usize, last: usize, indent: bool, times: usize) {
    let sw = usize::try_from(host.get_int("shiftwidth", 4)).unwrap_or(4).max(1);
    let tabstop = usize::try_from(host.get_int("tabstop", 8)).unwrap_or(8).max(1);
    let expand = host.get_bool("expandtab", true);
    let width = sw * times;
    let buf = host.text();
    let mut out = Vec::with_capacity(last - first + 1);
    for line in first..=last {
        let content = buf.line_content(line);
        if content.trim().is_empty() {
            out.push(content);
        } else if indent {
            let pad = if expand {
                " ".repeat(width)
            } else {
                format!("{}{}", "\t".repeat(width / tabstop), " ".repeat(width % tabstop))
            };
            out.push(format!("{pad}{content}"));
        } else {
            let mut removed = 0;
            let mut cut = 0;
            for c in content.chars() {
                let w = match c {
                    ' ' => 1,
                    '\t' => tabstop - removed % tabstop,
                    _ => break,
                };
                if removed + w > width && c == ' ' {
                    break;
                }
                removed += w;
                cut += c.len_utf8();
                if removed >= width {
                    break;
                }
            }
            out.push(content[cut..].to_string());
        }
    }
    let start = buf.line_start_offset(first);
    let end = buf.line_start_offset(last) + buf.line_byte_len(last);
    let joined = out.join("\n");
    if buf.slice_bytes(start, end) != joined {
        host.replace(start..end, &joined);
    }
    let pos = text_motion::first_non_blank(host.text(), first);
    set_caret(host, pos);
}

/// Run a host-native line command over the lines of `range` (0-based,
/// inclusive).
fn native_lines(host: &mut dyn Host, name: &str, range: OpRange) -> Result<(), ExecError> {
    let (first, last) = range.line_bounds(host.text());
    let cmd = NativeCommand::with_args(name, [first.to_string(), last.to_string()]);
    host.run_native(&cmd).map_err(ExecError::Message)?;
    let buf = host.text();
    let pos = text_motion::first_non_blank(buf, first.min(buf.last_line()));
    set_caret(host, pos);
    Ok(())
}
