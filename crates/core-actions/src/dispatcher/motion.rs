//! Caret movement.
//!
//! [`land`] computes where a motion ends without touching the host, so the
//! same code serves plain movement, selection extension and operator ranges.
//! Counts are applied here; the text primitives each take one step.

use super::{ExecError, anchor, caret_pos, last_char_offset};
use crate::Interpreter;
use core_state::{CharSearch, Host, LastSearch, Mode, MotionKind, Region, ScrollAlign, SessionState};
use core_text::motion as text_motion;
use core_text::text_object::ObjectScope;
use core_text::{Buffer, Position, grapheme, search};
use tracing::trace;

/// Who the landing is for. Anything but a plain caret may rest one past the
/// last grapheme of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    Caret,
    Typing,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Landing {
    pub pos: Position,
    /// Column to remember for following vertical motions.
    pub xpos: Option<usize>,
}

impl Landing {
    fn at(pos: Position) -> Self {
        Self { pos, xpos: None }
    }
}

fn as_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Where `motion` repeated `count` times takes a caret at `from`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn land(
    st: &mut SessionState,
    host: &dyn Host,
    motion: &MotionKind,
    count: Option<usize>,
    from: Position,
    xpos: Option<usize>,
    ctx: Context,
) -> Result<Landing, ExecError> {
    let buf = host.text();
    let n = count.unwrap_or(1).max(1);
    let eol = ctx != Context::Caret;
    let mut pos = from;
    let landing = match motion {
        MotionKind::Left { wrap } => {
            let mut moved = false;
            for _ in 0..n {
                if text_motion::left(buf, &mut pos) {
                    moved = true;
                } else if *wrap && pos.line > 0 {
                    pos.line -= 1;
                    let content = buf.line_content(pos.line);
                    pos.byte = if eol { content.len() } else { grapheme::last_boundary(&content) };
                    moved = true;
                } else {
                    break;
                }
            }
            if !moved {
                return Err(ExecError::MotionFailed);
            }
            Landing::at(pos)
        }
        MotionKind::Right { wrap } => {
            let mut moved = false;
            for _ in 0..n {
                if text_motion::right(buf, &mut pos, eol) {
                    moved = true;
                } else if *wrap && pos.line < buf.last_line() {
                    pos = Position::new(pos.line + 1, 0);
                    moved = true;
                } else {
                    break;
                }
            }
            if !moved {
                // `l` on the last grapheme still covers it for an operator.
                if ctx == Context::Operator && buf.grapheme_at(pos).is_some() {
                    let content = buf.line_content(pos.line);
                    pos.byte = grapheme::next_boundary(&content, pos.byte);
                } else {
                    return Err(ExecError::MotionFailed);
                }
            }
            Landing::at(pos)
        }
        MotionKind::Up | MotionKind::Down => {
            let down = matches!(motion, MotionKind::Down);
            let edge = if down { buf.last_line() } else { 0 };
            if from.line == edge {
                return Err(ExecError::MotionFailed);
            }
            let allow_eol = ctx == Context::Typing;
            let mut sticky = xpos;
            for _ in 0..n {
                sticky = if down {
                    text_motion::down(buf, &mut pos, sticky, allow_eol)
                } else {
                    text_motion::up(buf, &mut pos, sticky, allow_eol)
                };
            }
            Landing { pos, xpos: sticky }
        }
        MotionKind::WordForward { big } => {
            for _ in 0..n {
                let before = pos;
                text_motion::word_forward(buf, &mut pos, *big);
                if pos == before {
                    break;
                }
            }
            Landing::at(pos)
        }
        MotionKind::WordBackward { big } => {
            for _ in 0..n {
                let before = pos;
                text_motion::word_backward(buf, &mut pos, *big);
                if pos == before {
                    break;
                }
            }
            Landing::at(pos)
        }
        MotionKind::WordEnd { big } => {
            for _ in 0..n {
                let before = pos;
                text_motion::word_end(buf, &mut pos, *big);
                if pos == before {
                    break;
                }
            }
            Landing::at(pos)
        }
        MotionKind::LineStart => Landing::at(Position::new(from.line, 0)),
        MotionKind::FirstNonBlank => Landing::at(text_motion::first_non_blank(buf, from.line)),
        MotionKind::LineEnd => {
            let line = (from.line + n - 1).min(buf.last_line());
            let content = buf.line_content(line);
            let byte = if ctx == Context::Typing {
                content.len()
            } else {
                grapheme::last_boundary(&content)
            };
            Landing {
                pos: Position::new(line, byte),
                xpos: Some(usize::MAX),
            }
        }
        MotionKind::Column => {
            let content = buf.line_content(from.line);
            let byte = grapheme::byte_for_visual_col(&content, n - 1, false);
            Landing {
                pos: Position::new(from.line, byte),
                xpos: Some(n - 1),
            }
        }
        MotionKind::FirstNonBlankDown { skip_current } => {
            let step = if *skip_current { n } else { n - 1 };
            if step > 0 && from.line == buf.last_line() {
                return Err(ExecError::MotionFailed);
            }
            let line = (from.line + step).min(buf.last_line());
            Landing::at(text_motion::first_non_blank(buf, line))
        }
        MotionKind::FirstNonBlankUp => {
            if from.line == 0 {
                return Err(ExecError::MotionFailed);
            }
            Landing::at(text_motion::first_non_blank(buf, from.line.saturating_sub(n)))
        }
        MotionKind::GotoLine { default_last } => {
            let line = match count {
                Some(c) => c.saturating_sub(1).min(buf.last_line()),
                None if *default_last => buf.last_line(),
                None => 0,
            };
            Landing::at(text_motion::first_non_blank(buf, line))
        }
        MotionKind::FindChar(search) => {
            st.last_char_search = Some(*search);
            Landing::at(find_char(buf, from, *search, n, false)?)
        }
        MotionKind::RepeatCharSearch { reverse } => {
            let last = st.last_char_search.ok_or(ExecError::MotionFailed)?;
            let search = if *reverse { last.reversed() } else { last };
            Landing::at(find_char(buf, from, search, n, true)?)
        }
        MotionKind::MatchPair => {
            Landing::at(text_motion::match_pair(buf, from).ok_or(ExecError::MotionFailed)?)
        }
        MotionKind::ParagraphForward => {
            for _ in 0..n {
                text_motion::paragraph_forward(buf, &mut pos);
            }
            Landing::at(pos)
        }
        MotionKind::ParagraphBackward => {
            for _ in 0..n {
                text_motion::paragraph_backward(buf, &mut pos);
            }
            Landing::at(pos)
        }
        MotionKind::ScreenTop | MotionKind::ScreenMiddle | MotionKind::ScreenBottom => {
            let (first, last) = host.viewport_extent();
            let last = last.min(buf.last_line());
            let first = first.min(last);
            let line = match motion {
                MotionKind::ScreenTop => (first + n - 1).min(last),
                MotionKind::ScreenBottom => last.saturating_sub(n - 1).max(first),
                _ => first + (last - first) / 2,
            };
            Landing::at(text_motion::first_non_blank(buf, line))
        }
        MotionKind::HalfPageDown | MotionKind::HalfPageUp => {
            let (first, last) = host.viewport_extent();
            let height = last.saturating_sub(first) + 1;
            let amount = count.unwrap_or((height / 2).max(1));
            let down = matches!(motion, MotionKind::HalfPageDown);
            if (down && from.line == buf.last_line()) || (!down && from.line == 0) {
                return Err(ExecError::MotionFailed);
            }
            let line = if down {
                (from.line + amount).min(buf.last_line())
            } else {
                from.line.saturating_sub(amount)
            };
            let sticky = xpos.unwrap_or_else(|| text_motion::current_col(buf, &from));
            let content = buf.line_content(line);
            Landing {
                pos: Position::new(line, grapheme::byte_for_visual_col(&content, sticky, false)),
                xpos: Some(sticky),
            }
        }
        MotionKind::Search { forward, pattern } => {
            let pattern = if pattern.is_empty() {
                st.last_search
                    .as_ref()
                    .map(|s| s.pattern.clone())
                    .ok_or_else(|| ExecError::Message("E35: No previous regular expression".into()))?
            } else {
                pattern.clone()
            };
            st.last_search = Some(LastSearch {
                pattern: pattern.clone(),
                forward: *forward,
            });
            Landing::at(search_from(host, from, &pattern, *forward, n)?)
        }
        MotionKind::SearchNext { reverse } => {
            let last = st
                .last_search
                .clone()
                .ok_or_else(|| ExecError::Message("E35: No previous regular expression".into()))?;
            Landing::at(search_from(host, from, &last.pattern, last.forward != *reverse, n)?)
        }
        MotionKind::SearchWord { forward } => {
            let word = search::word_at(buf, from)
                .ok_or_else(|| ExecError::Message("E348: No string under cursor".into()))?;
            let pattern = search::word_pattern(&word);
            st.last_search = Some(LastSearch {
                pattern: pattern.clone(),
                forward: *forward,
            });
            Landing::at(search_from(host, from, &pattern, *forward, n)?)
        }
        MotionKind::MarkJump { mark, linewise } => {
            let target = st
                .marks
                .get(mark)
                .copied()
                .ok_or_else(|| ExecError::Message("E20: Mark not set".into()))?;
            let line = target.line.min(buf.last_line());
            if *linewise {
                Landing::at(text_motion::first_non_blank(buf, line))
            } else {
                let mut p = Position::new(line, target.byte);
                text_motion::normalize_normal_mode_position(buf, &mut p);
                Landing::at(p)
            }
        }
        MotionKind::Object { .. } | MotionKind::CurrentLine { .. } => {
            panic!("`{motion:?}` has no landing position")
        }
    };
    if motion.is_jump() && landing.pos != from {
        st.marks.insert('\'', from);
        st.marks.insert('`', from);
    }
    trace!(target: "actions.motion", ?motion, ?from, to = ?landing.pos, "landed");
    Ok(landing)
}

fn find_char(buf: &Buffer, from: Position, search: CharSearch, n: usize, repeat: bool) -> Result<Position, ExecError> {
    text_motion::find_in_line(buf, from, search.target, search.forward, search.till, as_u32(n), repeat)
        .ok_or(ExecError::MotionFailed)
}

fn search_from(host: &dyn Host, from: Position, pattern: &str, forward: bool, n: usize) -> Result<Position, ExecError> {
    let buf = host.text();
    let re = search::compile(pattern, host.get_bool("ignorecase", false))
        .map_err(|_| ExecError::Message(format!("E383: Invalid search string: {pattern}")))?;
    let wrap = host.get_bool("wrapscan", true);
    let mut at = buf.offset_of(from);
    for _ in 0..n {
        at = search::find_next(buf, at, &re, forward, wrap)
            .ok_or_else(|| ExecError::Message(format!("E486: Pattern not found: {pattern}")))?;
    }
    Ok(buf.position_of(at))
}

impl Interpreter {
    pub(super) fn exec_motion(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        motion: &MotionKind,
        count: Option<usize>,
        xpos: Option<usize>,
    ) -> Result<(), ExecError> {
        if let MotionKind::Object { kind, scope } = motion {
            return select_object(st, host, *kind, *scope, count);
        }
        let ctx = if st.mode.is_typing() { Context::Typing } else { Context::Caret };
        let from = caret_pos(host);
        let mut landing = land(st, host, motion, count, from, xpos.or(st.xpos), ctx)?;
        if ctx == Context::Caret {
            text_motion::normalize_normal_mode_position(host.text(), &mut landing.pos);
        }
        st.xpos = landing.xpos;
        let offset = host.text().offset_of(landing.pos);
        if st.mode.has_selection() {
            let a = anchor(host);
            host.set_selections(vec![Region::new(a, offset)]);
        } else {
            host.set_selections(vec![Region::caret(offset)]);
        }
        host.scroll_to(offset, ScrollAlign::Visible);
        Ok(())
    }

    pub(super) fn set_mark(&mut self, st: &mut SessionState, host: &mut dyn Host, mark: char) -> Result<(), ExecError> {
        if !(mark.is_ascii_alphabetic() || mark == '\'' || mark == '`') {
            return Err(ExecError::Message(
                "E191: Argument must be a letter or forward/backward quote".into(),
            ));
        }
        st.marks.insert(mark, caret_pos(host));
        Ok(())
    }
}

/// Select a text object around the caret. Only meaningful with a selection;
/// operators resolve objects themselves.
fn select_object(
    st: &mut SessionState,
    host: &mut dyn Host,
    kind: core_text::text_object::TextObjectKind,
    scope: ObjectScope,
    count: Option<usize>,
) -> Result<(), ExecError> {
    if !st.mode.has_selection() {
        return Err(ExecError::MotionFailed);
    }
    let buf = host.text();
    let caret = buf.offset_of(caret_pos(host));
    let span = kind
        .resolve(buf, caret, scope, as_u32(count.unwrap_or(1)))
        .ok_or(ExecError::MotionFailed)?;
    if span.start >= span.end {
        return Err(ExecError::MotionFailed);
    }
    let end = last_char_offset(buf, span.end);
    if span.linewise && st.mode == Mode::Visual {
        st.set_mode(Mode::VisualLine);
    }
    host.set_selections(vec![Region::new(span.start, end)]);
    host.scroll_to(end, ScrollAlign::Visible);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Buffer {
        Buffer::from_str("t", text).unwrap()
    }

    #[test]
    fn repeated_till_skips_the_adjacent_match() {
        let b = buf("a.b.c\n");
        let search = CharSearch {
            forward: true,
            till: true,
            target: '.',
        };
        let first = find_char(&b, Position::new(0, 0), search, 1, false).unwrap();
        assert_eq!(first, Position::new(0, 0));
        let again = find_char(&b, first, search, 1, true).unwrap();
        assert_eq!(again, Position::new(0, 2));
    }
}
