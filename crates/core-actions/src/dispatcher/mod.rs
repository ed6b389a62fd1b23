//! Executes resolved instructions against the host buffer.
//!
//! * `motion`   - caret movement and selection extension
//! * `operator` - operator ranges and their application
//! * `mode`     - mode transitions and insert sessions
//! * `edit`     - paste, join, replace, insert-mode edits, surround
//! * `undo`     - undo / redo dispatch
//!
//! Selections live in the host as byte-offset regions. Outside selection
//! modes the first region is a plain caret; in Visual modes `a` is the
//! anchor and `b` the caret, both sitting on the first byte of a grapheme
//! and both included in the selection.

use crate::Interpreter;
use core_state::{
    ActionKind, Host, Instruction, MacroError, Mode, RegisterError, SessionState, VisualShape,
};
use core_text::{Buffer, Position, grapheme, motion as text_motion};
use thiserror::Error;

mod edit;
mod mode;
mod motion;
mod operator;
mod undo;

pub(crate) use operator::{OpRange, selection_range};

/// Why an instruction did not run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// Rung as the bell.
    #[error("motion failed")]
    MotionFailed,
    #[error("nothing to do")]
    NoOp,
    /// Shown in the status line.
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Macro(#[from] MacroError),
    /// A nested replay stopped; its own failure was already reported.
    #[error("replay aborted")]
    Aborted,
}

impl Interpreter {
    pub(crate) fn execute(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        instr: &Instruction,
    ) -> Result<(), ExecError> {
        tracing::trace!(target: "actions.dispatch", instr = ?instr, mode = %st.mode, "execute");
        match instr {
            Instruction::Motion {
                motion,
                count,
                xpos,
            } => self.exec_motion(st, host, motion, *count, *xpos),
            Instruction::Operate {
                op,
                motion,
                count,
                register,
                xpos,
            } => self.exec_operate(st, host, *op, motion, *count, *register, *xpos),
            Instruction::OperateSelection {
                op,
                count,
                register,
            } => self.exec_operate_selection(st, host, *op, *count, *register),
            Instruction::Action {
                action,
                count,
                register,
            } => self.exec_action(st, host, action, *count, *register),
        }
    }

    fn exec_action(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        action: &ActionKind,
        count: Option<usize>,
        register: Option<char>,
    ) -> Result<(), ExecError> {
        use ActionKind::*;
        match action {
            EnterInsert(at) => self.enter_insert(st, host, *at, count),
            EnterVisual(mode) => {
                self.enter_visual(st, host, *mode);
                Ok(())
            }
            EnterSelect => {
                self.enter_visual(st, host, Mode::Select);
                Ok(())
            }
            EnterReplace => {
                let pos = caret_pos(host);
                self.begin_insert(st, host, Mode::Replace, pos, false);
                Ok(())
            }
            Escape => {
                self.escape(st, host);
                Ok(())
            }
            SelectToVisual => {
                st.set_mode(Mode::Visual);
                Ok(())
            }
            SwapSelectionEnds => {
                let regions = host
                    .get_selections()
                    .into_iter()
                    .map(|r| core_state::Region::new(r.b, r.a))
                    .collect();
                host.set_selections(regions);
                Ok(())
            }
            SelectRegister(_) => panic!("register selection reached the executor"),
            Shorthand { op, motion } => {
                let xpos = st.xpos;
                self.exec_operate(st, host, *op, motion, count, register, xpos)
            }
            Paste { before } => self.paste(st, host, *before, count, register),
            JoinLines => self.join_lines(st, host, count),
            ReplaceChar(c) => self.replace_char(st, host, *c, count),
            ToggleCaseChar => self.toggle_case_char(host, count),
            Undo => self.undo(st, host, count),
            Redo => self.redo(st, host, count),
            DotRepeat => self.dot_repeat(st, host, count),
            RecordMacro(reg) => self.toggle_recording(st, host, *reg),
            PlayMacro(reg) => self.play_macro(st, host, *reg, count),
            SetMark(c) => self.set_mark(st, host, *c),
            ScrollCaret(align) => {
                let at = caret(host);
                host.scroll_to(at, *align);
                Ok(())
            }
            ExCommandLine(line) => self.run_ex(st, host, line),
            InsertText(text) => self.insert_text(st, host, text),
            InsertNewline => self.insert_newline(st, host),
            InsertTab => self.insert_tab(st, host),
            DeleteBackward => self.delete_backward(st, host),
            DeleteForward => self.delete_forward(st, host),
            DeleteWordBackward => self.delete_word_backward(st, host),
            SurroundDelete(c) => self.surround_delete(host, *c),
            SurroundChange(from, to) => self.surround_change(host, *from, *to),
        }
    }
}

/// Caret end of the primary selection.
pub(crate) fn caret(host: &dyn Host) -> usize {
    host.get_selections().first().map_or(0, |r| r.b)
}

pub(crate) fn anchor(host: &dyn Host) -> usize {
    host.get_selections().first().map_or(0, |r| r.a)
}

pub(crate) fn caret_pos(host: &dyn Host) -> Position {
    host.text().position_of(caret(host))
}

/// Collapse the selection to a caret at `pos`.
pub(crate) fn set_caret(host: &mut dyn Host, pos: Position) {
    let offset = host.text().offset_of(pos);
    host.set_selections(vec![core_state::Region::caret(offset)]);
}

/// Collapse the selection to a caret at byte `offset`.
pub(crate) fn place_caret(host: &mut dyn Host, offset: usize) {
    host.set_selections(vec![core_state::Region::caret(offset)]);
}

pub(crate) fn normal_caret_at(host: &mut dyn Host, offset: usize) {
    let pos = host.text().position_of(offset);
    normal_caret(host, pos);
}

/// Collapse to a caret at `pos`, pulled back onto the last grapheme of its
/// line as Normal mode requires.
pub(crate) fn normal_caret(host: &mut dyn Host, mut pos: Position) {
    text_motion::normalize_normal_mode_position(host.text(), &mut pos);
    set_caret(host, pos);
}

/// Byte length of the grapheme starting at `offset`; 0 at a line end.
pub(crate) fn grapheme_len(buf: &Buffer, offset: usize) -> usize {
    buf.grapheme_at(buf.position_of(offset)).map_or(0, |g| g.len())
}

/// Start of the grapheme that ends at `end`, i.e. the last character of a
/// span ending there.
pub(crate) fn last_char_offset(buf: &Buffer, end: usize) -> usize {
    let p = buf.position_of(end.saturating_sub(1));
    let line = buf.line_content(p.line);
    if p.byte >= line.len() {
        return buf.offset_of(p);
    }
    buf.line_start_offset(p.line) + grapheme::prev_boundary(&line, p.byte + 1)
}

/// Size of the live selection, kept so `.` can rebuild it elsewhere.
pub(crate) fn visual_shape(mode: Mode, host: &dyn Host) -> VisualShape {
    let buf = host.text();
    match selection_range(mode, host) {
        OpRange::Block {
            first,
            last,
            left,
            right,
        } => VisualShape {
            mode,
            lines: last - first + 1,
            cols: right - left + 1,
        },
        OpRange::Lines { first, last } => VisualShape {
            mode,
            lines: last - first + 1,
            cols: 1,
        },
        OpRange::Chars { start, end } => {
            let s = buf.position_of(start);
            let e = buf.position_of(last_char_offset(buf, end.max(start + 1)));
            let start_col = grapheme::visual_col(&buf.line_content(s.line), s.byte);
            let end_col = grapheme::visual_col(&buf.line_content(e.line), e.byte);
            let cols = if s.line == e.line {
                end_col.saturating_sub(start_col) + 1
            } else {
                end_col + 1
            };
            VisualShape {
                mode,
                lines: e.line.saturating_sub(s.line) + 1,
                cols,
            }
        }
    }
}

/// Leading whitespace of `line`.
pub(crate) fn indent_of(buf: &Buffer, line: usize) -> String {
    buf.line_content(line)
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}
