//! Dot-repeat.
//!
//! The last repeatable command is kept as count-free key notation and is
//! replayed through the interpreter with remaps disabled. A count given to
//! `.` replaces the recorded one and becomes the new default. Commands
//! recorded over a visual selection also store the selection's size; `.`
//! from Normal mode rebuilds a selection of that size at the caret first.

use crate::dispatcher::{ExecError, caret_pos};
use crate::Interpreter;
use core_state::{
    Host, Mode, NativeCommand, Region, RepeatPayload, RepeatRecord, SessionState, VisualShape,
};
use core_text::{Position, grapheme};
use tracing::debug;

impl Interpreter {
    pub(crate) fn dot_repeat(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        count: Option<usize>,
    ) -> Result<(), ExecError> {
        let Some(mut record) = self.repeat.clone() else {
            return Err(ExecError::NoOp);
        };
        if count.is_some() {
            record.set_count(count);
            if let Some(stored) = self.repeat.as_mut() {
                stored.set_count(count);
            }
        }
        if st.mode.has_selection() && record.visual_shape.is_none() {
            return Err(ExecError::NoOp);
        }
        st.reset_command_data();
        debug!(target: "actions.repeat", record = ?record.payload, "dot repeat");
        match &record.payload {
            RepeatPayload::Vi { notation, count } => {
                if !st.mode.has_selection()
                    && let Some(shape) = record.visual_shape
                {
                    rebuild_selection(st, host, shape);
                }
                let text = match count {
                    Some(n) => format!("{n}{notation}"),
                    None => notation.clone(),
                };
                let saved = self.replaying_dot;
                self.replaying_dot = true;
                let report = self.replay(st, host, &text, true);
                self.replaying_dot = saved;
                if report.ok() { Ok(()) } else { Err(ExecError::Aborted) }
            }
            RepeatPayload::Native { command, count } => {
                host.begin_edit_group();
                let mut result = Ok(());
                for _ in 0..count.unwrap_or(1).max(1) {
                    if let Err(msg) = host.run_native(command) {
                        result = Err(ExecError::Message(msg));
                        break;
                    }
                }
                host.end_edit_group();
                result
            }
        }
    }

    /// Tell the interpreter the host ran `command` on its own, so `.` can
    /// repeat it. Inside an insert session the command becomes the session's
    /// repeat payload.
    pub fn on_native_command(&mut self, host: &mut dyn Host, command: NativeCommand, repeatable: bool) {
        if !repeatable {
            return;
        }
        let mut st = self.take_session(host);
        let record = RepeatRecord::native(command, None, st.mode);
        if st.mode.is_typing() {
            if let Some(session) = st.insert_session.as_mut() {
                session.dirty = true;
            }
            st.repeat_data = Some(record);
        } else {
            debug!(target: "actions.repeat", record = ?record.payload, "native command recorded");
            self.repeat = Some(record);
        }
        self.put_session(st);
    }
}

/// Select a region shaped like `shape` starting at the caret.
fn rebuild_selection(st: &mut SessionState, host: &mut dyn Host, shape: VisualShape) {
    let buf = host.text();
    let from = caret_pos(host);
    let last_line = (from.line + shape.lines.saturating_sub(1)).min(buf.last_line());
    let col_of = |line: usize, col: usize| {
        let content = buf.line_content(line);
        Position::new(line, grapheme::byte_for_visual_col(&content, col, false))
    };
    let start_col = grapheme::visual_col(&buf.line_content(from.line), from.byte);
    let end = match shape.mode {
        Mode::VisualLine => Position::new(last_line, from.byte.min(buf.line_byte_len(last_line))),
        Mode::VisualBlock => col_of(last_line, start_col + shape.cols.saturating_sub(1)),
        _ if shape.lines <= 1 => col_of(from.line, start_col + shape.cols.saturating_sub(1)),
        _ => col_of(last_line, shape.cols.saturating_sub(1)),
    };
    let a = buf.offset_of(from);
    let b = buf.offset_of(end);
    host.set_selections(vec![Region::new(a, b)]);
    st.set_mode(shape.mode);
}
