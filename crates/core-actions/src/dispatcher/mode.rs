//! Mode transitions and insert sessions.

use super::{ExecError, caret, caret_pos, indent_of, normal_caret, place_caret, set_caret};
use crate::Interpreter;
use core_state::{Host, InsertAt, InsertSession, Mode, Region, RepeatPayload, SessionState};
use core_text::{Position, motion as text_motion};
use tracing::debug;

impl Interpreter {
    /// Enter Insert mode at `at`. A count repeats the typed text on `<Esc>`.
    pub(super) fn enter_insert(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        at: InsertAt,
        count: Option<usize>,
    ) -> Result<(), ExecError> {
        let extra = count.unwrap_or(1).saturating_sub(1);
        let here = caret_pos(host);
        let buf = host.text();
        let (pos, dirty) = match at {
            InsertAt::Before => (here, false),
            InsertAt::After => {
                let mut pos = here;
                text_motion::right(buf, &mut pos, true);
                (pos, false)
            }
            InsertAt::FirstNonBlank => (text_motion::first_non_blank(buf, here.line), false),
            InsertAt::LineEnd => (Position::new(here.line, buf.line_byte_len(here.line)), false),
            InsertAt::OpenBelow | InsertAt::OpenAbove => {
                let indent = if host.get_bool("autoindent", false) {
                    indent_of(buf, here.line)
                } else {
                    String::new()
                };
                let (at_offset, text, pos) = if at == InsertAt::OpenBelow {
                    let end = buf.line_start_offset(here.line) + buf.line_byte_len(here.line);
                    (end, format!("\n{indent}"), Position::new(here.line + 1, indent.len()))
                } else {
                    let start = buf.line_start_offset(here.line);
                    (start, format!("{indent}\n"), Position::new(here.line, indent.len()))
                };
                // The new line joins the insert session's undo group.
                self.begin_insert(st, host, Mode::Insert, here, true);
                host.insert(at_offset, &text);
                set_caret(host, pos);
                if let Some(session) = st.insert_session.as_mut() {
                    session.extra = extra;
                    session.open_prefix = Some(format!("\n{indent}"));
                }
                return Ok(());
            }
        };
        self.begin_insert(st, host, Mode::Insert, pos, dirty);
        if let Some(session) = st.insert_session.as_mut() {
            session.extra = extra;
        }
        Ok(())
    }

    /// Start an insert session in `mode` with the caret at `pos`. Everything
    /// typed until `<Esc>` undoes as one step.
    pub(crate) fn begin_insert(&mut self, st: &mut SessionState, host: &mut dyn Host, mode: Mode, pos: Position, dirty: bool) {
        host.begin_edit_group();
        st.insert_session = Some(InsertSession {
            dirty,
            ..InsertSession::default()
        });
        st.set_mode(mode);
        set_caret(host, pos);
        debug!(target: "actions.mode", mode = %mode, dirty, "insert session started");
    }

    /// Close the insert session: remember the typed text, commit the
    /// pending repeat record when anything changed, and step back onto the
    /// last inserted grapheme.
    pub(crate) fn finish_insert(&mut self, st: &mut SessionState, host: &mut dyn Host) {
        if let Some(session) = st.insert_session.take() {
            if st.mode == Mode::Insert {
                repeat_typed(host, &session);
            }
            self.registers.set_last_inserted(session.typed.clone());
            if let Some(mut record) = st.repeat_data.take()
                && session.dirty
            {
                if let RepeatPayload::Vi { notation, .. } = &mut record.payload
                    && !notation.ends_with("<Esc>")
                {
                    notation.push_str("<Esc>");
                }
                self.repeat = Some(record);
            }
            host.end_edit_group();
            debug!(target: "actions.mode", dirty = session.dirty, typed = session.typed.len(), "insert session finished");
        }
        st.repeat_data = None;
        st.set_mode(Mode::Normal);
        let mut pos = caret_pos(host);
        text_motion::left(host.text(), &mut pos);
        normal_caret(host, pos);
    }

    pub(super) fn escape(&mut self, st: &mut SessionState, host: &mut dyn Host) {
        if st.mode.is_typing() {
            self.finish_insert(st, host);
        } else if st.mode.has_selection() {
            st.set_mode(Mode::Normal);
            let pos = caret_pos(host);
            normal_caret(host, pos);
        } else {
            st.set_mode(Mode::Normal);
        }
    }

    /// Enter `mode` from Normal, switch between selection shapes, or leave
    /// when `mode` is already active.
    pub(super) fn enter_visual(&mut self, st: &mut SessionState, host: &mut dyn Host, mode: Mode) {
        if st.mode == mode {
            self.escape(st, host);
            return;
        }
        if !st.mode.has_selection() {
            let pos = caret_pos(host);
            let mut normal = pos;
            text_motion::normalize_normal_mode_position(host.text(), &mut normal);
            let at = host.text().offset_of(normal);
            host.set_selections(vec![Region::caret(at)]);
        }
        st.set_mode(mode);
    }
}

/// Insert the session's extra copies after the caret, each on its own line
/// for `o`/`O`.
fn repeat_typed(host: &mut dyn Host, session: &InsertSession) {
    if session.extra == 0 || session.typed.is_empty() {
        return;
    }
    let (at, chunk) = match &session.open_prefix {
        Some(prefix) => {
            let pos = caret_pos(host);
            let buf = host.text();
            let end = buf.line_start_offset(pos.line) + buf.line_byte_len(pos.line);
            (end, format!("{prefix}{}", session.typed))
        }
        None => (caret(host), session.typed.clone()),
    };
    let text = chunk.repeat(session.extra);
    host.insert(at, &text);
    place_caret(host, at + text.len());
    debug!(target: "actions.mode", copies = session.extra, "insert repeated");
}
