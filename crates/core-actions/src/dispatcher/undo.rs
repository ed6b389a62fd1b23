//! Undo / redo dispatch. History itself lives in the host.

use super::{ExecError, normal_caret_at};
use crate::Interpreter;
use core_state::{Host, Mode, SessionState};
use tracing::debug;

impl Interpreter {
    pub(super) fn undo(&mut self, st: &mut SessionState, host: &mut dyn Host, count: Option<usize>) -> Result<(), ExecError> {
        self.step_history(st, host, count, false)
    }

    pub(super) fn redo(&mut self, st: &mut SessionState, host: &mut dyn Host, count: Option<usize>) -> Result<(), ExecError> {
        self.step_history(st, host, count, true)
    }

    fn step_history(&mut self, st: &mut SessionState, host: &mut dyn Host, count: Option<usize>, redo: bool) -> Result<(), ExecError> {
        // Edits made earlier in the same key run must be undoable as a unit.
        self.close_run_group(host);
        let mut done = 0;
        for _ in 0..count.unwrap_or(1).max(1) {
            let stepped = if redo { host.redo() } else { host.undo() };
            if !stepped {
                break;
            }
            done += 1;
        }
        debug!(target: "actions.undo", redo, steps = done, "history");
        if done == 0 {
            let msg = if redo { "Already at newest change" } else { "Already at oldest change" };
            return Err(ExecError::Message(msg.into()));
        }
        st.set_mode(Mode::Normal);
        let at = host.get_selections().first().map_or(0, |r| r.begin());
        normal_caret_at(host, at);
        Ok(())
    }
}
