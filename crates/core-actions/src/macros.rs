//! Macro recording and playback.
//!
//! Recording stores resolved instructions rather than keys, so playback does
//! not depend on the mappings in effect when it runs.

use crate::Interpreter;
use crate::dispatcher::ExecError;
use core_state::{Host, Instruction, SessionState};
use tracing::{debug, warn};

impl Interpreter {
    /// `q{reg}` starts recording; `q` while recording stops.
    pub(crate) fn toggle_recording(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        reg: char,
    ) -> Result<(), ExecError> {
        if self.macros.recording(st.buffer).is_some() {
            let record = self.macros.stop(st.buffer);
            st.macro_recording = None;
            debug!(target: "actions.macro", steps = record.map_or(0, |r| r.steps.len()), "recording closed");
            return Ok(());
        }
        self.macros.start(st.buffer, reg)?;
        st.macro_recording = Some(reg);
        host.status_message(&format!("recording @{reg}"));
        Ok(())
    }

    /// `{count}@{reg}`; `@@` plays the last played register again. The
    /// whole playback undoes as one step.
    pub(crate) fn play_macro(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        reg: char,
        count: Option<usize>,
    ) -> Result<(), ExecError> {
        let reg = if reg == '@' {
            st.last_played_macro
                .ok_or_else(|| ExecError::Message("E748: No previously used register".into()))?
        } else {
            reg
        };
        let steps = self.macros.begin_play(reg)?;
        st.last_played_macro = Some(reg);
        st.reset_command_data();
        host.begin_edit_group();
        let result = self.play_steps(st, host, &steps, count.unwrap_or(1).max(1));
        host.end_edit_group();
        self.macros.end_play();
        if let Err(error) = &result {
            warn!(target: "actions.macro", register = %reg, %error, "playback stopped");
        }
        result
    }

    fn play_steps(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        steps: &[Instruction],
        times: usize,
    ) -> Result<(), ExecError> {
        for _ in 0..times {
            for step in steps {
                let mut step = step.clone();
                step.refresh_for_replay();
                if let Err(error) = self.run_instruction(st, host, &step) {
                    self.report(host, &error);
                    return Err(ExecError::Aborted);
                }
                if !matches!(step, Instruction::Motion { .. }) {
                    st.xpos = None;
                }
            }
        }
        Ok(())
    }
}
