//! Non-interactive key replay.
//!
//! [`Interpreter::run_notation`] feeds a notation string as if typed, with
//! prompts disabled: a search collects its pattern up to `<CR>` inline. Edits
//! made during one run undo as a single step.

use crate::{Interpreter, KeyOutcome};
use core_events::{KeyToken, NotationError, parse_notation};
use core_state::{Host, SessionState};
use tracing::{debug, warn};

/// Tally of one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub keys: usize,
    pub executed: usize,
    pub failed: usize,
    pub passed_through: usize,
    /// The run ended with a command still waiting for keys.
    pub incomplete: bool,
}

impl RunReport {
    pub fn ok(&self) -> bool {
        self.failed == 0 && !self.incomplete
    }
}

impl Interpreter {
    /// Run `text` as key notation against `host`, prefixed with `count`.
    pub fn run_notation(
        &mut self,
        host: &mut dyn Host,
        text: &str,
        count: Option<usize>,
    ) -> Result<RunReport, NotationError> {
        let mut keys = parse_notation(text)?;
        if let Some(n) = count {
            let digits = n.to_string().chars().map(KeyToken::Char).collect::<Vec<_>>();
            keys.splice(0..0, digits);
        }
        let mut st = self.take_session(host);
        let report = self.replay_keys(&mut st, host, keys);
        self.put_session(st);
        Ok(report)
    }

    /// Replay notation inside a command already in progress. `noremap`
    /// turns user remaps off for the duration.
    pub(crate) fn replay(&mut self, st: &mut SessionState, host: &mut dyn Host, text: &str, noremap: bool) -> RunReport {
        let keys = match parse_notation(text) {
            Ok(keys) => keys,
            Err(error) => {
                warn!(target: "actions.runner", %error, text, "unparsable replay");
                return RunReport {
                    failed: 1,
                    ..RunReport::default()
                };
            }
        };
        let saved = st.user_mappings_enabled;
        if noremap {
            st.user_mappings_enabled = false;
        }
        let report = self.replay_keys(st, host, keys);
        st.user_mappings_enabled = saved;
        report
    }

    fn replay_keys(&mut self, st: &mut SessionState, host: &mut dyn Host, keys: Vec<KeyToken>) -> RunReport {
        let saved = st.non_interactive;
        st.non_interactive = true;
        self.run_groups.push(false);
        let mut report = RunReport {
            keys: keys.len(),
            ..RunReport::default()
        };
        for key in keys {
            match self.feed(st, host, key) {
                KeyOutcome::Executed => report.executed += 1,
                KeyOutcome::Failed | KeyOutcome::Stale => report.failed += 1,
                KeyOutcome::PassThrough => report.passed_through += 1,
                KeyOutcome::Pending | KeyOutcome::Prompt | KeyOutcome::Cancelled => {}
            }
        }
        if st.has_pending_command() {
            host.bell();
            self.abandon(st);
            report.incomplete = true;
        }
        if self.run_groups.pop() == Some(true) {
            host.end_edit_group();
        }
        st.non_interactive = saved;
        debug!(target: "actions.runner", ?report, "replay finished");
        report
    }

    /// Open the edit group of the innermost replay on its first edit.
    pub(crate) fn open_run_group(&mut self, host: &mut dyn Host) {
        if let Some(open) = self.run_groups.last_mut()
            && !*open
        {
            host.begin_edit_group();
            *open = true;
        }
    }

    /// Close the innermost replay's group early, e.g. before an undo.
    pub(crate) fn close_run_group(&mut self, host: &mut dyn Host) {
        if let Some(open) = self.run_groups.last_mut()
            && *open
        {
            host.end_edit_group();
            *open = false;
        }
    }
}
