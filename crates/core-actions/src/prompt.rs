//! Search and ex prompts, and the register quick panel.
//!
//! Opening a prompt or panel hands the host a [`Continuation`] holding only
//! what is needed to finish the command later. The session's command data is reset
//! right away; when the host answers, the continuation is checked against
//! the session's prompt generation and ignored if anything happened since.

use crate::dispatcher::ExecError;
use crate::{Interpreter, KeyOutcome, Meta};
use core_events::{KeyToken, NamedKey, parse_notation, to_notation};
use core_state::{
    ActionKind, CommandDef, Continuation, Host, Instruction, Mode, MotionKind, PromptKind,
    PromptRequest, QuickPanelRequest, Resume, SessionState,
};
use core_text::search;
use tracing::{debug, info};

impl Interpreter {
    pub(crate) fn open_prompt(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        def: &CommandDef,
        kind: PromptKind,
    ) -> KeyOutcome {
        let origin_mode = match st.mode {
            Mode::OperatorPending => Mode::Normal,
            other => other,
        };
        let resume = match kind {
            PromptKind::Search { forward } => {
                let operator = match &st.pending_action {
                    Some(CommandDef::Operator { op, .. }) => Some(*op),
                    _ => None,
                };
                Resume::Search {
                    forward,
                    count: st.count(),
                    operator,
                    register: st.register,
                    origin_mode,
                    notation: to_notation(&st.uncounted),
                }
            }
            PromptKind::Ex => Resume::Ex { origin_mode },
        };
        st.reset_command_data();
        if st.mode == Mode::OperatorPending {
            st.set_mode(Mode::Normal);
        }
        let request = PromptRequest {
            kind,
            initial_text: String::new(),
            continuation: Continuation {
                buffer: st.buffer,
                generation: st.prompt_generation,
                resume,
            },
        };
        debug!(target: "input.interpreter", command = def.name(), leader = %kind.leader(), "prompt opened");
        host.show_prompt(request);
        KeyOutcome::Prompt
    }

    /// Host answered a prompt with `text`.
    pub fn on_prompt_done(&mut self, host: &mut dyn Host, cont: &Continuation, text: &str) -> KeyOutcome {
        let mut st = self.take_session(host);
        let outcome = self.finish_prompt(&mut st, host, cont, text);
        self.put_session(st);
        outcome
    }

    fn finish_prompt(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        cont: &Continuation,
        text: &str,
    ) -> KeyOutcome {
        if !is_current(st, host, cont) {
            info!(target: "input.interpreter", buffer = %cont.buffer, generation = cont.generation, "stale prompt answer ignored");
            return KeyOutcome::Stale;
        }
        match &cont.resume {
            Resume::Search {
                forward,
                count,
                operator,
                register,
                notation,
                ..
            } => {
                let motion = MotionKind::Search {
                    forward: *forward,
                    pattern: text.to_string(),
                };
                let (instr, meta) = match operator {
                    Some(op) => (
                        Instruction::Operate {
                            op: *op,
                            motion,
                            count: *count,
                            register: *register,
                            xpos: st.xpos,
                        },
                        Meta {
                            repeatable: op.mutates(),
                            updates_xpos: true,
                        },
                    ),
                    None => (
                        Instruction::Motion {
                            motion,
                            count: *count,
                            xpos: None,
                        },
                        Meta::plain(),
                    ),
                };
                // The repeat notation carries the pattern inline.
                let mut keys = parse_notation(notation).unwrap_or_default();
                keys.extend(text.chars().map(KeyToken::Char));
                keys.push(KeyToken::Named(NamedKey::Enter));
                st.uncounted = keys;
                if operator.is_some() {
                    st.set_mode(Mode::OperatorPending);
                }
                self.execute_command(st, host, instr, meta)
            }
            Resume::PickRegister { .. } => {
                debug!(target: "input.interpreter", "quick panel continuation answered as a prompt");
                KeyOutcome::Failed
            }
            Resume::Ex { .. } => {
                let instr = Instruction::Action {
                    action: ActionKind::ExCommandLine(text.to_string()),
                    count: None,
                    register: None,
                };
                self.execute_command(st, host, instr, Meta::plain())
            }
        }
    }

    /// Live preview while the user edits the prompt. Only the status line
    /// changes.
    pub fn on_prompt_change(&mut self, host: &mut dyn Host, cont: &Continuation, text: &str) -> KeyOutcome {
        let st = self.take_session(host);
        let current = is_current(&st, host, cont);
        self.put_session(st);
        if !current {
            return KeyOutcome::Stale;
        }
        let leader = match &cont.resume {
            Resume::Search { forward, .. } => PromptKind::Search { forward: *forward }.leader(),
            Resume::Ex { .. } => PromptKind::Ex.leader(),
            Resume::PickRegister { .. } => return KeyOutcome::Failed,
        };
        let mut status = format!("{leader}{text}");
        if matches!(cont.resume, Resume::Search { .. }) && !text.is_empty() {
            let buf = host.text();
            let found = search::compile(text, host.get_bool("ignorecase", false))
                .ok()
                .and_then(|re| re.find(&buf.text()).map(|_| ()))
                .is_some();
            if !found {
                status.push_str(" [no match]");
            }
        }
        host.status_message(&status);
        KeyOutcome::Pending
    }

    /// The prompt was dismissed. Always resets the command in progress.
    pub fn on_prompt_cancel(&mut self, host: &mut dyn Host, cont: &Continuation) -> KeyOutcome {
        let mut st = self.take_session(host);
        debug!(target: "input.interpreter", generation = cont.generation, "prompt cancelled");
        self.abandon(&mut st);
        self.put_session(st);
        KeyOutcome::Cancelled
    }

    /// Hand the host the register listing queued by `:registers`. Runs once
    /// the command is done so the continuation carries the settled
    /// generation.
    pub(crate) fn show_queued_panel(&mut self, st: &SessionState, host: &mut dyn Host) {
        let Some(listing) = self.queued_panel.take() else {
            return;
        };
        let (registers, items): (Vec<char>, Vec<String>) = listing.into_iter().unzip();
        debug!(target: "input.interpreter", items = items.len(), "quick panel opened");
        host.show_quick_panel(QuickPanelRequest {
            items,
            continuation: Continuation {
                buffer: st.buffer,
                generation: st.prompt_generation,
                resume: Resume::PickRegister { registers },
            },
        });
    }

    /// Host answered a quick panel with the index of the picked item, or
    /// `None` when it was dismissed. Picking a register pastes it after the
    /// caret, like `"xp`.
    pub fn on_quick_panel_pick(&mut self, host: &mut dyn Host, cont: &Continuation, pick: Option<usize>) -> KeyOutcome {
        let mut st = self.take_session(host);
        let outcome = self.finish_pick(&mut st, host, cont, pick);
        self.put_session(st);
        outcome
    }

    fn finish_pick(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        cont: &Continuation,
        pick: Option<usize>,
    ) -> KeyOutcome {
        if !is_current(st, host, cont) {
            info!(target: "input.interpreter", buffer = %cont.buffer, generation = cont.generation, "stale quick panel pick ignored");
            return KeyOutcome::Stale;
        }
        let Resume::PickRegister { registers } = &cont.resume else {
            return KeyOutcome::Failed;
        };
        let Some(register) = pick.and_then(|i| registers.get(i)) else {
            debug!(target: "input.interpreter", ?pick, "quick panel dismissed");
            return KeyOutcome::Cancelled;
        };
        let report = self.replay(st, host, &format!("\"{register}p"), true);
        if report.ok() {
            KeyOutcome::Executed
        } else {
            KeyOutcome::Failed
        }
    }

    /// Surface an execution failure to the user.
    pub(crate) fn report(&mut self, host: &mut dyn Host, error: &ExecError) {
        debug!(target: "actions.exec", %error, "command failed");
        match error {
            ExecError::MotionFailed | ExecError::NoOp => host.bell(),
            ExecError::Aborted => {}
            ExecError::Macro(_) => {
                host.bell();
                host.status_message(&error.to_string());
            }
            ExecError::Message(_) | ExecError::Register(_) => host.status_message(&error.to_string()),
        }
    }
}

/// Whether a continuation still belongs to the session: same buffer, same
/// generation, nothing typed since, and a selection still present if the
/// prompt was opened from one.
fn is_current(st: &SessionState, host: &dyn Host, cont: &Continuation) -> bool {
    let origin = match &cont.resume {
        Resume::Search { origin_mode, .. } | Resume::Ex { origin_mode } => *origin_mode,
        Resume::PickRegister { .. } => Mode::Normal,
    };
    cont.buffer == host.id()
        && cont.generation == st.prompt_generation
        && !st.has_pending_command()
        && origin.has_selection() == st.mode.has_selection()
}
