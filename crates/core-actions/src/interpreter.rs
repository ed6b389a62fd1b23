//! Per-key interpretation.
//!
//! Each key either extends the count, feeds a command that is collecting
//! input, or joins the partial sequence that is looked up in the mapping
//! table. A resolved command runs immediately unless it still needs an
//! operator argument or inline input; keys the mapping did not consume are
//! fed again from the top.

use crate::{Interpreter, KeyOutcome, Meta, compose, dispatcher};
use core_events::{KeyToken, NamedKey, to_notation};
use core_keymap::{Resolution, Target};
use core_state::{
    Accept, ActionKind, CommandDef, Host, InputSpec, Instruction, Mode, Registers, RepeatPayload,
    RepeatRecord, SessionState,
};
use tracing::{debug, trace};

impl Interpreter {
    /// Feed one key from the host.
    pub fn press_key(&mut self, host: &mut dyn Host, key: KeyToken) -> KeyOutcome {
        let mut st = self.take_session(host);
        let outcome = self.feed(&mut st, host, key);
        self.put_session(st);
        outcome
    }

    pub(crate) fn feed(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        key: KeyToken,
    ) -> KeyOutcome {
        trace!(target: "input.interpreter", key = %key, mode = %st.mode, "key");
        if st.mode == Mode::InternalNormal {
            st.set_mode(Mode::Normal);
        }
        if st.must_collect_input {
            return self.collect(st, host, key);
        }
        if key.has_ctrl() && !host.get_bool("use_ctrl_keys", true) {
            trace!(target: "input.interpreter", key = %key, "ctrl key passed through");
            return KeyOutcome::PassThrough;
        }
        if let Some(digit) = key.digit()
            && st.partial_sequence.is_empty()
            && !st.mode.is_typing()
            && st.mode != Mode::Select
            && (digit != 0 || st.count_in_progress())
        {
            st.push_count_digit(digit);
            st.sequence.push(key);
            return KeyOutcome::Pending;
        }
        st.push_key(key.clone());
        st.push_uncounted(key);
        self.resolve(st, host)
    }

    fn resolve(&mut self, st: &mut SessionState, host: &mut dyn Host) -> KeyOutcome {
        match self.table.resolve(st, self.options.check_user_mappings) {
            Resolution::Incomplete => KeyOutcome::Pending,
            Resolution::Missing => self.missing(st, host),
            Resolution::Resolved {
                target,
                consumed,
                user,
            } => {
                let consumed = consumed.min(st.partial_sequence.len());
                let rest = st.partial_sequence.split_off(consumed);
                drop_tail(st, rest.len());
                let outcome = match target {
                    Target::Command(def) => self.dispatch_def(st, host, def),
                    Target::Expansion(keys) => {
                        debug!(target: "input.interpreter", user, rhs = %to_notation(&keys), "expanding remap");
                        self.expand(st, host, consumed, keys)
                    }
                };
                self.refeed(st, host, rest, outcome)
            }
        }
    }

    /// Replay a remap's right-hand side in place of its left-hand side. User
    /// mappings stay off while the expansion runs, so remaps never recurse.
    fn expand(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        lhs_len: usize,
        keys: Vec<KeyToken>,
    ) -> KeyOutcome {
        st.partial_sequence.clear();
        drop_tail(st, lhs_len);
        let saved = st.user_mappings_enabled;
        st.user_mappings_enabled = false;
        let mut outcome = KeyOutcome::Pending;
        for key in keys {
            outcome = self.feed(st, host, key);
        }
        st.user_mappings_enabled = saved;
        outcome
    }

    fn refeed(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        rest: Vec<KeyToken>,
        first: KeyOutcome,
    ) -> KeyOutcome {
        let mut outcome = first;
        for key in rest {
            outcome = self.feed(st, host, key);
        }
        outcome
    }

    /// No mapping matches the partial sequence. Typing modes insert the
    /// first key literally; everywhere else the command is abandoned.
    pub(crate) fn missing(&mut self, st: &mut SessionState, host: &mut dyn Host) -> KeyOutcome {
        let keys = std::mem::take(&mut st.partial_sequence);
        let literal = st.mode.is_typing() || st.mode == Mode::Select;
        if literal && let Some(c) = keys.first().and_then(KeyToken::as_char) {
            let rest = keys[1..].to_vec();
            drop_tail(st, rest.len());
            let instr = Instruction::Action {
                action: ActionKind::InsertText(c.to_string()),
                count: None,
                register: None,
            };
            let outcome = self.execute_command(st, host, instr, Meta::plain());
            return self.refeed(st, host, rest, outcome);
        }
        debug!(target: "input.interpreter", keys = %to_notation(&keys), mode = %st.mode, "unmapped sequence");
        host.bell();
        self.abandon(st);
        KeyOutcome::Failed
    }

    /// Hand the next key to the command collecting inline input.
    fn collect(&mut self, st: &mut SessionState, host: &mut dyn Host, key: KeyToken) -> KeyOutcome {
        st.sequence.push(key.clone());
        st.push_uncounted(key.clone());
        let from_motion = st.pending_motion.is_some();
        let slot = if from_motion {
            st.pending_motion.take()
        } else {
            st.pending_action.take()
        };
        let Some(mut def) = slot else {
            panic!("collecting input in {} mode with no pending command", st.mode);
        };
        let mut collected = std::mem::take(&mut st.collected);
        let verdict = def.accept(&key, &mut collected);
        st.collected = collected;
        match verdict {
            Accept::More => {
                if from_motion {
                    st.pending_motion = Some(def);
                } else {
                    st.pending_action = Some(def);
                }
                KeyOutcome::Pending
            }
            Accept::Cancel => {
                debug!(target: "input.interpreter", command = def.name(), key = %key, "input cancelled");
                self.abandon(st);
                if key.is_named(NamedKey::Esc) {
                    KeyOutcome::Cancelled
                } else {
                    host.bell();
                    KeyOutcome::Failed
                }
            }
            Accept::Done => {
                st.must_collect_input = false;
                st.collected.clear();
                self.run_def(st, host, def)
            }
        }
    }

    fn dispatch_def(&mut self, st: &mut SessionState, host: &mut dyn Host, def: CommandDef) -> KeyOutcome {
        debug!(target: "input.interpreter", command = def.name(), mode = %st.mode, "resolved");
        if is_surround(&def) && !host.get_bool("enable_surround", true) {
            return self.missing(st, host);
        }
        if def.accepts_input(st) {
            if let InputSpec::Line(kind) = def.caps().input
                && !st.non_interactive
            {
                return self.open_prompt(st, host, &def, kind);
            }
            st.must_collect_input = true;
            st.collected.clear();
            if matches!(def, CommandDef::Motion { .. }) {
                st.pending_motion = Some(def);
            } else {
                st.pending_action = Some(def);
            }
            return KeyOutcome::Pending;
        }
        self.run_def(st, host, def)
    }

    /// Run a command whose input is complete.
    pub(crate) fn run_def(&mut self, st: &mut SessionState, host: &mut dyn Host, def: CommandDef) -> KeyOutcome {
        if def.motion_required(st.mode) {
            debug!(target: "input.context", operator = def.name(), "operator pending");
            st.pending_action = Some(def);
            st.set_mode(Mode::OperatorPending);
            st.mapping_boundary();
            return KeyOutcome::Pending;
        }
        if let CommandDef::Action {
            action: ActionKind::SelectRegister(reg),
            ..
        } = &def
        {
            return self.select_register(st, host, *reg);
        }
        let pending = st.pending_action.take();
        let (instr, meta) = match pending {
            Some(op) if op.is_operator() && matches!(def, CommandDef::Motion { .. }) => {
                match compose(&op, &def, st) {
                    Ok(instr) => (
                        instr,
                        Meta {
                            repeatable: op.is_repeatable(),
                            updates_xpos: true,
                        },
                    ),
                    Err(error) => {
                        debug!(target: "actions.compose", %error, "composition rejected");
                        host.bell();
                        self.abandon(st);
                        return KeyOutcome::Failed;
                    }
                }
            }
            other => {
                st.pending_action = other;
                (def.translate(st), Meta::of(&def))
            }
        };
        self.execute_command(st, host, instr, meta)
    }

    fn select_register(&mut self, st: &mut SessionState, host: &mut dyn Host, reg: char) -> KeyOutcome {
        if !Registers::is_readable(reg) {
            host.status_message(&format!("E354: Invalid register name: '{reg}'"));
            self.abandon(st);
            return KeyOutcome::Failed;
        }
        debug!(target: "input.context", register = %reg, "register selected");
        st.register = Some(reg);
        st.mapping_boundary();
        KeyOutcome::Pending
    }

    /// Execute a translated instruction, then record it for dot-repeat and
    /// clear the command data.
    pub(crate) fn execute_command(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        instr: Instruction,
        meta: Meta,
    ) -> KeyOutcome {
        let mode_before = st.mode;
        let notation = to_notation(&st.uncounted);
        if mode_before.is_typing()
            && let Some(RepeatRecord {
                payload: RepeatPayload::Vi { notation: typed, .. },
                ..
            }) = st.repeat_data.as_mut()
        {
            typed.push_str(&notation);
        }
        let shape = if mode_before.has_selection() {
            Some(dispatcher::visual_shape(mode_before, host))
        } else {
            None
        };
        match self.run_instruction(st, host, &instr) {
            Ok(()) => {
                if meta.repeatable && !mode_before.is_typing() && !self.replaying_dot && !self.macros.is_playing() {
                    let origin = match mode_before {
                        Mode::OperatorPending => Mode::Normal,
                        other => other,
                    };
                    let mut record = RepeatRecord::vi(notation, instr.count(), origin);
                    record.visual_shape = shape;
                    if st.mode.is_typing() {
                        st.repeat_data = Some(record);
                    } else {
                        debug!(target: "actions.repeat", record = ?record.payload, "repeat recorded");
                        self.repeat = Some(record);
                    }
                }
                if meta.updates_xpos && !matches!(instr, Instruction::Motion { .. }) {
                    st.xpos = None;
                }
                st.reset_command_data();
                self.show_queued_panel(st, host);
                KeyOutcome::Executed
            }
            Err(error) => {
                self.queued_panel = None;
                self.report(host, &error);
                self.abandon(st);
                KeyOutcome::Failed
            }
        }
    }

    /// Execute one instruction inside an edit group when it changes text,
    /// and append it to the macro being recorded.
    pub(crate) fn run_instruction(
        &mut self,
        st: &mut SessionState,
        host: &mut dyn Host,
        instr: &Instruction,
    ) -> Result<(), crate::ExecError> {
        let grouped = match instr {
            Instruction::Action {
                action:
                    ActionKind::Undo | ActionKind::Redo | ActionKind::DotRepeat | ActionKind::PlayMacro(_),
                ..
            } => false,
            Instruction::Action {
                action: ActionKind::ExCommandLine(_),
                ..
            } => true,
            other => other.mutates_buffer(),
        };
        if grouped {
            self.open_run_group(host);
            host.begin_edit_group();
        }
        let result = self.execute(st, host, instr);
        if grouped {
            host.end_edit_group();
        }
        let starts_recording = matches!(
            instr,
            Instruction::Action {
                action: ActionKind::RecordMacro(_),
                ..
            }
        );
        if result.is_ok()
            && !starts_recording
            && !self.replaying_dot
            && !self.macros.is_playing()
            && self.macros.recording(st.buffer).is_some()
        {
            self.macros.record(st.buffer, instr);
        }
        result
    }

    /// Clear the command in progress; pending modes fall back to Normal.
    pub(crate) fn abandon(&mut self, st: &mut SessionState) {
        st.reset_command_data();
        if matches!(st.mode, Mode::OperatorPending | Mode::InternalNormal) {
            st.set_mode(Mode::Normal);
        }
    }
}

/// Forget the last `n` keys of the current sequence.
fn drop_tail(st: &mut SessionState, n: usize) {
    st.sequence.truncate(st.sequence.len().saturating_sub(n));
    st.uncounted.truncate(st.uncounted.len().saturating_sub(n));
}

fn is_surround(def: &CommandDef) -> bool {
    matches!(
        def,
        CommandDef::Action {
            action: ActionKind::SurroundDelete(_) | ActionKind::SurroundChange(..),
            ..
        }
    )
}
