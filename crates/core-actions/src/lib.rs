//! The key interpreter and everything that runs what it resolves.
//!
//! * `interpreter` - per-key state machine: counts, mapping lookup, inline
//!   input collection and dispatch of resolved commands
//! * [`compose`]   - pairs a pending operator with its motion
//! * `dispatcher`  - executes instructions against the host buffer
//! * `repeat` / `macros` - dot-repeat and macro recording/playback
//! * `runner`      - replays key notation through the interpreter
//! * `prompt`      - search / ex prompts, quick panels and their continuations
//! * [`ex`]        - hand-off of colon command lines
//! * `init`        - applying config and init scripts
//!
//! All state lives in an [`Interpreter`]: one [`SessionState`] per buffer
//! plus the process-wide mapping table, registers, macros and the last
//! repeatable command. Every entry point borrows the host for the duration
//! of one call and never retains it.

use core_keymap::MappingTable;
use core_state::{
    BufferId, CommandDef, Host, MacroRegistry, Mode, Region, Registers, RepeatRecord, SessionState,
    SettingValue,
};
use std::collections::HashMap;
use tracing::info;

pub mod compose;
mod dispatcher;
pub mod ex;
mod init;
mod interpreter;
mod macros;
mod prompt;
mod repeat;
mod runner;

pub use compose::{ComposeError, compose};
pub use dispatcher::ExecError;
pub use ex::{DefaultExParser, ExCommand, ExError, ExParser};
pub use runner::RunReport;

/// What a call into the interpreter did with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// More keys are needed to complete the command.
    Pending,
    Executed,
    /// A prompt was handed to the host; the command finishes through its
    /// continuation.
    Prompt,
    /// Rejected or failed; the bell or a status message has been issued.
    Failed,
    /// Abandoned quietly, e.g. `<Esc>` while collecting input.
    Cancelled,
    /// Ctrl chord ignored because `use_ctrl_keys` is off.
    PassThrough,
    /// A prompt continuation that no longer matches the session.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Consult user remaps before built-in mappings.
    pub check_user_mappings: bool,
    pub max_count: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            check_user_mappings: true,
            max_count: core_state::MAX_COUNT,
        }
    }
}

/// Execution flags carried from a command definition to its instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Meta {
    pub repeatable: bool,
    pub updates_xpos: bool,
}

impl Meta {
    pub(crate) fn of(def: &CommandDef) -> Self {
        Self {
            repeatable: def.is_repeatable(),
            updates_xpos: def.updates_xpos(),
        }
    }

    pub(crate) fn plain() -> Self {
        Self {
            repeatable: false,
            updates_xpos: true,
        }
    }
}

#[derive(Debug)]
pub struct Interpreter {
    table: MappingTable,
    registers: Registers,
    macros: MacroRegistry,
    /// Last completed repeatable command, shared by every buffer.
    repeat: Option<RepeatRecord>,
    sessions: HashMap<BufferId, SessionState>,
    options: InterpreterOptions,
    /// Settings written into each buffer the first time it is seen.
    defaults: Vec<(String, SettingValue)>,
    ex: Box<dyn ExParser>,
    replaying_dot: bool,
    /// One entry per active key replay; true once it opened its edit group.
    run_groups: Vec<bool>,
    /// Register listing waiting for the current command to finish.
    queued_panel: Option<Vec<(char, String)>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    pub fn with_options(options: InterpreterOptions) -> Self {
        Self {
            table: MappingTable::with_builtins(),
            registers: Registers::new(),
            macros: MacroRegistry::new(),
            repeat: None,
            sessions: HashMap::new(),
            options,
            defaults: Vec::new(),
            ex: Box::new(DefaultExParser),
            replaying_dot: false,
            run_groups: Vec::new(),
            queued_panel: None,
        }
    }

    /// Replace the ex command parser.
    pub fn with_ex_parser(mut self, parser: Box<dyn ExParser>) -> Self {
        self.ex = parser;
        self
    }

    pub fn options(&self) -> InterpreterOptions {
        self.options
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut MappingTable {
        &mut self.table
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn macros(&self) -> &MacroRegistry {
        &self.macros
    }

    pub fn repeat_record(&self) -> Option<&RepeatRecord> {
        self.repeat.as_ref()
    }

    pub fn session(&self, buffer: BufferId) -> Option<&SessionState> {
        self.sessions.get(&buffer)
    }

    /// Current mode of `buffer`; `Normal` before its first key.
    pub fn mode(&self, buffer: BufferId) -> Mode {
        match self.sessions.get(&buffer) {
            Some(st) if self.operator_prefix_pending(st) => Mode::OperatorPending,
            Some(st) => st.mode,
            None => Mode::Normal,
        }
    }

    /// `d` and `c` are also prefixes of `ds` and `cs`, so the trie holds them
    /// until the next key. They are operator-pending all the same.
    fn operator_prefix_pending(&self, st: &SessionState) -> bool {
        st.mode == Mode::Normal
            && !st.must_collect_input
            && !st.partial_sequence.is_empty()
            && self
                .table
                .builtin(Mode::Normal, &st.partial_sequence)
                .is_some_and(CommandDef::is_operator)
    }

    /// Setting applied to buffers seen from now on. Replaces an earlier
    /// default of the same name.
    pub fn set_default(&mut self, name: &str, value: SettingValue) {
        match self.defaults.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.defaults.push((name.to_string(), value)),
        }
    }

    pub fn defaults(&self) -> &[(String, SettingValue)] {
        &self.defaults
    }

    /// Abandon whatever the buffer's session was doing and return to Normal
    /// mode with a collapsed caret.
    pub fn reset(&mut self, host: &mut dyn Host) {
        let mut st = self.take_session(host);
        if st.insert_session.take().is_some() {
            host.end_edit_group();
        }
        st.repeat_data = None;
        st.reset_command_data();
        if st.mode != Mode::Normal {
            let caret = dispatcher::caret(host);
            host.set_selections(vec![Region::caret(caret)]);
            st.set_mode(Mode::Normal);
        }
        self.put_session(st);
    }

    /// Take the buffer's session out of the map, creating it on first use.
    /// Callers hand it back with [`Interpreter::put_session`].
    fn take_session(&mut self, host: &mut dyn Host) -> SessionState {
        let id = host.id();
        if let Some(st) = self.sessions.remove(&id) {
            return st;
        }
        for (name, value) in &self.defaults {
            host.set(name, value.clone());
        }
        let mut st = SessionState::new(id);
        st.max_count = self.options.max_count;
        info!(target: "input.interpreter", buffer = %id, "session created");
        st
    }

    fn put_session(&mut self, st: SessionState) {
        self.sessions.insert(st.buffer, st);
    }
}
