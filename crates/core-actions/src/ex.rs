//! Colon command lines.
//!
//! The interpreter does not understand ex syntax. It hands the line to an
//! [`ExParser`], which either produces a host-native command or one of the
//! commands the interpreter applies itself: the init-file forms (`map`,
//! `unmap`, `set`) and `:registers`.

use crate::Interpreter;
use crate::dispatcher::{ExecError, caret, normal_caret_at};
use core_config::{InitCommand, is_init_command, parse_line};
use core_state::{Host, Mode, NativeCommand, Registers, SessionState};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExError {
    #[error("empty command line")]
    Empty,
    #[error("E492: Not an editor command: {0}")]
    Invalid(String),
    #[error("E474: Invalid argument: {0}")]
    Argument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// Executed by the host.
    Native(NativeCommand),
    /// Applied to the interpreter's mapping table or the buffer's settings.
    Init(InitCommand),
    /// `:registers` / `:display`: list the registers in a quick panel.
    Registers,
}

/// Turns a command line into something executable.
pub trait ExParser: fmt::Debug {
    fn parse(&self, line: &str) -> Result<ExCommand, ExError>;
}

/// Recognizes `map`/`unmap`/`set` forms, `:registers` and a bare line number;
/// everything else becomes a native command named by its first word.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExParser;

impl ExParser for DefaultExParser {
    fn parse(&self, line: &str) -> Result<ExCommand, ExError> {
        let line = line.trim();
        let line = line.strip_prefix(':').unwrap_or(line).trim_start();
        if line.is_empty() {
            return Err(ExError::Empty);
        }
        if line.chars().all(|c| c.is_ascii_digit()) {
            return Ok(ExCommand::Native(NativeCommand::with_args("goto", [line])));
        }
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ExError::Empty);
        };
        if is_init_command(name) {
            return match parse_line(line) {
                Ok(Some(cmd)) => Ok(ExCommand::Init(cmd)),
                Ok(None) => Err(ExError::Empty),
                Err(reason) => Err(ExError::Argument(reason)),
            };
        }
        if abbreviates(name, "registers", 3) || abbreviates(name, "display", 2) {
            return Ok(ExCommand::Registers);
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '!' || c == '_') {
            return Err(ExError::Invalid(line.to_string()));
        }
        Ok(ExCommand::Native(NativeCommand::with_args(name, words)))
    }
}

/// `name` is `full` cut down to at least `min` characters.
fn abbreviates(name: &str, full: &str, min: usize) -> bool {
    name.len() >= min && full.starts_with(name)
}

/// One line per non-empty register, control characters shown as `^J`.
fn register_listing(registers: &Registers) -> Vec<(char, String)> {
    registers
        .snapshot()
        .into_iter()
        .map(|(c, value)| {
            let shown: String = value
                .text
                .chars()
                .flat_map(|ch| match ch {
                    '\n' => vec!['^', 'J'],
                    '\t' => vec!['^', 'I'],
                    other => vec![other],
                })
                .collect();
            (c, format!("\"{c}   {shown}"))
        })
        .collect()
}

impl Interpreter {
    pub(crate) fn run_ex(&mut self, st: &mut SessionState, host: &mut dyn Host, line: &str) -> Result<(), ExecError> {
        if st.mode.has_selection() {
            st.set_mode(Mode::Normal);
            let at = caret(host);
            normal_caret_at(host, at);
        }
        let command = match self.ex.parse(line) {
            Ok(command) => command,
            Err(ExError::Empty) => return Ok(()),
            Err(error) => {
                debug!(target: "actions.ex", line, %error, "ex line rejected");
                return Err(ExecError::Message(error.to_string()));
            }
        };
        debug!(target: "actions.ex", ?command, "ex command");
        match command {
            ExCommand::Native(cmd) => host.run_native(&cmd).map_err(ExecError::Message),
            ExCommand::Init(cmd) => self.apply_ex_init(host, cmd),
            ExCommand::Registers => {
                let listing = register_listing(&self.registers);
                if listing.is_empty() {
                    host.status_message("no registers set");
                } else {
                    self.queued_panel = Some(listing);
                }
                Ok(())
            }
        }
    }

    /// `map`/`unmap` change the shared table; `set` only the current buffer.
    fn apply_ex_init(&mut self, host: &mut dyn Host, cmd: InitCommand) -> Result<(), ExecError> {
        match cmd {
            InitCommand::Map { modes, lhs, rhs } => {
                self.table.remap(&lhs, modes, rhs);
                Ok(())
            }
            InitCommand::Unmap { modes, lhs } => {
                if self.table.unmap(&lhs, modes) {
                    Ok(())
                } else {
                    warn!(target: "actions.ex", lhs = %core_events::to_notation(&lhs), "no such mapping");
                    Err(ExecError::Message("E31: No such mapping".into()))
                }
            }
            InitCommand::Set { name, value } => {
                let status = format!("{name}={value}");
                host.set(&name, value);
                host.status_message(&status);
                Ok(())
            }
        }
    }
}
