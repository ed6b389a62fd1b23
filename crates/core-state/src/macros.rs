//! Macro recording and storage.
//!
//! Recordings are keyed by buffer so two buffers can record independently;
//! finished macros are keyed by register and shared by every buffer.

use crate::command::Instruction;
use crate::host::BufferId;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroError {
    #[error("invalid macro register: {0:?}")]
    InvalidRegister(char),
    #[error("already recording into register {0:?}")]
    AlreadyRecording(char),
    #[error("register {0:?} holds no macro")]
    Empty(char),
    #[error("macro {0:?} invokes itself")]
    Recursive(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRecord {
    /// Register as typed; uppercase appends on stop.
    pub register: char,
    pub steps: Vec<Instruction>,
}

#[derive(Debug, Default)]
pub struct MacroRegistry {
    active: HashMap<BufferId, MacroRecord>,
    stored: HashMap<char, Vec<Instruction>>,
    playing: Vec<char>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_register(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '"'
    }

    fn slot(c: char) -> char {
        c.to_ascii_lowercase()
    }

    pub fn start(&mut self, buffer: BufferId, register: char) -> Result<(), MacroError> {
        if !Self::is_valid_register(register) {
            return Err(MacroError::InvalidRegister(register));
        }
        if let Some(active) = self.active.get(&buffer) {
            return Err(MacroError::AlreadyRecording(active.register));
        }
        info!(target: "actions.macro", %buffer, register = %register, "recording started");
        self.active.insert(
            buffer,
            MacroRecord {
                register,
                steps: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn recording(&self, buffer: BufferId) -> Option<char> {
        self.active.get(&buffer).map(|r| r.register)
    }

    /// Append one dispatched instruction to the buffer's active recording.
    pub fn record(&mut self, buffer: BufferId, step: &Instruction) {
        if let Some(active) = self.active.get_mut(&buffer) {
            active.steps.push(step.clone());
        }
    }

    /// Finish the buffer's recording and store it. Returns what was stored.
    pub fn stop(&mut self, buffer: BufferId) -> Option<MacroRecord> {
        let record = self.active.remove(&buffer)?;
        let slot = Self::slot(record.register);
        if record.register.is_ascii_uppercase() {
            self.stored
                .entry(slot)
                .or_default()
                .extend(record.steps.iter().cloned());
        } else {
            self.stored.insert(slot, record.steps.clone());
        }
        info!(target: "actions.macro", %buffer, register = %record.register, steps = record.steps.len(), "recording stopped");
        Some(record)
    }

    pub fn get(&self, register: char) -> Option<&[Instruction]> {
        self.stored.get(&Self::slot(register)).map(Vec::as_slice)
    }

    /// Check out a macro for playback. Fails when the register is empty or the
    /// macro is already on the play stack.
    pub fn begin_play(&mut self, register: char) -> Result<Vec<Instruction>, MacroError> {
        if !Self::is_valid_register(register) {
            return Err(MacroError::InvalidRegister(register));
        }
        let slot = Self::slot(register);
        if self.playing.contains(&slot) {
            return Err(MacroError::Recursive(register));
        }
        let steps = self
            .stored
            .get(&slot)
            .filter(|s| !s.is_empty())
            .cloned()
            .ok_or(MacroError::Empty(register))?;
        self.playing.push(slot);
        Ok(steps)
    }

    pub fn end_play(&mut self) {
        self.playing.pop();
    }

    pub fn is_playing(&self) -> bool {
        !self.playing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ActionKind, MotionKind};
    use pretty_assertions::assert_eq;

    fn down() -> Instruction {
        Instruction::Motion {
            motion: MotionKind::Down,
            count: None,
            xpos: Some(2),
        }
    }

    fn undo() -> Instruction {
        Instruction::Action {
            action: ActionKind::Undo,
            count: None,
            register: None,
        }
    }

    #[test]
    fn record_then_play() {
        let mut m = MacroRegistry::new();
        let b = BufferId(1);
        m.start(b, 'q').unwrap();
        assert_eq!(m.recording(b), Some('q'));
        m.record(b, &down());
        m.record(BufferId(2), &undo());
        let rec = m.stop(b).unwrap();
        assert_eq!(rec.steps, vec![down()]);
        assert_eq!(m.begin_play('q').unwrap(), vec![down()]);
        m.end_play();
        assert!(!m.is_playing());
    }

    #[test]
    fn uppercase_appends() {
        let mut m = MacroRegistry::new();
        let b = BufferId(1);
        m.start(b, 'a').unwrap();
        m.record(b, &down());
        m.stop(b);
        m.start(b, 'A').unwrap();
        m.record(b, &undo());
        m.stop(b);
        assert_eq!(m.get('a').unwrap(), &[down(), undo()]);
    }

    #[test]
    fn invalid_and_recursive() {
        let mut m = MacroRegistry::new();
        assert_eq!(m.start(BufferId(1), '%'), Err(MacroError::InvalidRegister('%')));
        assert_eq!(m.begin_play('z'), Err(MacroError::Empty('z')));
        m.start(BufferId(1), 'z').unwrap();
        assert_eq!(m.start(BufferId(1), 'y'), Err(MacroError::AlreadyRecording('z')));
        m.record(BufferId(1), &down());
        m.stop(BufferId(1));
        m.begin_play('z').unwrap();
        assert_eq!(m.begin_play('Z'), Err(MacroError::Recursive('Z')));
    }
}
