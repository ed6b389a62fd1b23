//! Per-buffer interpreter state and the dot-repeat record.

use crate::command::CommandDef;
use crate::host::{BufferId, NativeCommand};
use crate::Mode;
use core_events::KeyToken;
use core_text::Position;
use std::collections::HashMap;
use tracing::debug;

/// Default ceiling for accumulated counts.
pub const MAX_COUNT: usize = 999_999;

/// Last `f F t T` search, replayed by `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharSearch {
    pub forward: bool,
    pub till: bool,
    pub target: char,
}

impl CharSearch {
    pub fn reversed(self) -> Self {
        Self {
            forward: !self.forward,
            ..self
        }
    }
}

/// Last `/ ? * #` pattern, replayed by `n` and `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSearch {
    pub pattern: String,
    pub forward: bool,
}

/// Extent of the selection a visual-mode command acted on, so `.` from
/// Normal mode can rebuild a selection of the same size at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualShape {
    pub mode: Mode,
    /// Number of lines covered, at least one.
    pub lines: usize,
    /// Columns covered on the last line (charwise) or block width.
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatPayload {
    /// Count-free notation replayed through the interpreter.
    Vi {
        notation: String,
        count: Option<usize>,
    },
    /// A host command replayed `count` times.
    Native {
        command: NativeCommand,
        count: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatRecord {
    pub payload: RepeatPayload,
    pub mode_at_record: Mode,
    pub visual_shape: Option<VisualShape>,
}

impl RepeatRecord {
    pub fn vi(notation: impl Into<String>, count: Option<usize>, mode: Mode) -> Self {
        Self {
            payload: RepeatPayload::Vi {
                notation: notation.into(),
                count,
            },
            mode_at_record: mode,
            visual_shape: None,
        }
    }

    pub fn native(command: NativeCommand, count: Option<usize>, mode: Mode) -> Self {
        Self {
            payload: RepeatPayload::Native { command, count },
            mode_at_record: mode,
            visual_shape: None,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match &self.payload {
            RepeatPayload::Vi { count, .. } | RepeatPayload::Native { count, .. } => *count,
        }
    }

    /// Replace the stored count (`5.` makes 5 the new default).
    pub fn set_count(&mut self, new: Option<usize>) {
        match &mut self.payload {
            RepeatPayload::Vi { count, .. } | RepeatPayload::Native { count, .. } => *count = new,
        }
    }
}

/// Bookkeeping for one stay in Insert or Replace mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSession {
    /// Buffer changed since the mode was entered.
    pub dirty: bool,
    /// Text typed during the session, stored in the `.` register on exit.
    pub typed: String,
    /// Extra copies of `typed` inserted on exit (`3ix<Esc>` gives two).
    pub extra: usize,
    /// Set for `o`/`O`: each extra copy goes on a new line opened with
    /// this prefix.
    pub open_prefix: Option<String>,
}

/// Mutable interpreter state for one buffer.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub buffer: BufferId,
    pub mode: Mode,
    /// Keys since the last full resolution.
    pub sequence: Vec<KeyToken>,
    /// Keys since the last mapping boundary; always a suffix of `sequence`.
    pub partial_sequence: Vec<KeyToken>,
    /// `sequence` without count digits; becomes the dot-repeat payload.
    pub uncounted: Vec<KeyToken>,
    pub action_count: Option<usize>,
    pub motion_count: Option<usize>,
    pub register: Option<char>,
    pub pending_action: Option<CommandDef>,
    pub pending_motion: Option<CommandDef>,
    pub must_collect_input: bool,
    /// Keys taken so far by the collecting command.
    pub collected: String,
    /// Repeat record under construction while in Insert/Replace.
    pub repeat_data: Option<RepeatRecord>,
    pub macro_recording: Option<char>,
    pub non_interactive: bool,
    /// Remembered column for vertical motions. `usize::MAX` sticks to line end.
    pub xpos: Option<usize>,
    pub marks: HashMap<char, Position>,
    pub last_char_search: Option<CharSearch>,
    pub last_search: Option<LastSearch>,
    /// Bumped whenever a prompt opens or pending data resets; continuations
    /// carrying an older value are stale.
    pub prompt_generation: u64,
    pub insert_session: Option<InsertSession>,
    /// Cleared while a remap expansion is being replayed.
    pub user_mappings_enabled: bool,
    pub last_played_macro: Option<char>,
    pub max_count: usize,
}

impl SessionState {
    pub fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            mode: Mode::Normal,
            sequence: Vec::new(),
            partial_sequence: Vec::new(),
            uncounted: Vec::new(),
            action_count: None,
            motion_count: None,
            register: None,
            pending_action: None,
            pending_motion: None,
            must_collect_input: false,
            collected: String::new(),
            repeat_data: None,
            macro_recording: None,
            non_interactive: false,
            xpos: None,
            marks: HashMap::new(),
            last_char_search: None,
            last_search: None,
            prompt_generation: 0,
            insert_session: None,
            user_mappings_enabled: true,
            last_played_macro: None,
            max_count: MAX_COUNT,
        }
    }

    /// Product of the action and motion counts, `None` when neither was typed.
    pub fn count(&self) -> Option<usize> {
        match (self.action_count, self.motion_count) {
            (None, None) => None,
            (a, m) => Some(
                a.unwrap_or(1)
                    .saturating_mul(m.unwrap_or(1))
                    .min(self.max_count),
            ),
        }
    }

    pub fn effective_count(&self) -> usize {
        self.count().unwrap_or(1)
    }

    /// True when a digit typed now extends a count already in progress, so a
    /// `0` is a digit rather than the line-start motion.
    pub fn count_in_progress(&self) -> bool {
        if self.pending_action.is_some() {
            self.motion_count.is_some()
        } else {
            self.action_count.is_some()
        }
    }

    /// Append one digit to the count being typed: the motion count once an
    /// operator is pending, the action count otherwise.
    pub fn push_count_digit(&mut self, digit: u32) {
        let slot = if self.pending_action.is_some() {
            &mut self.motion_count
        } else {
            &mut self.action_count
        };
        let next = slot
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(digit as usize)
            .min(self.max_count);
        *slot = Some(next);
        debug!(target: "input.context", action = ?self.action_count, motion = ?self.motion_count, "count extended");
    }

    pub fn push_key(&mut self, key: KeyToken) {
        self.sequence.push(key.clone());
        self.partial_sequence.push(key);
    }

    /// Record a non-count key in the repeatable notation.
    pub fn push_uncounted(&mut self, key: KeyToken) {
        self.uncounted.push(key);
    }

    /// Start a new lookup after a prefix (register, operator) resolved.
    pub fn mapping_boundary(&mut self) {
        self.partial_sequence.clear();
    }

    /// Forget everything about the command in progress. Mode, marks, searches,
    /// recording state and the remembered column survive.
    pub fn reset_command_data(&mut self) {
        self.sequence.clear();
        self.partial_sequence.clear();
        self.uncounted.clear();
        self.action_count = None;
        self.motion_count = None;
        self.register = None;
        self.pending_action = None;
        self.pending_motion = None;
        self.must_collect_input = false;
        self.collected.clear();
        self.prompt_generation = self.prompt_generation.wrapping_add(1);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(target: "input.context", from = %self.mode, to = %mode, "mode change");
            self.mode = mode;
        }
    }

    pub fn has_pending_command(&self) -> bool {
        !self.sequence.is_empty()
            || self.pending_action.is_some()
            || self.pending_motion.is_some()
            || self.must_collect_input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::OperatorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_multiply() {
        let mut s = SessionState::new(BufferId(0));
        assert_eq!(s.count(), None);
        assert_eq!(s.effective_count(), 1);
        s.push_count_digit(3);
        assert_eq!(s.count(), Some(3));
        s.pending_action = Some(CommandDef::operator("delete", OperatorKind::Delete));
        assert!(!s.count_in_progress());
        s.push_count_digit(2);
        assert!(s.count_in_progress());
        assert_eq!(s.count(), Some(6));
    }

    #[test]
    fn count_digits_build_ten() {
        let mut s = SessionState::new(BufferId(0));
        s.push_count_digit(1);
        s.push_count_digit(0);
        assert_eq!(s.action_count, Some(10));
    }

    #[test]
    fn count_saturates_at_ceiling() {
        let mut s = SessionState::new(BufferId(0));
        for _ in 0..12 {
            s.push_count_digit(9);
        }
        assert_eq!(s.action_count, Some(MAX_COUNT));
        s.motion_count = Some(MAX_COUNT);
        assert_eq!(s.count(), Some(MAX_COUNT));
    }

    #[test]
    fn reset_keeps_mode_and_bumps_generation() {
        let mut s = SessionState::new(BufferId(0));
        s.set_mode(Mode::Visual);
        s.push_key(KeyToken::Char('"'));
        s.register = Some('a');
        s.xpos = Some(4);
        let generation = s.prompt_generation;
        s.reset_command_data();
        assert_eq!(s.mode, Mode::Visual);
        assert!(s.sequence.is_empty());
        assert_eq!(s.register, None);
        assert_eq!(s.xpos, Some(4));
        assert_eq!(s.prompt_generation, generation + 1);
        assert!(!s.has_pending_command());
    }

    #[test]
    fn partial_sequence_is_suffix_after_boundary() {
        let mut s = SessionState::new(BufferId(0));
        s.push_key(KeyToken::Char('"'));
        s.push_key(KeyToken::Char('a'));
        s.mapping_boundary();
        s.push_key(KeyToken::Char('d'));
        assert!(s.sequence.ends_with(&s.partial_sequence));
        assert_eq!(s.partial_sequence, vec![KeyToken::Char('d')]);
    }

    #[test]
    fn repeat_record_count_override() {
        let mut r = RepeatRecord::vi("dw", Some(3), Mode::Normal);
        assert_eq!(r.count(), Some(3));
        r.set_count(Some(5));
        assert_eq!(
            r.payload,
            RepeatPayload::Vi {
                notation: "dw".into(),
                count: Some(5)
            }
        );
    }
}
