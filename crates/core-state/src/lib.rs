//! Modal session state and the contracts the engine shares with its host.
//!
//! * [`Mode`] / [`ModeSet`]: the modal state machine vocabulary.
//! * [`command`]: `CommandDef` (the capability contract every mapped command
//!   satisfies) and the `Instruction` values commands translate into.
//! * [`session`]: per-buffer [`SessionState`] plus dot-repeat records.
//! * [`registers`] and [`macros`]: process-wide register and macro storage.
//! * [`host`]: traits for the host buffer, UI and settings capabilities.

use std::fmt;

pub mod command;
pub mod host;
pub mod macros;
pub mod registers;
pub mod session;

pub use command::{
    Accept, ActionKind, Caps, CommandDef, InputSpec, InsertAt, Instruction, MotionKind,
    MotionPolicy, OperatorKind,
};
pub use host::{
    BufferId, Continuation, Host, HostBuffer, HostUi, NativeCommand, PromptKind, PromptRequest,
    QuickPanelRequest, Region, Resume, ScrollAlign, SettingValue, Settings,
};
pub use macros::{MacroError, MacroRecord, MacroRegistry};
pub use registers::{RegisterError, RegisterValue, Registers};
pub use session::{
    CharSearch, InsertSession, LastSearch, MAX_COUNT, RepeatPayload, RepeatRecord, SessionState,
    VisualShape,
};

/// Current editing mode. Exactly one is active per session.
///
/// `InternalNormal` exists only while an operator's motion runs against the
/// host selection and always resolves back to `Normal` before the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual,
    VisualLine,
    VisualBlock,
    Select,
    Replace,
    OperatorPending,
    InternalNormal,
    Unknown,
}

impl Mode {
    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine | Mode::VisualBlock)
    }

    /// Modes whose selection is a live range rather than a caret.
    pub fn has_selection(self) -> bool {
        self.is_visual() || self == Mode::Select
    }

    /// Modes where unmapped printable keys are typed into the buffer.
    pub fn is_typing(self) -> bool {
        matches!(self, Mode::Insert | Mode::Replace)
    }

    pub fn as_set(self) -> ModeSet {
        match self {
            Mode::Normal => ModeSet::NORMAL,
            Mode::Insert => ModeSet::INSERT,
            Mode::Visual => ModeSet::VISUAL,
            Mode::VisualLine => ModeSet::VISUAL_LINE,
            Mode::VisualBlock => ModeSet::VISUAL_BLOCK,
            Mode::Select => ModeSet::SELECT,
            Mode::Replace => ModeSet::REPLACE,
            Mode::OperatorPending => ModeSet::OPERATOR_PENDING,
            Mode::InternalNormal => ModeSet::INTERNAL_NORMAL,
            Mode::Unknown => ModeSet::empty(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Visual => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
            Mode::VisualBlock => "VISUAL BLOCK",
            Mode::Select => "SELECT",
            Mode::Replace => "REPLACE",
            Mode::OperatorPending => "OPERATOR PENDING",
            Mode::InternalNormal => "INTERNAL NORMAL",
            Mode::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

bitflags::bitflags! {
    /// Set of modes a mapping or command applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModeSet: u16 {
        const NORMAL = 1;
        const INSERT = 1 << 1;
        const VISUAL = 1 << 2;
        const VISUAL_LINE = 1 << 3;
        const VISUAL_BLOCK = 1 << 4;
        const SELECT = 1 << 5;
        const REPLACE = 1 << 6;
        const OPERATOR_PENDING = 1 << 7;
        const INTERNAL_NORMAL = 1 << 8;
        const ANY_VISUAL = Self::VISUAL.bits() | Self::VISUAL_LINE.bits() | Self::VISUAL_BLOCK.bits();
        /// Where a motion is usable: standalone, extending a selection, or as an operator argument.
        const MOTION = Self::NORMAL.bits() | Self::ANY_VISUAL.bits() | Self::OPERATOR_PENDING.bits();
    }
}

impl ModeSet {
    pub fn contains_mode(self, mode: Mode) -> bool {
        !mode.as_set().is_empty() && self.contains(mode.as_set())
    }
}
