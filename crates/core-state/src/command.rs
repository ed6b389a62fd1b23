//! Command definitions and the instructions they translate into.
//!
//! Every mapped command is one [`CommandDef`]: a motion, an operator or an
//! action, each carrying the same capability record ([`Caps`]). Commands that
//! need extra keys after their mapping (a search target, a register name, a
//! mark) declare an [`InputSpec`] and receive those keys through
//! [`CommandDef::accept`], which fills the placeholder fields of the variant.

use crate::host::{PromptKind, ScrollAlign};
use crate::session::{CharSearch, SessionState};
use crate::{Mode, ModeSet};
use core_events::{KeyToken, NamedKey};
use core_text::text_object::{ObjectScope, TextObjectKind};

/// Extra input a command collects after its mapping resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSpec {
    None,
    /// A single character (`f`, `r`, `m`, `"`).
    Char,
    /// A fixed number of characters (`cs{from}{to}`).
    Chars(u8),
    /// A line terminated by `<CR>`; interactive sessions open a prompt instead.
    Line(PromptKind),
}

/// Result of feeding one key to a collecting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Done,
    More,
    Cancel,
}

/// How a motion's range is interpreted when an operator consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPolicy {
    /// End position is not part of the range.
    Exclusive,
    /// End position's character is part of the range.
    Inclusive,
    /// Whole lines from start to end.
    Linewise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionKind {
    Left { wrap: bool },
    Right { wrap: bool },
    Up,
    Down,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEnd { big: bool },
    LineStart,
    FirstNonBlank,
    LineEnd,
    /// `|`: screen column `count`.
    Column,
    /// `_` (count-1 lines down) and `+`/`<CR>` (count lines down).
    FirstNonBlankDown { skip_current: bool },
    /// `-`
    FirstNonBlankUp,
    /// `gg` goes to the first line without a count, `G` to the last.
    GotoLine { default_last: bool },
    FindChar(CharSearch),
    RepeatCharSearch { reverse: bool },
    MatchPair,
    ParagraphForward,
    ParagraphBackward,
    ScreenTop,
    ScreenMiddle,
    ScreenBottom,
    HalfPageDown,
    HalfPageUp,
    Search { forward: bool, pattern: String },
    SearchNext { reverse: bool },
    SearchWord { forward: bool },
    MarkJump { mark: char, linewise: bool },
    Object { kind: TextObjectKind, scope: ObjectScope },
    /// Second key of a doubled operator (`dd`, `gUU`). Only valid when the
    /// pending operator doubles with `key`.
    CurrentLine { key: &'static str },
}

impl MotionKind {
    /// Range policy when an operator consumes this motion. A repeated
    /// character search takes the policy of the search it repeats and is
    /// resolved to a `FindChar` before use.
    pub fn policy(&self) -> MotionPolicy {
        use MotionKind::*;
        match self {
            Up | Down | FirstNonBlankDown { .. } | FirstNonBlankUp | GotoLine { .. }
            | ScreenTop | ScreenMiddle | ScreenBottom | HalfPageDown | HalfPageUp
            | CurrentLine { .. } => MotionPolicy::Linewise,
            MarkJump { linewise: true, .. } => MotionPolicy::Linewise,
            WordEnd { .. } | LineEnd | MatchPair => MotionPolicy::Inclusive,
            FindChar(search) if search.forward => MotionPolicy::Inclusive,
            _ => MotionPolicy::Exclusive,
        }
    }

    /// Vertical motions keep the remembered column instead of resetting it.
    pub fn keeps_xpos(&self) -> bool {
        matches!(
            self,
            MotionKind::Up | MotionKind::Down | MotionKind::HalfPageDown | MotionKind::HalfPageUp
        )
    }

    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            MotionKind::GotoLine { .. }
                | MotionKind::Search { .. }
                | MotionKind::SearchNext { .. }
                | MotionKind::SearchWord { .. }
                | MotionKind::MatchPair
                | MotionKind::MarkJump { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Delete,
    Change,
    Yank,
    Indent,
    Unindent,
    Reindent,
    ToggleCase,
    Lowercase,
    Uppercase,
    Comment,
}

impl OperatorKind {
    pub fn name(self) -> &'static str {
        match self {
            OperatorKind::Delete => "delete",
            OperatorKind::Change => "change",
            OperatorKind::Yank => "yank",
            OperatorKind::Indent => "indent",
            OperatorKind::Unindent => "unindent",
            OperatorKind::Reindent => "reindent",
            OperatorKind::ToggleCase => "toggle-case",
            OperatorKind::Lowercase => "lowercase",
            OperatorKind::Uppercase => "uppercase",
            OperatorKind::Comment => "comment",
        }
    }

    /// Whether `key`, typed after this operator, means "the current line".
    pub fn doubles_with(self, key: &str) -> bool {
        match self {
            OperatorKind::Delete => key == "d",
            OperatorKind::Change => key == "c",
            OperatorKind::Yank => key == "y",
            OperatorKind::Indent => key == ">",
            OperatorKind::Unindent => key == "<",
            OperatorKind::Reindent => key == "=",
            OperatorKind::ToggleCase => key == "~" || key == "g~",
            OperatorKind::Lowercase => key == "u" || key == "gu",
            OperatorKind::Uppercase => key == "U" || key == "gU",
            OperatorKind::Comment => key == "c" || key == "gc",
        }
    }

    pub fn mutates(self) -> bool {
        self != OperatorKind::Yank
    }
}

/// Where `i a I A o O` place the caret before entering Insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertAt {
    Before,
    After,
    FirstNonBlank,
    LineEnd,
    OpenBelow,
    OpenAbove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    EnterInsert(InsertAt),
    /// Enter or toggle one of the visual shapes.
    EnterVisual(Mode),
    EnterSelect,
    EnterReplace,
    Escape,
    SelectToVisual,
    SwapSelectionEnds,
    SelectRegister(char),
    /// Single-key forms of an operator plus motion (`x`, `D`, `Y`, ...).
    Shorthand { op: OperatorKind, motion: MotionKind },
    Paste { before: bool },
    JoinLines,
    ReplaceChar(char),
    ToggleCaseChar,
    Undo,
    Redo,
    DotRepeat,
    RecordMacro(char),
    PlayMacro(char),
    SetMark(char),
    ScrollCaret(ScrollAlign),
    ExCommandLine(String),
    InsertText(String),
    InsertNewline,
    InsertTab,
    DeleteBackward,
    DeleteForward,
    DeleteWordBackward,
    SurroundDelete(char),
    SurroundChange(char, char),
}

impl ActionKind {
    pub fn mutates(&self) -> bool {
        use ActionKind::*;
        match self {
            EnterInsert(InsertAt::OpenBelow | InsertAt::OpenAbove) => true,
            Shorthand { op, .. } => op.mutates(),
            Paste { .. } | JoinLines | ReplaceChar(_) | ToggleCaseChar | Undo | Redo
            | DotRepeat | PlayMacro(_) | InsertText(_) | InsertNewline | InsertTab
            | DeleteBackward | DeleteForward | DeleteWordBackward | SurroundDelete(_)
            | SurroundChange(..) => true,
            _ => false,
        }
    }
}

/// Capability record shared by all command variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub name: &'static str,
    pub modes: ModeSet,
    pub input: InputSpec,
    pub repeatable: bool,
    pub updates_xpos: bool,
}

impl Caps {
    pub fn new(name: &'static str, modes: ModeSet) -> Self {
        Self {
            name,
            modes,
            input: InputSpec::None,
            repeatable: false,
            updates_xpos: true,
        }
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.input = input;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn keeps_xpos(mut self) -> Self {
        self.updates_xpos = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandDef {
    Motion { caps: Caps, motion: MotionKind },
    Operator { caps: Caps, op: OperatorKind },
    Action { caps: Caps, action: ActionKind },
}

impl CommandDef {
    /// A motion usable standalone, in visual modes and after an operator.
    pub fn motion(name: &'static str, motion: MotionKind) -> Self {
        let mut caps = Caps::new(name, ModeSet::MOTION);
        caps.updates_xpos = !motion.keeps_xpos();
        caps.input = match &motion {
            MotionKind::FindChar(_) | MotionKind::MarkJump { .. } => InputSpec::Char,
            MotionKind::Search { forward, .. } => InputSpec::Line(PromptKind::Search {
                forward: *forward,
            }),
            _ => InputSpec::None,
        };
        CommandDef::Motion { caps, motion }
    }

    /// A text object: only after an operator or inside a visual selection.
    pub fn object(name: &'static str, kind: TextObjectKind, scope: ObjectScope) -> Self {
        CommandDef::Motion {
            caps: Caps::new(name, ModeSet::OPERATOR_PENDING | ModeSet::ANY_VISUAL),
            motion: MotionKind::Object { kind, scope },
        }
    }

    pub fn operator(name: &'static str, op: OperatorKind) -> Self {
        let mut caps = Caps::new(name, ModeSet::NORMAL | ModeSet::ANY_VISUAL);
        caps.repeatable = op.mutates();
        CommandDef::Operator { caps, op }
    }

    pub fn action(caps: Caps, action: ActionKind) -> Self {
        CommandDef::Action { caps, action }
    }

    pub fn caps(&self) -> &Caps {
        match self {
            CommandDef::Motion { caps, .. }
            | CommandDef::Operator { caps, .. }
            | CommandDef::Action { caps, .. } => caps,
        }
    }

    pub fn caps_mut(&mut self) -> &mut Caps {
        match self {
            CommandDef::Motion { caps, .. }
            | CommandDef::Operator { caps, .. }
            | CommandDef::Action { caps, .. } => caps,
        }
    }

    pub fn name(&self) -> &'static str {
        self.caps().name
    }

    pub fn modes(&self) -> ModeSet {
        self.caps().modes
    }

    pub fn is_repeatable(&self) -> bool {
        self.caps().repeatable
    }

    pub fn updates_xpos(&self) -> bool {
        self.caps().updates_xpos
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, CommandDef::Operator { .. })
    }

    /// Operators need a motion unless a selection already supplies the range.
    pub fn motion_required(&self, mode: Mode) -> bool {
        self.is_operator() && !mode.has_selection()
    }

    /// Whether the command still has to collect keys before it can run.
    /// `q` only reads a register name when it starts a recording.
    pub fn accepts_input(&self, state: &SessionState) -> bool {
        if let CommandDef::Action {
            action: ActionKind::RecordMacro(_),
            ..
        } = self
            && state.macro_recording.is_some()
        {
            return false;
        }
        self.caps().input != InputSpec::None
    }

    /// Feed one key while collecting input. `collected` holds the keys taken
    /// so far and is owned by the session.
    pub fn accept(&mut self, key: &KeyToken, collected: &mut String) -> Accept {
        match self.caps().input {
            InputSpec::None => Accept::Done,
            InputSpec::Char | InputSpec::Chars(_) => {
                let want = match self.caps().input {
                    InputSpec::Chars(n) => n as usize,
                    _ => 1,
                };
                let Some(c) = input_char(key) else {
                    return Accept::Cancel;
                };
                collected.push(c);
                if collected.chars().count() < want {
                    return Accept::More;
                }
                self.fill_input(collected);
                Accept::Done
            }
            InputSpec::Line(_) => {
                if key.is_named(NamedKey::Enter) {
                    self.fill_input(collected);
                    return Accept::Done;
                }
                if key.is_named(NamedKey::Esc) {
                    return Accept::Cancel;
                }
                if key.is_named(NamedKey::Backspace) {
                    return match collected.pop() {
                        Some(_) => Accept::More,
                        None => Accept::Cancel,
                    };
                }
                match key.as_char() {
                    Some(c) => {
                        collected.push(c);
                        Accept::More
                    }
                    None => Accept::Cancel,
                }
            }
        }
    }

    /// Store collected input into the variant's placeholder fields.
    pub fn fill_input(&mut self, input: &str) {
        let mut chars = input.chars();
        let first = chars.clone().next().unwrap_or('\0');
        match self {
            CommandDef::Motion { motion, .. } => match motion {
                MotionKind::FindChar(search) => search.target = first,
                MotionKind::MarkJump { mark, .. } => *mark = first,
                MotionKind::Search { pattern, .. } => *pattern = input.to_string(),
                _ => {}
            },
            CommandDef::Action { action, .. } => match action {
                ActionKind::SelectRegister(c)
                | ActionKind::ReplaceChar(c)
                | ActionKind::RecordMacro(c)
                | ActionKind::PlayMacro(c)
                | ActionKind::SetMark(c)
                | ActionKind::SurroundDelete(c) => *c = first,
                ActionKind::ExCommandLine(line) => *line = input.to_string(),
                ActionKind::SurroundChange(from, to) => {
                    *from = chars.next().unwrap_or('\0');
                    *to = chars.next().unwrap_or('\0');
                }
                _ => {}
            },
            CommandDef::Operator { .. } => {}
        }
    }

    /// Produce the instruction for this command from the session's counts and
    /// register. Operators only translate on their own when a selection
    /// supplies the range; otherwise the composer pairs them with a motion.
    pub fn translate(&self, state: &SessionState) -> Instruction {
        let count = state.count();
        match self {
            CommandDef::Motion { motion, .. } => Instruction::Motion {
                motion: motion.clone(),
                count,
                xpos: state.xpos,
            },
            CommandDef::Operator { caps, op } => {
                if self.motion_required(state.mode) {
                    panic!(
                        "operator `{}` translated without a motion in {} mode",
                        caps.name, state.mode
                    );
                }
                Instruction::OperateSelection {
                    op: *op,
                    count,
                    register: state.register,
                }
            }
            CommandDef::Action { action, .. } => Instruction::Action {
                action: action.clone(),
                count,
                register: state.register,
            },
        }
    }
}

/// Translate a collected key into the character it stands for.
fn input_char(key: &KeyToken) -> Option<char> {
    if key.is_named(NamedKey::Enter) {
        return Some('\n');
    }
    if key.is_named(NamedKey::Tab) {
        return Some('\t');
    }
    key.as_char()
}

/// A fully resolved, executable step. Macros store these; the executor runs
/// them against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Motion {
        motion: MotionKind,
        count: Option<usize>,
        xpos: Option<usize>,
    },
    Operate {
        op: OperatorKind,
        motion: MotionKind,
        count: Option<usize>,
        register: Option<char>,
        xpos: Option<usize>,
    },
    OperateSelection {
        op: OperatorKind,
        count: Option<usize>,
        register: Option<char>,
    },
    Action {
        action: ActionKind,
        count: Option<usize>,
        register: Option<char>,
    },
}

impl Instruction {
    pub fn mutates_buffer(&self) -> bool {
        match self {
            Instruction::Motion { .. } => false,
            Instruction::Operate { op, .. } | Instruction::OperateSelection { op, .. } => {
                op.mutates()
            }
            Instruction::Action { action, .. } => action.mutates(),
        }
    }

    /// Drop position-relative arguments so a replay recomputes them from the
    /// buffer it runs against.
    pub fn refresh_for_replay(&mut self) {
        match self {
            Instruction::Motion { xpos, .. } | Instruction::Operate { xpos, .. } => *xpos = None,
            _ => {}
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            Instruction::Motion { count, .. }
            | Instruction::Operate { count, .. }
            | Instruction::OperateSelection { count, .. }
            | Instruction::Action { count, .. } => *count,
        }
    }
}
