//! Capabilities the engine consumes from its host application.
//!
//! The host owns text storage, selections, undo history and any UI. Every call
//! is synchronous and its effect is visible to the next interpreter step.

use crate::{Mode, OperatorKind};
use core_text::Buffer;
use std::fmt;
use std::ops::Range;

/// Identifies the buffer a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// A selection as two absolute byte offsets. `a` is the anchor, `b` the caret
/// end; either may be the larger. An empty region is a plain caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub a: usize,
    pub b: usize,
}

impl Region {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    pub fn caret(at: usize) -> Self {
        Self { a: at, b: at }
    }

    pub fn begin(&self) -> usize {
        self.a.min(self.b)
    }

    pub fn end(&self) -> usize {
        self.a.max(self.b)
    }

    pub fn is_empty(&self) -> bool {
        self.a == self.b
    }

    pub fn is_reversed(&self) -> bool {
        self.b < self.a
    }

    pub fn range(&self) -> Range<usize> {
        self.begin()..self.end()
    }
}

/// Where `scroll_to` should place the target line in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollAlign {
    Top,
    Center,
    Bottom,
    /// Only scroll if the target is off-screen.
    Visible,
}

/// A host-native command: a name plus its argument words.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl NativeCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for NativeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Buffer capability: text, selections, viewport and undo.
pub trait HostBuffer {
    fn id(&self) -> BufferId;

    /// Read view of the current text.
    fn text(&self) -> &Buffer;

    fn insert(&mut self, at: usize, text: &str);
    fn erase(&mut self, range: Range<usize>);
    fn replace(&mut self, range: Range<usize>, text: &str);

    fn get_selections(&self) -> Vec<Region>;
    fn set_selections(&mut self, regions: Vec<Region>);

    fn scroll_to(&mut self, offset: usize, align: ScrollAlign);

    /// First and last visible line, inclusive.
    fn viewport_extent(&self) -> (usize, usize);

    /// Open an undo group; every edit until the matching `end_edit_group`
    /// undoes as one step. Groups may nest.
    fn begin_edit_group(&mut self) {}
    fn end_edit_group(&mut self) {}

    /// Returns false when there is nothing to undo.
    fn undo(&mut self) -> bool;
    fn redo(&mut self) -> bool;

    /// Run a command the host implements natively (reindent, comment toggle,
    /// ex results). The error string is surfaced as a status message.
    fn run_native(&mut self, cmd: &NativeCommand) -> Result<(), String>;
}

/// What an interactive prompt is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Search { forward: bool },
    Ex,
}

impl PromptKind {
    /// The prompt's leading character as shown to the user.
    pub fn leader(self) -> char {
        match self {
            PromptKind::Search { forward: true } => '/',
            PromptKind::Search { forward: false } => '?',
            PromptKind::Ex => ':',
        }
    }
}

/// Minimal state needed to finish a command once its prompt answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    Search {
        forward: bool,
        count: Option<usize>,
        operator: Option<OperatorKind>,
        register: Option<char>,
        origin_mode: Mode,
        /// Keys that led to the prompt, used to build the dot-repeat payload.
        notation: String,
    },
    Ex {
        origin_mode: Mode,
    },
    /// A register listing; the picked item is pasted after the caret.
    PickRegister {
        registers: Vec<char>,
    },
}

/// Handed to the host with a prompt and passed back on done/change/cancel.
/// A continuation whose generation no longer matches the session is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub buffer: BufferId,
    pub generation: u64,
    pub resume: Resume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub kind: PromptKind,
    pub initial_text: String,
    pub continuation: Continuation,
}

/// A pick list. The host answers with the index of the chosen item, or
/// nothing when dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickPanelRequest {
    pub items: Vec<String>,
    pub continuation: Continuation,
}

/// UI capability.
pub trait HostUi {
    fn show_prompt(&mut self, request: PromptRequest);
    fn show_quick_panel(&mut self, request: QuickPanelRequest);
    fn bell(&mut self);
    fn status_message(&mut self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Int(i) => Some(*i != 0),
            SettingValue::Str(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            SettingValue::Str(s) => s.parse().ok(),
            SettingValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Str(s) => f.write_str(s),
        }
    }
}

/// Per-buffer option store.
pub trait Settings {
    fn get(&self, name: &str) -> Option<SettingValue>;
    fn set(&mut self, name: &str, value: SettingValue);

    fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn get_int(&self, name: &str, default: i64) -> i64 {
        self.get(name).and_then(|v| v.as_int()).unwrap_or(default)
    }
}

/// Everything the interpreter needs from one host buffer.
pub trait Host: HostBuffer + HostUi + Settings {}

impl<T: HostBuffer + HostUi + Settings> Host for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_ordering() {
        let r = Region::new(9, 3);
        assert_eq!(r.begin(), 3);
        assert_eq!(r.end(), 9);
        assert!(r.is_reversed());
        assert_eq!(r.range(), 3..9);
        assert!(Region::caret(4).is_empty());
    }

    #[test]
    fn native_command_display() {
        let cmd = NativeCommand::with_args("reindent", ["3"]);
        assert_eq!(cmd.to_string(), "reindent 3");
        assert_eq!(NativeCommand::new("w").to_string(), "w");
    }

    #[test]
    fn setting_coercions() {
        assert_eq!(SettingValue::Int(0).as_bool(), Some(false));
        assert_eq!(SettingValue::Str("8".into()).as_int(), Some(8));
        assert_eq!(SettingValue::Str("x".into()).as_bool(), None);
        assert_eq!(PromptKind::Search { forward: false }.leader(), '?');
    }
}
