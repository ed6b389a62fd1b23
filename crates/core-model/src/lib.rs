//! In-memory host: one text buffer with selections, undo history, a
//! viewport, an option store and a UI log.
//!
//! `MemoryHost` is what the `oxvi` binary edits files with and what the
//! interpreter tests drive. It implements every host capability
//! synchronously:
//!
//! * Edits go through [`UndoEngine`], which snapshots before the first edit of
//!   an edit group so a whole command undoes as one step.
//! * Selections are clamped to the buffer after every edit; the interpreter
//!   always sets fresh selections once it finishes a command.
//! * UI calls (bell, status messages, prompts, quick panels) are appended to
//!   [`UiLog`] so callers can inspect or answer them.
//! * A handful of native commands exist (`reindent`, `toggle_comment`,
//!   `write`, `goto`, `nohlsearch`); anything else is rejected with a vi-style
//!   error string.

use anyhow::Result;
use core_state::{
    BufferId, HostBuffer, HostUi, NativeCommand, PromptRequest, QuickPanelRequest, Region,
    ScrollAlign, SettingValue, Settings,
};
use core_text::{Buffer, Position, motion};
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info};

pub mod undo;
pub mod viewport;

pub use undo::{EditGroup, UNDO_HISTORY_MAX, UndoEngine};
pub use viewport::{Viewport, compute_scroll_intent};

/// Everything the engine asked the UI to do, in order.
#[derive(Debug, Default, Clone)]
pub struct UiLog {
    pub bells: usize,
    pub messages: Vec<String>,
    pub prompts: Vec<PromptRequest>,
    pub quick_panels: Vec<QuickPanelRequest>,
}

#[derive(Debug)]
pub struct MemoryHost {
    id: BufferId,
    buffer: Buffer,
    selections: Vec<Region>,
    undo: UndoEngine,
    viewport: Viewport,
    settings: HashMap<String, SettingValue>,
    path: Option<PathBuf>,
    pub ui: UiLog,
    /// Native commands run so far, successful or not.
    pub native_log: Vec<NativeCommand>,
}

impl MemoryHost {
    pub fn new(id: BufferId, name: &str, text: &str) -> Result<Self> {
        Ok(Self {
            id,
            buffer: Buffer::from_str(name, text)?,
            selections: vec![Region::caret(0)],
            undo: UndoEngine::new(),
            viewport: Viewport::default(),
            settings: HashMap::new(),
            path: None,
            ui: UiLog::default(),
            native_log: Vec::new(),
        })
    }

    /// Load `path` into a new host; `write` saves back to it.
    pub fn open(id: BufferId, path: PathBuf) -> Result<Self> {
        let text = if path.exists() {
            std::fs::read_to_string(&path)?
        } else {
            String::new()
        };
        let mut host = Self::new(id, &path.display().to_string(), &text)?;
        info!(target: "host.memory", path = %path.display(), bytes = text.len(), "buffer opened");
        host.path = Some(path);
        Ok(host)
    }

    pub fn with_settings<I>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, SettingValue)>,
    {
        for (name, value) in settings {
            self.settings.insert(name.to_string(), value);
        }
        self
    }

    pub fn with_viewport_height(mut self, height: usize) -> Self {
        self.viewport = Viewport::new(height);
        self
    }

    pub fn contents(&self) -> String {
        self.buffer.text()
    }

    /// Caret end of the primary selection.
    pub fn caret(&self) -> usize {
        self.selections.first().map(|r| r.b).unwrap_or(0)
    }

    pub fn caret_position(&self) -> Position {
        self.buffer.position_of(self.caret())
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.selections = vec![Region::caret(offset.min(self.buffer.len_bytes()))];
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn undo_engine(&self) -> &UndoEngine {
        &self.undo
    }

    fn before_edit(&mut self) {
        self.undo.before_edit(&self.buffer, &self.selections);
    }

    fn clamp_selections(&mut self) {
        let len = self.buffer.len_bytes();
        for r in &mut self.selections {
            r.a = r.a.min(len);
            r.b = r.b.min(len);
        }
    }

    fn line_args(&self, cmd: &NativeCommand) -> Result<(usize, usize), String> {
        let parse = |i: usize| -> Result<usize, String> {
            cmd.args
                .get(i)
                .ok_or_else(|| format!("{}: missing line argument", cmd.name))?
                .parse::<usize>()
                .map_err(|e| format!("{}: {e}", cmd.name))
        };
        let first = parse(0)?;
        let last = if cmd.args.len() > 1 { parse(1)? } else { first };
        let max = self.buffer.last_line();
        Ok((first.min(max), last.min(max)))
    }

    fn rewrite_lines(&mut self, first: usize, last: usize, f: impl Fn(usize, &str) -> String) {
        let start = self.buffer.line_start_offset(first);
        let mut out = String::new();
        for line in first..=last {
            let text = self.buffer.line_content(line);
            out.push_str(&f(line, &text));
            if line < last || self.buffer.line(last).is_some_and(|l| l.ends_with('\n')) {
                out.push('\n');
            }
        }
        let end = self.buffer.line_end_offset_inclusive(last);
        self.replace(start..end, &out);
    }

    /// Give each line the indentation of the nearest non-blank line above the
    /// range.
    fn reindent(&mut self, first: usize, last: usize) {
        let indent = (0..first)
            .rev()
            .find(|&l| !self.buffer.is_blank_line(l))
            .map(|l| {
                let text = self.buffer.line_content(l);
                text[..text.len() - text.trim_start().len()].to_string()
            })
            .unwrap_or_default();
        self.rewrite_lines(first, last, |_, text| {
            if text.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", text.trim_start())
            }
        });
    }

    fn toggle_comment(&mut self, first: usize, last: usize) {
        let prefix = match self.get("comment_prefix") {
            Some(SettingValue::Str(s)) => s,
            _ => "//".to_string(),
        };
        let lines: Vec<String> = (first..=last).map(|l| self.buffer.line_content(l)).collect();
        let commented = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .all(|l| l.trim_start().starts_with(&prefix));
        let indent = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        self.rewrite_lines(first, last, |_, text| {
            if text.trim().is_empty() {
                return text.to_string();
            }
            if commented {
                let lead = text.len() - text.trim_start().len();
                let rest = &text[lead + prefix.len()..];
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                format!("{}{rest}", &text[..lead])
            } else {
                format!("{}{prefix} {}", &text[..indent], &text[indent..])
            }
        });
    }

    fn write(&mut self, target: Option<&String>) -> Result<(), String> {
        let path = match (target, &self.path) {
            (Some(p), _) => PathBuf::from(p),
            (None, Some(p)) => p.clone(),
            (None, None) => return Err("E32: No file name".to_string()),
        };
        std::fs::write(&path, self.buffer.text()).map_err(|e| format!("E212: {e}"))?;
        info!(target: "host.memory", path = %path.display(), "buffer written");
        self.status_message(&format!(
            "\"{}\" {}L written",
            path.display(),
            self.buffer.content_line_count()
        ));
        Ok(())
    }
}

impl HostBuffer for MemoryHost {
    fn id(&self) -> BufferId {
        self.id
    }

    fn text(&self) -> &Buffer {
        &self.buffer
    }

    fn insert(&mut self, at: usize, text: &str) {
        self.before_edit();
        self.buffer.insert_str(at, text);
    }

    fn erase(&mut self, range: Range<usize>) {
        self.before_edit();
        self.buffer.delete_bytes(range.start, range.end);
        self.clamp_selections();
    }

    fn replace(&mut self, range: Range<usize>, text: &str) {
        self.before_edit();
        self.buffer.replace_bytes(range.start, range.end, text);
        self.clamp_selections();
    }

    fn get_selections(&self) -> Vec<Region> {
        self.selections.clone()
    }

    fn set_selections(&mut self, regions: Vec<Region>) {
        self.selections = regions;
        self.clamp_selections();
    }

    fn scroll_to(&mut self, offset: usize, align: ScrollAlign) {
        let line = self.buffer.position_of(offset).line;
        if self.viewport.align(line, align, self.buffer.last_line()) {
            debug!(target: "host.memory", first_line = self.viewport.first_line, ?align, "viewport_scrolled");
        }
    }

    fn viewport_extent(&self) -> (usize, usize) {
        self.viewport.extent(self.buffer.last_line())
    }

    fn begin_edit_group(&mut self) {
        self.undo.begin_group();
    }

    fn end_edit_group(&mut self) {
        self.undo.end_group();
    }

    fn undo(&mut self) -> bool {
        self.undo.undo(&mut self.buffer, &mut self.selections)
    }

    fn redo(&mut self) -> bool {
        self.undo.redo(&mut self.buffer, &mut self.selections)
    }

    fn run_native(&mut self, cmd: &NativeCommand) -> Result<(), String> {
        debug!(target: "host.memory", command = %cmd, "run_native");
        self.native_log.push(cmd.clone());
        match cmd.name.as_str() {
            "reindent" => {
                let (first, last) = self.line_args(cmd)?;
                self.reindent(first, last);
                Ok(())
            }
            "toggle_comment" => {
                let (first, last) = self.line_args(cmd)?;
                self.toggle_comment(first, last);
                Ok(())
            }
            "w" | "write" => self.write(cmd.args.first()),
            "goto" => {
                let line: usize = cmd
                    .args
                    .first()
                    .and_then(|a| a.parse().ok())
                    .ok_or_else(|| "goto: expected a line number".to_string())?;
                let line = line.saturating_sub(1).min(self.buffer.last_line());
                let pos = motion::first_non_blank(&self.buffer, line);
                let offset = self.buffer.offset_of(pos);
                self.set_caret(offset);
                self.scroll_to(offset, ScrollAlign::Visible);
                Ok(())
            }
            "noh" | "nohlsearch" => Ok(()),
            _ => Err(format!("E492: Not an editor command: {cmd}")),
        }
    }
}

impl HostUi for MemoryHost {
    fn show_prompt(&mut self, request: PromptRequest) {
        debug!(target: "host.memory", kind = ?request.kind, "show_prompt");
        self.ui.prompts.push(request);
    }

    fn show_quick_panel(&mut self, request: QuickPanelRequest) {
        debug!(target: "host.memory", items = request.items.len(), "show_quick_panel");
        self.ui.quick_panels.push(request);
    }

    fn bell(&mut self) {
        self.ui.bells += 1;
    }

    fn status_message(&mut self, text: &str) {
        self.ui.messages.push(text.to_string());
    }
}

impl Settings for MemoryHost {
    fn get(&self, name: &str) -> Option<SettingValue> {
        self.settings.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: SettingValue) {
        debug!(target: "host.memory", name, %value, "setting changed");
        self.settings.insert(name.to_string(), value);
    }
}
