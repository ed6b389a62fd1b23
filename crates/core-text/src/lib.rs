//! Rope-based text read model plus the pure geometry the modal engine needs:
//! cursor motions, text objects and pattern search.
//!
//! Everything here is free of editor state. Positions are (line, byte-in-line)
//! pairs; hosts address text by absolute byte offsets, and [`Buffer`] converts
//! between the two.

use anyhow::Result;
use ropey::Rope;

pub mod motion;
pub mod search;
pub mod text_object;

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone, Debug)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

/// A position inside a buffer expressed as (line index, byte offset within that line).
/// Byte offsets sit on grapheme boundaries once produced by a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }
    pub fn origin() -> Self {
        Self { line: 0, byte: 0 }
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    /// Total number of rope lines, including the empty line after a final newline.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Number of lines a user can place the caret on: a trailing newline does not
    /// open an extra line. Never less than one.
    pub fn content_line_count(&self) -> usize {
        let n = self.rope.len_lines();
        if n > 1 && self.rope.line(n - 1).len_chars() == 0 {
            n - 1
        } else {
            n.max(1)
        }
    }

    pub fn last_line(&self) -> usize {
        self.content_line_count() - 1
    }

    /// Return the requested line as an owned `String` (including trailing newline if present).
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx < self.rope.len_lines() {
            Some(self.rope.line(idx).to_string())
        } else {
            None
        }
    }

    /// Line text without its newline; empty for out-of-range lines.
    pub fn line_content(&self, idx: usize) -> String {
        let mut s = self.line(idx).unwrap_or_default();
        if s.ends_with('\n') {
            s.pop();
            if s.ends_with('\r') {
                s.pop();
            }
        }
        s
    }

    /// Byte length of a line (excluding any newline) for clamping purposes.
    pub fn line_byte_len(&self, idx: usize) -> usize {
        self.line_content(idx).len()
    }

    pub fn is_blank_line(&self, idx: usize) -> bool {
        self.line_content(idx).trim().is_empty()
    }

    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Absolute byte offset of the first byte of `line` (clamped to buffer end).
    pub fn line_start_offset(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        self.rope.char_to_byte(self.rope.line_to_char(line))
    }

    /// Absolute offset just past the newline ending `line`, or buffer end.
    pub fn line_end_offset_inclusive(&self, line: usize) -> usize {
        self.line_start_offset(line + 1)
    }

    /// Absolute byte offset of a position, clamping line and byte.
    pub fn offset_of(&self, pos: Position) -> usize {
        let line = pos.line.min(self.rope.len_lines().saturating_sub(1));
        let byte = pos.byte.min(self.line_byte_len(line));
        self.line_start_offset(line) + byte
    }

    /// Position of an absolute byte offset (clamped to buffer end).
    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_bytes());
        let line = self.rope.byte_to_line(offset);
        let start = self.line_start_offset(line);
        Position {
            line,
            byte: (offset - start).min(self.line_byte_len(line)),
        }
    }

    /// Return the UTF-8 slice in the absolute byte range `[start,end)`.
    pub fn slice_bytes(&self, start: usize, end: usize) -> String {
        let total = self.rope.len_bytes();
        let s = start.min(total);
        let e = end.min(total);
        if s >= e {
            return String::new();
        }
        let start_char = self.rope.byte_to_char(s);
        let end_char = self.rope.byte_to_char(e);
        self.rope.slice(start_char..end_char).to_string()
    }

    /// Insert `text` at absolute byte offset (clamped).
    pub fn insert_str(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.rope.len_bytes());
        let at = self.rope.byte_to_char(offset);
        self.rope.insert(at, text);
    }

    /// Delete the UTF-8 slice in absolute byte range `[start,end)` (clamped).
    /// Returns the removed text.
    pub fn delete_bytes(&mut self, start: usize, end: usize) -> String {
        let total = self.rope.len_bytes();
        let s = start.min(total);
        let e = end.min(total);
        if s >= e {
            return String::new();
        }
        let start_char = self.rope.byte_to_char(s);
        let end_char = self.rope.byte_to_char(e);
        let removed = self.rope.slice(start_char..end_char).to_string();
        self.rope.remove(start_char..end_char);
        removed
    }

    /// Replace `[start,end)` with `text`, returning the replaced slice.
    pub fn replace_bytes(&mut self, start: usize, end: usize, text: &str) -> String {
        let removed = self.delete_bytes(start, end);
        self.insert_str(start, text);
        removed
    }

    /// Grapheme cluster starting at `pos`, if any (never the newline).
    pub fn grapheme_at(&self, pos: Position) -> Option<String> {
        let line = self.line_content(pos.line);
        if pos.byte >= line.len() {
            return None;
        }
        let next = grapheme::next_boundary(&line, pos.byte);
        Some(line[pos.byte..next].to_string())
    }
}

/// Grapheme and width utilities. These are pure helpers operating on a single line.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;
    use unicode_width::UnicodeWidthStr;

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Start byte of the last grapheme cluster, 0 for an empty line.
    pub fn last_boundary(line: &str) -> usize {
        prev_boundary(line, line.len())
    }

    /// Width in terminal cells of this grapheme cluster (tabs count as one cell).
    pub fn cluster_width(g: &str) -> usize {
        if g == "\t" { 1 } else { g.width().max(1) }
    }

    /// Compute visual column (terminal cells) up to (but not including) byte offset.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        let mut col = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            col += cluster_width(g);
        }
        col
    }

    /// Byte offset of the cluster covering visual column `target`, clamped to the
    /// last cluster (Normal-mode caret) when `allow_eol` is false.
    pub fn byte_for_visual_col(line: &str, target: usize, allow_eol: bool) -> usize {
        let mut col = 0;
        for (b, g) in line.grapheme_indices(true) {
            let w = cluster_width(g);
            if col + w > target {
                return b;
            }
            col += w;
        }
        if allow_eol {
            line.len()
        } else {
            last_boundary(line)
        }
    }
}
