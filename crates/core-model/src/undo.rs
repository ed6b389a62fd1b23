use core_state::Region;
use core_text::Buffer;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tracing::trace;

/// Maximum number of snapshots retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// A full-state snapshot for undo/redo (coarse clone of buffer + selections).
#[derive(Clone, Debug)]
pub struct EditSnapshot {
    pub buffer: Buffer,
    pub selections: Vec<Region>,
    /// Content hash of the buffer at capture.
    pub hash: u64,
}

/// Edit-group state. Edits inside an open group share one snapshot, taken
/// before the group's first edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditGroup {
    Inactive,
    Open { depth: u32, recorded: bool },
}

#[derive(Debug)]
pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
    group: EditGroup,
    /// Snapshots skipped because the buffer matched the previous one.
    skipped: u64,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            group: EditGroup::Inactive,
            skipped: 0,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn group(&self) -> EditGroup {
        self.group
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.skipped
    }

    fn push_snapshot(&mut self, buffer: &Buffer, selections: &[Region]) {
        let current_hash = buffer_hash(buffer);
        if let Some(last) = self.undo_stack.last()
            && last.hash == current_hash
            && self.redo_stack.is_empty()
        {
            self.skipped += 1;
            trace!(target: "host.undo", undo_depth = self.undo_stack.len(), hash = current_hash, "snapshot_dedupe_skip");
            return;
        }
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            selections: selections.to_vec(),
            hash: current_hash,
        });
        trace!(target: "host.undo", undo_depth = self.undo_stack.len(), lines = buffer.line_count(), hash = current_hash, "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            let _ = self.undo_stack.remove(0);
            trace!(target: "host.undo", "undo_stack_trimmed");
        }
        self.redo_stack.clear();
    }

    pub fn begin_group(&mut self) {
        self.group = match self.group {
            EditGroup::Inactive => EditGroup::Open {
                depth: 1,
                recorded: false,
            },
            EditGroup::Open { depth, recorded } => EditGroup::Open {
                depth: depth + 1,
                recorded,
            },
        };
    }

    pub fn end_group(&mut self) {
        self.group = match self.group {
            EditGroup::Open { depth, recorded } if depth > 1 => EditGroup::Open {
                depth: depth - 1,
                recorded,
            },
            _ => EditGroup::Inactive,
        };
    }

    /// Call before mutating `buffer`. Outside a group every edit gets its own
    /// snapshot; inside a group only the first does.
    pub fn before_edit(&mut self, buffer: &Buffer, selections: &[Region]) {
        match self.group {
            EditGroup::Inactive => self.push_snapshot(buffer, selections),
            EditGroup::Open {
                depth,
                recorded: false,
            } => {
                self.push_snapshot(buffer, selections);
                self.group = EditGroup::Open {
                    depth,
                    recorded: true,
                };
            }
            EditGroup::Open { recorded: true, .. } => {}
        }
    }

    pub fn undo(&mut self, buffer: &mut Buffer, selections: &mut Vec<Region>) -> bool {
        let Some(last) = self.undo_stack.pop() else {
            return false;
        };
        trace!(target: "host.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        self.redo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            selections: selections.clone(),
            hash: buffer_hash(buffer),
        });
        *buffer = last.buffer;
        *selections = last.selections;
        true
    }

    pub fn redo(&mut self, buffer: &mut Buffer, selections: &mut Vec<Region>) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        trace!(target: "host.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            selections: selections.clone(),
            hash: buffer_hash(buffer),
        });
        *buffer = next.buffer;
        *selections = next.selections;
        true
    }
}

fn buffer_hash(buf: &Buffer) -> u64 {
    let mut h = DefaultHasher::new();
    for i in 0..buf.line_count() {
        if let Some(l) = buf.line(i) {
            h.write(l.as_bytes());
        }
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &str) -> Buffer {
        Buffer::from_str("t", s).unwrap()
    }

    #[test]
    fn ungrouped_edits_undo_one_at_a_time() {
        let mut u = UndoEngine::new();
        let mut b = buf("a");
        let mut sel = vec![Region::caret(0)];
        u.before_edit(&b, &sel);
        b.insert_str(1, "b");
        u.before_edit(&b, &sel);
        b.insert_str(2, "c");
        assert_eq!(u.undo_depth(), 2);
        assert!(u.undo(&mut b, &mut sel));
        assert_eq!(b.text(), "ab");
        assert!(u.redo(&mut b, &mut sel));
        assert_eq!(b.text(), "abc");
    }

    #[test]
    fn group_collapses_to_one_snapshot() {
        let mut u = UndoEngine::new();
        let mut b = buf("x");
        let mut sel = vec![Region::caret(0)];
        u.begin_group();
        u.begin_group();
        u.before_edit(&b, &sel);
        b.insert_str(0, "1");
        u.end_group();
        u.before_edit(&b, &sel);
        b.insert_str(0, "2");
        u.end_group();
        assert_eq!(u.group(), EditGroup::Inactive);
        assert_eq!(u.undo_depth(), 1);
        assert!(u.undo(&mut b, &mut sel));
        assert_eq!(b.text(), "x");
        assert!(!u.undo(&mut b, &mut sel));
    }

    #[test]
    fn empty_group_records_nothing() {
        let mut u = UndoEngine::new();
        u.begin_group();
        u.end_group();
        assert_eq!(u.undo_depth(), 0);
    }

    #[test]
    fn identical_snapshot_is_skipped() {
        let mut u = UndoEngine::new();
        let b = buf("same");
        u.before_edit(&b, &[]);
        u.before_edit(&b, &[]);
        assert_eq!(u.undo_depth(), 1);
        assert_eq!(u.snapshots_skipped(), 1);
    }
}
