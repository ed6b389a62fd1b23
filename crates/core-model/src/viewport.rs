//! Vertical viewport bookkeeping for the in-memory host.

use core_state::ScrollAlign;

/// A window of `height` lines starting at `first_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_line: usize,
    pub height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            first_line: 0,
            height: 24,
        }
    }
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self {
            first_line: 0,
            height,
        }
    }

    /// First and last visible line, inclusive, clamped to `last_line`.
    pub fn extent(&self, last_line: usize) -> (usize, usize) {
        let last = (self.first_line + self.height.max(1) - 1).min(last_line);
        (self.first_line.min(last_line), last)
    }

    /// Reposition so `line` sits where `align` asks. Returns true if the
    /// first visible line changed.
    pub fn align(&mut self, line: usize, align: ScrollAlign, last_line: usize) -> bool {
        let h = self.height.max(1);
        let target = match align {
            ScrollAlign::Top => line,
            ScrollAlign::Center => line.saturating_sub(h / 2),
            ScrollAlign::Bottom => (line + 1).saturating_sub(h),
            ScrollAlign::Visible => match compute_scroll_intent(self.first_line, line, h, 0) {
                Some(first) => first,
                None => return false,
            },
        };
        let target = target.min(last_line);
        let changed = target != self.first_line;
        self.first_line = target;
        changed
    }
}

/// Pure helper: given the current first line, the caret line, the viewport
/// height and a margin, return the new first line if a scroll is needed.
///
/// The margin is clamped to half the height.
pub fn compute_scroll_intent(
    first: usize,
    cursor_line: usize,
    text_height: usize,
    margin: usize,
) -> Option<usize> {
    if text_height == 0 {
        return None;
    }
    let m = margin.min(text_height / 2);
    let bottom = first + text_height;
    if cursor_line < first + m {
        let new_first = cursor_line.saturating_sub(m);
        if new_first != first {
            return Some(new_first);
        }
    } else if cursor_line + m >= bottom {
        let new_first = cursor_line + m + 1 - text_height;
        if new_first != first {
            return Some(new_first);
        }
    }
    None
}
