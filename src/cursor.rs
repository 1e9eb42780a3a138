use crate::buffer::Buffer;
use crate::motion::{Position, max_col};

/// Cursor location plus the sticky column used by vertical motions.
///
/// `desired_col` is `usize::MAX` after `$`, meaning "end of every line".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
    pub desired_col: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            line: 0,
            col: 0,
            desired_col: 0,
        }
    }

    /// Cursor at a position whose sticky column follows the column.
    pub fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            desired_col: col,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Move horizontally, resetting the sticky column.
    pub fn set_position(&mut self, pos: Position) {
        self.line = pos.line;
        self.col = pos.col;
        self.desired_col = pos.col;
    }

    /// Pull the cursor back inside the buffer. Normal mode keeps it on a
    /// grapheme; Insert mode may rest one past the last grapheme.
    pub fn clamp(&mut self, buffer: &Buffer, past_end: bool) {
        let last_line = buffer.line_count().saturating_sub(1);
        if self.line > last_line {
            self.line = last_line;
        }
        let limit = max_col(buffer, self.line, past_end);
        if self.col > limit {
            self.col = limit;
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
