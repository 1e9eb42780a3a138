// src/viewport.rs - Visible window over the active buffer and render spans

use std::ops::Range;

/// What a highlight span marks. Syntax token classes are opaque names
/// supplied by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightKind {
    Selection,
    SearchMatch,
    Syntax(String),
}

/// Columns `[start_col, end_col)` of one line, in graphemes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub kind: HighlightKind,
}

/// External syntax classifier: a pure function from a line to its spans.
pub trait SyntaxClassifier {
    fn classify(&self, line: usize, text: &str) -> Vec<HighlightSpan>;
}

/// Classifier that marks nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl SyntaxClassifier for PlainText {
    fn classify(&self, _line: usize, _text: &str) -> Vec<HighlightSpan> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset_line: usize,
    pub offset_col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Viewport {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            offset_line: 0,
            offset_col: 0,
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = rows.max(1);
        self.cols = cols.max(1);
    }

    /// Scroll as little as possible so the cursor stays visible with at
    /// least `scroll_off` lines of context above and below it.
    pub fn scroll_to_cursor(&mut self, cursor_line: usize, cursor_col: usize, scroll_off: usize) {
        let margin = scroll_off.min(self.rows.saturating_sub(1) / 2);
        if cursor_line < self.offset_line + margin {
            self.offset_line = cursor_line.saturating_sub(margin);
        } else if cursor_line + margin >= self.offset_line + self.rows {
            self.offset_line = cursor_line + margin + 1 - self.rows;
        }

        if cursor_col < self.offset_col {
            self.offset_col = cursor_col;
        } else if cursor_col >= self.offset_col + self.cols {
            self.offset_col = cursor_col + 1 - self.cols;
        }
    }

    /// Buffer lines currently on screen
    pub fn visible_range(&self, line_count: usize) -> Range<usize> {
        let start = self.offset_line.min(line_count);
        let end = self.offset_line.saturating_add(self.rows).min(line_count);
        start..end
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(24, 80)
    }
}
