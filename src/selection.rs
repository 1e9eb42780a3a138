// src/selection.rs - Visual mode selection tracking

use crate::buffer::Buffer;
use crate::motion::{Position, Range};
use crate::registers::{Register, RegisterKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// Character-wise selection (v)
    Char,
    /// Line-wise selection (V)
    Line,
    /// Block/column selection (Ctrl+V)
    Block,
}

impl From<SelectionKind> for RegisterKind {
    fn from(kind: SelectionKind) -> Self {
        match kind {
            SelectionKind::Char => RegisterKind::Char,
            SelectionKind::Line => RegisterKind::Line,
            SelectionKind::Block => RegisterKind::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
    pub kind: SelectionKind,
}

/// One line's share of a selection: columns `[start_col, end_col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Selection {
    /// `(start, end)` ordered so that start <= end
    pub fn ordered(&self) -> (Position, Position) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    pub fn line_range(&self) -> (usize, usize) {
        let (start, end) = self.ordered();
        (start.line, end.line)
    }

    /// Inclusive column range used by block selections.
    pub fn col_range(&self) -> (usize, usize) {
        (
            self.anchor.col.min(self.head.col),
            self.anchor.col.max(self.head.col),
        )
    }

    /// Half-open buffer range covered by a character-wise selection. The end
    /// grapheme is included; selecting past a line end takes the line break.
    pub fn char_range(&self, buffer: &Buffer) -> Range {
        let (start, end) = self.ordered();
        let len = buffer.line_len(end.line);
        let end = if end.col < len {
            Position::new(end.line, end.col + 1)
        } else if end.line + 1 < buffer.line_count() {
            Position::new(end.line + 1, 0)
        } else {
            Position::new(end.line, len)
        };
        Range::new(start, end)
    }

    /// Per-line column spans, clipped to each line's length.
    pub fn spans(&self, buffer: &Buffer) -> Vec<LineSpan> {
        let (start, end) = self.ordered();
        let (first, last) = (start.line, end.line.min(buffer.line_count().saturating_sub(1)));
        (first..=last)
            .map(|line| {
                let len = buffer.line_len(line);
                let (from, to) = match self.kind {
                    SelectionKind::Line => (0, len),
                    SelectionKind::Block => {
                        let (left, right) = self.col_range();
                        (left.min(len), right.saturating_add(1).min(len))
                    }
                    SelectionKind::Char => {
                        let from = if line == start.line { start.col.min(len) } else { 0 };
                        let to = if line == end.line {
                            end.col.saturating_add(1).min(len)
                        } else {
                            len
                        };
                        (from, to)
                    }
                };
                LineSpan {
                    line,
                    start_col: from,
                    end_col: to.max(from),
                }
            })
            .collect()
    }
}

/// Optional active selection anchored where Visual mode started.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    active: Option<Selection>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn start(&mut self, kind: SelectionKind, at: Position) {
        self.active = Some(Selection {
            anchor: at,
            head: at,
            kind,
        });
    }

    /// Move the live end of the selection.
    pub fn extend(&mut self, to: Position) {
        if let Some(selection) = &mut self.active {
            selection.head = to;
        }
    }

    pub fn set_kind(&mut self, kind: SelectionKind) {
        if let Some(selection) = &mut self.active {
            selection.kind = kind;
        }
    }

    /// Swap anchor and head (Visual `o`), returning the new head.
    pub fn swap_ends(&mut self) -> Option<Position> {
        let selection = self.active.as_mut()?;
        std::mem::swap(&mut selection.anchor, &mut selection.head);
        Some(selection.head)
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn get(&self) -> Option<&Selection> {
        self.active.as_ref()
    }

    pub fn kind(&self) -> Option<SelectionKind> {
        self.active.map(|s| s.kind)
    }

    /// Text covered by the selection, shaped for a register.
    ///
    /// Char mode yields the literal inclusive span, Line mode whole lines each
    /// terminated by `\n`, Block mode one clipped piece per line joined by `\n`.
    pub fn materialize(&self, buffer: &Buffer) -> Option<Register> {
        let selection = self.active?;
        let text = match selection.kind {
            SelectionKind::Char => buffer.slice(selection.char_range(buffer)).ok()?,
            SelectionKind::Line => {
                let (first, last) = selection.line_range();
                (first..=last)
                    .filter_map(|line| buffer.line(line))
                    .map(|line| line + "\n")
                    .collect()
            }
            SelectionKind::Block => selection
                .spans(buffer)
                .iter()
                .map(|span| {
                    buffer.line_graphemes(span.line)[span.start_col..span.end_col].concat()
                })
                .collect::<Vec<_>>()
                .join("\n"),
        };
        Some(Register::new(text, selection.kind.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(kind: SelectionKind, anchor: (usize, usize), head: (usize, usize)) -> SelectionModel {
        let mut model = SelectionModel::new();
        model.start(kind, Position::new(anchor.0, anchor.1));
        model.extend(Position::new(head.0, head.1));
        model
    }

    #[test]
    fn test_char_selection_is_inclusive_and_normalized() {
        let buffer = Buffer::from_text("hello world");
        let sel = model(SelectionKind::Char, (0, 4), (0, 0));
        let reg = sel.materialize(&buffer).unwrap();
        assert_eq!(reg.text, "hello");
        assert_eq!(reg.kind, RegisterKind::Char);
    }

    #[test]
    fn test_char_selection_across_lines() {
        let buffer = Buffer::from_text("abc\ndef");
        let sel = model(SelectionKind::Char, (0, 1), (1, 1));
        assert_eq!(sel.materialize(&buffer).unwrap().text, "bc\nde");
    }

    #[test]
    fn test_line_selection_takes_whole_lines() {
        let buffer = Buffer::from_text("one\ntwo\nthree");
        let sel = model(SelectionKind::Line, (2, 3), (1, 1));
        let reg = sel.materialize(&buffer).unwrap();
        assert_eq!(reg.text, "two\nthree\n");
        assert_eq!(reg.kind, RegisterKind::Line);
    }

    #[test]
    fn test_block_selection_clips_short_lines() {
        let buffer = Buffer::from_text("abcd\nef");
        let sel = model(SelectionKind::Block, (0, 0), (1, 2));
        let reg = sel.materialize(&buffer).unwrap();
        assert_eq!(reg.text, "abc\nef");
        assert_eq!(reg.kind, RegisterKind::Block);
    }

    #[test]
    fn test_block_spans() {
        let buffer = Buffer::from_text("abcdef\nab\nabcdef");
        let sel = model(SelectionKind::Block, (0, 4), (2, 2));
        let spans = sel.get().unwrap().spans(&buffer);
        assert_eq!(
            spans,
            vec![
                LineSpan { line: 0, start_col: 2, end_col: 5 },
                LineSpan { line: 1, start_col: 2, end_col: 2 },
                LineSpan { line: 2, start_col: 2, end_col: 5 },
            ]
        );
    }

    #[test]
    fn test_swap_and_clear() {
        let mut sel = model(SelectionKind::Char, (0, 1), (0, 3));
        assert_eq!(sel.swap_ends(), Some(Position::new(0, 1)));
        assert_eq!(sel.get().unwrap().anchor, Position::new(0, 3));
        sel.clear();
        assert!(!sel.is_active());
        assert!(sel.materialize(&Buffer::new()).is_none());
    }
}
