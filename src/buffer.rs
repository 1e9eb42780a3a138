// src/buffer.rs - Rope-backed text buffer addressed in grapheme clusters

use crate::error::EditorError;
use crate::motion::{Position, Range};
use ropey::Rope;
use std::path::{Path, PathBuf};
use unicode_segmentation::UnicodeSegmentation;

/// Line terminator style detected when the buffer was loaded.
/// Content is always held with `\n` internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

/// Ordered sequence of grapheme clusters split into lines.
///
/// Every public position is a `(line, grapheme column)` pair; char and byte
/// offsets of the underlying rope stay private to this module.
#[derive(Debug, Clone)]
pub struct Buffer {
    rope: Rope,
    file_path: Option<PathBuf>,
    modified: bool,
    version: u64,
    line_ending: LineEnding,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            file_path: None,
            modified: false,
            version: 0,
            line_ending: LineEnding::Lf,
        }
    }

    /// Build a clean buffer from loaded text. CRLF files are normalized and
    /// remember their line ending for saving.
    pub fn from_text(text: &str) -> Self {
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let rope = match line_ending {
            LineEnding::CrLf => Rope::from_str(&text.replace("\r\n", "\n")),
            LineEnding::Lf => Rope::from_str(text),
        };
        Self {
            rope,
            file_path: None,
            modified: false,
            version: 0,
            line_ending,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    // === Metadata ===

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.file_path = Some(path.into());
    }

    /// File name shown in buffer lists and the `%` register.
    pub fn display_name(&self) -> String {
        self.file_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "[No Name]".to_string())
    }

    pub fn is_dirty(&self) -> bool {
        self.modified
    }

    pub fn mark_clean(&mut self) {
        self.modified = false;
    }

    /// Modification counter; bumped on every mutation, including restores.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whole content as a string with `\n` terminators.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Content as it should be written back to disk.
    pub fn text_for_save(&self) -> String {
        match self.line_ending {
            LineEnding::Lf => self.rope.to_string(),
            LineEnding::CrLf => self.rope.to_string().replace('\n', "\r\n"),
        }
    }

    pub(crate) fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Replace the whole content with a previously captured rope.
    pub(crate) fn restore(&mut self, rope: Rope, dirty: bool) {
        self.rope = rope;
        self.modified = dirty;
        self.version += 1;
    }

    fn touch(&mut self) {
        self.modified = true;
        self.version += 1;
    }

    // === Reading ===

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without its terminator.
    pub fn line(&self, line_idx: usize) -> Option<String> {
        if line_idx < self.rope.len_lines() {
            Some(strip_line_break(self.rope.line(line_idx).to_string()))
        } else {
            None
        }
    }

    /// Number of grapheme clusters on a line, excluding the terminator.
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line(line_idx)
            .map(|l| l.graphemes(true).count())
            .unwrap_or(0)
    }

    pub fn line_graphemes(&self, line_idx: usize) -> Vec<String> {
        self.line(line_idx)
            .map(|l| l.graphemes(true).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Grapheme cluster at a position, `None` at or past the line end.
    pub fn char_at(&self, pos: Position) -> Option<String> {
        let line = self.line(pos.line)?;
        line.graphemes(true).nth(pos.col).map(str::to_string)
    }

    pub fn slice(&self, range: Range) -> Result<String, EditorError> {
        let range = range.normalized();
        let start = self.pos_to_char(range.start)?;
        let end = self.pos_to_char(range.end)?;
        Ok(self.rope.slice(start..end).to_string())
    }

    /// Position just past the last grapheme of the buffer.
    pub fn end_position(&self) -> Position {
        let last = self.line_count().saturating_sub(1);
        Position::new(last, self.line_len(last))
    }

    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.line < self.line_count() && pos.col <= self.line_len(pos.line)
    }

    // === Editing ===

    /// Insert `text` at `pos`, returning the position just past the new text.
    /// Inserting at a line end (including the end of the buffer) is allowed.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<Position, EditorError> {
        let char_idx = self.pos_to_char(pos)?;
        if text.is_empty() {
            return Ok(pos);
        }
        let text = if text.contains("\r\n") {
            text.replace("\r\n", "\n")
        } else {
            text.to_string()
        };
        self.rope.insert(char_idx, &text);
        self.touch();
        Ok(self.char_to_pos(char_idx + text.chars().count()))
    }

    /// Remove the half-open range `[start, end)`, returning the removed text.
    pub fn delete(&mut self, range: Range) -> Result<String, EditorError> {
        let range = range.normalized();
        let start = self.pos_to_char(range.start)?;
        let end = self.pos_to_char(range.end)?;
        if start == end {
            return Ok(String::new());
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.touch();
        Ok(removed)
    }

    /// Overwrite one line's content, keeping its terminator.
    pub fn replace_line(&mut self, line_idx: usize, content: &str) -> Result<(), EditorError> {
        let len = self.line_len(line_idx);
        if line_idx >= self.line_count() {
            return Err(EditorError::out_of_range(format!("line {}", line_idx)));
        }
        self.delete(Range::new(
            Position::new(line_idx, 0),
            Position::new(line_idx, len),
        ))?;
        self.insert(Position::new(line_idx, 0), content)?;
        Ok(())
    }

    // === Coordinate translation ===

    fn pos_to_char(&self, pos: Position) -> Result<usize, EditorError> {
        let line = self
            .line(pos.line)
            .ok_or_else(|| EditorError::out_of_range(format!("line {}", pos.line)))?;
        let offset = grapheme_char_offset(&line, pos.col).ok_or_else(|| {
            EditorError::out_of_range(format!("column {} on line {}", pos.col, pos.line))
        })?;
        Ok(self.rope.line_to_char(pos.line) + offset)
    }

    fn char_to_pos(&self, char_idx: usize) -> Position {
        let char_idx = char_idx.min(self.rope.len_chars());
        let line = self.rope.char_to_line(char_idx);
        let within = char_idx - self.rope.line_to_char(line);
        let content = self.line(line).unwrap_or_default();
        let mut chars = 0;
        let mut col = 0;
        for g in content.graphemes(true) {
            if chars >= within {
                break;
            }
            chars += g.chars().count();
            col += 1;
        }
        Position::new(line, col)
    }
}

/// Number of chars preceding the `col`-th grapheme; `None` past the end.
fn grapheme_char_offset(line: &str, col: usize) -> Option<usize> {
    let mut offset = 0;
    let mut graphemes = line.graphemes(true);
    for _ in 0..col {
        offset += graphemes.next()?.chars().count();
    }
    Some(offset)
}

fn strip_line_break(mut line: String) -> String {
    if line.ends_with("\r\n") {
        line.truncate(line.len() - 2);
    } else if let Some(last) = line.chars().last()
        && matches!(
            last,
            '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
        )
    {
        line.truncate(line.len() - last.len_utf8());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    #[test]
    fn test_new_buffer_has_one_empty_line() {
        let buffer = Buffer::new();
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.line_len(0), 0);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_insert_marks_dirty_and_bumps_version() {
        let mut buffer = Buffer::new();
        let end = buffer.insert(pos(0, 0), "a").unwrap();
        assert_eq!(end, pos(0, 1));
        assert_eq!(buffer.line(0).unwrap(), "a");
        assert!(buffer.is_dirty());
        assert_eq!(buffer.version(), 1);
    }

    #[test]
    fn test_insert_multiline_returns_end() {
        let mut buffer = Buffer::from_text("ad");
        let end = buffer.insert(pos(0, 1), "b\nc").unwrap();
        assert_eq!(end, pos(1, 1));
        assert_eq!(buffer.text(), "ab\ncd");
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut buffer = Buffer::from_text("abc");
        assert!(matches!(
            buffer.insert(pos(0, 4), "x"),
            Err(EditorError::OutOfRange(_))
        ));
        assert!(matches!(
            buffer.insert(pos(1, 0), "x"),
            Err(EditorError::OutOfRange(_))
        ));
        // end of buffer is the permitted boundary
        assert!(buffer.insert(pos(0, 3), "d").is_ok());
        assert_eq!(buffer.text(), "abcd");
    }

    #[test]
    fn test_combining_marks_are_one_column() {
        // "e" + combining acute accent is a single grapheme
        let buffer = Buffer::from_text("e\u{301}x");
        assert_eq!(buffer.line_len(0), 2);
        assert_eq!(buffer.char_at(pos(0, 0)).unwrap(), "e\u{301}");
        assert_eq!(buffer.char_at(pos(0, 1)).unwrap(), "x");
        assert_eq!(buffer.char_at(pos(0, 2)), None);
    }

    #[test]
    fn test_delete_never_splits_clusters() {
        let mut buffer = Buffer::from_text("a\u{1F468}\u{200D}\u{1F469}b");
        assert_eq!(buffer.line_len(0), 3);
        let removed = buffer.delete(Range::new(pos(0, 1), pos(0, 2))).unwrap();
        assert_eq!(removed, "\u{1F468}\u{200D}\u{1F469}");
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn test_delete_across_lines() {
        let mut buffer = Buffer::from_text("hello\nworld");
        let removed = buffer.delete(Range::new(pos(0, 3), pos(1, 2))).unwrap();
        assert_eq!(removed, "lo\nwo");
        assert_eq!(buffer.text(), "helrld");
    }

    #[test]
    fn test_slice_and_reversed_range() {
        let buffer = Buffer::from_text("hello\nworld");
        assert_eq!(buffer.slice(Range::new(pos(1, 3), pos(0, 4))).unwrap(), "o\nwor");
    }

    #[test]
    fn test_crlf_round_trip() {
        let buffer = Buffer::from_text("a\r\nb\r\n");
        assert_eq!(buffer.line_ending(), LineEnding::CrLf);
        assert_eq!(buffer.line(0).unwrap(), "a");
        assert_eq!(buffer.line_len(0), 1);
        assert_eq!(buffer.text_for_save(), "a\r\nb\r\n");
    }

    #[test]
    fn test_replace_line() {
        let mut buffer = Buffer::from_text("one\ntwo\nthree");
        buffer.replace_line(1, "2").unwrap();
        assert_eq!(buffer.text(), "one\n2\nthree");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Buffer::new().display_name(), "[No Name]");
        assert_eq!(Buffer::new().with_path("a.txt").display_name(), "a.txt");
    }

    proptest! {
        #[test]
        fn insert_then_delete_restores(
            base in "[a-z \\n]{0,40}",
            text in "[a-zA-Z0-9 \\n\u{e9}]{0,20}",
            line_pick in 0usize..50,
            col_pick in 0usize..50,
        ) {
            let mut buffer = Buffer::from_text(&base);
            let line = line_pick % buffer.line_count();
            let col = col_pick % (buffer.line_len(line) + 1);
            let start = Position::new(line, col);
            let end = buffer.insert(start, &text).unwrap();
            buffer.delete(Range::new(start, end)).unwrap();
            prop_assert_eq!(buffer.text(), base);
        }
    }
}
