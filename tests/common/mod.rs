// Common test utilities for editing scenarios and bounds checks

use kestrel::buffer::Buffer;
use kestrel::editor::Editor;
use kestrel::motion::Position;

/// Utilities for creating editors with specific characteristics
pub mod boundary {
    use super::*;

    /// Text of n lines; line i has (i % 10) + 1 characters
    #[allow(dead_code)]
    pub fn multiline_text(line_count: usize) -> String {
        (0..line_count)
            .map(|i| "a".repeat(i % 10 + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Editor whose only buffer holds `text`, cursor at (0,0), Normal mode
    #[allow(dead_code)]
    pub fn editor_with(text: &str) -> Editor {
        Editor::with_text(text)
    }

    /// Editor with the cursor already placed
    #[allow(dead_code)]
    pub fn editor_at(text: &str, line: usize, col: usize) -> Editor {
        let mut editor = Editor::with_text(text);
        editor.set_cursor(Position::new(line, col));
        editor
    }

    /// Start, last grapheme and one-past-end of every line
    #[allow(dead_code)]
    pub fn boundary_positions(buffer: &Buffer) -> Vec<Position> {
        let mut positions = Vec::new();
        for line in 0..buffer.line_count() {
            let len = buffer.line_len(line);
            positions.push(Position::new(line, 0));
            if len > 0 {
                positions.push(Position::new(line, len - 1));
            }
            positions.push(Position::new(line, len));
        }
        positions
    }
}

/// Validation utilities for checking invariants
pub mod validation {
    use super::*;
    use kestrel::mode::Mode;

    /// All lines of the active buffer
    #[allow(dead_code)]
    pub fn lines(editor: &Editor) -> Vec<String> {
        let buffer = editor.buffer();
        (0..buffer.line_count())
            .map(|l| buffer.line(l).expect("line in range"))
            .collect()
    }

    /// Cursor is on an existing line and, outside Insert mode, on a grapheme
    /// (or column 0 of an empty line).
    #[allow(dead_code)]
    pub fn assert_cursor_valid(editor: &Editor) {
        let cursor = editor.cursor();
        let buffer = editor.buffer();
        assert!(
            cursor.line < buffer.line_count(),
            "Cursor line {} out of bounds (line_count: {})",
            cursor.line,
            buffer.line_count()
        );
        let len = buffer.line_len(cursor.line);
        let limit = if editor.mode() == Mode::Insert {
            len
        } else {
            len.saturating_sub(1)
        };
        assert!(
            cursor.col <= limit,
            "Cursor col {} out of bounds for line {} (line_len: {}, mode: {:?})",
            cursor.col,
            cursor.line,
            len,
            editor.mode()
        );
    }

    #[allow(dead_code)]
    pub fn assert_buffer_invariants(buffer: &Buffer) {
        assert!(buffer.line_count() >= 1, "Buffer must have at least 1 line");
        for line in 0..buffer.line_count() {
            assert!(buffer.line(line).is_some(), "line {} not accessible", line);
        }
    }
}

/// Utilities for testing overflow scenarios
pub mod overflow {
    /// Counts that could cause arithmetic overflow if multiplied or added
    #[allow(dead_code)]
    pub const EXTREME_COUNTS: &[usize] = &[1, 2, 100, 99_999, 1_000_000];
}

/// Utilities for rapid key replay
pub mod stress {
    use super::*;

    /// Replay each key string `iterations` times, checking invariants after
    /// every string.
    #[allow(dead_code)]
    pub fn rapid_keys(editor: &mut Editor, keys: &[&str], iterations: usize) {
        for _ in 0..iterations {
            for k in keys {
                editor.feed_keys(k).expect("no fatal error");
                validation::assert_cursor_valid(editor);
                validation::assert_buffer_invariants(editor.buffer());
            }
        }
    }
}
