// src/motion.rs - Position and motion calculation for Vim commands

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::error::EditorError;

/// A position in the buffer (line, grapheme column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// A half-open range `[start, end)` between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Normalize range so start <= end
    pub fn normalized(self) -> Range {
        if self.start <= self.end {
            self
        } else {
            Range {
                start: self.end,
                end: self.start,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// How an operator treats the span between cursor and motion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// Target grapheme is not part of the span (`w`, `b`, `h`, `0`).
    Exclusive,
    /// Target grapheme is part of the span (`e`, `f`, `$`, `%`).
    Inclusive,
    /// Whole lines between cursor and target (`j`, `k`, `G`).
    Linewise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    WordForward,
    WordBackward,
    WordEnd,
    LineStart,
    FirstNonBlank,
    LineEnd,
    FileStart,
    FileEnd,
    /// 1-based target line (`{count}G`, `{count}gg`, `:{count}`)
    GotoLine(usize),
    FindForward(char),
    FindBackward(char),
    TillForward(char),
    TillBackward(char),
    RepeatFind,
    RepeatFindReverse,
    MatchPair,
    SearchNext,
    SearchPrev,
}

impl Motion {
    pub fn kind(&self) -> MotionKind {
        match self {
            Motion::Up
            | Motion::Down
            | Motion::FileStart
            | Motion::FileEnd
            | Motion::GotoLine(_) => MotionKind::Linewise,
            Motion::WordEnd
            | Motion::LineEnd
            | Motion::FindForward(_)
            | Motion::TillForward(_)
            | Motion::MatchPair => MotionKind::Inclusive,
            _ => MotionKind::Exclusive,
        }
    }

    /// Motions that keep the sticky column instead of resetting it.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Motion::Up | Motion::Down)
    }

    /// The same find motion scanning the other way (used by `,`).
    pub fn reversed_find(&self) -> Option<Motion> {
        match *self {
            Motion::FindForward(c) => Some(Motion::FindBackward(c)),
            Motion::FindBackward(c) => Some(Motion::FindForward(c)),
            Motion::TillForward(c) => Some(Motion::TillBackward(c)),
            Motion::TillBackward(c) => Some(Motion::TillForward(c)),
            _ => None,
        }
    }

    pub fn is_find(&self) -> bool {
        self.reversed_find().is_some()
    }
}

/// Word boundaries for Vim-style word movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    /// Word consists of alphanumeric and underscore
    Alphanumeric,
    /// Word is whitespace (line breaks count as whitespace)
    Whitespace,
    /// Word is other non-whitespace
    Other,
}

/// Determine the kind of character at a position
fn char_kind(c: char) -> WordKind {
    if c.is_alphanumeric() || c == '_' {
        WordKind::Alphanumeric
    } else if c.is_whitespace() {
        WordKind::Whitespace
    } else {
        WordKind::Other
    }
}

/// A grapheme cluster is classified by its base character.
pub fn grapheme_kind(g: &str) -> WordKind {
    g.chars().next().map(char_kind).unwrap_or(WordKind::Whitespace)
}

/// Steps through the buffer one grapheme at a time, caching the current
/// line. The column equal to the line length stands for the line break.
struct GraphemeWalker<'a> {
    buffer: &'a Buffer,
    line: usize,
    col: usize,
    graphemes: Vec<String>,
}

impl<'a> GraphemeWalker<'a> {
    fn new(buffer: &'a Buffer, pos: Position) -> Self {
        let graphemes = buffer.line_graphemes(pos.line);
        let col = pos.col.min(graphemes.len());
        Self {
            buffer,
            line: pos.line,
            col,
            graphemes,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn kind(&self) -> WordKind {
        self.graphemes
            .get(self.col)
            .map(|g| grapheme_kind(g))
            .unwrap_or(WordKind::Whitespace)
    }

    fn load(&mut self, line: usize) {
        self.line = line;
        self.graphemes = self.buffer.line_graphemes(line);
    }

    fn advance(&mut self) -> bool {
        if self.col < self.graphemes.len() {
            self.col += 1;
            // the final line has no break to stand on
            if self.col == self.graphemes.len() && self.line + 1 >= self.buffer.line_count() {
                self.col -= 1;
                return false;
            }
            true
        } else if self.line + 1 < self.buffer.line_count() {
            self.load(self.line + 1);
            self.col = 0;
            true
        } else {
            false
        }
    }

    fn retreat(&mut self) -> bool {
        if self.col > 0 {
            self.col -= 1;
            true
        } else if self.line > 0 {
            self.load(self.line - 1);
            self.col = self.graphemes.len();
            true
        } else {
            false
        }
    }
}

/// Start of the next word (Vim's `w` motion), `None` when no word follows.
///
/// Rules:
/// - A boundary is any change between word, punctuation and whitespace
/// - Whitespace (including line breaks and blank lines) is skipped when landing
pub fn word_forward(buffer: &Buffer, pos: Position) -> Option<Position> {
    let mut walker = GraphemeWalker::new(buffer, pos);
    let start_kind = walker.kind();
    if start_kind != WordKind::Whitespace {
        while walker.kind() == start_kind {
            if !walker.advance() {
                return None;
            }
        }
    }
    while walker.kind() == WordKind::Whitespace {
        if !walker.advance() {
            return None;
        }
    }
    Some(walker.pos())
}

/// Start of the previous word (Vim's `b` motion), `None` at the first word.
pub fn word_backward(buffer: &Buffer, pos: Position) -> Option<Position> {
    let mut walker = GraphemeWalker::new(buffer, pos);
    if !walker.retreat() {
        return None;
    }
    while walker.kind() == WordKind::Whitespace {
        if !walker.retreat() {
            return None;
        }
    }
    let kind = walker.kind();
    loop {
        let here = walker.pos();
        if !walker.retreat() {
            return Some(here);
        }
        if walker.kind() != kind {
            return Some(here);
        }
    }
}

/// End of the current or next word (Vim's `e` motion).
pub fn word_end(buffer: &Buffer, pos: Position) -> Option<Position> {
    let mut walker = GraphemeWalker::new(buffer, pos);
    if !walker.advance() {
        return None;
    }
    while walker.kind() == WordKind::Whitespace {
        if !walker.advance() {
            return None;
        }
    }
    let kind = walker.kind();
    loop {
        let here = walker.pos();
        if !walker.advance() || walker.kind() != kind {
            return Some(here);
        }
    }
}

/// Last column of the word run under `pos`, staying on the line. Used by
/// `cw`, which changes to the end of the current word rather than the next.
pub fn word_run_end(buffer: &Buffer, pos: Position) -> Position {
    let graphemes = buffer.line_graphemes(pos.line);
    let Some(kind) = graphemes.get(pos.col).map(|g| grapheme_kind(g)) else {
        return pos;
    };
    let run = graphemes[pos.col..]
        .iter()
        .take_while(|g| grapheme_kind(g) == kind)
        .count();
    Position::new(pos.line, pos.col + run.saturating_sub(1))
}

/// Move to start of line (Vim's `0` motion)
pub fn line_start(pos: Position) -> Position {
    Position::new(pos.line, 0)
}

/// Move to first non-blank character of line (Vim's `^` motion).
/// All-whitespace lines fall back to column 0.
pub fn first_non_blank(buffer: &Buffer, line: usize) -> Position {
    let col = buffer
        .line_graphemes(line)
        .iter()
        .position(|g| grapheme_kind(g) != WordKind::Whitespace)
        .unwrap_or(0);
    Position::new(line, col)
}

/// Last grapheme of a line (Vim's `$` motion)
pub fn line_end(buffer: &Buffer, line: usize) -> Position {
    Position::new(line, buffer.line_len(line).saturating_sub(1))
}

/// Move to start of file (Vim's `gg` motion)
pub fn file_start(buffer: &Buffer) -> Position {
    first_non_blank(buffer, 0)
}

/// Move to end of file (Vim's `G` motion)
pub fn file_end(buffer: &Buffer) -> Position {
    first_non_blank(buffer, buffer.line_count().saturating_sub(1))
}

/// Scan the rest of the current line for `target` (`f`, `F`, `t`, `T`).
/// Repeats `count` times; fails when the line runs out of occurrences.
pub fn find_in_line(
    buffer: &Buffer,
    pos: Position,
    motion: Motion,
    count: usize,
) -> Result<Position, EditorError> {
    let graphemes = buffer.line_graphemes(pos.line);
    let (target, forward, till) = match motion {
        Motion::FindForward(c) => (c, true, false),
        Motion::FindBackward(c) => (c, false, false),
        Motion::TillForward(c) => (c, true, true),
        Motion::TillBackward(c) => (c, false, true),
        _ => return Ok(pos),
    };
    let needle = target.to_string();
    let not_found = || EditorError::NoMatchFound(needle.clone());
    let mut col = pos.col;
    for _ in 0..count.max(1) {
        let found = if forward {
            graphemes
                .iter()
                .enumerate()
                .skip(col + 1)
                .find(|(_, g)| **g == needle)
                .map(|(idx, _)| idx)
        } else {
            graphemes[..col.min(graphemes.len())]
                .iter()
                .rposition(|g| *g == needle)
        };
        col = found.ok_or_else(not_found)?;
    }
    if till {
        col = if forward { col - 1 } else { col + 1 };
    }
    Ok(Position::new(pos.line, col))
}

fn bracket_pair(g: &str) -> Option<(char, char, bool)> {
    match g {
        "(" => Some(('(', ')', true)),
        "[" => Some(('[', ']', true)),
        "{" => Some(('{', '}', true)),
        ")" => Some(('(', ')', false)),
        "]" => Some(('[', ']', false)),
        "}" => Some(('{', '}', false)),
        _ => None,
    }
}

/// Find matching pair character (parens, braces, brackets) for `%`.
///
/// The nearest bracket at or after the cursor on the current line is used
/// as the origin; its partner is searched across the whole buffer with a
/// depth counter.
pub fn find_matching_pair(buffer: &Buffer, pos: Position) -> Result<Position, EditorError> {
    let not_found = || EditorError::NoMatchFound("matching bracket".to_string());
    let graphemes = buffer.line_graphemes(pos.line);
    let (origin_col, (open, close, forward)) = graphemes
        .iter()
        .enumerate()
        .skip(pos.col)
        .find_map(|(idx, g)| bracket_pair(g).map(|pair| (idx, pair)))
        .ok_or_else(not_found)?;
    let (same, partner) = if forward {
        (open.to_string(), close.to_string())
    } else {
        (close.to_string(), open.to_string())
    };

    let mut walker = GraphemeWalker::new(buffer, Position::new(pos.line, origin_col));
    let mut depth = 0usize;
    loop {
        let moved = if forward {
            walker.advance()
        } else {
            walker.retreat()
        };
        if !moved {
            return Err(not_found());
        }
        let Some(g) = walker.graphemes.get(walker.col) else {
            continue;
        };
        if *g == same {
            depth += 1;
        } else if *g == partner {
            if depth == 0 {
                return Ok(walker.pos());
            }
            depth -= 1;
        }
    }
}

/// Largest column the cursor may occupy on a line.
pub fn max_col(buffer: &Buffer, line: usize, past_end: bool) -> usize {
    let len = buffer.line_len(line);
    if past_end { len } else { len.saturating_sub(1) }
}

/// Resolve a motion against the buffer, applying it `count` times.
///
/// `past_end` lets the cursor rest one column past the last grapheme, as in
/// Insert mode or when an operator needs an exclusive end. Search motions are
/// resolved by the editor and return the cursor unchanged here.
pub fn resolve(
    buffer: &Buffer,
    cursor: &Cursor,
    motion: Motion,
    count: usize,
    past_end: bool,
) -> Result<Cursor, EditorError> {
    let count = count.max(1);
    let pos = cursor.position();
    let last_line = buffer.line_count().saturating_sub(1);
    let target = match motion {
        Motion::Left => Position::new(pos.line, pos.col.saturating_sub(count)),
        Motion::Right => {
            let limit = max_col(buffer, pos.line, past_end);
            Position::new(pos.line, pos.col.saturating_add(count).min(limit))
        }
        Motion::Up | Motion::Down => {
            let line = if motion == Motion::Up {
                pos.line.saturating_sub(count)
            } else {
                pos.line.saturating_add(count).min(last_line)
            };
            let col = cursor.desired_col.min(max_col(buffer, line, past_end));
            return Ok(Cursor {
                line,
                col,
                desired_col: cursor.desired_col,
            });
        }
        Motion::WordForward => repeat(pos, count, |p| word_forward(buffer, p)),
        Motion::WordBackward => repeat(pos, count, |p| word_backward(buffer, p)),
        Motion::WordEnd => repeat(pos, count, |p| word_end(buffer, p)),
        Motion::LineStart => line_start(pos),
        Motion::FirstNonBlank => first_non_blank(buffer, pos.line),
        Motion::LineEnd => {
            let line = pos.line.saturating_add(count - 1).min(last_line);
            let end = if past_end {
                Position::new(line, buffer.line_len(line))
            } else {
                line_end(buffer, line)
            };
            return Ok(Cursor {
                line: end.line,
                col: end.col,
                desired_col: usize::MAX,
            });
        }
        Motion::FileStart => file_start(buffer),
        Motion::FileEnd => file_end(buffer),
        Motion::GotoLine(n) => first_non_blank(buffer, n.saturating_sub(1).min(last_line)),
        Motion::FindForward(_)
        | Motion::FindBackward(_)
        | Motion::TillForward(_)
        | Motion::TillBackward(_) => find_in_line(buffer, pos, motion, count)?,
        Motion::MatchPair => {
            let mut p = pos;
            for _ in 0..count {
                p = find_matching_pair(buffer, p)?;
            }
            p
        }
        Motion::RepeatFind | Motion::RepeatFindReverse | Motion::SearchNext | Motion::SearchPrev => {
            pos
        }
    };
    Ok(Cursor::at(target.line, target.col))
}

/// Apply a single-step motion up to `count` times, stopping early when it
/// can no longer move.
fn repeat(pos: Position, count: usize, step: impl Fn(Position) -> Option<Position>) -> Position {
    let mut current = pos;
    for _ in 0..count {
        match step(current) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Buffer {
        Buffer::from_text(text)
    }

    #[test]
    fn test_position_new() {
        let pos = Position::new(5, 10);
        assert_eq!(pos.line, 5);
        assert_eq!(pos.col, 10);
    }

    #[test]
    fn test_range_normalized() {
        let range1 = Range::new(Position::new(5, 10), Position::new(2, 3));
        let norm1 = range1.normalized();
        assert_eq!(norm1.start, Position::new(2, 3));
        assert_eq!(norm1.end, Position::new(5, 10));

        let range2 = Range::new(Position::new(2, 3), Position::new(5, 10));
        assert_eq!(range2.normalized(), range2);
    }

    #[test]
    fn test_char_kind() {
        assert_eq!(char_kind('a'), WordKind::Alphanumeric);
        assert_eq!(char_kind('Z'), WordKind::Alphanumeric);
        assert_eq!(char_kind('0'), WordKind::Alphanumeric);
        assert_eq!(char_kind('_'), WordKind::Alphanumeric);
        assert_eq!(char_kind(' '), WordKind::Whitespace);
        assert_eq!(char_kind('\t'), WordKind::Whitespace);
        assert_eq!(char_kind('.'), WordKind::Other);
        assert_eq!(char_kind('('), WordKind::Other);
    }

    #[test]
    fn test_word_forward_boundaries() {
        let b = buf("foo.bar  baz");
        assert_eq!(word_forward(&b, Position::new(0, 0)), Some(Position::new(0, 3)));
        assert_eq!(word_forward(&b, Position::new(0, 3)), Some(Position::new(0, 4)));
        assert_eq!(word_forward(&b, Position::new(0, 4)), Some(Position::new(0, 9)));
        assert_eq!(word_forward(&b, Position::new(0, 9)), None);
    }

    #[test]
    fn test_word_forward_crosses_lines_and_blank_lines() {
        let b = buf("one\n\n  two");
        assert_eq!(word_forward(&b, Position::new(0, 0)), Some(Position::new(2, 2)));
    }

    #[test]
    fn test_word_backward() {
        let b = buf("one two\nthree");
        assert_eq!(word_backward(&b, Position::new(1, 0)), Some(Position::new(0, 4)));
        assert_eq!(word_backward(&b, Position::new(0, 5)), Some(Position::new(0, 4)));
        assert_eq!(word_backward(&b, Position::new(0, 4)), Some(Position::new(0, 0)));
        assert_eq!(word_backward(&b, Position::new(0, 0)), None);
    }

    #[test]
    fn test_word_end() {
        let b = buf("one two");
        assert_eq!(word_end(&b, Position::new(0, 0)), Some(Position::new(0, 2)));
        assert_eq!(word_end(&b, Position::new(0, 2)), Some(Position::new(0, 6)));
        assert_eq!(word_end(&b, Position::new(0, 6)), None);
    }

    #[test]
    fn test_word_run_end_stays_in_word() {
        let b = buf("ab cd");
        assert_eq!(word_run_end(&b, Position::new(0, 0)), Position::new(0, 1));
        assert_eq!(word_run_end(&b, Position::new(0, 1)), Position::new(0, 1));
        assert_eq!(word_run_end(&b, Position::new(0, 2)), Position::new(0, 2));
    }

    #[test]
    fn test_first_non_blank_falls_back_to_zero() {
        let b = buf("   x\n    ");
        assert_eq!(first_non_blank(&b, 0), Position::new(0, 3));
        assert_eq!(first_non_blank(&b, 1), Position::new(1, 0));
    }

    #[test]
    fn test_find_in_line() {
        let b = buf("a,b,c,d");
        let p = Position::new(0, 0);
        assert_eq!(
            find_in_line(&b, p, Motion::FindForward(','), 2).unwrap(),
            Position::new(0, 3)
        );
        assert_eq!(
            find_in_line(&b, p, Motion::TillForward('c'), 1).unwrap(),
            Position::new(0, 3)
        );
        assert!(matches!(
            find_in_line(&b, p, Motion::FindForward('z'), 1),
            Err(EditorError::NoMatchFound(_))
        ));
        assert_eq!(
            find_in_line(&b, Position::new(0, 6), Motion::FindBackward('b'), 1).unwrap(),
            Position::new(0, 2)
        );
    }

    #[test]
    fn test_matching_pair_nested_and_multiline() {
        let b = buf("f(a, (b)) {\n  x\n}");
        assert_eq!(find_matching_pair(&b, Position::new(0, 0)).unwrap(), Position::new(0, 8));
        assert_eq!(find_matching_pair(&b, Position::new(0, 8)).unwrap(), Position::new(0, 1));
        assert_eq!(find_matching_pair(&b, Position::new(0, 9)).unwrap(), Position::new(2, 0));
        assert!(find_matching_pair(&buf("no brackets"), Position::new(0, 0)).is_err());
    }

    #[test]
    fn test_vertical_motion_keeps_sticky_column() {
        let b = buf("long line\nab\nanother long");
        let cursor = Cursor::at(0, 7);
        let down = resolve(&b, &cursor, Motion::Down, 1, false).unwrap();
        assert_eq!((down.line, down.col, down.desired_col), (1, 1, 7));
        let down = resolve(&b, &down, Motion::Down, 1, false).unwrap();
        assert_eq!((down.line, down.col), (2, 7));
    }

    #[test]
    fn test_horizontal_motion_clamps_to_line() {
        let b = buf("abc\ndef");
        let cursor = Cursor::at(0, 1);
        let right = resolve(&b, &cursor, Motion::Right, 10, false).unwrap();
        assert_eq!(right.position(), Position::new(0, 2));
        let right = resolve(&b, &cursor, Motion::Right, 10, true).unwrap();
        assert_eq!(right.position(), Position::new(0, 3));
        let left = resolve(&b, &cursor, Motion::Left, 10, false).unwrap();
        assert_eq!(left.position(), Position::new(0, 0));
    }

    #[test]
    fn test_counted_word_motion_matches_repeated_single_steps() {
        let b = buf("a b c d e f");
        let once = (0..3).fold(Cursor::new(), |c, _| {
            resolve(&b, &c, Motion::WordForward, 1, false).unwrap()
        });
        let counted = resolve(&b, &Cursor::new(), Motion::WordForward, 3, false).unwrap();
        assert_eq!(once.position(), counted.position());
    }

    #[test]
    fn test_dollar_sets_sticky_end() {
        let b = buf("abc\nabcdef");
        let end = resolve(&b, &Cursor::new(), Motion::LineEnd, 1, false).unwrap();
        assert_eq!(end.position(), Position::new(0, 2));
        let down = resolve(&b, &end, Motion::Down, 1, false).unwrap();
        assert_eq!(down.position(), Position::new(1, 5));
    }
}
