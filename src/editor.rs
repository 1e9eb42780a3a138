// src/editor.rs - Core editor coordinator

use crate::buffer::Buffer;
use crate::buffer_manager::{BufferId, BufferManager};
use crate::command::{Command, InsertEntry, Operator, PasteSide};
use crate::config::EditorConfig;
use crate::cursor::Cursor;
use crate::error::{EditorError, PersistOp};
use crate::ex::{self, ExCommand};
use crate::history::History;
use crate::keys::{key_notation, parse_keys};
use crate::mode::Mode;
use crate::motion::{self, Motion, MotionKind, Position, Range, WordKind};
use crate::persistence::{FsPersistence, Persistence};
use crate::registers::{Register, RegisterKind, Registers, UNNAMED};
use crate::search::{self, PatternMatcher, RegexMatcher, SearchDirection, SearchOptions, SearchState};
use crate::selection::{LineSpan, Selection, SelectionKind};
use crate::viewport::{HighlightKind, HighlightSpan, SyntaxClassifier, Viewport};
use crate::vim_parser::{ParseResult, VimParser};
use crossterm::event::KeyEvent;
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};

/// Message for the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

impl Status {
    pub fn message(&self) -> &str {
        match self {
            Status::Info(msg) | Status::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }
}

/// Text typed since entering Insert mode; the session is one undo step.
#[derive(Debug, Default)]
struct InsertSession {
    typed: String,
}

/// Span an operator works on
enum Span {
    Chars(Range),
    Lines(usize, usize),
}

pub struct Editor {
    buffers: BufferManager,
    registers: Registers,
    parser: VimParser,
    viewport: Viewport,
    config: EditorConfig,
    search: SearchState,
    matcher: Box<dyn PatternMatcher>,
    persistence: Box<dyn Persistence>,
    last_find: Option<Motion>,
    insert_session: Option<InsertSession>,
    status: Option<Status>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self::with_persistence(config, Box::new(FsPersistence))
    }

    pub fn with_persistence(config: EditorConfig, persistence: Box<dyn Persistence>) -> Self {
        Self {
            buffers: BufferManager::with_undo_levels(config.undo_levels),
            registers: Registers::new(),
            parser: VimParser::new(),
            viewport: Viewport::default(),
            search: SearchState::new(),
            matcher: Box::new(RegexMatcher::new()),
            persistence,
            last_find: None,
            insert_session: None,
            status: None,
            config,
        }
    }

    /// Editor whose only buffer holds `text`
    pub fn with_text(text: &str) -> Self {
        let mut editor = Self::new();
        editor.buffers.open(Buffer::from_text(text));
        editor
    }

    pub fn set_matcher(&mut self, matcher: Box<dyn PatternMatcher>) {
        self.matcher = matcher;
    }

    /// Open `path` in a new buffer, or activate it when already open. A path
    /// that does not exist yet gives an empty buffer that will create it.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<BufferId, EditorError> {
        let path = path.as_ref();
        if let Some(id) = self.buffers.find_by_path(path) {
            self.buffers.switch_to(id)?;
            self.on_buffer_switch();
            return Ok(id);
        }
        let buffer = match self.persistence.load(path) {
            Ok(text) => Buffer::from_text(&text).with_path(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.info(format!("\"{}\" [New]", path.display()));
                Buffer::new().with_path(path)
            }
            Err(source) => {
                return Err(EditorError::Persistence {
                    op: PersistOp::Load,
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let id = self.buffers.open(buffer);
        self.on_buffer_switch();
        Ok(id)
    }

    // === Accessors for the renderer and callers ===

    pub fn mode(&self) -> Mode {
        self.parser.mode()
    }

    pub fn cursor(&self) -> Cursor {
        self.buffers.active().cursor
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffers.active().buffer
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    pub fn active_buffer_id(&self) -> BufferId {
        self.buffers.active_id()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.buffers.active().history
    }

    pub fn selection(&self) -> Option<Selection> {
        self.buffers.active().selection.get().copied()
    }

    /// Command or search line being typed, with its prompt
    pub fn command_line(&self) -> Option<String> {
        self.parser.pending_line()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.viewport.resize(rows, cols);
        self.scroll_to_cursor();
    }

    /// Lines currently inside the viewport
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.viewport.visible_range(self.buffer().line_count())
    }

    /// Place the cursor directly, clamped to the buffer
    pub fn set_cursor(&mut self, pos: Position) {
        self.set_cursor_position(pos);
        self.after_command();
    }

    /// Per-line columns covered by the active selection
    pub fn selection_spans(&self) -> Vec<LineSpan> {
        let entry = self.buffers.active();
        entry
            .selection
            .get()
            .map(|s| s.spans(&entry.buffer))
            .unwrap_or_default()
    }

    /// Matches of the last search on visible lines while highlighting is on
    pub fn search_spans(&self) -> Vec<search::SearchMatch> {
        let Some(pattern) = self.search.last_pattern.as_deref() else {
            return Vec::new();
        };
        if !self.search.highlight {
            return Vec::new();
        }
        let buffer = self.buffer();
        self.visible_range()
            .flat_map(|line| {
                search::matches_in_line(
                    buffer,
                    line,
                    pattern,
                    self.config.ignore_case,
                    self.matcher.as_ref(),
                )
                .unwrap_or_default()
            })
            .collect()
    }

    /// Everything the renderer paints over the visible lines: syntax spans
    /// from `classifier`, then search matches, then the selection.
    pub fn highlight_spans(&self, classifier: &dyn SyntaxClassifier) -> Vec<HighlightSpan> {
        let buffer = self.buffer();
        let mut spans: Vec<HighlightSpan> = self
            .visible_range()
            .filter_map(|line| buffer.line(line).map(|text| classifier.classify(line, &text)))
            .flatten()
            .collect();
        spans.extend(self.search_spans().into_iter().map(|m| HighlightSpan {
            line: m.line,
            start_col: m.start_col,
            end_col: m.end_col,
            kind: HighlightKind::SearchMatch,
        }));
        let visible = self.visible_range();
        spans.extend(
            self.selection_spans()
                .into_iter()
                .filter(|s| visible.contains(&s.line))
                .map(|s| HighlightSpan {
                    line: s.line,
                    start_col: s.start_col,
                    end_col: s.end_col,
                    kind: HighlightKind::Selection,
                }),
        );
        spans
    }

    // === Key handling ===

    /// Feed one key event. Returns `Ok(true)` when the editor should quit.
    ///
    /// Recoverable errors become a status message; only a failed save is
    /// returned to the caller.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool, EditorError> {
        let outcome = match self.parser.process_key(key) {
            ParseResult::Command(cmd) => self.execute_command(cmd),
            ParseResult::Invalid => Err(EditorError::InvalidCommand(key_notation(&key))),
            ParseResult::Pending | ParseResult::Cancelled => Ok(false),
        };
        let result = match outcome {
            Ok(quit) => Ok(quit),
            Err(e) if e.is_fatal() => {
                warn!("{}", e);
                self.status = Some(Status::Error(e.to_string()));
                Err(e)
            }
            Err(e) => {
                debug!("recovered: {}", e);
                self.status = Some(Status::Error(e.to_string()));
                Ok(false)
            }
        };
        self.after_command();
        result
    }

    /// Replay keys written in Vim notation, stopping early on quit.
    pub fn feed_keys(&mut self, notation: &str) -> Result<bool, EditorError> {
        for key in parse_keys(notation)? {
            if self.handle_key(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run a resolved command against the active buffer. Returns `Ok(true)`
    /// when the editor should quit.
    pub fn execute_command(&mut self, cmd: Command) -> Result<bool, EditorError> {
        debug!("dispatch {:?}", cmd);
        match cmd {
            Command::Move { motion, count } => {
                let past_end = self.parser.mode() == Mode::Insert;
                let target = self.resolve_motion(motion, count, past_end)?;
                self.buffers.active_mut().cursor = target;
            }
            Command::Operate {
                operator,
                motion,
                count,
                register,
            } => self.operate_motion(operator, motion, count, register)?,
            Command::OperateLines {
                operator,
                count,
                register,
            } => {
                let first = self.cursor().line;
                let last = first.saturating_add(count.max(1) - 1);
                self.operate_lines(operator, first, last, register)?;
            }
            Command::OperateSelection { operator, register } => {
                let result = self.operate_selection(operator, register);
                self.buffers.active_mut().selection.clear();
                result?;
            }
            Command::Paste {
                side,
                count,
                register,
            } => self.paste(side, count, register)?,
            Command::ReplaceChar { ch, count } => self.replace_chars(ch, count)?,
            Command::JoinLines(count) => self.join_lines(count)?,
            Command::ToggleCase(count) => self.toggle_case(count)?,
            Command::Undo(count) => self.undo(count)?,
            Command::Redo(count) => self.redo(count)?,
            Command::EnterInsert(entry) => self.enter_insert(entry)?,
            Command::EnterVisual(kind) => {
                let entry = self.buffers.active_mut();
                if entry.selection.is_active() {
                    entry.selection.set_kind(kind);
                } else {
                    entry.selection.start(kind, entry.cursor.position());
                }
            }
            Command::SwapSelectionEnds => {
                let entry = self.buffers.active_mut();
                if let Some(head) = entry.selection.swap_ends() {
                    entry.cursor.set_position(head);
                }
            }
            Command::EnterCommandMode | Command::EnterSearch(_) => self.status = None,
            Command::ExecuteCommandLine(line) => {
                if !line.trim().is_empty() {
                    self.registers.store_command(line.clone());
                }
                let command = ExCommand::parse(&line)?;
                return self.execute_ex(command);
            }
            Command::Search { direction, pattern } => self.search_for(&pattern, direction)?,
            Command::InsertText(text) => self.insert_text(&text)?,
            Command::InsertNewline => self.insert_text("\n")?,
            Command::InsertTab => {
                let tab = self.config.tab_text();
                self.insert_text(&tab)?;
            }
            Command::DeleteChar => self.backspace()?,
            Command::DeleteCharForward => self.delete_forward()?,
            Command::NormalMode => {
                self.finish_insert();
                self.buffers.active_mut().selection.clear();
            }
        }
        Ok(false)
    }

    // === Undo bookkeeping ===

    /// Call before mutating: remembers the cursor for undo. Inside an insert
    /// session the whole session is one change.
    fn begin_change(&mut self) {
        if self.insert_session.is_none() {
            let entry = self.buffers.active_mut();
            entry.history.note_cursor(entry.cursor);
        }
    }

    /// Call after mutating: records one undo step.
    fn commit_change(&mut self) {
        if self.insert_session.is_none() {
            let entry = self.buffers.active_mut();
            entry.history.snapshot(&entry.buffer, entry.cursor);
        }
    }

    fn undo(&mut self, count: usize) -> Result<(), EditorError> {
        let entry = self.buffers.active_mut();
        let mut restored = None;
        for _ in 0..count.max(1) {
            match entry.history.undo() {
                Ok(snapshot) => restored = Some(snapshot.clone()),
                Err(e) if restored.is_none() => return Err(e),
                Err(_) => break,
            }
        }
        if let Some(snapshot) = restored {
            entry.buffer.restore(snapshot.text, snapshot.dirty);
            entry.cursor = snapshot.cursor;
        }
        Ok(())
    }

    fn redo(&mut self, count: usize) -> Result<(), EditorError> {
        let entry = self.buffers.active_mut();
        let mut restored = None;
        for _ in 0..count.max(1) {
            match entry.history.redo() {
                Ok(snapshot) => restored = Some(snapshot.clone()),
                Err(e) if restored.is_none() => return Err(e),
                Err(_) => break,
            }
        }
        if let Some(snapshot) = restored {
            entry.buffer.restore(snapshot.text, snapshot.dirty);
            entry.cursor = snapshot.cursor;
        }
        Ok(())
    }

    // === Motions ===

    fn resolve_motion(
        &mut self,
        motion: Motion,
        count: usize,
        past_end: bool,
    ) -> Result<Cursor, EditorError> {
        let cursor = self.buffers.active().cursor;
        match motion {
            Motion::SearchNext | Motion::SearchPrev => {
                let (pattern, direction) = self.search.repeat(motion == Motion::SearchPrev)?;
                self.search.highlight = true;
                let pos = self.search_from(cursor.position(), &pattern, direction, count)?;
                Ok(Cursor::at(pos.line, pos.col))
            }
            Motion::RepeatFind | Motion::RepeatFindReverse => {
                let find = self.repeated_find(motion)?;
                // a repeated till must not stick in front of the same target
                let mut start = cursor;
                match find {
                    Motion::TillForward(_) => start.col += 1,
                    Motion::TillBackward(_) => start.col = start.col.saturating_sub(1),
                    _ => {}
                }
                motion::resolve(&self.buffers.active().buffer, &start, find, count, past_end)
            }
            _ => {
                if motion.is_find() {
                    self.last_find = Some(motion);
                }
                motion::resolve(&self.buffers.active().buffer, &cursor, motion, count, past_end)
            }
        }
    }

    /// The find motion `;` or `,` stands for
    fn repeated_find(&self, motion: Motion) -> Result<Motion, EditorError> {
        let last = self
            .last_find
            .ok_or_else(|| EditorError::NoMatchFound("no previous find".to_string()))?;
        Ok(match motion {
            Motion::RepeatFindReverse => last.reversed_find().unwrap_or(last),
            _ => last,
        })
    }

    /// Position of the `count`-th match from `from`.
    fn search_from(
        &self,
        from: Position,
        pattern: &str,
        direction: SearchDirection,
        count: usize,
    ) -> Result<Position, EditorError> {
        let options = SearchOptions {
            wrap_scan: self.config.wrap_scan,
            ignore_case: self.config.ignore_case,
        };
        let buffer = &self.buffers.active().buffer;
        let count = count.max(1);
        let mut seen: Vec<Position> = Vec::new();
        let mut pos = from;
        while seen.len() < count {
            let next = search::find_next(buffer, pos, pattern, direction, options, self.matcher.as_ref())?
                .start();
            // wrapped all the way round: the rest of the count just cycles
            if seen.first() == Some(&next) {
                return Ok(seen[(count - 1) % seen.len()]);
            }
            seen.push(next);
            pos = next;
        }
        Ok(pos)
    }

    fn search_for(&mut self, pattern: &str, direction: SearchDirection) -> Result<(), EditorError> {
        let pattern = self.search.begin(pattern, direction)?;
        self.registers.store_search(pattern.clone());
        let from = self.cursor().position();
        let target = self.search_from(from, &pattern, direction, 1)?;
        self.set_cursor_position(target);
        Ok(())
    }

    // === Operators ===

    fn operate_motion(
        &mut self,
        operator: Operator,
        motion: Motion,
        count: usize,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let start = self.cursor().position();
        let on_word = self
            .buffer()
            .char_at(start)
            .is_some_and(|g| motion::grapheme_kind(&g) != WordKind::Whitespace);

        // `cw` on a word changes to its end, like `ce` that never jumps ahead
        if operator == Operator::Change && motion == Motion::WordForward && on_word {
            let buffer = self.buffer();
            let mut end = motion::word_run_end(buffer, start);
            if count > 1 {
                let from = Cursor::at(end.line, end.col);
                end = motion::resolve(buffer, &from, Motion::WordEnd, count - 1, true)?.position();
            }
            let range = Range::new(start, inclusive_end(buffer, end));
            return self.apply_span(operator, Span::Chars(range), register);
        }

        let kind = match motion {
            Motion::RepeatFind | Motion::RepeatFindReverse => self.repeated_find(motion)?.kind(),
            _ => motion.kind(),
        };
        let target = self.resolve_motion(motion, count, true)?.position();
        let buffer = self.buffer();
        let span = match kind {
            MotionKind::Linewise => {
                if motion.is_vertical() && target.line == start.line {
                    return Ok(());
                }
                Span::Lines(start.line.min(target.line), start.line.max(target.line))
            }
            MotionKind::Inclusive => {
                let (from, to) = if start <= target { (start, target) } else { (target, start) };
                Span::Chars(Range::new(from, inclusive_end(buffer, to)))
            }
            MotionKind::Exclusive => {
                let mut target = target;
                // `dw` stops at the end of the line
                if motion == Motion::WordForward && (target.line != start.line || target <= start) {
                    target = Position::new(start.line, buffer.line_len(start.line));
                }
                Span::Chars(Range::new(start, target).normalized())
            }
        };
        self.apply_span(operator, span, register)
    }

    fn apply_span(
        &mut self,
        operator: Operator,
        span: Span,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        match (span, operator) {
            (Span::Lines(first, last), _) => self.operate_lines(operator, first, last, register),
            (Span::Chars(range), Operator::Indent | Operator::Unindent) => {
                self.shift_lines(range.start.line, range.end.line, operator == Operator::Indent)
            }
            (Span::Chars(range), _) => self.operate_chars(operator, range, register),
        }
    }

    fn operate_chars(
        &mut self,
        operator: Operator,
        range: Range,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let range = range.normalized();
        if range.is_empty() {
            if operator == Operator::Change {
                self.begin_change();
                self.start_insert();
            }
            return Ok(());
        }
        let content = Register::chars(self.buffer().slice(range)?);
        match operator {
            Operator::Yank => {
                self.registers.record_yank(register, content)?;
                self.set_cursor_position(range.start);
            }
            Operator::Delete | Operator::Change => {
                self.registers.record_delete(register, content)?;
                self.begin_change();
                self.buffers.active_mut().buffer.delete(range)?;
                self.set_cursor_position(range.start);
                if operator == Operator::Change {
                    self.start_insert();
                } else {
                    self.commit_change();
                }
            }
            Operator::Indent | Operator::Unindent => {
                self.shift_lines(range.start.line, range.end.line, operator == Operator::Indent)?;
            }
        }
        Ok(())
    }

    fn operate_lines(
        &mut self,
        operator: Operator,
        first: usize,
        last: usize,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let buffer = self.buffer();
        let last = last.min(buffer.line_count().saturating_sub(1));
        let text: String = (first..=last)
            .filter_map(|line| buffer.line(line))
            .map(|line| line + "\n")
            .collect();
        let content = Register::lines(text);

        match operator {
            Operator::Yank => {
                self.registers.record_yank(register, content)?;
                let cursor = self.cursor();
                if first < cursor.line {
                    self.set_cursor_position(Position::new(first, cursor.col));
                }
            }
            Operator::Delete => {
                self.registers.record_delete(register, content)?;
                self.begin_change();
                let buffer = &mut self.buffers.active_mut().buffer;
                let range = whole_lines_range(buffer, first, last);
                buffer.delete(range)?;
                let line = first.min(buffer.line_count().saturating_sub(1));
                let target = motion::first_non_blank(buffer, line);
                self.set_cursor_position(target);
                self.commit_change();
            }
            Operator::Change => {
                self.registers.record_delete(register, content)?;
                self.begin_change();
                let buffer = &mut self.buffers.active_mut().buffer;
                let end = Position::new(last, buffer.line_len(last));
                buffer.delete(Range::new(Position::new(first, 0), end))?;
                self.set_cursor_position(Position::new(first, 0));
                self.start_insert();
            }
            Operator::Indent | Operator::Unindent => {
                self.shift_lines(first, last, operator == Operator::Indent)?;
            }
        }
        Ok(())
    }

    /// `>` and `<`: add or remove one indentation level on each line
    fn shift_lines(&mut self, first: usize, last: usize, indent: bool) -> Result<(), EditorError> {
        let unit = self.config.indent_unit();
        let shift_width = self.config.shift_width.max(1);
        self.begin_change();
        let buffer = &mut self.buffers.active_mut().buffer;
        let last = last.min(buffer.line_count().saturating_sub(1));
        for line in first..=last {
            let text = buffer.line(line).unwrap_or_default();
            if indent {
                if !text.is_empty() {
                    buffer.insert(Position::new(line, 0), &unit)?;
                }
            } else {
                let remove = if text.starts_with('\t') {
                    1
                } else {
                    text.chars().take(shift_width).take_while(|c| *c == ' ').count()
                };
                if remove > 0 {
                    buffer.delete(Range::new(Position::new(line, 0), Position::new(line, remove)))?;
                }
            }
        }
        let target = motion::first_non_blank(buffer, first);
        self.set_cursor_position(target);
        self.commit_change();
        Ok(())
    }

    fn operate_selection(
        &mut self,
        operator: Operator,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let Some(selection) = self.selection() else {
            return Ok(());
        };
        let (first, last) = selection.line_range();
        if matches!(operator, Operator::Indent | Operator::Unindent) {
            return self.shift_lines(first, last, operator == Operator::Indent);
        }
        match selection.kind {
            SelectionKind::Char => {
                let range = selection.char_range(self.buffer());
                self.operate_chars(operator, range, register)
            }
            SelectionKind::Line => self.operate_lines(operator, first, last, register),
            SelectionKind::Block => self.operate_block(operator, &selection, register),
        }
    }

    /// Block operators work on the inclusive column range of every line,
    /// clipped to each line's length; short lines are not padded.
    fn operate_block(
        &mut self,
        operator: Operator,
        selection: &Selection,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let entry = self.buffers.active();
        let Some(content) = entry.selection.materialize(&entry.buffer) else {
            return Ok(());
        };
        let spans = selection.spans(&entry.buffer);
        let top_left = Position::new(selection.line_range().0, selection.col_range().0);

        if operator == Operator::Yank {
            self.registers.record_yank(register, content)?;
            self.set_cursor_position(top_left);
            return Ok(());
        }
        self.registers.record_delete(register, content)?;
        self.begin_change();
        let buffer = &mut self.buffers.active_mut().buffer;
        for span in spans.iter().filter(|s| s.end_col > s.start_col) {
            buffer.delete(Range::new(
                Position::new(span.line, span.start_col),
                Position::new(span.line, span.end_col),
            ))?;
        }
        self.set_cursor_position(top_left);
        if operator == Operator::Change {
            self.start_insert();
        } else {
            self.commit_change();
        }
        Ok(())
    }

    // === Simple actions ===

    fn paste(
        &mut self,
        side: PasteSide,
        count: usize,
        register: Option<char>,
    ) -> Result<(), EditorError> {
        let content = self.registers.read(register.unwrap_or(UNNAMED))?;
        let count = count.max(1);
        self.begin_change();
        let cursor = self.cursor();
        let buffer = &mut self.buffers.active_mut().buffer;
        let line_len = buffer.line_len(cursor.line);

        let landing = match content.kind {
            RegisterKind::Char => {
                let col = match side {
                    PasteSide::After => (cursor.col + 1).min(line_len),
                    PasteSide::Before => cursor.col.min(line_len),
                };
                let at = Position::new(cursor.line, col);
                let end = buffer.insert(at, &content.text.repeat(count))?;
                if end.line == at.line {
                    Position::new(end.line, end.col.saturating_sub(1))
                } else {
                    at
                }
            }
            RegisterKind::Line => {
                let mut text = content.text.clone();
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                let text = text.repeat(count);
                let target = match side {
                    PasteSide::After => cursor.line + 1,
                    PasteSide::Before => cursor.line,
                };
                if target < buffer.line_count() {
                    buffer.insert(Position::new(target, 0), &text)?;
                } else {
                    // below the last line: lead with a break, drop the trailing one
                    let last = buffer.line_count() - 1;
                    let body = &text[..text.len() - 1];
                    let end = Position::new(last, buffer.line_len(last));
                    buffer.insert(end, &format!("\n{}", body))?;
                }
                motion::first_non_blank(buffer, target)
            }
            RegisterKind::Block => {
                let col = match side {
                    PasteSide::After if line_len > 0 => cursor.col + 1,
                    PasteSide::After => 0,
                    PasteSide::Before => cursor.col,
                };
                for (offset, piece) in content.pieces().iter().enumerate() {
                    let line = cursor.line + offset;
                    while line >= buffer.line_count() {
                        let end = buffer.end_position();
                        buffer.insert(end, "\n")?;
                    }
                    let len = buffer.line_len(line);
                    if len < col {
                        buffer.insert(Position::new(line, len), &" ".repeat(col - len))?;
                    }
                    buffer.insert(Position::new(line, col), &piece.repeat(count))?;
                }
                Position::new(cursor.line, col)
            }
        };
        self.set_cursor_position(landing);
        self.commit_change();
        Ok(())
    }

    /// `r{c}`: overwrite `count` graphemes; fails if the line is too short
    fn replace_chars(&mut self, ch: char, count: usize) -> Result<(), EditorError> {
        let cursor = self.cursor();
        let count = count.max(1);
        if cursor.col.saturating_add(count) > self.buffer().line_len(cursor.line) {
            return Err(EditorError::out_of_range("replace past end of line"));
        }
        self.begin_change();
        let buffer = &mut self.buffers.active_mut().buffer;
        let start = Position::new(cursor.line, cursor.col);
        buffer.delete(Range::new(start, Position::new(cursor.line, cursor.col + count)))?;
        buffer.insert(start, &ch.to_string().repeat(count))?;
        self.set_cursor_position(Position::new(cursor.line, cursor.col + count - 1));
        self.commit_change();
        Ok(())
    }

    /// `J`: join `count` lines (at least two), separating them with a space
    fn join_lines(&mut self, count: usize) -> Result<(), EditorError> {
        let line = self.cursor().line;
        if line + 1 >= self.buffer().line_count() {
            return Err(EditorError::out_of_range("no line to join"));
        }
        self.begin_change();
        let buffer = &mut self.buffers.active_mut().buffer;
        let mut join_col = 0;
        for _ in 0..count.saturating_sub(1).max(1) {
            if line + 1 >= buffer.line_count() {
                break;
            }
            let current = buffer.line(line).unwrap_or_default();
            let next = buffer.line_graphemes(line + 1);
            let leading = next
                .iter()
                .take_while(|g| motion::grapheme_kind(g) == WordKind::Whitespace)
                .count();
            let current_len = buffer.line_len(line);
            buffer.delete(Range::new(
                Position::new(line, current_len),
                Position::new(line + 1, leading),
            ))?;
            let rest = &next[leading..];
            let needs_space = !current.is_empty()
                && !current.ends_with(' ')
                && !rest.is_empty()
                && rest[0] != ")";
            if needs_space {
                buffer.insert(Position::new(line, current_len), " ")?;
            }
            join_col = current_len;
        }
        self.set_cursor_position(Position::new(line, join_col));
        self.commit_change();
        Ok(())
    }

    /// `~`: toggle case of `count` graphemes and step past them
    fn toggle_case(&mut self, count: usize) -> Result<(), EditorError> {
        let cursor = self.cursor();
        let graphemes = self.buffer().line_graphemes(cursor.line);
        if cursor.col >= graphemes.len() {
            return Ok(());
        }
        let end = cursor.col.saturating_add(count.max(1)).min(graphemes.len());
        let toggled: String = graphemes[cursor.col..end]
            .concat()
            .chars()
            .flat_map(|c| {
                if c.is_lowercase() {
                    c.to_uppercase().collect::<Vec<_>>()
                } else {
                    c.to_lowercase().collect::<Vec<_>>()
                }
            })
            .collect();
        self.begin_change();
        let buffer = &mut self.buffers.active_mut().buffer;
        let start = cursor.position();
        buffer.delete(Range::new(start, Position::new(cursor.line, end)))?;
        buffer.insert(start, &toggled)?;
        self.set_cursor_position(Position::new(cursor.line, end));
        self.commit_change();
        Ok(())
    }

    // === Insert mode ===

    fn enter_insert(&mut self, entry: InsertEntry) -> Result<(), EditorError> {
        self.begin_change();
        let cursor = self.cursor();
        let line = cursor.line;
        let buffer = &mut self.buffers.active_mut().buffer;
        let len = buffer.line_len(line);
        let target = match entry {
            InsertEntry::Before => cursor.position(),
            InsertEntry::After => Position::new(line, (cursor.col + 1).min(len)),
            InsertEntry::LineStart => motion::first_non_blank(buffer, line),
            InsertEntry::LineEnd => Position::new(line, len),
            InsertEntry::OpenBelow => {
                buffer.insert(Position::new(line, len), "\n")?;
                Position::new(line + 1, 0)
            }
            InsertEntry::OpenAbove => {
                buffer.insert(Position::new(line, 0), "\n")?;
                Position::new(line, 0)
            }
        };
        self.set_cursor_position(target);
        self.start_insert();
        Ok(())
    }

    fn start_insert(&mut self) {
        self.insert_session = Some(InsertSession::default());
    }

    /// Leave Insert mode: record the session as one undo step and step the
    /// cursor back onto the text.
    fn finish_insert(&mut self) {
        let Some(session) = self.insert_session.take() else {
            return;
        };
        if !session.typed.is_empty() {
            self.registers.store_inserted(session.typed);
        }
        let entry = self.buffers.active_mut();
        let col = entry.cursor.col.saturating_sub(1);
        entry.cursor.set_position(Position::new(entry.cursor.line, col));
        entry.cursor.clamp(&entry.buffer, false);
        entry.history.snapshot(&entry.buffer, entry.cursor);
    }

    fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.begin_change();
        let entry = self.buffers.active_mut();
        let end = entry.buffer.insert(entry.cursor.position(), text)?;
        entry.cursor.set_position(end);
        if let Some(session) = &mut self.insert_session {
            session.typed.push_str(text);
        }
        self.commit_change();
        Ok(())
    }

    /// Backspace: delete before the cursor, joining with the previous line
    /// at column 0
    fn backspace(&mut self) -> Result<(), EditorError> {
        let pos = self.cursor().position();
        let (range, landing) = if pos.col > 0 {
            let prev = Position::new(pos.line, pos.col - 1);
            (Range::new(prev, pos), prev)
        } else if pos.line > 0 {
            let prev_end = Position::new(pos.line - 1, self.buffer().line_len(pos.line - 1));
            (Range::new(prev_end, pos), prev_end)
        } else {
            return Ok(());
        };
        self.begin_change();
        self.buffers.active_mut().buffer.delete(range)?;
        self.set_cursor_position(landing);
        if let Some(session) = &mut self.insert_session {
            session.typed.pop();
        }
        self.commit_change();
        Ok(())
    }

    fn delete_forward(&mut self) -> Result<(), EditorError> {
        let pos = self.cursor().position();
        let buffer = self.buffer();
        let end = if pos.col < buffer.line_len(pos.line) {
            Position::new(pos.line, pos.col + 1)
        } else if pos.line + 1 < buffer.line_count() {
            Position::new(pos.line + 1, 0)
        } else {
            return Ok(());
        };
        self.begin_change();
        self.buffers.active_mut().buffer.delete(Range::new(pos, end))?;
        self.commit_change();
        Ok(())
    }

    // === Ex commands ===

    fn execute_ex(&mut self, command: ExCommand) -> Result<bool, EditorError> {
        match command {
            ExCommand::Nop => {}
            ExCommand::Write { path, force } => self.write_buffer(path, force)?,
            ExCommand::Quit { force } => return self.quit(force),
            ExCommand::WriteQuit => {
                self.write_buffer(None, true)?;
                return self.quit(false);
            }
            ExCommand::WriteIfModifiedQuit => {
                if self.buffer().is_dirty() {
                    self.write_buffer(None, false)?;
                }
                return self.quit(false);
            }
            ExCommand::Edit { path: Some(path), .. } => {
                self.open_file(path)?;
            }
            ExCommand::Edit { path: None, force } => self.reload(force)?,
            ExCommand::Buffer(id) => {
                self.buffers.switch_to(BufferId(id))?;
                self.on_buffer_switch();
            }
            ExCommand::BufferNext => {
                self.buffers.switch_next();
                self.on_buffer_switch();
            }
            ExCommand::BufferPrev => {
                self.buffers.switch_prev();
                self.on_buffer_switch();
            }
            ExCommand::BufferDelete { id, force } => {
                let id = id.map(BufferId).unwrap_or_else(|| self.buffers.active_id());
                let entry = self.buffers.get(id).ok_or(EditorError::UnknownBuffer(id))?;
                if entry.buffer.is_dirty() && !force {
                    return Err(EditorError::UnsavedChanges);
                }
                self.buffers.close(id)?;
                self.on_buffer_switch();
            }
            ExCommand::ListBuffers => {
                let listing: Vec<String> = self.buffers.list().iter().map(|s| s.to_string()).collect();
                self.info(listing.join("\n"));
            }
            ExCommand::GotoLine(line) => {
                let target = self.resolve_motion(Motion::GotoLine(line.max(1)), 1, false)?;
                self.buffers.active_mut().cursor = target;
            }
            ExCommand::NoHighlight => self.search.highlight = false,
            ExCommand::Substitute(mut sub) => {
                if sub.pattern.is_empty() {
                    sub.pattern = self
                        .search
                        .last_pattern
                        .clone()
                        .ok_or_else(|| EditorError::NoMatchFound("no previous pattern".to_string()))?;
                }
                let line = self.cursor().line;
                self.begin_change();
                let result = ex::apply_substitute(
                    &mut self.buffers.active_mut().buffer,
                    &sub,
                    line,
                    self.config.ignore_case,
                    self.matcher.as_ref(),
                )?;
                self.search.last_pattern = Some(sub.pattern.clone());
                self.registers.store_search(sub.pattern);
                self.commit_change();
                self.info(format!(
                    "{} substitution{} on {} line{}",
                    result.count,
                    if result.count == 1 { "" } else { "s" },
                    result.lines,
                    if result.lines == 1 { "" } else { "s" }
                ));
            }
        }
        Ok(false)
    }

    /// `:w [path]`. A clean buffer without an explicit path is not written.
    fn write_buffer(&mut self, path: Option<PathBuf>, force: bool) -> Result<(), EditorError> {
        let buffer = self.buffer();
        let explicit = path.is_some();
        let target = path
            .or_else(|| buffer.path().map(Path::to_path_buf))
            .ok_or(EditorError::NoFileName)?;
        if !explicit && !force && !buffer.is_dirty() {
            self.info("No changes to save");
            return Ok(());
        }
        let text = buffer.text_for_save();
        let lines = buffer.line_count();
        self.persistence
            .save(&target, &text)
            .map_err(|source| EditorError::Persistence {
                op: PersistOp::Save,
                path: target.clone(),
                source,
            })?;

        let entry = self.buffers.active_mut();
        if entry.buffer.path().is_none() {
            entry.buffer.set_path(target.clone());
        }
        if entry.buffer.path() == Some(target.as_path()) {
            entry.buffer.mark_clean();
            entry.history.mark_saved();
        }
        self.on_buffer_switch();
        self.info(format!("\"{}\" {}L written", target.display(), lines));
        Ok(())
    }

    fn quit(&mut self, force: bool) -> Result<bool, EditorError> {
        if !force && !self.buffers.dirty_ids().is_empty() {
            return Err(EditorError::UnsavedChanges);
        }
        Ok(true)
    }

    /// `:e` / `:e!`: reload the active buffer from its file
    fn reload(&mut self, force: bool) -> Result<(), EditorError> {
        let buffer = self.buffer();
        if buffer.is_dirty() && !force {
            return Err(EditorError::UnsavedChanges);
        }
        let path = buffer.path().ok_or(EditorError::NoFileName)?.to_path_buf();
        let text = self
            .persistence
            .load(&path)
            .map_err(|source| EditorError::Persistence {
                op: PersistOp::Load,
                path: path.clone(),
                source,
            })?;
        let undo_levels = self.config.undo_levels;
        let entry = self.buffers.active_mut();
        entry.buffer = Buffer::from_text(&text).with_path(path);
        entry.history = History::with_limit(&entry.buffer, entry.cursor, undo_levels);
        entry.selection.clear();
        entry.cursor.clamp(&entry.buffer, false);
        Ok(())
    }

    // === Helpers ===

    fn set_cursor_position(&mut self, pos: Position) {
        self.buffers.active_mut().cursor.set_position(pos);
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.status = Some(Status::Info(msg.into()));
    }

    fn on_buffer_switch(&mut self) {
        let name = self.buffer().path().map(|p| p.display().to_string());
        self.registers.set_file_name(name);
    }

    fn scroll_to_cursor(&mut self) {
        let cursor = self.cursor();
        self.viewport
            .scroll_to_cursor(cursor.line, cursor.col, self.config.scroll_off);
    }

    /// Bring mode, selection and cursor back in line after any command,
    /// including one that failed half way.
    fn after_command(&mut self) {
        let mode = self.parser.mode();
        if mode == Mode::Insert && self.insert_session.is_none() {
            // a command that was to enter Insert failed: cancel cleanly
            self.parser.reset();
        } else if mode != Mode::Insert && self.insert_session.is_some() {
            self.finish_insert();
        }

        let mode = self.parser.mode();
        let entry = self.buffers.active_mut();
        entry.cursor.clamp(&entry.buffer, mode == Mode::Insert);
        match mode {
            Mode::Visual(kind) => {
                if entry.selection.is_active() {
                    entry.selection.set_kind(kind);
                    entry.selection.extend(entry.cursor.position());
                } else {
                    entry.selection.start(kind, entry.cursor.position());
                }
            }
            _ => entry.selection.clear(),
        }
        self.scroll_to_cursor();
    }
}

/// Exclusive end for an inclusive target grapheme
fn inclusive_end(buffer: &Buffer, pos: Position) -> Position {
    Position::new(pos.line, (pos.col + 1).min(buffer.line_len(pos.line)))
}

/// Range removing lines `first..=last` together with one line break
fn whole_lines_range(buffer: &Buffer, first: usize, last: usize) -> Range {
    if last + 1 < buffer.line_count() {
        Range::new(Position::new(first, 0), Position::new(last + 1, 0))
    } else if first > 0 {
        Range::new(
            Position::new(first - 1, buffer.line_len(first - 1)),
            Position::new(last, buffer.line_len(last)),
        )
    } else {
        Range::new(Position::new(0, 0), Position::new(last, buffer.line_len(last)))
    }
}
