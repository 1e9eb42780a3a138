// src/vim_parser.rs - Modal key parser turning key events into commands

use crate::command::{Command, InsertEntry, Operator, PasteSide};
use crate::mode::Mode;
use crate::motion::Motion;
use crate::search::SearchDirection;
use crate::selection::SelectionKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::trace;

/// Counts are capped so a long digit run cannot overflow or stall dispatch
pub const MAX_COUNT: usize = 99_999;

/// Result of parsing a key event
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// Complete command ready to execute
    Command(Command),
    /// More keys needed to complete the command
    Pending,
    /// Invalid key sequence; any pending prefix was dropped
    Invalid,
    /// Escape dropped a pending prefix (or there was nothing to drop)
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FindKind {
    Forward,
    Backward,
    TillForward,
    TillBackward,
}

impl FindKind {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'f' => Some(FindKind::Forward),
            'F' => Some(FindKind::Backward),
            't' => Some(FindKind::TillForward),
            'T' => Some(FindKind::TillBackward),
            _ => None,
        }
    }

    fn motion(self, target: char) -> Motion {
        match self {
            FindKind::Forward => Motion::FindForward(target),
            FindKind::Backward => Motion::FindBackward(target),
            FindKind::TillForward => Motion::TillForward(target),
            FindKind::TillBackward => Motion::TillBackward(target),
        }
    }
}

/// Parser state machine for Normal and Visual key sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    #[default]
    Idle,
    ReadingCount,
    ReadingRegister,
    ReadingOperator,
    ReadingOperatorCount,
    ReadingG,
    ReadingFindChar(FindKind),
    ReadingReplaceChar,
}

/// The mode machine: current mode plus any half-typed command.
///
/// [`VimParser::step`] is a pure transition `(state, key) -> (state, result)`;
/// [`VimParser::process_key`] applies it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VimParser {
    mode: Mode,
    state: ParserState,
    count: Option<usize>,
    register: Option<char>,
    operator: Option<Operator>,
    operator_count: Option<usize>,
    line: String,
}

impl VimParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Text typed so far on the command or search line, with its prompt
    pub fn pending_line(&self) -> Option<String> {
        match self.mode {
            Mode::Command => Some(format!(":{}", self.line)),
            Mode::Search(SearchDirection::Forward) => Some(format!("/{}", self.line)),
            Mode::Search(SearchDirection::Backward) => Some(format!("?{}", self.line)),
            _ => None,
        }
    }

    /// True while a count, register or operator waits for more keys
    pub fn is_pending(&self) -> bool {
        self.state != ParserState::Idle
            || self.count.is_some()
            || self.register.is_some()
            || self.operator.is_some()
    }

    /// Drop any pending prefix and return to Normal mode
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Process a key event and return the parse result
    pub fn process_key(&mut self, key: KeyEvent) -> ParseResult {
        let (next, result) = std::mem::take(self).step(&key);
        *self = next;
        result
    }

    /// Pure transition function of the mode machine.
    pub fn step(mut self, key: &KeyEvent) -> (Self, ParseResult) {
        let result = match self.mode {
            Mode::Normal | Mode::Visual(_) => self.step_normal(key),
            Mode::Insert => self.step_insert(key),
            Mode::Command | Mode::Search(_) => self.step_line(key),
        };
        trace!("key {:?} -> {:?} (mode {:?})", key.code, result, self.mode);
        (self, result)
    }

    // === Shared helpers ===

    fn clear_pending(&mut self) {
        self.state = ParserState::Idle;
        self.count = None;
        self.register = None;
        self.operator = None;
        self.operator_count = None;
    }

    fn finish(&mut self, cmd: Command) -> ParseResult {
        self.clear_pending();
        ParseResult::Command(cmd)
    }

    fn invalid(&mut self) -> ParseResult {
        self.clear_pending();
        ParseResult::Invalid
    }

    fn total_count(&self) -> usize {
        self.count
            .unwrap_or(1)
            .saturating_mul(self.operator_count.unwrap_or(1))
            .min(MAX_COUNT)
    }

    /// The composed count, only when the user typed one
    fn given_count(&self) -> Option<usize> {
        if self.count.is_some() || self.operator_count.is_some() {
            Some(self.total_count())
        } else {
            None
        }
    }

    fn push_digit(slot: &mut Option<usize>, ch: char) {
        let digit = ch.to_digit(10).unwrap_or(0) as usize;
        let current = slot.unwrap_or(0);
        *slot = Some(current.saturating_mul(10).saturating_add(digit).min(MAX_COUNT));
    }

    // === Normal / Visual ===

    fn step_normal(&mut self, key: &KeyEvent) -> ParseResult {
        if is_escape(key) {
            self.clear_pending();
            if self.mode.is_visual() {
                self.mode = Mode::Normal;
                return ParseResult::Command(Command::NormalMode);
            }
            return ParseResult::Cancelled;
        }

        match self.state {
            ParserState::ReadingRegister => return self.process_reading_register(key),
            ParserState::ReadingFindChar(kind) => {
                return match plain_char(key) {
                    Some(c) => self.complete_motion(kind.motion(c)),
                    None => self.invalid(),
                };
            }
            ParserState::ReadingReplaceChar => {
                return match plain_char(key) {
                    Some(c) => {
                        let count = self.total_count();
                        self.finish(Command::ReplaceChar { ch: c, count })
                    }
                    None => self.invalid(),
                };
            }
            _ => {}
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.process_ctrl_key(key.code);
        }

        let ch = match key.code {
            KeyCode::Char(c) => c,
            KeyCode::Left | KeyCode::Backspace => 'h',
            KeyCode::Right => 'l',
            KeyCode::Up => 'k',
            KeyCode::Down | KeyCode::Enter => 'j',
            _ => return self.invalid(),
        };

        match self.state {
            ParserState::Idle | ParserState::ReadingCount => self.process_idle(ch),
            ParserState::ReadingOperator | ParserState::ReadingOperatorCount => {
                self.process_reading_operator(ch)
            }
            ParserState::ReadingG => self.process_reading_g(ch),
            _ => self.invalid(),
        }
    }

    fn process_ctrl_key(&mut self, code: KeyCode) -> ParseResult {
        let idle = matches!(self.state, ParserState::Idle | ParserState::ReadingCount)
            && self.operator.is_none();
        match code {
            KeyCode::Char('r') if idle && self.mode == Mode::Normal => {
                let count = self.total_count();
                self.finish(Command::Redo(count))
            }
            KeyCode::Char('v') if idle => self.visual_key(SelectionKind::Block),
            _ => self.invalid(),
        }
    }

    fn process_idle(&mut self, ch: char) -> ParseResult {
        match ch {
            // Numbers start count parsing; a leading 0 is the line-start motion
            '1'..='9' => {
                Self::push_digit(&mut self.count, ch);
                self.state = ParserState::ReadingCount;
                ParseResult::Pending
            }
            '0' if self.count.is_some() => {
                Self::push_digit(&mut self.count, ch);
                ParseResult::Pending
            }
            '"' => {
                self.state = ParserState::ReadingRegister;
                ParseResult::Pending
            }
            'g' => {
                self.state = ParserState::ReadingG;
                ParseResult::Pending
            }
            'f' | 'F' | 't' | 'T' => {
                if let Some(kind) = FindKind::from_char(ch) {
                    self.state = ParserState::ReadingFindChar(kind);
                }
                ParseResult::Pending
            }
            _ => {
                if let Some(motion) = motion_from_char(ch, self.given_count()) {
                    return self.complete_motion(motion);
                }
                if self.mode.is_visual() {
                    self.process_visual_action(ch)
                } else {
                    self.process_normal_action(ch)
                }
            }
        }
    }

    fn process_normal_action(&mut self, ch: char) -> ParseResult {
        let count = self.total_count();
        let register = self.register;
        let cmd = match ch {
            'd' | 'y' | 'c' | '>' | '<' => {
                self.operator = Operator::from_char(ch);
                self.state = ParserState::ReadingOperator;
                return ParseResult::Pending;
            }
            'x' => Command::Operate {
                operator: Operator::Delete,
                motion: Motion::Right,
                count,
                register,
            },
            'X' => Command::Operate {
                operator: Operator::Delete,
                motion: Motion::Left,
                count,
                register,
            },
            'D' => Command::Operate {
                operator: Operator::Delete,
                motion: Motion::LineEnd,
                count,
                register,
            },
            'C' => {
                self.mode = Mode::Insert;
                Command::Operate {
                    operator: Operator::Change,
                    motion: Motion::LineEnd,
                    count,
                    register,
                }
            }
            's' => {
                self.mode = Mode::Insert;
                Command::Operate {
                    operator: Operator::Change,
                    motion: Motion::Right,
                    count,
                    register,
                }
            }
            'S' => {
                self.mode = Mode::Insert;
                Command::OperateLines {
                    operator: Operator::Change,
                    count,
                    register,
                }
            }
            'Y' => Command::OperateLines {
                operator: Operator::Yank,
                count,
                register,
            },
            'p' => Command::Paste {
                side: PasteSide::After,
                count,
                register,
            },
            'P' => Command::Paste {
                side: PasteSide::Before,
                count,
                register,
            },
            'r' => {
                self.state = ParserState::ReadingReplaceChar;
                return ParseResult::Pending;
            }
            'J' => Command::JoinLines(count),
            '~' => Command::ToggleCase(count),
            'u' => Command::Undo(count),
            'i' | 'a' | 'I' | 'A' | 'o' | 'O' => {
                let entry = match ch {
                    'i' => InsertEntry::Before,
                    'a' => InsertEntry::After,
                    'I' => InsertEntry::LineStart,
                    'A' => InsertEntry::LineEnd,
                    'o' => InsertEntry::OpenBelow,
                    _ => InsertEntry::OpenAbove,
                };
                self.mode = Mode::Insert;
                Command::EnterInsert(entry)
            }
            'v' => return self.visual_key(SelectionKind::Char),
            'V' => return self.visual_key(SelectionKind::Line),
            ':' => {
                self.mode = Mode::Command;
                self.line.clear();
                Command::EnterCommandMode
            }
            '/' | '?' => {
                let direction = if ch == '/' {
                    SearchDirection::Forward
                } else {
                    SearchDirection::Backward
                };
                self.mode = Mode::Search(direction);
                self.line.clear();
                Command::EnterSearch(direction)
            }
            _ => return self.invalid(),
        };
        self.finish(cmd)
    }

    fn process_visual_action(&mut self, ch: char) -> ParseResult {
        let register = self.register;
        let operator = match ch {
            'd' | 'x' => Operator::Delete,
            'y' => Operator::Yank,
            'c' | 's' => Operator::Change,
            '>' => Operator::Indent,
            '<' => Operator::Unindent,
            'o' => return self.finish(Command::SwapSelectionEnds),
            'v' => return self.visual_key(SelectionKind::Char),
            'V' => return self.visual_key(SelectionKind::Line),
            _ => return self.invalid(),
        };
        self.mode = if operator == Operator::Change {
            Mode::Insert
        } else {
            Mode::Normal
        };
        self.finish(Command::OperateSelection { operator, register })
    }

    /// `v`, `V` and `Ctrl-V`: enter Visual, switch kind, or leave when the
    /// kind is already active.
    fn visual_key(&mut self, kind: SelectionKind) -> ParseResult {
        if self.mode == Mode::Visual(kind) {
            self.mode = Mode::Normal;
            return self.finish(Command::NormalMode);
        }
        self.mode = Mode::Visual(kind);
        self.finish(Command::EnterVisual(kind))
    }

    fn process_reading_register(&mut self, key: &KeyEvent) -> ParseResult {
        let Some(ch) = plain_char(key) else {
            return self.invalid();
        };
        // Valid register names: ", a-z, A-Z, 0-9, -, *, +, and read-only . % : /
        if ch.is_ascii_alphanumeric() || matches!(ch, '"' | '-' | '*' | '+' | '.' | '%' | ':' | '/') {
            self.register = Some(ch);
            self.state = if self.count.is_some() {
                ParserState::ReadingCount
            } else {
                ParserState::Idle
            };
            ParseResult::Pending
        } else {
            self.invalid()
        }
    }

    fn process_reading_operator(&mut self, ch: char) -> ParseResult {
        let Some(operator) = self.operator else {
            return self.invalid();
        };
        match ch {
            '1'..='9' => {
                Self::push_digit(&mut self.operator_count, ch);
                self.state = ParserState::ReadingOperatorCount;
                ParseResult::Pending
            }
            '0' if self.operator_count.is_some() => {
                Self::push_digit(&mut self.operator_count, ch);
                ParseResult::Pending
            }
            'g' => {
                self.state = ParserState::ReadingG;
                ParseResult::Pending
            }
            'f' | 'F' | 't' | 'T' => {
                if let Some(kind) = FindKind::from_char(ch) {
                    self.state = ParserState::ReadingFindChar(kind);
                }
                ParseResult::Pending
            }
            // Double operators as linewise operations
            c if c == operator.as_char() => {
                let count = self.total_count();
                let register = self.register;
                if operator == Operator::Change {
                    self.mode = Mode::Insert;
                }
                self.finish(Command::OperateLines {
                    operator,
                    count,
                    register,
                })
            }
            _ => match motion_from_char(ch, self.given_count()) {
                Some(motion) => self.complete_motion(motion),
                None => self.invalid(),
            },
        }
    }

    fn process_reading_g(&mut self, ch: char) -> ParseResult {
        match ch {
            'g' => {
                let motion = match self.given_count() {
                    Some(line) => Motion::GotoLine(line),
                    None => Motion::FileStart,
                };
                self.complete_motion(motion)
            }
            _ => self.invalid(),
        }
    }

    /// A motion finished: either move, or feed it to the pending operator.
    fn complete_motion(&mut self, motion: Motion) -> ParseResult {
        let count = self.total_count();
        let cmd = match self.operator {
            Some(operator) => {
                if operator == Operator::Change {
                    self.mode = Mode::Insert;
                }
                Command::Operate {
                    operator,
                    motion,
                    count,
                    register: self.register,
                }
            }
            None => Command::Move { motion, count },
        };
        self.finish(cmd)
    }

    // === Insert ===

    fn step_insert(&mut self, key: &KeyEvent) -> ParseResult {
        if is_escape(key) {
            self.mode = Mode::Normal;
            return ParseResult::Command(Command::NormalMode);
        }
        let cmd = match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Command::InsertText(c.to_string())
            }
            KeyCode::Enter => Command::InsertNewline,
            KeyCode::Tab => Command::InsertTab,
            KeyCode::Backspace => Command::DeleteChar,
            KeyCode::Delete => Command::DeleteCharForward,
            KeyCode::Left => Command::Move { motion: Motion::Left, count: 1 },
            KeyCode::Right => Command::Move { motion: Motion::Right, count: 1 },
            KeyCode::Up => Command::Move { motion: Motion::Up, count: 1 },
            KeyCode::Down => Command::Move { motion: Motion::Down, count: 1 },
            _ => return ParseResult::Invalid,
        };
        ParseResult::Command(cmd)
    }

    // === Command line / search line ===

    fn step_line(&mut self, key: &KeyEvent) -> ParseResult {
        if is_escape(key) {
            self.mode = Mode::Normal;
            self.line.clear();
            return ParseResult::Command(Command::NormalMode);
        }
        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.line);
                let cmd = match self.mode {
                    Mode::Search(direction) => Command::Search {
                        direction,
                        pattern: line,
                    },
                    _ => Command::ExecuteCommandLine(line),
                };
                self.mode = Mode::Normal;
                ParseResult::Command(cmd)
            }
            KeyCode::Backspace => {
                // Backspace on an empty line leaves the mode
                if self.line.pop().is_none() {
                    self.mode = Mode::Normal;
                    return ParseResult::Command(Command::NormalMode);
                }
                ParseResult::Pending
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.line.push(c);
                ParseResult::Pending
            }
            KeyCode::Tab => {
                self.line.push('\t');
                ParseResult::Pending
            }
            _ => ParseResult::Invalid,
        }
    }
}

fn is_escape(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('[') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn plain_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(c),
        KeyCode::Tab => Some('\t'),
        _ => None,
    }
}

/// Single-key motions. `G` becomes a line jump when a count was typed.
fn motion_from_char(ch: char, count: Option<usize>) -> Option<Motion> {
    let motion = match ch {
        'h' => Motion::Left,
        'l' | ' ' => Motion::Right,
        'j' => Motion::Down,
        'k' => Motion::Up,
        'w' => Motion::WordForward,
        'b' => Motion::WordBackward,
        'e' => Motion::WordEnd,
        '0' => Motion::LineStart,
        '^' => Motion::FirstNonBlank,
        '$' => Motion::LineEnd,
        'G' => match count {
            Some(line) => Motion::GotoLine(line),
            None => Motion::FileEnd,
        },
        '%' => Motion::MatchPair,
        ';' => Motion::RepeatFind,
        ',' => Motion::RepeatFindReverse,
        'n' => Motion::SearchNext,
        'N' => Motion::SearchPrev,
        _ => return None,
    };
    Some(motion)
}
