use crate::motion::Motion;
use crate::search::SearchDirection;
use crate::selection::SelectionKind;

/// Operators that combine with a motion, a line count or a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Yank,
    Change,
    Indent,
    Unindent,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(Operator::Delete),
            'y' => Some(Operator::Yank),
            'c' => Some(Operator::Change),
            '>' => Some(Operator::Indent),
            '<' => Some(Operator::Unindent),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Operator::Delete => 'd',
            Operator::Yank => 'y',
            Operator::Change => 'c',
            Operator::Indent => '>',
            Operator::Unindent => '<',
        }
    }

    pub fn modifies_buffer(&self) -> bool {
        !matches!(self, Operator::Yank)
    }
}

/// Where the cursor goes before Insert mode starts (`i a I A o O`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertEntry {
    Before,
    After,
    LineStart,
    LineEnd,
    OpenBelow,
    OpenAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteSide {
    After,
    Before,
}

/// A fully resolved command produced by the key parser
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move {
        motion: Motion,
        count: usize,
    },
    /// Operator applied to the span between cursor and motion target
    Operate {
        operator: Operator,
        motion: Motion,
        count: usize,
        register: Option<char>,
    },
    /// Doubled operator (`dd`, `yy`, `cc`, `>>`, `<<`) over `count` lines
    OperateLines {
        operator: Operator,
        count: usize,
        register: Option<char>,
    },
    /// Operator consuming the active Visual selection
    OperateSelection {
        operator: Operator,
        register: Option<char>,
    },
    Paste {
        side: PasteSide,
        count: usize,
        register: Option<char>,
    },
    ReplaceChar {
        ch: char,
        count: usize,
    },
    JoinLines(usize),
    ToggleCase(usize),
    Undo(usize),
    Redo(usize),
    EnterInsert(InsertEntry),
    EnterVisual(SelectionKind),
    SwapSelectionEnds,
    EnterCommandMode,
    EnterSearch(SearchDirection),
    ExecuteCommandLine(String),
    Search {
        direction: SearchDirection,
        pattern: String,
    },
    InsertText(String),
    InsertNewline,
    InsertTab,
    DeleteChar,
    DeleteCharForward,
    /// Escape: leave the current mode
    NormalMode,
}

impl Command {
    /// Commands that may change buffer content
    pub fn is_mutating(&self) -> bool {
        match self {
            Command::Operate { operator, .. }
            | Command::OperateLines { operator, .. }
            | Command::OperateSelection { operator, .. } => operator.modifies_buffer(),
            Command::Paste { .. }
            | Command::ReplaceChar { .. }
            | Command::JoinLines(_)
            | Command::ToggleCase(_)
            | Command::EnterInsert(_)
            | Command::ExecuteCommandLine(_)
            | Command::InsertText(_)
            | Command::InsertNewline
            | Command::InsertTab
            | Command::DeleteChar
            | Command::DeleteCharForward => true,
            _ => false,
        }
    }
}
