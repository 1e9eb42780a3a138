use crate::search::SearchDirection;
use crate::selection::SelectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Command,
    Visual(SelectionKind),
    Search(SearchDirection),
}

impl Mode {
    /// Returns the display name for the status line
    pub fn display(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Command => "COMMAND",
            Mode::Visual(SelectionKind::Char) => "VISUAL",
            Mode::Visual(SelectionKind::Line) => "VISUAL LINE",
            Mode::Visual(SelectionKind::Block) => "VISUAL BLOCK",
            Mode::Search(_) => "SEARCH",
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, Mode::Visual(_))
    }

    /// Modes that accumulate a line of text before executing it
    pub fn is_line_input(&self) -> bool {
        matches!(self, Mode::Command | Mode::Search(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_variants() {
        assert_eq!(Mode::default(), Mode::Normal);
        assert_ne!(Mode::Normal, Mode::Insert);
        assert_ne!(
            Mode::Visual(SelectionKind::Char),
            Mode::Visual(SelectionKind::Block)
        );
        assert!(Mode::Search(SearchDirection::Backward).is_line_input());
        assert!(!Mode::Insert.is_line_input());
    }

    #[test]
    fn test_display() {
        assert_eq!(Mode::Visual(SelectionKind::Line).display(), "VISUAL LINE");
        assert_eq!(Mode::Search(SearchDirection::Forward).display(), "SEARCH");
    }
}
