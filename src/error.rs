// src/error.rs - Error taxonomy shared by every editing component

use crate::buffer_manager::BufferId;
use std::path::PathBuf;

/// Which persistence call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Load,
    Save,
}

impl std::fmt::Display for PersistOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistOp::Load => write!(f, "load"),
            PersistOp::Save => write!(f, "save"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    #[error("Position out of range: {0}")]
    OutOfRange(String),
    #[error("Already at oldest change")]
    NothingToUndo,
    #[error("Already at newest change")]
    NothingToRedo,
    #[error("Nothing in register {0}")]
    EmptyRegister(char),
    #[error("Register {0} is read-only")]
    ReadOnlyRegister(char),
    #[error("Cannot close last buffer")]
    CannotCloseLastBuffer,
    #[error("No buffer with id {0}")]
    UnknownBuffer(BufferId),
    #[error("Pattern not found: {0}")]
    NoMatchFound(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Not an editor command: {0}")]
    InvalidCommand(String),
    #[error("No write since last change (add ! to override)")]
    UnsavedChanges,
    #[error("No file name")]
    NoFileName,
    #[error("Failed to {op} {}: {source}", path.display())]
    Persistence {
        op: PersistOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Config(String),
}

impl EditorError {
    /// Only a failed explicit save is allowed to abort the caller; every
    /// other condition is reported and editing continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EditorError::Persistence {
                op: PersistOp::Save,
                ..
            }
        )
    }

    pub fn out_of_range(what: impl Into<String>) -> Self {
        EditorError::OutOfRange(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_save_failures_are_fatal() {
        let save = EditorError::Persistence {
            op: PersistOp::Save,
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::other("disk full"),
        };
        let load = EditorError::Persistence {
            op: PersistOp::Load,
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::other("denied"),
        };
        assert!(save.is_fatal());
        assert!(!load.is_fatal());
        assert!(!EditorError::NothingToUndo.is_fatal());
        assert!(!EditorError::CannotCloseLastBuffer.is_fatal());
    }

    #[test]
    fn test_messages() {
        assert_eq!(EditorError::EmptyRegister('a').to_string(), "Nothing in register a");
        let err = EditorError::Persistence {
            op: PersistOp::Save,
            path: PathBuf::from("notes.txt"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to save notes.txt: disk full");
    }
}
