// lib.rs - Library root for the kestrel editing engine

pub mod buffer;
pub mod buffer_manager;
pub mod cli;
pub mod clipboard;
pub mod command;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod ex;
pub mod history;
pub mod keys;
pub mod mode;
pub mod motion;
pub mod persistence;
pub mod registers;
pub mod search;
pub mod selection;
pub mod viewport;
pub mod vim_parser;

pub use buffer::Buffer;
pub use editor::{Editor, Status};
pub use error::EditorError;
pub use motion::{Position, Range};

pub type Result<T> = std::result::Result<T, EditorError>;
