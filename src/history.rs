// src/history.rs - Linear undo/redo history of buffer snapshots
//
// Every atomic mutating command pushes one snapshot. Rope clones share their
// tree nodes, so a snapshot costs about the size of the edited chunks.
//
//   states:  [s0] [s1] [s2] [s3]
//                       ^ current
//   undo -> restore s1, redo -> restore s3, new edit -> drop s3, push s3'

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::error::EditorError;
use log::trace;
use ropey::Rope;
use std::time::Instant;

/// Maximum number of undo states to keep unless configured otherwise
pub const DEFAULT_UNDO_LEVELS: usize = 1000;

/// A snapshot of the buffer state
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub text: Rope,
    pub cursor: Cursor,
    pub dirty: bool,
    pub timestamp: Instant,
}

impl Snapshot {
    pub fn capture(buffer: &Buffer, cursor: Cursor) -> Self {
        Self {
            text: buffer.rope().clone(),
            cursor,
            dirty: buffer.is_dirty(),
            timestamp: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    states: Vec<Snapshot>,
    current: usize,
    limit: usize,
}

impl History {
    /// Start a history whose bottom state is the buffer as it is now.
    pub fn new(buffer: &Buffer, cursor: Cursor) -> Self {
        Self::with_limit(buffer, cursor, DEFAULT_UNDO_LEVELS)
    }

    pub fn with_limit(buffer: &Buffer, cursor: Cursor, limit: usize) -> Self {
        Self {
            states: vec![Snapshot::capture(buffer, cursor)],
            current: 0,
            limit: limit.max(1),
        }
    }

    /// Remember where the cursor is before a mutation, so undoing that
    /// mutation puts the cursor back here.
    pub fn note_cursor(&mut self, cursor: Cursor) {
        self.states[self.current].cursor = cursor;
    }

    /// Record the buffer after a mutating command. Anything past the current
    /// pointer is discarded. Returns `false` when the content did not change.
    pub fn snapshot(&mut self, buffer: &Buffer, cursor: Cursor) -> bool {
        if self.states[self.current].text == *buffer.rope() {
            trace!("history: unchanged content, snapshot skipped");
            return false;
        }
        self.states.truncate(self.current + 1);
        self.states.push(Snapshot::capture(buffer, cursor));
        if self.states.len() > self.limit + 1 {
            let excess = self.states.len() - (self.limit + 1);
            self.states.drain(..excess);
        }
        self.current = self.states.len() - 1;
        trace!("history: snapshot {} of {}", self.current, self.states.len());
        true
    }

    /// Step back one state and return it for restoring.
    pub fn undo(&mut self) -> Result<&Snapshot, EditorError> {
        if self.current == 0 {
            return Err(EditorError::NothingToUndo);
        }
        self.current -= 1;
        Ok(&self.states[self.current])
    }

    /// Step forward one state and return it for restoring.
    pub fn redo(&mut self) -> Result<&Snapshot, EditorError> {
        if self.current + 1 >= self.states.len() {
            return Err(EditorError::NothingToRedo);
        }
        self.current += 1;
        Ok(&self.states[self.current])
    }

    /// The buffer was written: only the current state matches the file.
    pub fn mark_saved(&mut self) {
        let current = self.current;
        for (idx, state) in self.states.iter_mut().enumerate() {
            state.dirty = idx != current;
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.states.len()
    }

    pub fn undo_count(&self) -> usize {
        self.current
    }

    pub fn redo_count(&self) -> usize {
        self.states.len() - self.current - 1
    }

    pub fn current(&self) -> &Snapshot {
        &self.states[self.current]
    }

    /// Forget everything but the current state.
    pub fn clear(&mut self) {
        let keep = self.states.swap_remove(self.current);
        self.states = vec![keep];
        self.current = 0;
    }
}
