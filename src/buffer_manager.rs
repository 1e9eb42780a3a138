// src/buffer_manager.rs - Ordered set of open buffers with one active entry

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::error::EditorError;
use crate::history::{DEFAULT_UNDO_LEVELS, History};
use crate::selection::SelectionModel;
use log::debug;
use std::fmt;
use std::path::Path;

/// Stable buffer identifier; never reused after the buffer is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything that belongs to one open buffer
#[derive(Debug)]
pub struct BufferEntry {
    pub id: BufferId,
    pub buffer: Buffer,
    pub cursor: Cursor,
    pub selection: SelectionModel,
    pub history: History,
}

impl BufferEntry {
    fn new(id: BufferId, buffer: Buffer, undo_levels: usize) -> Self {
        let cursor = Cursor::new();
        let history = History::with_limit(&buffer, cursor, undo_levels);
        Self {
            id,
            buffer,
            cursor,
            selection: SelectionModel::new(),
            history,
        }
    }

    /// Unnamed, untouched and empty: safe to replace on open
    fn is_pristine(&self) -> bool {
        self.buffer.path().is_none()
            && !self.buffer.is_dirty()
            && !self.history.can_undo()
            && self.buffer.line_count() == 1
            && self.buffer.line_len(0) == 0
    }
}

/// One row of `:ls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSummary {
    pub id: BufferId,
    pub name: String,
    pub dirty: bool,
    pub line_count: usize,
    pub active: bool,
}

impl fmt::Display for BufferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {}{} \"{}\" {} lines",
            self.id,
            if self.active { '%' } else { ' ' },
            if self.dirty { '+' } else { ' ' },
            self.name,
            self.line_count
        )
    }
}

/// Owns every open buffer. There is always at least one, and exactly one is
/// active.
#[derive(Debug)]
pub struct BufferManager {
    entries: Vec<BufferEntry>,
    active: usize,
    next_id: u64,
    undo_levels: usize,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::with_undo_levels(DEFAULT_UNDO_LEVELS)
    }

    pub fn with_undo_levels(undo_levels: usize) -> Self {
        let mut manager = Self {
            entries: Vec::new(),
            active: 0,
            next_id: 1,
            undo_levels,
        };
        let id = manager.allocate_id();
        manager
            .entries
            .push(BufferEntry::new(id, Buffer::new(), undo_levels));
        manager
    }

    fn allocate_id(&mut self) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a buffer and make it active.
    ///
    /// A buffer whose path is already open activates the existing entry
    /// instead. When the only buffer is an untouched empty scratch buffer it
    /// is replaced.
    pub fn open(&mut self, buffer: Buffer) -> BufferId {
        if let Some(path) = buffer.path()
            && let Some(existing) = self.find_by_path(path)
        {
            debug!("buffer for {} already open as {}", path.display(), existing);
            self.activate(existing);
            return existing;
        }
        let id = self.allocate_id();
        let entry = BufferEntry::new(id, buffer, self.undo_levels);
        if self.entries.len() == 1 && self.entries[0].is_pristine() {
            self.entries[0] = entry;
            self.active = 0;
        } else {
            self.entries.push(entry);
            self.active = self.entries.len() - 1;
        }
        debug!("opened buffer {}", id);
        id
    }

    pub fn open_empty(&mut self) -> BufferId {
        self.open(Buffer::new())
    }

    /// Close a buffer. Closing the active one activates its successor,
    /// wrapping to the first entry.
    pub fn close(&mut self, id: BufferId) -> Result<(), EditorError> {
        let idx = self.index_of(id)?;
        if self.entries.len() == 1 {
            return Err(EditorError::CannotCloseLastBuffer);
        }
        self.entries.remove(idx);
        if idx < self.active {
            self.active -= 1;
        } else if idx == self.active {
            self.active = idx % self.entries.len();
        }
        debug!("closed buffer {}", id);
        Ok(())
    }

    pub fn switch_next(&mut self) -> BufferId {
        self.active = (self.active + 1) % self.entries.len();
        self.active_id()
    }

    pub fn switch_prev(&mut self) -> BufferId {
        self.active = (self.active + self.entries.len() - 1) % self.entries.len();
        self.active_id()
    }

    pub fn switch_to(&mut self, id: BufferId) -> Result<(), EditorError> {
        self.active = self.index_of(id)?;
        Ok(())
    }

    fn activate(&mut self, id: BufferId) {
        if let Ok(idx) = self.index_of(id) {
            self.active = idx;
        }
    }

    fn index_of(&self, id: BufferId) -> Result<usize, EditorError> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(EditorError::UnknownBuffer(id))
    }

    pub fn active(&self) -> &BufferEntry {
        &self.entries[self.active]
    }

    pub fn active_mut(&mut self) -> &mut BufferEntry {
        &mut self.entries[self.active]
    }

    pub fn active_id(&self) -> BufferId {
        self.entries[self.active].id
    }

    pub fn get(&self, id: BufferId) -> Option<&BufferEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut BufferEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<BufferId> {
        self.entries
            .iter()
            .find(|e| e.buffer.path() == Some(path))
            .map(|e| e.id)
    }

    pub fn list(&self) -> Vec<BufferSummary> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, e)| BufferSummary {
                id: e.id,
                name: e.buffer.display_name(),
                dirty: e.buffer.is_dirty(),
                line_count: e.buffer.line_count(),
                active: idx == self.active,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with unsaved changes
    pub fn dirty_ids(&self) -> Vec<BufferId> {
        self.entries
            .iter()
            .filter(|e| e.buffer.is_dirty())
            .map(|e| e.id)
            .collect()
    }
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Buffer {
        Buffer::from_text(name).with_path(name)
    }

    #[test]
    fn test_starts_with_one_buffer() {
        let manager = BufferManager::new();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active_id(), BufferId(1));
    }

    #[test]
    fn test_open_replaces_pristine_scratch() {
        let mut manager = BufferManager::new();
        let id = manager.open(named("a"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active_id(), id);
        assert_eq!(id, BufferId(2));
    }

    #[test]
    fn test_reopening_path_activates_existing() {
        let mut manager = BufferManager::new();
        let a = manager.open(named("a"));
        manager.open(named("b"));
        assert_eq!(manager.open(named("a")), a);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.active_id(), a);
    }

    #[test]
    fn test_switch_wraps() {
        let mut manager = BufferManager::new();
        let a = manager.open(named("a"));
        let b = manager.open(named("b"));
        let c = manager.open(named("c"));
        assert_eq!(manager.switch_next(), a);
        assert_eq!(manager.switch_prev(), c);
        assert_eq!(manager.switch_prev(), b);
        assert!(matches!(
            manager.switch_to(BufferId(99)),
            Err(EditorError::UnknownBuffer(BufferId(99)))
        ));
    }

    #[test]
    fn test_close_activates_next_and_never_reuses_ids() {
        let mut manager = BufferManager::new();
        let a = manager.open(named("a"));
        let b = manager.open(named("b"));
        let c = manager.open(named("c"));
        manager.switch_to(b).unwrap();
        manager.close(b).unwrap();
        assert_eq!(manager.active_id(), c);
        manager.close(c).unwrap();
        assert_eq!(manager.active_id(), a);
        assert!(matches!(manager.close(a), Err(EditorError::CannotCloseLastBuffer)));
        let d = manager.open_empty();
        assert!(d.0 > c.0);
    }

    #[test]
    fn test_list_marks_active_and_dirty() {
        let mut manager = BufferManager::new();
        manager.open(named("a"));
        manager.open(named("b"));
        manager.active_mut().buffer.insert(Default::default(), "x").unwrap();
        let list = manager.list();
        assert_eq!(list.len(), 2);
        assert!(list[1].active && list[1].dirty);
        assert!(!list[0].active && !list[0].dirty);
        assert_eq!(manager.dirty_ids(), vec![list[1].id]);
    }
}
