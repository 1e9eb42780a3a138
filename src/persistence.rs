// src/persistence.rs - Load/save collaborator used by buffer commands

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Where buffer text comes from and goes to. The editor never touches the
/// filesystem directly; it only sees the text or the failure.
pub trait Persistence {
    fn load(&self, path: &Path) -> io::Result<String>;
    fn save(&self, path: &Path, text: &str) -> io::Result<()>;
}

/// Plain filesystem persistence
#[derive(Debug, Default, Clone, Copy)]
pub struct FsPersistence;

impl Persistence for FsPersistence {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn save(&self, path: &Path, text: &str) -> io::Result<()> {
        std::fs::write(path, text)
    }
}

/// In-memory file store, handy for headless sessions and tests.
/// Paths listed in `read_only` fail to save.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    files: RefCell<HashMap<PathBuf, String>>,
    read_only: RefCell<Vec<PathBuf>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), text.into());
        self
    }

    pub fn set_read_only(&self, path: impl Into<PathBuf>) {
        self.read_only.borrow_mut().push(path.into());
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn save(&self, path: &Path, text: &str) -> io::Result<()> {
        if self.read_only.borrow().iter().any(|p| p == path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only file"));
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), text.to_string());
        Ok(())
    }
}

impl<P: Persistence + ?Sized> Persistence for std::rc::Rc<P> {
    fn load(&self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }

    fn save(&self, path: &Path, text: &str) -> io::Result<()> {
        (**self).save(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryPersistence::new().with_file("a.txt", "hello");
        assert_eq!(store.load(Path::new("a.txt")).unwrap(), "hello");
        store.save(Path::new("b.txt"), "world").unwrap();
        assert_eq!(store.contents(Path::new("b.txt")).unwrap(), "world");
        assert_eq!(
            store.load(Path::new("missing")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_read_only_save_fails() {
        let store = MemoryPersistence::new();
        store.set_read_only("locked.txt");
        assert!(store.save(Path::new("locked.txt"), "x").is_err());
    }

    #[test]
    fn test_fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        FsPersistence.save(&path, "line\n").unwrap();
        assert_eq!(FsPersistence.load(&path).unwrap(), "line\n");
    }
}
