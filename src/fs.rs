//! File-system access used by the taglib resolver.
//!
//! Included files are read and stat'ed through [`FileSystem`] so the
//! include crawler can be exercised against an in-memory tree.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

/// The two operations the resolver needs: read a UTF-8 file, and ask for
/// its modification time.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified: SystemTime,
}

/// An in-memory file tree with explicit modification times.
///
/// Every read is counted per path so callers can assert how often the
/// resolver actually went to "disk".  Cloning shares the tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MemoryFile>>>,
    reads: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>, modified: SystemTime) {
        self.files.lock().insert(
            path.into(),
            MemoryFile {
                content: content.into(),
                modified,
            },
        );
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    /// How many times `path` has been read.
    pub fn read_count(&self, path: &Path) -> usize {
        self.reads.lock().get(path).copied().unwrap_or(0)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        *self.reads.lock().entry(path.to_path_buf()).or_insert(0) += 1;
        self.files
            .lock()
            .get(path)
            .map(|file| file.content.clone())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .lock()
            .get(path)
            .map(|file| file.modified)
            .ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}
