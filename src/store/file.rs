//! File store abstraction and the local-disk implementation.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

/// Abstract filesystem surface the storage engine moves files through.
///
/// Only the handful of operations retirement needs: existence checks,
/// immediate-children listing, overwriting moves, recursive filename
/// search, and empty-folder removal.
pub trait FileStore {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate children of a directory. Empty when the path is missing
    /// or not a directory.
    fn list_dir(&self, dir: &Path) -> Vec<PathBuf>;

    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Move one entry (file or directory), replacing any stale destination.
    fn move_entry(&self, source: &Path, dest: &Path) -> io::Result<()>;

    /// Find a file by exact name anywhere under `root`, depth-first.
    fn find_by_name(&self, root: &Path, file_name: &str) -> Option<PathBuf>;

    /// Remove `dir` if empty; `Ok(true)` when it was removed.
    fn remove_dir_if_empty(&self, dir: &Path) -> io::Result<bool>;

    /// Remove `dir` and its parents while they are empty, stopping at
    /// (and never removing) `stop`.
    fn remove_empty_upward(&self, dir: &Path, stop: &Path) {
        let mut current = dir.to_path_buf();
        while current != stop && self.exists(&current) {
            match self.remove_dir_if_empty(&current) {
                Ok(true) => {
                    debug!("removed empty folder {}", current.display());
                    match current.parent() {
                        Some(parent) => current = parent.to_path_buf(),
                        None => break,
                    }
                }
                Ok(false) => break,
                Err(e) => {
                    warn!("could not prune {}: {}", current.display(), e);
                    break;
                }
            }
        }
    }
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        children.sort();
        children
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }

    fn move_entry(&self, source: &Path, dest: &Path) -> io::Result<()> {
        if dest.exists() {
            if dest.is_dir() {
                std::fs::remove_dir_all(dest)?;
            } else {
                std::fs::remove_file(dest)?;
            }
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Rename is atomic on the same filesystem; fall back to
        // copy+remove across mount points.
        match std::fs::rename(source, dest) {
            Ok(()) => Ok(()),
            Err(_) if source.is_file() => {
                std::fs::copy(source, dest)?;
                std::fs::remove_file(source)
            }
            Err(e) => Err(e),
        }
    }

    fn find_by_name(&self, root: &Path, file_name: &str) -> Option<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
            .map(|entry| entry.into_path())
    }

    fn remove_dir_if_empty(&self, dir: &Path) -> io::Result<bool> {
        if !dir.is_dir() {
            return Ok(false);
        }
        if std::fs::read_dir(dir)?.next().is_some() {
            return Ok(false);
        }
        std::fs::remove_dir(dir)?;
        Ok(true)
    }
}
