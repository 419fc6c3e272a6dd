//! Intent journal for file moves, with reverse replay on rollback.

use std::path::PathBuf;

use log::{info, warn};
use serde::Serialize;

use crate::store::FileStore;

/// One intended move of a single filesystem entry.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug)]
struct JournalEntry {
    source: PathBuf,
    dest: PathBuf,
    performed: bool,
}

/// Records every intended move before it happens, executes them one by
/// one, and can replay the performed ones in reverse.
///
/// Individual move failures are collected as warnings rather than aborting
/// the batch; the caller decides whether the overall operation commits.
#[derive(Debug, Default)]
pub struct MoveJournal {
    entries: Vec<JournalEntry>,
}

impl MoveJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log an intended move. Nothing touches disk until [`execute`].
    ///
    /// [`execute`]: MoveJournal::execute
    pub fn record(&mut self, source: PathBuf, dest: PathBuf) {
        self.entries.push(JournalEntry {
            source,
            dest,
            performed: false,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Perform every recorded move, overwriting stale destinations.
    /// Returns per-entry failure messages.
    pub fn execute(&mut self, files: &dyn FileStore) -> Vec<String> {
        let mut warnings = Vec::new();
        for entry in &mut self.entries {
            if !files.exists(&entry.source) {
                continue;
            }
            match files.move_entry(&entry.source, &entry.dest) {
                Ok(()) => {
                    info!(
                        "moved {} -> {}",
                        entry.source.display(),
                        entry.dest.display()
                    );
                    entry.performed = true;
                }
                Err(e) => {
                    warn!("failed to move {}: {}", entry.source.display(), e);
                    warnings.push(format!(
                        "Failed to move {}: {}",
                        entry
                            .source
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| entry.source.display().to_string()),
                        e
                    ));
                }
            }
        }
        warnings
    }

    /// Undo the performed moves in reverse order. Failures are logged and
    /// skipped; rollback is best effort by nature.
    pub fn rollback(&self, files: &dyn FileStore) {
        for entry in self.entries.iter().rev() {
            if !entry.performed {
                continue;
            }
            if let Err(e) = files.move_entry(&entry.dest, &entry.source) {
                warn!(
                    "rollback failed for {}: {}",
                    entry.dest.display(),
                    e
                );
            } else {
                info!(
                    "rolled back {} -> {}",
                    entry.dest.display(),
                    entry.source.display()
                );
            }
        }
    }
}
