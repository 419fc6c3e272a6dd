//! The storage transition engine: retire and restore.
//!
//! Retiring moves a whole variant's file tree into retired storage while
//! keeping every version row and its lineage references intact; restoring
//! is the inverse. Folder discovery starts from the rows' actual storage
//! pointers (legacy naming conventions may differ from the canonical
//! layout) plus the canonical library and history folders.
//!
//! Commit rule: if *zero* rows could be updated the journal replays every
//! move backwards and the operation fails; if at least one row updated the
//! operation commits and the remaining failures surface as warnings. A
//! half-updated variant is the one unsafe state to leave behind.

pub mod journal;

pub use journal::{MoveJournal, PlannedMove};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::paths::{LibraryLayout, StorageLocation, RETIRED_CURRENT_DIR, RETIRED_HISTORY_DIR};
use crate::store::{FileStore, RecordStore, VersionPatch};
use crate::types::{
    AssetType, AssetVersion, FileRole, LifecycleError, LifecycleResult,
};

/// Outcome of a committed retire/restore.
#[derive(Debug, Clone, Serialize)]
pub struct StorageReport {
    /// Rows successfully updated.
    pub updated: usize,
    /// Rows the operation covered.
    pub total: usize,
    /// Per-file and per-row failures that did not abort the operation.
    pub warnings: Vec<String>,
    pub message: String,
}

/// Dry-run summary of what a retire would touch.
#[derive(Debug, Clone, Serialize)]
pub struct RetirePreview {
    pub name: String,
    pub variant_name: String,
    pub asset_type: AssetType,
    pub is_base: bool,
    pub version_labels: Vec<String>,
    /// Folder-level moves the operation would perform.
    pub folder_moves: Vec<PlannedMove>,
}

/// A discovered source folder and where its contents go.
#[derive(Debug, Clone)]
struct SourceFolder {
    dest: PathBuf,
    /// Only move immediate file children. Set for the legacy
    /// `{type}/{name}` library folder, whose subdirectories belong to
    /// sibling variants.
    files_only: bool,
}

/// Moves variant file trees between active and retired storage, keeping
/// per-version path metadata synchronized with disk.
pub struct StorageEngine<F: FileStore> {
    layout: LibraryLayout,
    files: F,
}

impl<F: FileStore> StorageEngine<F> {
    pub fn new(layout: LibraryLayout, files: F) -> Self {
        Self { layout, files }
    }

    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    /// Retire a variant: move all of its files into retired storage and
    /// flag every version row. Retiring Base never cascades to sibling
    /// variants; they keep referencing the retired Base by identifier.
    pub fn retire(
        &self,
        records: &mut dyn RecordStore,
        uuid: Uuid,
        actor: &str,
    ) -> LifecycleResult<StorageReport> {
        let version = records
            .get_version(uuid)
            .ok_or(LifecycleError::NotFound(uuid))?;
        if version.is_retired {
            return Err(LifecycleError::InvalidOperation(format!(
                "{} {} is already retired",
                version.name, version.variant_name
            )));
        }

        let family = self.variant_family(records, &version);
        let retired_base =
            self.layout
                .retired_dir(version.asset_type, &version.name, &version.variant_name);

        let sources = self.discover_retire_sources(&version, &family, &retired_base);
        let mut journal = MoveJournal::new();
        for (folder, source) in &sources {
            for item in self.files.list_dir(folder) {
                if source.files_only && self.files.is_dir(&item) {
                    continue;
                }
                if let Some(name) = item.file_name() {
                    journal.record(item.clone(), source.dest.join(name));
                }
            }
        }

        debug!(
            "retiring {}/{}: {} move(s) across {} folder(s)",
            version.name,
            version.variant_name,
            journal.len(),
            sources.len()
        );
        let mut warnings = journal.execute(&self.files);
        for folder in sources.keys() {
            self.prune_active_source(folder);
        }

        // Flag every row, re-pointing its files at the retired tree. The
        // row's own labeled history folder wins over the rest of the tree
        // so same-named files across versions resolve to the right copy.
        let now = Utc::now();
        let mut updated = 0;
        for row in &family {
            let labeled = retired_base
                .join(RETIRED_HISTORY_DIR)
                .join(&row.version_label);
            let files =
                self.relocate_pointers(&row.files, &[labeled.as_path(), retired_base.as_path()]);
            let patch = VersionPatch::retire(files, now, actor);
            if records.update_version(row.uuid, &patch) {
                updated += 1;
            } else {
                warnings.push(format!("{}: record update failed", row.version_label));
            }
        }

        self.commit(
            journal,
            updated,
            family.len(),
            warnings,
            format!(
                "Retired {} version(s) of {}/{}",
                updated, version.name, version.variant_name
            ),
        )
    }

    /// Restore a retired variant back into active storage: the collapsed
    /// `current` folder returns to the library, version-labeled history
    /// folders return to active history, and the retired tree is pruned.
    pub fn restore(
        &self,
        records: &mut dyn RecordStore,
        uuid: Uuid,
        _actor: &str,
    ) -> LifecycleResult<StorageReport> {
        let version = records
            .get_version(uuid)
            .ok_or(LifecycleError::NotFound(uuid))?;
        if !version.is_retired {
            return Err(LifecycleError::InvalidOperation(format!(
                "{} {} is not retired",
                version.name, version.variant_name
            )));
        }

        let family: Vec<AssetVersion> = self
            .variant_family(records, &version)
            .into_iter()
            .filter(|v| v.is_retired)
            .collect();

        let retired_base =
            self.layout
                .retired_dir(version.asset_type, &version.name, &version.variant_name);
        if !self.files.exists(&retired_base) {
            return Err(LifecycleError::InvalidOperation(format!(
                "retired folder not found: {}",
                retired_base.display()
            )));
        }

        let dst_library =
            self.layout
                .library_dir(version.asset_type, &version.name, &version.variant_name);
        let dst_history = self.layout.history_variant_dir(
            version.asset_type,
            &version.name,
            &version.variant_name,
        );

        let mut sources: BTreeMap<PathBuf, SourceFolder> = BTreeMap::new();
        let current = retired_base.join(RETIRED_CURRENT_DIR);
        if self.files.is_dir(&current) {
            sources.insert(
                current,
                SourceFolder {
                    dest: dst_library.clone(),
                    files_only: false,
                },
            );
        }
        let history = retired_base.join(RETIRED_HISTORY_DIR);
        for child in self.files.list_dir(&history) {
            if !self.files.is_dir(&child) {
                continue;
            }
            if let Some(label) = child.file_name() {
                let dest = dst_history.join(label);
                sources.insert(
                    child,
                    SourceFolder {
                        dest,
                        files_only: false,
                    },
                );
            }
        }

        let mut journal = MoveJournal::new();
        for (folder, source) in &sources {
            for item in self.files.list_dir(folder) {
                if let Some(name) = item.file_name() {
                    journal.record(item.clone(), source.dest.join(name));
                }
            }
        }

        debug!(
            "restoring {}/{}: {} move(s)",
            version.name,
            version.variant_name,
            journal.len()
        );
        let mut warnings = journal.execute(&self.files);

        // Re-point rows at the active tree; the row's own labeled history
        // folder wins, then history at large, then the library.
        let mut updated = 0;
        for row in &family {
            let labeled = dst_history.join(&row.version_label);
            let files = self.relocate_pointers(
                &row.files,
                &[
                    labeled.as_path(),
                    dst_history.as_path(),
                    dst_library.as_path(),
                ],
            );
            let patch = VersionPatch::restore(files);
            if records.update_version(row.uuid, &patch) {
                updated += 1;
            } else {
                warnings.push(format!("{}: record update failed", row.version_label));
            }
        }

        if updated > 0 {
            self.prune_retired_tree(&sources, &retired_base);
        }

        self.commit(
            journal,
            updated,
            family.len(),
            warnings,
            format!(
                "Restored {} version(s) of {}/{}",
                updated, version.name, version.variant_name
            ),
        )
    }

    /// Dry-run summary of a retire: affected versions and the folder
    /// moves that would be performed. Touches nothing.
    pub fn retire_preview(
        &self,
        records: &dyn RecordStore,
        uuid: Uuid,
    ) -> LifecycleResult<RetirePreview> {
        let version = records
            .get_version(uuid)
            .ok_or(LifecycleError::NotFound(uuid))?;
        let family = self.variant_family(records, &version);
        let retired_base =
            self.layout
                .retired_dir(version.asset_type, &version.name, &version.variant_name);
        let sources = self.discover_retire_sources(&version, &family, &retired_base);

        Ok(RetirePreview {
            name: version.name.clone(),
            variant_name: version.variant_name.clone(),
            asset_type: version.asset_type,
            is_base: version.is_base(),
            version_labels: family.iter().map(|v| v.version_label.clone()).collect(),
            folder_moves: sources
                .into_iter()
                .map(|(source, info)| PlannedMove {
                    source,
                    dest: info.dest,
                })
                .collect(),
        })
    }

    /// Whether a version row is flagged retired.
    pub fn is_retired(&self, records: &dyn RecordStore, uuid: Uuid) -> bool {
        records
            .get_version(uuid)
            .map(|v| v.is_retired)
            .unwrap_or(false)
    }

    /// All rows of the target's variant within its version group.
    fn variant_family(
        &self,
        records: &dyn RecordStore,
        version: &AssetVersion,
    ) -> Vec<AssetVersion> {
        let mut family: Vec<AssetVersion> = records
            .get_versions_by_group(version.version_group_id)
            .into_iter()
            .filter(|v| v.variant_name == version.variant_name)
            .collect();
        if family.is_empty() {
            family.push(version.clone());
        }
        family
    }

    /// Every folder that owns files for this variant, with its retired
    /// destination. Canonical folders first, then parents of whatever the
    /// rows actually point at (legacy layouts).
    fn discover_retire_sources(
        &self,
        version: &AssetVersion,
        family: &[AssetVersion],
        retired_base: &Path,
    ) -> BTreeMap<PathBuf, SourceFolder> {
        let mut sources: BTreeMap<PathBuf, SourceFolder> = BTreeMap::new();

        let library_dir =
            self.layout
                .library_dir(version.asset_type, &version.name, &version.variant_name);
        if self.files.is_dir(&library_dir) && !self.files.list_dir(&library_dir).is_empty() {
            sources.insert(
                library_dir.clone(),
                SourceFolder {
                    dest: retired_base.join(RETIRED_CURRENT_DIR),
                    files_only: false,
                },
            );
        }

        // Legacy layout: files directly under {type}/{name}. Subfolders in
        // there belong to other variants and stay put.
        let legacy_dir = self
            .layout
            .legacy_library_dir(version.asset_type, &version.name);
        if self
            .files
            .list_dir(&legacy_dir)
            .iter()
            .any(|item| !self.files.is_dir(item))
        {
            sources.entry(legacy_dir).or_insert(SourceFolder {
                dest: retired_base.join(RETIRED_CURRENT_DIR),
                files_only: true,
            });
        }

        // History stores all versions; rows may only point at the library
        // copy of the latest, so walk the version folders directly.
        let history_variant = self.layout.history_variant_dir(
            version.asset_type,
            &version.name,
            &version.variant_name,
        );
        for child in self.files.list_dir(&history_variant) {
            if !self.files.is_dir(&child) {
                continue;
            }
            if let Some(label) = child.file_name() {
                let dest = retired_base.join(RETIRED_HISTORY_DIR).join(label);
                sources.insert(
                    child,
                    SourceFolder {
                        dest,
                        files_only: false,
                    },
                );
            }
        }

        // Whatever the rows actually point at, canonical or not.
        for row in family {
            for path in row.files.values() {
                if !self.files.exists(path) {
                    continue;
                }
                if let Some(parent) = path.parent() {
                    let dest = self.classify_retire_dest(parent, retired_base);
                    sources.entry(parent.to_path_buf()).or_insert(SourceFolder {
                        dest,
                        files_only: false,
                    });
                }
            }
        }

        sources
    }

    /// Destination under the retired root for a discovered source folder:
    /// library-side folders collapse into `current`, history-side (and
    /// unrecognized) folders keep a labeled subfolder under `history`.
    fn classify_retire_dest(&self, folder: &Path, retired_base: &Path) -> PathBuf {
        let library_root = self.layout.location_root(StorageLocation::Library);
        if folder.starts_with(&library_root) {
            return retired_base.join(RETIRED_CURRENT_DIR);
        }
        let leaf = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| RETIRED_HISTORY_DIR.to_string());
        retired_base.join(RETIRED_HISTORY_DIR).join(leaf)
    }

    /// Re-point a version's storage pointers by searching the given roots
    /// for files of the same name. Pointers whose file cannot be found are
    /// left untouched.
    fn relocate_pointers(
        &self,
        files: &BTreeMap<FileRole, PathBuf>,
        search_roots: &[&Path],
    ) -> BTreeMap<FileRole, PathBuf> {
        let mut relocated = files.clone();
        for (role, path) in files {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            for root in search_roots {
                if let Some(found) = self.files.find_by_name(root, &name) {
                    relocated.insert(*role, found);
                    break;
                }
            }
        }
        relocated
    }

    /// Remove a now-empty source folder and its empty parents, up to (but
    /// never including) its storage-location root.
    fn prune_active_source(&self, folder: &Path) {
        for location in [StorageLocation::Library, StorageLocation::History] {
            let root = self.layout.location_root(location);
            if folder.starts_with(&root) {
                self.files.remove_empty_upward(folder, &root);
                return;
            }
        }
    }

    /// Prune the emptied retired tree bottom-up: version folders, then
    /// `history`/`current`, then variant, name, and type folders.
    fn prune_retired_tree(&self, sources: &BTreeMap<PathBuf, SourceFolder>, retired_base: &Path) {
        for folder in sources.keys() {
            if let Err(e) = self.files.remove_dir_if_empty(folder) {
                warn!("could not prune {}: {}", folder.display(), e);
            }
        }
        let _ = self
            .files
            .remove_dir_if_empty(&retired_base.join(RETIRED_HISTORY_DIR));
        let retired_root = self.layout.location_root(StorageLocation::Retired);
        self.files.remove_empty_upward(retired_base, &retired_root);
    }

    /// Apply the zero-success rule: roll back and fail when nothing
    /// committed, otherwise report success with any warnings attached.
    fn commit(
        &self,
        journal: MoveJournal,
        updated: usize,
        total: usize,
        warnings: Vec<String>,
        message: String,
    ) -> LifecycleResult<StorageReport> {
        if updated == 0 && total > 0 {
            warn!("no records updated; rolling back {} move(s)", journal.len());
            journal.rollback(&self.files);
            return Err(LifecycleError::StorageConsistency {
                attempted: total,
                details: if warnings.is_empty() {
                    "no records could be updated".to_string()
                } else {
                    warnings.join("; ")
                },
            });
        }

        let message = if warnings.is_empty() {
            message
        } else {
            format!("{} with {} warning(s)", message, warnings.len())
        };
        Ok(StorageReport {
            updated,
            total,
            warnings,
            message,
        })
    }
}
