//! Record store abstraction and the in-memory reference implementation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    AssetVersion, CycleType, FileRole, LifecycleError, LifecycleResult, LifecycleStatus,
    NoteCounts, NoteStatus, ReviewCycle, ReviewNote, ReviewState, UserRole,
};

/// A typed partial update for an [`AssetVersion`] row.
///
/// `None` means "leave the field alone". Clearable fields are doubly
/// optional: `Some(None)` clears them.
#[derive(Debug, Clone, Default)]
pub struct VersionPatch {
    pub is_latest: Option<bool>,
    pub is_cold: Option<bool>,
    pub is_locked: Option<bool>,
    pub status: Option<LifecycleStatus>,
    pub is_retired: Option<bool>,
    pub retired_date: Option<Option<DateTime<Utc>>>,
    pub retired_by: Option<Option<String>>,
    pub files: Option<BTreeMap<FileRole, PathBuf>>,
}

impl VersionPatch {
    /// Patch that marks a row retired, stamping date and actor.
    pub fn retire(
        files: BTreeMap<FileRole, PathBuf>,
        date: DateTime<Utc>,
        by: impl Into<String>,
    ) -> Self {
        Self {
            is_retired: Some(true),
            retired_date: Some(Some(date)),
            retired_by: Some(Some(by.into())),
            files: Some(files),
            ..Self::default()
        }
    }

    /// Patch that clears the retired flags.
    pub fn restore(files: BTreeMap<FileRole, PathBuf>) -> Self {
        Self {
            is_retired: Some(false),
            retired_date: Some(None),
            retired_by: Some(None),
            files: Some(files),
            ..Self::default()
        }
    }

    /// Apply this patch to a version row.
    pub fn apply(&self, version: &mut AssetVersion) {
        if let Some(v) = self.is_latest {
            version.is_latest = v;
        }
        if let Some(v) = self.is_cold {
            version.is_cold = v;
        }
        if let Some(v) = self.is_locked {
            version.is_locked = v;
        }
        if let Some(v) = self.status {
            version.status = v;
        }
        if let Some(v) = self.is_retired {
            version.is_retired = v;
        }
        if let Some(ref v) = self.retired_date {
            version.retired_date = *v;
        }
        if let Some(ref v) = self.retired_by {
            version.retired_by = v.clone();
        }
        if let Some(ref v) = self.files {
            version.files = v.clone();
        }
    }
}

/// Abstract persistence for version, cycle, and note records.
///
/// The engines own all state *computation*; implementations only hold rows.
/// Update methods return `false` on a missing row instead of erroring so
/// the storage engine can count per-row successes (its commit rule depends
/// on the count, not on any single row).
pub trait RecordStore {
    fn get_version(&self, uuid: Uuid) -> Option<AssetVersion>;

    /// All rows sharing a `version_group_id`, ordered by version descending.
    fn get_versions_by_group(&self, version_group_id: Uuid) -> Vec<AssetVersion>;

    /// All rows of a family (every variant, every version).
    fn get_variants(&self, asset_id: Uuid) -> Vec<AssetVersion>;

    /// All version rows in the store.
    fn all_versions(&self) -> Vec<AssetVersion>;

    fn insert_version(&mut self, version: AssetVersion) -> LifecycleResult<()>;

    /// Apply a patch; `false` if the row does not exist or the write failed.
    fn update_version(&mut self, uuid: Uuid, patch: &VersionPatch) -> bool;

    fn create_cycle(
        &mut self,
        asset_id: Uuid,
        cycle_type: CycleType,
        start_version: &str,
        submitted_by: &str,
    ) -> u64;

    /// The open (non-final) cycle for a family, if any.
    fn get_open_cycle(&self, asset_id: Uuid) -> Option<ReviewCycle>;

    fn get_cycle(&self, cycle_id: u64) -> Option<ReviewCycle>;

    fn set_cycle_state(&mut self, cycle_id: u64, state: ReviewState) -> bool;

    fn close_cycle(&mut self, cycle_id: u64, end_version: &str, finalized_by: &str) -> bool;

    fn link_version_to_cycle(&mut self, version_uuid: Uuid, cycle_id: u64) -> bool;

    /// The cycle a version is linked to, if any.
    fn cycle_for_version(&self, version_uuid: Uuid) -> Option<ReviewCycle>;

    fn add_note(
        &mut self,
        cycle_id: u64,
        version_uuid: Uuid,
        text: &str,
        author: &str,
        author_role: UserRole,
    ) -> u64;

    fn get_note(&self, note_id: u64) -> Option<ReviewNote>;

    fn set_note_status(&mut self, note_id: u64, status: NoteStatus) -> bool;

    fn notes_for_cycle(&self, cycle_id: u64) -> Vec<ReviewNote>;

    /// Note tallies across the *entire* cycle, not one version.
    fn note_counts_for_cycle(&self, cycle_id: u64) -> NoteCounts;
}

/// In-memory record store, serializable as the catalog sidecar.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryRecordStore {
    versions: Vec<AssetVersion>,
    cycles: Vec<ReviewCycle>,
    notes: Vec<ReviewNote>,
    /// version uuid -> cycle id
    cycle_links: BTreeMap<Uuid, u64>,
    next_cycle_id: u64,
    next_note_id: u64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog sidecar, or start empty when none exists yet.
    pub fn load(path: &Path) -> LifecycleResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| LifecycleError::CorruptCatalog(e.to_string()))
    }

    /// Write the catalog sidecar, creating parent folders as needed.
    pub fn save(&self, path: &Path) -> LifecycleResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| LifecycleError::Store(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// All cycles (open and closed) for a family, newest first.
    pub fn cycles_for_asset(&self, asset_id: Uuid) -> Vec<ReviewCycle> {
        let mut cycles: Vec<ReviewCycle> = self
            .cycles
            .iter()
            .filter(|c| c.asset_id == asset_id)
            .cloned()
            .collect();
        cycles.sort_by(|a, b| b.id.cmp(&a.id));
        cycles
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_version(&self, uuid: Uuid) -> Option<AssetVersion> {
        self.versions.iter().find(|v| v.uuid == uuid).cloned()
    }

    fn get_versions_by_group(&self, version_group_id: Uuid) -> Vec<AssetVersion> {
        let mut versions: Vec<AssetVersion> = self
            .versions
            .iter()
            .filter(|v| v.version_group_id == version_group_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        versions
    }

    fn get_variants(&self, asset_id: Uuid) -> Vec<AssetVersion> {
        self.versions
            .iter()
            .filter(|v| v.asset_id == asset_id)
            .cloned()
            .collect()
    }

    fn all_versions(&self) -> Vec<AssetVersion> {
        self.versions.clone()
    }

    fn insert_version(&mut self, version: AssetVersion) -> LifecycleResult<()> {
        if self.versions.iter().any(|v| v.uuid == version.uuid) {
            return Err(LifecycleError::Store(format!(
                "version {} already exists",
                version.uuid
            )));
        }
        self.versions.push(version);
        Ok(())
    }

    fn update_version(&mut self, uuid: Uuid, patch: &VersionPatch) -> bool {
        match self.versions.iter_mut().find(|v| v.uuid == uuid) {
            Some(version) => {
                patch.apply(version);
                true
            }
            None => false,
        }
    }

    fn create_cycle(
        &mut self,
        asset_id: Uuid,
        cycle_type: CycleType,
        start_version: &str,
        submitted_by: &str,
    ) -> u64 {
        self.next_cycle_id += 1;
        let id = self.next_cycle_id;
        self.cycles.push(ReviewCycle {
            id,
            asset_id,
            cycle_type,
            start_version: start_version.to_string(),
            end_version: None,
            review_state: ReviewState::NeedsReview,
            submitted_by: submitted_by.to_string(),
            finalized_by: None,
            created_at: Utc::now(),
            closed_at: None,
        });
        id
    }

    fn get_open_cycle(&self, asset_id: Uuid) -> Option<ReviewCycle> {
        self.cycles
            .iter()
            .find(|c| c.asset_id == asset_id && c.is_open())
            .cloned()
    }

    fn get_cycle(&self, cycle_id: u64) -> Option<ReviewCycle> {
        self.cycles.iter().find(|c| c.id == cycle_id).cloned()
    }

    fn set_cycle_state(&mut self, cycle_id: u64, state: ReviewState) -> bool {
        match self.cycles.iter_mut().find(|c| c.id == cycle_id) {
            Some(cycle) => {
                cycle.review_state = state;
                true
            }
            None => false,
        }
    }

    fn close_cycle(&mut self, cycle_id: u64, end_version: &str, finalized_by: &str) -> bool {
        match self.cycles.iter_mut().find(|c| c.id == cycle_id) {
            Some(cycle) => {
                cycle.review_state = ReviewState::Final;
                cycle.end_version = Some(end_version.to_string());
                cycle.finalized_by = Some(finalized_by.to_string());
                cycle.closed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    fn link_version_to_cycle(&mut self, version_uuid: Uuid, cycle_id: u64) -> bool {
        if !self.cycles.iter().any(|c| c.id == cycle_id) {
            return false;
        }
        self.cycle_links.insert(version_uuid, cycle_id);
        true
    }

    fn cycle_for_version(&self, version_uuid: Uuid) -> Option<ReviewCycle> {
        let cycle_id = self.cycle_links.get(&version_uuid)?;
        self.get_cycle(*cycle_id)
    }

    fn add_note(
        &mut self,
        cycle_id: u64,
        version_uuid: Uuid,
        text: &str,
        author: &str,
        author_role: UserRole,
    ) -> u64 {
        self.next_note_id += 1;
        let id = self.next_note_id;
        self.notes.push(ReviewNote {
            id,
            cycle_id,
            version_uuid,
            text: text.to_string(),
            author: author.to_string(),
            author_role,
            status: NoteStatus::Open,
            created_at: Utc::now(),
        });
        id
    }

    fn get_note(&self, note_id: u64) -> Option<ReviewNote> {
        self.notes.iter().find(|n| n.id == note_id).cloned()
    }

    fn set_note_status(&mut self, note_id: u64, status: NoteStatus) -> bool {
        match self.notes.iter_mut().find(|n| n.id == note_id) {
            Some(note) => {
                note.status = status;
                true
            }
            None => false,
        }
    }

    fn notes_for_cycle(&self, cycle_id: u64) -> Vec<ReviewNote> {
        self.notes
            .iter()
            .filter(|n| n.cycle_id == cycle_id)
            .cloned()
            .collect()
    }

    fn note_counts_for_cycle(&self, cycle_id: u64) -> NoteCounts {
        let mut counts = NoteCounts::default();
        for note in self.notes.iter().filter(|n| n.cycle_id == cycle_id) {
            match note.status {
                NoteStatus::Open => counts.open += 1,
                NoteStatus::Addressed => counts.addressed += 1,
                NoteStatus::Approved => counts.approved += 1,
            }
        }
        counts
    }
}
