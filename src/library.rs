//! The library facade: one entry point for UI and automation callers.
//!
//! Owns the injected record and file stores plus both engines, and maps
//! every operation to an [`Outcome`] whose message is safe to show the
//! user verbatim. Callers needing typed results use the engines directly.
//!
//! The caller must serialize lifecycle operations per asset family; the
//! facade holds no locks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;

use crate::model;
use crate::paths::LibraryLayout;
use crate::review::ReviewEngine;
use crate::storage::{RetirePreview, StorageEngine};
use crate::store::{FileStore, RecordStore};
use crate::types::{
    AssetType, AssetVersion, CycleType, FileRole, LifecycleResult, Outcome, ReviewCycle,
    ReviewNote, ReviewState, UserRole,
};

pub struct Library<S: RecordStore, F: FileStore> {
    records: S,
    review: ReviewEngine,
    storage: StorageEngine<F>,
}

impl<S: RecordStore, F: FileStore> Library<S, F> {
    pub fn new(records: S, layout: LibraryLayout, files: F) -> Self {
        Self {
            records,
            review: ReviewEngine::new(),
            storage: StorageEngine::new(layout, files),
        }
    }

    pub fn records(&self) -> &S {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut S {
        &mut self.records
    }

    pub fn layout(&self) -> &LibraryLayout {
        self.storage.layout()
    }

    // ==================== Identity operations ====================

    /// Register a new asset family (Base variant, v001).
    pub fn create_family(
        &mut self,
        name: &str,
        asset_type: AssetType,
        files: BTreeMap<FileRole, PathBuf>,
    ) -> LifecycleResult<AssetVersion> {
        model::register_family(&mut self.records, name, asset_type, files)
    }

    /// Create the next version of a variant. The new version auto-joins
    /// the family's open review cycle, if one exists.
    pub fn create_version(
        &mut self,
        version_group_id: Uuid,
        files: BTreeMap<FileRole, PathBuf>,
    ) -> LifecycleResult<AssetVersion> {
        let version = model::create_version(&mut self.records, version_group_id, files)?;
        self.review
            .on_version_created(&mut self.records, version.uuid)?;
        Ok(version)
    }

    /// Branch a new variant from a Base version. The variant's first
    /// version auto-joins the family's open review cycle, if one exists.
    pub fn create_variant(
        &mut self,
        source_uuid: Uuid,
        variant_name: &str,
        variant_set: Option<&str>,
        files: BTreeMap<FileRole, PathBuf>,
    ) -> LifecycleResult<AssetVersion> {
        let version = model::create_variant(
            &mut self.records,
            source_uuid,
            variant_name,
            variant_set,
            files,
        )?;
        self.review
            .on_version_created(&mut self.records, version.uuid)?;
        Ok(version)
    }

    pub fn promote_to_latest(&mut self, uuid: Uuid) -> LifecycleResult<()> {
        model::promote_to_latest(&mut self.records, uuid)
    }

    // ==================== Review operations ====================

    pub fn submit_for_review(
        &mut self,
        version_uuid: Uuid,
        cycle_type: CycleType,
        submitted_by: &str,
    ) -> Outcome {
        match self
            .review
            .submit_for_review(&mut self.records, version_uuid, cycle_type, submitted_by)
        {
            Ok(t) => Outcome {
                success: t.changed,
                message: t.message,
            },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    /// Add a note; elevated authors may push the cycle into review.
    /// Returns the new note's id alongside the outcome.
    pub fn on_comment_added(
        &mut self,
        version_uuid: Uuid,
        text: &str,
        author: &str,
        author_role: UserRole,
    ) -> (Option<u64>, Outcome) {
        match self
            .review
            .add_note(&mut self.records, version_uuid, text, author, author_role)
        {
            Ok(added) => (
                Some(added.note_id),
                Outcome::success(added.transition.message),
            ),
            Err(e) => (None, Outcome::failure(e.to_string())),
        }
    }

    pub fn on_note_addressed(&mut self, note_id: u64) -> Outcome {
        match self.review.address_note(&mut self.records, note_id) {
            Ok(event) => Outcome {
                success: event.applied,
                message: event.transition.message,
            },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    pub fn on_note_approved(&mut self, note_id: u64) -> Outcome {
        match self.review.approve_note(&mut self.records, note_id) {
            Ok(event) => Outcome {
                success: event.applied,
                message: event.transition.message,
            },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    pub fn on_note_reopened(&mut self, note_id: u64, actor_role: UserRole) -> Outcome {
        match self
            .review
            .reopen_note(&mut self.records, note_id, actor_role)
        {
            Ok(event) => Outcome {
                success: event.applied,
                message: event.transition.message,
            },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    pub fn mark_as_final(
        &mut self,
        version_uuid: Uuid,
        actor: &str,
        actor_role: UserRole,
    ) -> Outcome {
        match self
            .review
            .mark_as_final(&mut self.records, version_uuid, actor, actor_role)
        {
            Ok(t) => Outcome {
                success: t.changed,
                message: t.message,
            },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    // ==================== Storage operations ====================

    pub fn retire(&mut self, uuid: Uuid, actor: &str) -> Outcome {
        match self.storage.retire(&mut self.records, uuid, actor) {
            Ok(report) => Outcome::success(report.message),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    pub fn restore(&mut self, uuid: Uuid, actor: &str) -> Outcome {
        match self.storage.restore(&mut self.records, uuid, actor) {
            Ok(report) => Outcome::success(report.message),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }

    // ==================== Queries ====================

    pub fn current_state(&self, version_uuid: Uuid) -> Option<ReviewState> {
        self.review.current_state(&self.records, version_uuid)
    }

    pub fn active_cycle(&self, asset_id: Uuid) -> Option<ReviewCycle> {
        self.review.active_cycle(&self.records, asset_id)
    }

    pub fn is_retired(&self, uuid: Uuid) -> bool {
        self.storage.is_retired(&self.records, uuid)
    }

    pub fn retire_preview(&self, uuid: Uuid) -> LifecycleResult<RetirePreview> {
        self.storage.retire_preview(&self.records, uuid)
    }

    pub fn version(&self, uuid: Uuid) -> Option<AssetVersion> {
        self.records.get_version(uuid)
    }

    pub fn versions_of_group(&self, version_group_id: Uuid) -> Vec<AssetVersion> {
        self.records.get_versions_by_group(version_group_id)
    }

    /// All rows of a family, every variant included.
    pub fn family(&self, asset_id: Uuid) -> Vec<AssetVersion> {
        self.records.get_variants(asset_id)
    }

    pub fn notes_for_cycle(&self, cycle_id: u64) -> Vec<ReviewNote> {
        self.records.notes_for_cycle(cycle_id)
    }
}
