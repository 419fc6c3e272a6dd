//! Storage transition engine tests: retire, restore, rollback, and the
//! commit rule, against a real temporary filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use asset_vault::model;
use asset_vault::paths::{LibraryLayout, StorageLocation};
use asset_vault::storage::StorageEngine;
use asset_vault::store::{LocalFileStore, MemoryRecordStore, RecordStore, VersionPatch};
use asset_vault::types::{
    AssetType, AssetVersion, CycleType, FileRole, LifecycleError, LifecycleResult,
    LifecycleStatus, NoteCounts, NoteStatus, ReviewCycle, ReviewNote, ReviewState, UserRole,
};

// ==================== Helpers ====================

fn no_files() -> BTreeMap<FileRole, PathBuf> {
    BTreeMap::new()
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn point_payload(store: &mut MemoryRecordStore, uuid: Uuid, path: &Path) {
    let mut files = BTreeMap::new();
    files.insert(FileRole::Payload, path.to_path_buf());
    let patch = VersionPatch {
        files: Some(files),
        ..VersionPatch::default()
    };
    assert!(store.update_version(uuid, &patch));
}

/// Recursive (relative path -> contents) snapshot of a directory tree.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut tree = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
            tree.insert(rel, std::fs::read(entry.path()).unwrap());
        }
    }
    tree
}

/// A Crate asset with v001 in history and v002 in the library, both with
/// real payload files on disk.
fn setup_crate(
    root: &Path,
) -> (
    MemoryRecordStore,
    StorageEngine<LocalFileStore>,
    AssetVersion,
    AssetVersion,
) {
    let layout = LibraryLayout::new(root);
    let mut store = MemoryRecordStore::new();

    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    let v2 = model::create_version(&mut store, v1.version_group_id, no_files()).unwrap();

    let hist_file = layout
        .history_dir(AssetType::Mesh, "Crate", "Base", "v001")
        .join("Crate_v001.blend");
    let lib_file = layout
        .library_dir(AssetType::Mesh, "Crate", "Base")
        .join("Crate_v002.blend");
    write_file(&hist_file, "v001 payload");
    write_file(&lib_file, "v002 payload");
    point_payload(&mut store, v1.uuid, &hist_file);
    point_payload(&mut store, v2.uuid, &lib_file);

    let v1 = store.get_version(v1.uuid).unwrap();
    let v2 = store.get_version(v2.uuid).unwrap();
    let engine = StorageEngine::new(layout, LocalFileStore::new());
    (store, engine, v1, v2)
}

/// Record store wrapper whose `update_version` can be made to fail, for
/// exercising the rollback and partial-failure paths.
struct SabotagedStore {
    inner: MemoryRecordStore,
    /// `None` fails every update; otherwise only the listed rows fail.
    fail_uuids: Option<Vec<Uuid>>,
}

impl SabotagedStore {
    fn fail_all(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            fail_uuids: None,
        }
    }

    fn fail_only(inner: MemoryRecordStore, uuids: Vec<Uuid>) -> Self {
        Self {
            inner,
            fail_uuids: Some(uuids),
        }
    }
}

impl RecordStore for SabotagedStore {
    fn get_version(&self, uuid: Uuid) -> Option<AssetVersion> {
        self.inner.get_version(uuid)
    }
    fn get_versions_by_group(&self, version_group_id: Uuid) -> Vec<AssetVersion> {
        self.inner.get_versions_by_group(version_group_id)
    }
    fn get_variants(&self, asset_id: Uuid) -> Vec<AssetVersion> {
        self.inner.get_variants(asset_id)
    }
    fn all_versions(&self) -> Vec<AssetVersion> {
        self.inner.all_versions()
    }
    fn insert_version(&mut self, version: AssetVersion) -> LifecycleResult<()> {
        self.inner.insert_version(version)
    }
    fn update_version(&mut self, uuid: Uuid, patch: &VersionPatch) -> bool {
        match &self.fail_uuids {
            None => false,
            Some(uuids) if uuids.contains(&uuid) => false,
            _ => self.inner.update_version(uuid, patch),
        }
    }
    fn create_cycle(
        &mut self,
        asset_id: Uuid,
        cycle_type: CycleType,
        start_version: &str,
        submitted_by: &str,
    ) -> u64 {
        self.inner
            .create_cycle(asset_id, cycle_type, start_version, submitted_by)
    }
    fn get_open_cycle(&self, asset_id: Uuid) -> Option<ReviewCycle> {
        self.inner.get_open_cycle(asset_id)
    }
    fn get_cycle(&self, cycle_id: u64) -> Option<ReviewCycle> {
        self.inner.get_cycle(cycle_id)
    }
    fn set_cycle_state(&mut self, cycle_id: u64, state: ReviewState) -> bool {
        self.inner.set_cycle_state(cycle_id, state)
    }
    fn close_cycle(&mut self, cycle_id: u64, end_version: &str, finalized_by: &str) -> bool {
        self.inner.close_cycle(cycle_id, end_version, finalized_by)
    }
    fn link_version_to_cycle(&mut self, version_uuid: Uuid, cycle_id: u64) -> bool {
        self.inner.link_version_to_cycle(version_uuid, cycle_id)
    }
    fn cycle_for_version(&self, version_uuid: Uuid) -> Option<ReviewCycle> {
        self.inner.cycle_for_version(version_uuid)
    }
    fn add_note(
        &mut self,
        cycle_id: u64,
        version_uuid: Uuid,
        text: &str,
        author: &str,
        author_role: UserRole,
    ) -> u64 {
        self.inner
            .add_note(cycle_id, version_uuid, text, author, author_role)
    }
    fn get_note(&self, note_id: u64) -> Option<ReviewNote> {
        self.inner.get_note(note_id)
    }
    fn set_note_status(&mut self, note_id: u64, status: NoteStatus) -> bool {
        self.inner.set_note_status(note_id, status)
    }
    fn notes_for_cycle(&self, cycle_id: u64) -> Vec<ReviewNote> {
        self.inner.notes_for_cycle(cycle_id)
    }
    fn note_counts_for_cycle(&self, cycle_id: u64) -> NoteCounts {
        self.inner.note_counts_for_cycle(cycle_id)
    }
}

// ==================== Retire ====================

#[test]
fn test_retire_moves_variant_to_cold_storage() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, v1, v2) = setup_crate(tmp.path());
    let layout = engine.layout().clone();

    let report = engine.retire(&mut store, v2.uuid, "admin").unwrap();
    assert_eq!(report.updated, 2);
    assert_eq!(report.total, 2);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert!(report.message.contains("Retired 2 version(s)"));

    // Files landed in the retired tree: library collapses into current/,
    // history keeps its version-labeled folders
    let retired = layout.retired_dir(AssetType::Mesh, "Crate", "Base");
    assert!(retired.join("current").join("Crate_v002.blend").is_file());
    assert!(retired
        .join("history")
        .join("v001")
        .join("Crate_v001.blend")
        .is_file());

    // Emptied active folders are pruned
    assert!(!layout.library_dir(AssetType::Mesh, "Crate", "Base").exists());
    assert!(!layout
        .history_variant_dir(AssetType::Mesh, "Crate", "Base")
        .exists());

    // Rows are flagged and their pointers resolve inside the retired tree
    for uuid in [v1.uuid, v2.uuid] {
        let row = store.get_version(uuid).unwrap();
        assert!(row.is_retired);
        assert!(row.retired_date.is_some());
        assert_eq!(row.retired_by.as_deref(), Some("admin"));
        let payload = row.files.get(&FileRole::Payload).unwrap();
        assert!(payload.is_file(), "{} missing", payload.display());
        assert!(payload.starts_with(layout.location_root(StorageLocation::Retired)));
    }
}

#[test]
fn test_retire_twice_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());

    engine.retire(&mut store, v2.uuid, "admin").unwrap();
    let result = engine.retire(&mut store, v2.uuid, "admin");
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

#[test]
fn test_retire_overwrites_stale_destination() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());
    let layout = engine.layout().clone();

    // A stale copy from an earlier, restored retirement
    let stale = layout
        .retired_dir(AssetType::Mesh, "Crate", "Base")
        .join("current")
        .join("Crate_v002.blend");
    write_file(&stale, "stale");

    engine.retire(&mut store, v2.uuid, "admin").unwrap();
    assert_eq!(std::fs::read_to_string(&stale).unwrap(), "v002 payload");
}

#[test]
fn test_retire_preview_is_a_dry_run() {
    let tmp = TempDir::new().unwrap();
    let (store, engine, v1, v2) = setup_crate(tmp.path());
    let before = snapshot(tmp.path());

    let preview = engine.retire_preview(&store, v2.uuid).unwrap();
    assert_eq!(preview.name, "Crate");
    assert_eq!(preview.variant_name, "Base");
    assert!(preview.is_base);
    assert_eq!(preview.version_labels, vec!["v002", "v001"]);
    assert_eq!(preview.folder_moves.len(), 2);

    // Nothing moved, nothing flagged
    assert_eq!(snapshot(tmp.path()), before);
    assert!(!store.get_version(v1.uuid).unwrap().is_retired);
    assert!(!store.get_version(v2.uuid).unwrap().is_retired);
}

// ==================== No-cascade ====================

#[test]
fn test_retiring_base_never_cascades_to_variants() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());
    let layout = engine.layout().clone();

    let damaged =
        model::create_variant(&mut store, v2.uuid, "Damaged", None, no_files()).unwrap();
    let damaged_file = layout
        .library_dir(AssetType::Mesh, "Crate", "Damaged")
        .join("Crate_damaged.blend");
    write_file(&damaged_file, "damaged payload");
    point_payload(&mut store, damaged.uuid, &damaged_file);

    engine.retire(&mut store, v2.uuid, "admin").unwrap();

    // Sibling variant stays active, its files untouched
    let row = store.get_version(damaged.uuid).unwrap();
    assert!(!row.is_retired);
    assert!(row.retired_date.is_none());
    assert_eq!(
        std::fs::read_to_string(&damaged_file).unwrap(),
        "damaged payload"
    );
}

// ==================== Rollback ====================

#[test]
fn test_total_record_failure_rolls_back_every_move() {
    let tmp = TempDir::new().unwrap();
    let (store, engine, _, v2) = setup_crate(tmp.path());
    let before = snapshot(tmp.path());

    let mut sabotaged = SabotagedStore::fail_all(store);
    let result = engine.retire(&mut sabotaged, v2.uuid, "admin");
    match result {
        Err(LifecycleError::StorageConsistency { attempted, .. }) => {
            assert_eq!(attempted, 2);
        }
        other => panic!("Expected StorageConsistency, got {:?}", other.map(|r| r.message)),
    }

    // Filesystem is byte-identical to the pre-retire state
    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn test_partial_record_failure_commits_with_warnings() {
    let tmp = TempDir::new().unwrap();
    let (store, engine, v1, v2) = setup_crate(tmp.path());

    let mut sabotaged = SabotagedStore::fail_only(store, vec![v1.uuid]);
    let report = engine.retire(&mut sabotaged, v2.uuid, "admin").unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.total, 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("v001"));
    assert!(report.message.contains("warning"));

    // Forward progress committed: v002 is retired, v001 was left behind
    assert!(sabotaged.get_version(v2.uuid).unwrap().is_retired);
    assert!(!sabotaged.get_version(v1.uuid).unwrap().is_retired);
}

// ==================== Round trip ====================

#[test]
fn test_retire_restore_round_trip() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, v1, v2) = setup_crate(tmp.path());
    let layout = engine.layout().clone();

    // Content hashes of every pointer before the trip
    let mut before: BTreeMap<Uuid, Vec<u8>> = BTreeMap::new();
    for uuid in [v1.uuid, v2.uuid] {
        let row = store.get_version(uuid).unwrap();
        let payload = row.files.get(&FileRole::Payload).unwrap();
        before.insert(uuid, std::fs::read(payload).unwrap());
    }

    engine.retire(&mut store, v2.uuid, "admin").unwrap();
    let report = engine.restore(&mut store, v2.uuid, "admin").unwrap();
    assert_eq!(report.updated, 2);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    for uuid in [v1.uuid, v2.uuid] {
        let row = store.get_version(uuid).unwrap();
        assert!(!row.is_retired);
        assert!(row.retired_date.is_none());
        assert!(row.retired_by.is_none());

        // Pointers resolve to files whose content survived the trip
        let payload = row.files.get(&FileRole::Payload).unwrap();
        assert!(payload.is_file(), "{} missing", payload.display());
        assert_eq!(&std::fs::read(payload).unwrap(), before.get(&uuid).unwrap());
        assert!(!payload.starts_with(layout.location_root(StorageLocation::Retired)));
    }

    // Files are back in their canonical locations
    assert!(layout
        .history_dir(AssetType::Mesh, "Crate", "Base", "v001")
        .join("Crate_v001.blend")
        .is_file());
    assert!(layout
        .library_dir(AssetType::Mesh, "Crate", "Base")
        .join("Crate_v002.blend")
        .is_file());

    // The emptied retired tree is pruned away
    assert!(!layout
        .location_root(StorageLocation::Retired)
        .join("meshes")
        .exists());
}

#[test]
fn test_restore_requires_retired_state() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());

    let result = engine.restore(&mut store, v2.uuid, "admin");
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

// ==================== Legacy layout ====================

#[test]
fn test_legacy_family_folder_files_move_but_sibling_dirs_stay() {
    let tmp = TempDir::new().unwrap();
    let layout = LibraryLayout::new(tmp.path());
    let mut store = MemoryRecordStore::new();

    let base = model::register_family(&mut store, "Relic", AssetType::Mesh, no_files()).unwrap();
    let damaged = model::create_variant(&mut store, base.uuid, "Damaged", None, no_files()).unwrap();

    // Legacy convention: Base files sit directly in {type}/{name}
    let legacy_file = layout
        .legacy_library_dir(AssetType::Mesh, "Relic")
        .join("Relic.blend");
    write_file(&legacy_file, "legacy payload");
    point_payload(&mut store, base.uuid, &legacy_file);

    // The sibling variant's folder lives inside the same family folder
    let damaged_file = layout
        .library_dir(AssetType::Mesh, "Relic", "Damaged")
        .join("Relic_damaged.blend");
    write_file(&damaged_file, "damaged payload");
    point_payload(&mut store, damaged.uuid, &damaged_file);

    let engine = StorageEngine::new(layout.clone(), LocalFileStore::new());
    let report = engine.retire(&mut store, base.uuid, "admin").unwrap();
    assert_eq!(report.updated, 1);

    // The legacy file moved into the retired tree
    assert!(layout
        .retired_dir(AssetType::Mesh, "Relic", "Base")
        .join("current")
        .join("Relic.blend")
        .is_file());
    // The sibling variant's folder did not move
    assert!(damaged_file.is_file());
    assert!(!store.get_version(damaged.uuid).unwrap().is_retired);
}

// ==================== Status flags ====================

#[test]
fn test_is_retired_query() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());

    assert!(!engine.is_retired(&store, v2.uuid));
    engine.retire(&mut store, v2.uuid, "admin").unwrap();
    assert!(engine.is_retired(&store, v2.uuid));
    assert!(!engine.is_retired(&store, Uuid::new_v4()));
}

#[test]
fn test_retired_rows_keep_their_lifecycle_status() {
    let tmp = TempDir::new().unwrap();
    let (mut store, engine, _, v2) = setup_crate(tmp.path());

    store.update_version(
        v2.uuid,
        &VersionPatch {
            status: Some(LifecycleStatus::Approved),
            ..VersionPatch::default()
        },
    );
    engine.retire(&mut store, v2.uuid, "admin").unwrap();

    // Retirement changes storage state, not content maturity
    let row = store.get_version(v2.uuid).unwrap();
    assert!(row.is_retired);
    assert_eq!(row.status, LifecycleStatus::Approved);
}
