//! Identity and versioning model tests: single-latest invariant, variant
//! partition, creation rules, and path resolution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use asset_vault::model;
use asset_vault::paths::{sanitize_name, LibraryLayout, StorageLocation};
use asset_vault::store::{MemoryRecordStore, RecordStore, VersionPatch};
use asset_vault::types::{AssetType, FileRole, LifecycleError};

// ==================== Helpers ====================

fn no_files() -> BTreeMap<FileRole, PathBuf> {
    BTreeMap::new()
}

// ==================== Family registration ====================

#[test]
fn test_register_family_creates_base_v001() {
    let mut store = MemoryRecordStore::new();
    let version = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();

    assert_eq!(version.variant_name, "Base");
    assert_eq!(version.version, 1);
    assert_eq!(version.version_label, "v001");
    assert!(version.is_latest);
    assert!(!version.is_retired);
    assert!(store.get_version(version.uuid).is_some());
}

#[test]
fn test_register_family_rejects_folder_collision() {
    let mut store = MemoryRecordStore::new();
    model::register_family(&mut store, "My_Asset", AssetType::Mesh, no_files()).unwrap();

    // "My:Asset" sanitizes to the same folder as "My_Asset"
    let result = model::register_family(&mut store, "My:Asset", AssetType::Mesh, no_files());
    match result {
        Err(LifecycleError::DuplicateAsset { folder, .. }) => {
            assert_eq!(folder, "My_Asset");
        }
        other => panic!("Expected DuplicateAsset, got {:?}", other.map(|v| v.name)),
    }

    // Same display name under a different type is fine
    assert!(model::register_family(&mut store, "My:Asset", AssetType::Rig, no_files()).is_ok());
}

// ==================== Version chains ====================

#[test]
fn test_create_version_increments_and_flips_latest() {
    let mut store = MemoryRecordStore::new();
    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();

    let v2 = model::create_version(&mut store, v1.version_group_id, no_files()).unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(v2.version_label, "v002");
    assert!(v2.is_latest);

    let old = store.get_version(v1.uuid).unwrap();
    assert!(!old.is_latest);
    assert!(old.is_cold);

    let group = store.get_versions_by_group(v1.version_group_id);
    assert_eq!(group.len(), 2);
    model::check_single_latest(&group).unwrap();
}

#[test]
fn test_create_version_rejects_retired_group() {
    let mut store = MemoryRecordStore::new();
    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();

    let patch = VersionPatch {
        is_retired: Some(true),
        ..VersionPatch::default()
    };
    assert!(store.update_version(v1.uuid, &patch));

    let result = model::create_version(&mut store, v1.version_group_id, no_files());
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

#[test]
fn test_single_latest_detects_violations() {
    let mut store = MemoryRecordStore::new();
    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    let v2 = model::create_version(&mut store, v1.version_group_id, no_files()).unwrap();

    // Force two latest rows
    store.update_version(
        v1.uuid,
        &VersionPatch {
            is_latest: Some(true),
            ..VersionPatch::default()
        },
    );
    let group = store.get_versions_by_group(v1.version_group_id);
    assert!(model::check_single_latest(&group).is_err());

    // Force zero latest rows among active versions
    for uuid in [v1.uuid, v2.uuid] {
        store.update_version(
            uuid,
            &VersionPatch {
                is_latest: Some(false),
                ..VersionPatch::default()
            },
        );
    }
    let group = store.get_versions_by_group(v1.version_group_id);
    assert!(model::check_single_latest(&group).is_err());
}

#[test]
fn test_single_latest_ignores_retired_rows() {
    let mut store = MemoryRecordStore::new();
    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    let v2 = model::create_version(&mut store, v1.version_group_id, no_files()).unwrap();

    // Retire the non-latest row; the group still has exactly one active latest
    store.update_version(
        v1.uuid,
        &VersionPatch {
            is_retired: Some(true),
            ..VersionPatch::default()
        },
    );
    let group = store.get_versions_by_group(v2.version_group_id);
    model::check_single_latest(&group).unwrap();

    // A fully retired group carries no latest and is still valid
    store.update_version(
        v2.uuid,
        &VersionPatch {
            is_retired: Some(true),
            is_latest: Some(false),
            ..VersionPatch::default()
        },
    );
    let group = store.get_versions_by_group(v2.version_group_id);
    model::check_single_latest(&group).unwrap();
}

#[test]
fn test_promote_to_latest() {
    let mut store = MemoryRecordStore::new();
    let v1 = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    let v2 = model::create_version(&mut store, v1.version_group_id, no_files()).unwrap();

    model::promote_to_latest(&mut store, v1.uuid).unwrap();

    let promoted = store.get_version(v1.uuid).unwrap();
    let demoted = store.get_version(v2.uuid).unwrap();
    assert!(promoted.is_latest);
    assert!(!promoted.is_cold);
    assert!(!demoted.is_latest);
    assert!(demoted.is_cold);

    let group = store.get_versions_by_group(v1.version_group_id);
    model::check_single_latest(&group).unwrap();
}

// ==================== Variants ====================

#[test]
fn test_variant_branches_from_base() {
    let mut store = MemoryRecordStore::new();
    let base = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();

    let variant =
        model::create_variant(&mut store, base.uuid, "Damaged", Some("Wear"), no_files()).unwrap();

    assert_eq!(variant.asset_id, base.asset_id);
    assert_ne!(variant.version_group_id, base.version_group_id);
    assert_eq!(variant.variant_name, "Damaged");
    assert_eq!(variant.variant_set.as_deref(), Some("Wear"));
    assert_eq!(variant.version, 1);
    assert!(variant.is_latest);
}

#[test]
fn test_variant_from_variant_rejected() {
    let mut store = MemoryRecordStore::new();
    let base = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    let variant =
        model::create_variant(&mut store, base.uuid, "Damaged", None, no_files()).unwrap();

    let result = model::create_variant(&mut store, variant.uuid, "Broken", None, no_files());
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

#[test]
fn test_variant_name_base_is_reserved() {
    let mut store = MemoryRecordStore::new();
    let base = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();

    let result = model::create_variant(&mut store, base.uuid, "Base", None, no_files());
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

#[test]
fn test_variant_duplicate_name_rejected() {
    let mut store = MemoryRecordStore::new();
    let base = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    model::create_variant(&mut store, base.uuid, "Damaged", None, no_files()).unwrap();

    let result = model::create_variant(&mut store, base.uuid, "Damaged", None, no_files());
    assert!(matches!(result, Err(LifecycleError::InvalidOperation(_))));
}

#[test]
fn test_variant_groups_partition() {
    let mut store = MemoryRecordStore::new();
    let base = model::register_family(&mut store, "Crate", AssetType::Mesh, no_files()).unwrap();
    model::create_version(&mut store, base.version_group_id, no_files()).unwrap();
    model::create_variant(&mut store, base.uuid, "Damaged", None, no_files()).unwrap();
    model::create_variant(&mut store, base.uuid, "Burnt", None, no_files()).unwrap();

    let partition = model::variant_groups(&store.get_variants(base.asset_id));

    assert_eq!(partition.base.len(), 2);
    // Newest first within a chain
    assert_eq!(partition.base[0].version_label, "v002");
    assert_eq!(partition.base[1].version_label, "v001");
    assert_eq!(partition.variants.len(), 2);
    assert!(partition.variants.contains_key("Damaged"));
    assert!(partition.variants.contains_key("Burnt"));
}

// ==================== Path resolution ====================

#[test]
fn test_sanitize_name_rules() {
    assert_eq!(sanitize_name("Sword: Mk/II"), "Sword_ Mk_II");
    assert_eq!(sanitize_name("  Crate.. "), "Crate");
    assert_eq!(sanitize_name("a//b"), "a_b");
    assert_eq!(sanitize_name(""), "unnamed");
    assert_eq!(sanitize_name(" . "), "unnamed");
}

#[test]
fn test_layout_resolves_canonical_paths() {
    let layout = LibraryLayout::new("/vault");

    assert_eq!(
        layout.library_dir(AssetType::Mesh, "Old Crate", "Base"),
        PathBuf::from("/vault/library/meshes/Old Crate/Base")
    );
    assert_eq!(
        layout.history_dir(AssetType::Mesh, "Old Crate", "Base", "v002"),
        PathBuf::from("/vault/_archive/meshes/Old Crate/Base/v002")
    );
    assert_eq!(
        layout.retired_dir(AssetType::Rig, "Hero", "Damaged"),
        PathBuf::from("/vault/_retired/rigs/Hero/Damaged")
    );
    assert_eq!(
        layout.location_root(StorageLocation::Retired),
        PathBuf::from("/vault/_retired")
    );
    assert_eq!(
        layout.catalog_path(),
        PathBuf::from("/vault/.meta/catalog.json")
    );
}

#[test]
fn test_layout_sanitizes_names_in_paths() {
    let layout = LibraryLayout::new("/vault");
    assert_eq!(
        layout.library_dir(AssetType::Mesh, "A/B", "Base"),
        PathBuf::from("/vault/library/meshes/A_B/Base")
    );
}
