//! CLI command implementations.
//!
//! Every command loads the catalog sidecar into memory, performs one
//! operation through the library facade, and writes the catalog back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::library::Library;
use crate::model;
use crate::paths::{LibraryLayout, StorageLocation};
use crate::store::{LocalFileStore, MemoryRecordStore, RecordStore};
use crate::types::{
    AssetType, AssetVersion, CycleType, FileRole, LifecycleResult, Outcome, UserRole,
};

type LocalLibrary = Library<MemoryRecordStore, LocalFileStore>;

fn open_library(root: &Path) -> LifecycleResult<LocalLibrary> {
    let layout = LibraryLayout::new(root);
    let records = MemoryRecordStore::load(&layout.catalog_path())?;
    Ok(Library::new(records, layout, LocalFileStore::new()))
}

fn save_library(library: &LocalLibrary) -> LifecycleResult<()> {
    library.records().save(&library.layout().catalog_path())
}

fn print_outcome(outcome: &Outcome, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string(outcome).unwrap_or_default()
        );
    } else {
        println!("{}", outcome.message);
    }
}

fn file_map(payload: Option<PathBuf>) -> BTreeMap<FileRole, PathBuf> {
    let mut files = BTreeMap::new();
    if let Some(path) = payload {
        files.insert(FileRole::Payload, path);
    }
    files
}

/// Initialize a library root: location folders plus an empty catalog.
pub fn cmd_init(root: &Path) -> LifecycleResult<()> {
    let layout = LibraryLayout::new(root);
    for location in [
        StorageLocation::Library,
        StorageLocation::History,
        StorageLocation::Retired,
    ] {
        std::fs::create_dir_all(layout.location_root(location))?;
    }
    let records = MemoryRecordStore::new();
    records.save(&layout.catalog_path())?;
    println!("Initialized library at {}", root.display());
    Ok(())
}

/// Register a new asset family.
pub fn cmd_add(
    root: &Path,
    name: &str,
    asset_type: AssetType,
    payload: Option<PathBuf>,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let version = library.create_family(name, asset_type, file_map(payload))?;
    save_library(&library)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "uuid": version.uuid,
                "asset_id": version.asset_id,
                "version_group_id": version.version_group_id,
                "version_label": version.version_label,
            })
        );
    } else {
        println!(
            "Added {} ({}) as {} [{}]",
            version.name, version.asset_type, version.version_label, version.uuid
        );
    }
    Ok(())
}

/// Create the next version within a variant's chain.
pub fn cmd_version(
    root: &Path,
    uuid: Uuid,
    payload: Option<PathBuf>,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let source = library
        .version(uuid)
        .ok_or(crate::types::LifecycleError::NotFound(uuid))?;
    let version = library.create_version(source.version_group_id, file_map(payload))?;
    save_library(&library)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "uuid": version.uuid,
                "version_label": version.version_label,
            })
        );
    } else {
        println!(
            "Created {} {} [{}]",
            version.name, version.version_label, version.uuid
        );
    }
    Ok(())
}

/// Branch a variant off a Base version.
pub fn cmd_variant(
    root: &Path,
    source_uuid: Uuid,
    variant_name: &str,
    variant_set: Option<&str>,
    payload: Option<PathBuf>,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let version =
        library.create_variant(source_uuid, variant_name, variant_set, file_map(payload))?;
    save_library(&library)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "uuid": version.uuid,
                "variant_name": version.variant_name,
                "version_group_id": version.version_group_id,
            })
        );
    } else {
        println!(
            "Created variant {} of {} [{}]",
            version.variant_name, version.name, version.uuid
        );
    }
    Ok(())
}

/// Submit a version for review, opening a cycle.
pub fn cmd_submit(
    root: &Path,
    uuid: Uuid,
    cycle_type: CycleType,
    user: &str,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.submit_for_review(uuid, cycle_type, user);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

/// Add a review note.
pub fn cmd_note_add(
    root: &Path,
    uuid: Uuid,
    text: &str,
    author: &str,
    role: UserRole,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let (note_id, outcome) = library.on_comment_added(uuid, text, author, role);
    save_library(&library)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "note_id": note_id,
                "success": outcome.success,
                "message": outcome.message,
            })
        );
    } else {
        match note_id {
            Some(id) => println!("Note {} added. {}", id, outcome.message),
            None => println!("{}", outcome.message),
        }
    }
    Ok(())
}

pub fn cmd_note_address(root: &Path, note_id: u64, json: bool) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.on_note_addressed(note_id);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

pub fn cmd_note_approve(root: &Path, note_id: u64, json: bool) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.on_note_approved(note_id);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

pub fn cmd_note_reopen(
    root: &Path,
    note_id: u64,
    role: UserRole,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.on_note_reopened(note_id, role);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

/// Close the version's review cycle.
pub fn cmd_finalize(
    root: &Path,
    uuid: Uuid,
    user: &str,
    role: UserRole,
    json: bool,
) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.mark_as_final(uuid, user, role);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

/// Review and storage status of one version.
pub fn cmd_status(root: &Path, uuid: Uuid, json: bool) -> LifecycleResult<()> {
    let library = open_library(root)?;
    let version = library
        .version(uuid)
        .ok_or(crate::types::LifecycleError::NotFound(uuid))?;
    let state = library.current_state(uuid);
    let cycle = library.active_cycle(version.asset_id);
    let notes = cycle
        .as_ref()
        .map(|c| library.records().note_counts_for_cycle(c.id))
        .unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "uuid": version.uuid,
                "name": version.name,
                "variant_name": version.variant_name,
                "version_label": version.version_label,
                "is_latest": version.is_latest,
                "is_retired": version.is_retired,
                "review_state": state.map(|s| s.name()),
                "cycle": cycle.as_ref().map(|c| serde_json::json!({
                    "id": c.id,
                    "cycle_type": c.cycle_type.name(),
                    "start_version": c.start_version,
                    "state": c.review_state.name(),
                })),
                "notes": { "open": notes.open, "addressed": notes.addressed, "approved": notes.approved },
            }))
            .unwrap_or_default()
        );
    } else {
        println!(
            "{} / {} {}",
            version.name, version.variant_name, version.version_label
        );
        println!(
            "  Review state: {}",
            state.map(|s| s.name()).unwrap_or("none")
        );
        if let Some(c) = &cycle {
            println!(
                "  Active cycle: {} (started at {})",
                c.cycle_type.label(),
                c.start_version
            );
            println!(
                "  Notes: {} open, {} addressed, {} approved",
                notes.open, notes.addressed, notes.approved
            );
        }
        println!("  Retired: {}", version.is_retired);
        if let Some(by) = &version.retired_by {
            println!("  Retired by: {}", by);
        }
    }
    Ok(())
}

/// Retire a variant to cold storage.
pub fn cmd_retire(root: &Path, uuid: Uuid, user: &str, json: bool) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.retire(uuid, user);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

/// Restore a retired variant.
pub fn cmd_restore(root: &Path, uuid: Uuid, user: &str, json: bool) -> LifecycleResult<()> {
    let mut library = open_library(root)?;
    let outcome = library.restore(uuid, user);
    save_library(&library)?;
    print_outcome(&outcome, json);
    Ok(())
}

/// Dry-run: show what a retire would touch.
pub fn cmd_preview(root: &Path, uuid: Uuid, json: bool) -> LifecycleResult<()> {
    let library = open_library(root)?;
    let preview = library.retire_preview(uuid)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&preview).unwrap_or_default()
        );
    } else {
        println!(
            "Retiring {} / {} would affect {} version(s): {}",
            preview.name,
            preview.variant_name,
            preview.version_labels.len(),
            preview.version_labels.join(", ")
        );
        if preview.is_base {
            println!("  Base variant: sibling variants stay active");
        }
        for mv in &preview.folder_moves {
            println!("  {} -> {}", mv.source.display(), mv.dest.display());
        }
    }
    Ok(())
}

/// List versions in the catalog.
pub fn cmd_list(root: &Path, all: bool, json: bool) -> LifecycleResult<()> {
    let library = open_library(root)?;
    let mut versions: Vec<AssetVersion> = library
        .records()
        .all_versions()
        .into_iter()
        .filter(|v| all || v.is_latest)
        .collect();
    versions.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.variant_name.cmp(&b.variant_name))
            .then(b.version.cmp(&a.version))
    });

    if json {
        let rows: Vec<serde_json::Value> = versions
            .iter()
            .map(|v| {
                serde_json::json!({
                    "uuid": v.uuid,
                    "name": v.name,
                    "variant_name": v.variant_name,
                    "version_label": v.version_label,
                    "is_latest": v.is_latest,
                    "is_retired": v.is_retired,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).unwrap_or_default()
        );
    } else {
        for v in &versions {
            let mut flags = Vec::new();
            if v.is_latest {
                flags.push("latest");
            }
            if v.is_retired {
                flags.push("retired");
            }
            println!(
                "{}  {} / {} {}  [{}]",
                v.uuid,
                v.name,
                v.variant_name,
                v.version_label,
                flags.join(", ")
            );
        }
        println!("{} version(s)", versions.len());
    }
    Ok(())
}

/// Partition a family into its variant groups.
pub fn cmd_variants(root: &Path, uuid: Uuid, json: bool) -> LifecycleResult<()> {
    let library = open_library(root)?;
    let version = library
        .version(uuid)
        .ok_or(crate::types::LifecycleError::NotFound(uuid))?;
    let partition = model::variant_groups(&library.family(version.asset_id));

    if json {
        let variants: serde_json::Map<String, serde_json::Value> = partition
            .variants
            .iter()
            .map(|(name, rows)| {
                (
                    name.clone(),
                    serde_json::json!(rows.iter().map(|r| r.version_label.clone()).collect::<Vec<_>>()),
                )
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "name": version.name,
                "base": partition.base.iter().map(|r| r.version_label.clone()).collect::<Vec<_>>(),
                "variants": variants,
            }))
            .unwrap_or_default()
        );
    } else {
        println!("{}", version.name);
        println!(
            "  Base: {} version(s)",
            partition.base.len()
        );
        for (name, rows) in &partition.variants {
            println!("  {}: {} version(s)", name, rows.len());
        }
    }
    Ok(())
}
