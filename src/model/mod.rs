//! Identity and versioning contract.
//!
//! Pure data-consistency rules shared by everything else: the
//! single-latest invariant inside a version group, the Base-privileged
//! variant partition of a family, and the creation rules for families,
//! versions, and variants.

use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;

use crate::paths::sanitize_name;
use crate::store::{RecordStore, VersionPatch};
use crate::types::{
    version_label, AssetType, AssetVersion, AssetVersionBuilder, FileRole, LifecycleError,
    LifecycleResult, DEFAULT_VARIANT,
};

/// Verify the single-latest invariant over one version group's rows.
///
/// Among *active* (non-retired) rows exactly one must be `is_latest`. A
/// fully retired group carries no latest row and is fine.
pub fn check_single_latest(versions: &[AssetVersion]) -> LifecycleResult<()> {
    let active: Vec<&AssetVersion> = versions.iter().filter(|v| v.is_active()).collect();
    if active.is_empty() {
        return Ok(());
    }
    let latest_count = active.iter().filter(|v| v.is_latest).count();
    if latest_count != 1 {
        let group = versions
            .first()
            .map(|v| v.version_group_id.to_string())
            .unwrap_or_default();
        return Err(LifecycleError::InvalidOperation(format!(
            "version group {} has {} latest versions among {} active rows",
            group,
            latest_count,
            active.len()
        )));
    }
    Ok(())
}

/// A family's rows partitioned by variant, Base privileged as the root.
#[derive(Debug, Default)]
pub struct VariantPartition {
    /// The Base chain, newest first. Empty for malformed families.
    pub base: Vec<AssetVersion>,
    /// Non-Base variants by name, each chain newest first.
    pub variants: BTreeMap<String, Vec<AssetVersion>>,
}

/// Partition a family's rows into variant groups by `variant_name`.
pub fn variant_groups(versions: &[AssetVersion]) -> VariantPartition {
    let mut partition = VariantPartition::default();
    for version in versions {
        if version.is_base() {
            partition.base.push(version.clone());
        } else {
            partition
                .variants
                .entry(version.variant_name.clone())
                .or_default()
                .push(version.clone());
        }
    }
    partition.base.sort_by(|a, b| b.version.cmp(&a.version));
    for chain in partition.variants.values_mut() {
        chain.sort_by(|a, b| b.version.cmp(&a.version));
    }
    partition
}

/// Register a brand-new asset family: Base variant, version 1.
///
/// Rejects display names whose sanitized folder collides with an existing
/// family of the same type; two families must never merge into one
/// directory.
pub fn register_family(
    records: &mut dyn RecordStore,
    name: &str,
    asset_type: AssetType,
    files: BTreeMap<FileRole, PathBuf>,
) -> LifecycleResult<AssetVersion> {
    let folder = sanitize_name(name);
    for existing in records.all_versions() {
        if existing.asset_type == asset_type && sanitize_name(&existing.name) == folder {
            return Err(LifecycleError::DuplicateAsset {
                name: name.to_string(),
                folder,
            });
        }
    }

    let mut builder = AssetVersionBuilder::new(name, asset_type);
    for (role, path) in files {
        builder = builder.file(role, path);
    }
    let version = builder.build();
    records.insert_version(version.clone())?;
    Ok(version)
}

/// Create the next version within a variant's chain.
///
/// Computes the next monotonic version number, refuses a duplicate label
/// (double-submit protection), and flips the previous latest off before
/// inserting so the group never holds two latest rows.
pub fn create_version(
    records: &mut dyn RecordStore,
    version_group_id: Uuid,
    files: BTreeMap<FileRole, PathBuf>,
) -> LifecycleResult<AssetVersion> {
    let existing = records.get_versions_by_group(version_group_id);
    let template = existing.first().ok_or_else(|| {
        LifecycleError::InvalidOperation(format!(
            "version group {} has no versions to extend",
            version_group_id
        ))
    })?;
    if template.is_retired {
        return Err(LifecycleError::InvalidOperation(
            "cannot add a version to a retired variant".to_string(),
        ));
    }

    let max_version = existing.iter().map(|v| v.version).max().unwrap_or(0);
    let next = max_version + 1;
    let label = version_label(next);
    if existing.iter().any(|v| v.version_label == label) {
        return Err(LifecycleError::InvalidOperation(format!(
            "version {} already exists in this group",
            label
        )));
    }

    // Demote the current latest; it moves to cold history storage.
    for old in existing.iter().filter(|v| v.is_latest) {
        records.update_version(
            old.uuid,
            &VersionPatch {
                is_latest: Some(false),
                is_cold: Some(true),
                ..VersionPatch::default()
            },
        );
    }

    let mut builder = AssetVersionBuilder::new(template.name.clone(), template.asset_type)
        .asset_id(template.asset_id)
        .version_group_id(version_group_id)
        .variant_name(template.variant_name.clone())
        .representation(template.representation)
        .version(next);
    if let Some(set) = &template.variant_set {
        builder = builder.variant_set(set.clone());
    }
    for (role, path) in files {
        builder = builder.file(role, path);
    }
    let version = builder.build();
    records.insert_version(version.clone())?;
    Ok(version)
}

/// Branch a new variant off a Base version.
///
/// Variants may only be created *from* Base, never from another variant;
/// the new variant keeps the family `asset_id` but starts a fresh version
/// group at v001.
pub fn create_variant(
    records: &mut dyn RecordStore,
    source_uuid: Uuid,
    variant_name: &str,
    variant_set: Option<&str>,
    files: BTreeMap<FileRole, PathBuf>,
) -> LifecycleResult<AssetVersion> {
    let source = records
        .get_version(source_uuid)
        .ok_or(LifecycleError::NotFound(source_uuid))?;

    if !source.is_base() {
        return Err(LifecycleError::InvalidOperation(format!(
            "variants must branch from {}; {} is itself a variant ({})",
            DEFAULT_VARIANT, source.name, source.variant_name
        )));
    }
    if variant_name == DEFAULT_VARIANT {
        return Err(LifecycleError::InvalidOperation(format!(
            "{} is reserved for the family root",
            DEFAULT_VARIANT
        )));
    }
    let family = records.get_variants(source.asset_id);
    if family.iter().any(|v| v.variant_name == variant_name) {
        return Err(LifecycleError::InvalidOperation(format!(
            "variant {} already exists for {}",
            variant_name, source.name
        )));
    }

    let mut builder = AssetVersionBuilder::new(source.name.clone(), source.asset_type)
        .asset_id(source.asset_id)
        .variant_name(variant_name)
        .representation(source.representation);
    if let Some(set) = variant_set {
        builder = builder.variant_set(set);
    }
    for (role, path) in files {
        builder = builder.file(role, path);
    }
    let version = builder.build();
    records.insert_version(version.clone())?;
    Ok(version)
}

/// Re-point `is_latest` at a specific version within its group.
///
/// The demoted row is flagged cold; the promoted one is warmed back up.
/// Retired rows cannot be promoted.
pub fn promote_to_latest(records: &mut dyn RecordStore, uuid: Uuid) -> LifecycleResult<()> {
    let target = records
        .get_version(uuid)
        .ok_or(LifecycleError::NotFound(uuid))?;
    if target.is_retired {
        return Err(LifecycleError::InvalidOperation(
            "cannot promote a retired version".to_string(),
        ));
    }
    if target.is_latest {
        return Ok(());
    }

    for row in records.get_versions_by_group(target.version_group_id) {
        if row.is_latest {
            records.update_version(
                row.uuid,
                &VersionPatch {
                    is_latest: Some(false),
                    is_cold: Some(true),
                    ..VersionPatch::default()
                },
            );
        }
    }
    if !records.update_version(
        uuid,
        &VersionPatch {
            is_latest: Some(true),
            is_cold: Some(false),
            ..VersionPatch::default()
        },
    ) {
        return Err(LifecycleError::NotFound(uuid));
    }
    Ok(())
}
