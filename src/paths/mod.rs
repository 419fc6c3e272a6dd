//! Canonical storage paths for the asset library.
//!
//! This module is the single source of truth for where asset files live.
//! All movers and scanners construct paths through [`LibraryLayout`]; no
//! hardcoded folder strings should exist outside this module.
//!
//! # Layout
//!
//! ```text
//! {root}/
//! ├── library/                        current versions (active)
//! │   └── {type}/{name}/{variant}/
//! ├── _archive/                       all previous versions (active history)
//! │   └── {type}/{name}/{variant}/{vNNN}/
//! ├── _retired/                       retired variants (cold)
//! │   └── {type}/{name}/{variant}/
//! │       ├── current/                collapsed library contents
//! │       └── history/{vNNN}/         archived versions, labels preserved
//! └── .meta/
//!     └── catalog.json                record sidecar
//! ```

use std::path::{Path, PathBuf};

use crate::types::AssetType;

/// Subfolder of a retired variant holding the collapsed library contents.
pub const RETIRED_CURRENT_DIR: &str = "current";

/// Subfolder of a retired variant holding version-labeled history folders.
pub const RETIRED_HISTORY_DIR: &str = "history";

/// The three places a variant's files can physically live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLocation {
    /// Active library, holding the current version of each variant.
    Library,
    /// Active history, holding every previously published version.
    History,
    /// Retired cold storage.
    Retired,
}

impl StorageLocation {
    /// Folder name under the storage root.
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::History => "_archive",
            Self::Retired => "_retired",
        }
    }
}

/// Sanitize a display name for use as a folder name.
///
/// Replaces filesystem-illegal characters with `_`, trims leading/trailing
/// spaces and dots, and collapses underscore runs. The mapping is stable,
/// so a given display name always resolves to the same folder; collisions
/// between different display names are rejected at family registration.
pub fn sanitize_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    safe = safe.trim_matches(|c| c == ' ' || c == '.').to_string();

    let mut collapsed = String::with_capacity(safe.len());
    let mut prev_underscore = false;
    for c in safe.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push('_');
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    if collapsed.is_empty() {
        "unnamed".to_string()
    } else {
        collapsed
    }
}

/// Resolves canonical, type/name/variant/version-qualified directories under
/// one storage root.
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    root: PathBuf,
}

impl LibraryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root everything lives under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root folder of a storage location.
    pub fn location_root(&self, location: StorageLocation) -> PathBuf {
        self.root.join(location.folder())
    }

    /// `{location}/{type}/{sanitized_name}/{variant}`: the variant
    /// directory, optionally qualified by a version label.
    pub fn resolve(
        &self,
        location: StorageLocation,
        asset_type: AssetType,
        name: &str,
        variant: &str,
        version_label: Option<&str>,
    ) -> PathBuf {
        let mut path = self
            .location_root(location)
            .join(asset_type.folder())
            .join(sanitize_name(name))
            .join(sanitize_name(variant));
        if let Some(label) = version_label {
            path.push(label);
        }
        path
    }

    /// Active library directory of a variant (current version files).
    pub fn library_dir(&self, asset_type: AssetType, name: &str, variant: &str) -> PathBuf {
        self.resolve(StorageLocation::Library, asset_type, name, variant, None)
    }

    /// Legacy library directory: `{type}/{name}` with no variant subfolder.
    /// Older libraries stored Base files this way; the storage engine still
    /// scans it during retirement.
    pub fn legacy_library_dir(&self, asset_type: AssetType, name: &str) -> PathBuf {
        self.location_root(StorageLocation::Library)
            .join(asset_type.folder())
            .join(sanitize_name(name))
    }

    /// Active history directory of one version of a variant.
    pub fn history_dir(
        &self,
        asset_type: AssetType,
        name: &str,
        variant: &str,
        version_label: &str,
    ) -> PathBuf {
        self.resolve(
            StorageLocation::History,
            asset_type,
            name,
            variant,
            Some(version_label),
        )
    }

    /// Active history directory of a variant (parent of the version dirs).
    pub fn history_variant_dir(&self, asset_type: AssetType, name: &str, variant: &str) -> PathBuf {
        self.resolve(StorageLocation::History, asset_type, name, variant, None)
    }

    /// Retired directory of a variant.
    pub fn retired_dir(&self, asset_type: AssetType, name: &str, variant: &str) -> PathBuf {
        self.resolve(StorageLocation::Retired, asset_type, name, variant, None)
    }

    /// Where the record catalog sidecar lives.
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(".meta").join("catalog.json")
    }
}
