//! Asset version records and their classification enums.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{version_label, DEFAULT_VARIANT};

/// The kind of content a version holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Mesh,
    Material,
    Rig,
    Light,
    Camera,
    Collection,
    GreasePencil,
    Curve,
    Scene,
    Other,
}

impl AssetType {
    /// Return a human-readable name for this asset type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Material => "material",
            Self::Rig => "rig",
            Self::Light => "light",
            Self::Camera => "camera",
            Self::Collection => "collection",
            Self::GreasePencil => "grease_pencil",
            Self::Curve => "curve",
            Self::Scene => "scene",
            Self::Other => "other",
        }
    }

    /// Parse an asset type from a string name. Unknown names map to nothing
    /// rather than `Other` so typos surface at the call site.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mesh" => Some(Self::Mesh),
            "material" => Some(Self::Material),
            "rig" => Some(Self::Rig),
            "light" => Some(Self::Light),
            "camera" => Some(Self::Camera),
            "collection" => Some(Self::Collection),
            "grease_pencil" | "greasepencil" => Some(Self::GreasePencil),
            "curve" => Some(Self::Curve),
            "scene" => Some(Self::Scene),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Storage folder name for this type (plural form).
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Mesh => "meshes",
            Self::Material => "materials",
            Self::Rig => "rigs",
            Self::Light => "lights",
            Self::Camera => "cameras",
            Self::Collection => "collections",
            Self::GreasePencil => "grease_pencils",
            Self::Curve => "curves",
            Self::Scene => "scenes",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Content-maturity status, independent of the review workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// No status badge (solo-artist mode).
    #[default]
    None,
    Wip,
    Review,
    Approved,
    Deprecated,
    Archived,
}

impl LifecycleStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Wip => "wip",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Deprecated => "deprecated",
            Self::Archived => "archived",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "wip" => Some(Self::Wip),
            "review" => Some(Self::Review),
            "approved" => Some(Self::Approved),
            "deprecated" => Some(Self::Deprecated),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which pipeline representation a version carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationType {
    #[default]
    None,
    Model,
    Lookdev,
    Rig,
    Final,
}

impl RepresentationType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Model => "model",
            Self::Lookdev => "lookdev",
            Self::Rig => "rig",
            Self::Final => "final",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "model" => Some(Self::Model),
            "lookdev" => Some(Self::Lookdev),
            "rig" => Some(Self::Rig),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

/// The role a stored file plays for a version.
///
/// Ordered so that `BTreeMap<FileRole, _>` iterates payload first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// The primary importable payload.
    Payload,
    /// Thumbnail image.
    Thumbnail,
    /// Turntable / preview render.
    Preview,
    /// Interchange file (e.g. USD) for cross-tool exchange.
    Interchange,
}

impl FileRole {
    /// All roles, payload first.
    pub const ALL: [FileRole; 4] = [
        Self::Payload,
        Self::Thumbnail,
        Self::Preview,
        Self::Interchange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Payload => "payload",
            Self::Thumbnail => "thumbnail",
            Self::Preview => "preview",
            Self::Interchange => "interchange",
        }
    }
}

/// One physical, importable representation of an asset at a point in time.
///
/// The stored file paths are derived caches. The source of truth is the
/// filesystem location implied by identity plus storage state, and the
/// storage engine rewrites them whenever that state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVersion {
    /// Globally unique, stable identity of this version row.
    pub uuid: Uuid,
    /// Family identifier shared by Base and all its variants.
    pub asset_id: Uuid,
    /// Identifier shared by all versions within one variant's chain.
    pub version_group_id: Uuid,
    /// Display name of the asset family.
    pub name: String,
    pub asset_type: AssetType,
    /// `"Base"` or a user-defined variant label.
    pub variant_name: String,
    /// Semantic grouping for sibling variants (e.g. "Armor").
    pub variant_set: Option<String>,
    pub representation: RepresentationType,
    /// Monotonic version number within the version group, starting at 1.
    pub version: u32,
    /// Formatted version label, e.g. `v003`.
    pub version_label: String,
    /// Exactly one version per group carries this among active rows.
    pub is_latest: bool,
    pub status: LifecycleStatus,
    /// Locked versions are immutable (published).
    pub is_locked: bool,
    /// Cold versions live only in history storage.
    pub is_cold: bool,
    pub is_retired: bool,
    pub retired_date: Option<DateTime<Utc>>,
    pub retired_by: Option<String>,
    /// Legacy per-version review state for rows that predate cycles.
    /// Read-only fallback; the cycle state is authoritative for linked
    /// versions.
    #[serde(default)]
    pub legacy_review_state: Option<super::ReviewState>,
    /// Typed storage pointers, recomputed on every storage transition.
    pub files: BTreeMap<FileRole, PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl AssetVersion {
    /// Whether this row still participates in active (non-retired) storage.
    pub fn is_active(&self) -> bool {
        !self.is_retired
    }

    /// Whether this row is the family root variant.
    pub fn is_base(&self) -> bool {
        self.variant_name == DEFAULT_VARIANT
    }
}

/// Builder for constructing [`AssetVersion`] records ergonomically.
pub struct AssetVersionBuilder {
    name: String,
    asset_type: AssetType,
    asset_id: Uuid,
    version_group_id: Uuid,
    variant_name: String,
    variant_set: Option<String>,
    representation: RepresentationType,
    version: u32,
    status: LifecycleStatus,
    files: BTreeMap<FileRole, PathBuf>,
    created_at: Option<DateTime<Utc>>,
}

impl AssetVersionBuilder {
    /// Start a builder for a brand-new family: fresh `asset_id` and
    /// `version_group_id`, Base variant, version 1.
    pub fn new(name: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            name: name.into(),
            asset_type,
            asset_id: Uuid::new_v4(),
            version_group_id: Uuid::new_v4(),
            variant_name: DEFAULT_VARIANT.to_string(),
            variant_set: None,
            representation: RepresentationType::None,
            version: 1,
            status: LifecycleStatus::None,
            files: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Attach to an existing family.
    pub fn asset_id(mut self, asset_id: Uuid) -> Self {
        self.asset_id = asset_id;
        self
    }

    /// Attach to an existing version group.
    pub fn version_group_id(mut self, group: Uuid) -> Self {
        self.version_group_id = group;
        self
    }

    pub fn variant_name(mut self, variant: impl Into<String>) -> Self {
        self.variant_name = variant.into();
        self
    }

    pub fn variant_set(mut self, set: impl Into<String>) -> Self {
        self.variant_set = Some(set.into());
        self
    }

    pub fn representation(mut self, rep: RepresentationType) -> Self {
        self.representation = rep;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version.max(1);
        self
    }

    pub fn status(mut self, status: LifecycleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn file(mut self, role: FileRole, path: impl Into<PathBuf>) -> Self {
        self.files.insert(role, path.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Build the version record. New rows are latest until the identity
    /// model says otherwise.
    pub fn build(self) -> AssetVersion {
        AssetVersion {
            uuid: Uuid::new_v4(),
            asset_id: self.asset_id,
            version_group_id: self.version_group_id,
            name: self.name,
            asset_type: self.asset_type,
            variant_name: self.variant_name,
            variant_set: self.variant_set,
            representation: self.representation,
            version: self.version,
            version_label: version_label(self.version),
            is_latest: true,
            status: self.status,
            is_locked: false,
            is_cold: false,
            is_retired: false,
            retired_date: None,
            retired_by: None,
            legacy_review_state: None,
            files: self.files,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}
