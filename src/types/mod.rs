//! All data types for the asset-vault library.

pub mod cycle;
pub mod error;
pub mod version;

pub use cycle::{
    CycleType, NoteCounts, NoteStatus, ReviewCycle, ReviewNote, ReviewState, UserRole,
};
pub use error::{LifecycleError, LifecycleResult};
pub use version::{
    AssetType, AssetVersion, AssetVersionBuilder, FileRole, LifecycleStatus, RepresentationType,
};

use serde::Serialize;

/// The reserved variant name of the family root.
pub const DEFAULT_VARIANT: &str = "Base";

/// Format a version number as its label, e.g. `3` -> `v003`.
pub fn version_label(version: u32) -> String {
    format!("v{:03}", version)
}

/// Caller-facing outcome of a lifecycle operation.
///
/// The message is final, human-readable text; callers surface it verbatim
/// instead of re-deriving wording from error codes.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
