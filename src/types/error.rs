//! Error types for the asset-vault library.

use thiserror::Error;
use uuid::Uuid;

/// All errors that can occur in the asset-vault library.
///
/// Guard misses on review transitions are deliberately *not* errors; they
/// come back as unchanged [`Transition`](crate::review::Transition) results
/// carrying a reason the UI can show verbatim. The variants here are the
/// genuinely exceptional outcomes.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// No asset version with this UUID exists.
    #[error("Asset version not found: {0}")]
    NotFound(Uuid),

    /// No review cycle with this ID exists.
    #[error("Review cycle not found: {0}")]
    CycleNotFound(u64),

    /// No review note with this ID exists.
    #[error("Review note not found: {0}")]
    NoteNotFound(u64),

    /// A gated transition was attempted from a state that has no such edge.
    #[error("Invalid transition: {reason}")]
    InvalidTransition { reason: String },

    /// The actor's role is insufficient for this operation.
    #[error("Not authorized: {actor} ({role}) cannot {action}")]
    AuthorizationDenied {
        actor: String,
        role: String,
        action: String,
    },

    /// The operation violates an identity-model rule (e.g. branching a
    /// variant from another variant).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Two display names map to the same storage folder.
    #[error("Duplicate asset: {name} collides with existing folder {folder}")]
    DuplicateAsset { name: String, folder: String },

    /// Zero records could be updated during a storage transition. The
    /// engine has already rolled the file moves back when this surfaces.
    #[error("Storage transition failed for all {attempted} version(s): {details}")]
    StorageConsistency { attempted: usize, details: String },

    /// Record store rejected an operation.
    #[error("Record store error: {0}")]
    Store(String),

    /// Catalog sidecar could not be parsed.
    #[error("Corrupt catalog: {0}")]
    CorruptCatalog(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for asset-vault operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
