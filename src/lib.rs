//! asset-vault — lifecycle engine for versioned, variant-based creative assets.
//!
//! Tracks asset families (Base plus named variants, each with a monotonic
//! version chain) through two independent state spaces: a review workflow
//! gating artistic approval, and a storage state governing whether a
//! variant's files live in active or retired storage.

pub mod cli;
pub mod library;
pub mod model;
pub mod paths;
pub mod review;
pub mod storage;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use library::Library;
pub use paths::{sanitize_name, LibraryLayout, StorageLocation};
pub use review::{NoteAdded, NoteEvent, ReviewEngine, Transition};
pub use storage::{MoveJournal, PlannedMove, RetirePreview, StorageEngine, StorageReport};
pub use store::{FileStore, LocalFileStore, MemoryRecordStore, RecordStore, VersionPatch};
pub use types::{
    version_label, AssetType, AssetVersion, AssetVersionBuilder, CycleType, FileRole,
    LifecycleError, LifecycleResult, LifecycleStatus, NoteCounts, NoteStatus, Outcome,
    RepresentationType, ReviewCycle, ReviewNote, ReviewState, UserRole, DEFAULT_VARIANT,
};
