//! Persistence abstractions: record store and file store.

pub mod file;
pub mod record;

pub use file::{FileStore, LocalFileStore};
pub use record::{MemoryRecordStore, RecordStore, VersionPatch};
