// SQLite-backed snapshot store
// Keeps the last good answer around so the UI has something to show offline

pub mod cache;

pub use cache::{CacheError, Snapshot, SnapshotStore};
