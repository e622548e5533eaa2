//! Snapshot caching for offline data access.
//!
//! `SnapshotCache` keeps the most recent live result of every category,
//! serialized as JSON through a `KeyValueStore`. Snapshots are replaced only
//! by new live results, never by cached or derived ones, and are considered
//! stale (but still served) after 60 minutes.

pub mod manager;

pub use manager::{CachedData, SnapshotCache};
