//! Persistent key/value storage used by the credential store and the
//! snapshot cache.
//!
//! Three backends are provided:
//! - `MemoryStore`: process-local map, used in tests and for ephemeral sessions
//! - `FileStore`: one JSON file per key inside the cache directory
//! - `KeyringStore`: OS keychain entries via the `keyring` crate

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Async key/value persistence.
///
/// Values are replaced whole: a `set` either publishes the complete new value
/// or leaves the previous one in place. Deleting a missing key succeeds.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
