use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use super::KeyValueStore;

/// Stores each key as `<dir>/<key>.json`.
///
/// Each write goes to its own uniquely named temporary file in the same
/// directory, which is then persisted over the target. Readers only ever
/// see a complete value and concurrent writers of one key never share a
/// temporary file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("store key cannot be empty");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("store key contains invalid characters: {:?}", key);
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read store file: {}", key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        let contents = value.as_bytes().to_vec();
        let name = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create temp file for: {}", name))?;
            tmp.write_all(&contents)
                .with_context(|| format!("Failed to write store file: {}", name))?;
            tmp.persist(&path)
                .map_err(|e| e.error)
                .with_context(|| format!("Failed to publish store file: {}", name))?;
            Ok(())
        })
        .await
        .context("Store write task failed")??;

        debug!(key = key, bytes = value.len(), "Store entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete store file: {}", key)),
        }
    }
}
