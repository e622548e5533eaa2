use std::sync::Arc;

use anyhow::{Context, Result};

use crate::storage::KeyValueStore;

/// Well-known key holding the current bearer token
pub const CREDENTIAL_KEY: &str = "auth_token";

/// Durable storage for the single bearer token.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the stored token, if any. Blank values count as absent.
    pub async fn load(&self) -> Result<Option<String>> {
        let value = self
            .store
            .get(CREDENTIAL_KEY)
            .await
            .context("Failed to read stored credential")?;
        Ok(value.filter(|token| !token.trim().is_empty()))
    }

    pub async fn save(&self, token: &str) -> Result<()> {
        self.store
            .set(CREDENTIAL_KEY, token)
            .await
            .context("Failed to store credential")
    }

    pub async fn clear(&self) -> Result<()> {
        self.store
            .delete(CREDENTIAL_KEY)
            .await
            .context("Failed to delete stored credential")
    }

    pub async fn has_credential(&self) -> bool {
        matches!(self.load().await, Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_credential_store_lifecycle() {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(!creds.has_credential().await);

        creds.save("tok").await.unwrap();
        assert_eq!(creds.load().await.unwrap().as_deref(), Some("tok"));

        creds.clear().await.unwrap();
        assert_eq!(creds.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blank_credential_is_absent() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(CREDENTIAL_KEY, "  ").await.unwrap();
        let creds = CredentialStore::new(backing);
        assert_eq!(creds.load().await.unwrap(), None);
    }
}
