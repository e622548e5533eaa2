//! Trekline Core Library
//!
//! Shared functionality for the trekline clients: the session lifecycle,
//! the authenticated request pipeline, per-category snapshots, and resilient
//! live → cached → derived fetching.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod models;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, ResetSignal, Session, SessionManager, SessionState};
pub use cache::SnapshotCache;
pub use config::Config;
pub use coordinator::{Category, CategoryResult, FeedState, FetchCoordinator, HomeFeed, Provenance};

use api::{HttpTransport, Pipeline, Transport};
use auth::CredentialStore;
use storage::{FileStore, KeyValueStore, KeyringStore};

/// Snapshot files live under this directory inside the cache dir
const SNAPSHOT_DIR: &str = "snapshots";

/// Everything a client needs, wired together around one session.
#[derive(Clone)]
pub struct Trekline {
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub coordinator: FetchCoordinator,
    pub reset: Arc<ResetSignal>,
}

impl Trekline {
    /// Wire the stack on explicit parts. Credentials and snapshots may share
    /// a store; their keys never collide.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn KeyValueStore>,
        snapshots: Arc<dyn KeyValueStore>,
    ) -> Self {
        let reset = Arc::new(ResetSignal::new());
        let session = Arc::new(SessionManager::new(
            CredentialStore::new(credentials),
            reset.clone(),
        ));
        let pipeline = Arc::new(Pipeline::authenticated(transport, session.clone()));
        let api = ApiClient::new(pipeline);
        let coordinator = FetchCoordinator::new(
            api.clone(),
            SnapshotCache::new(snapshots),
            session.clone(),
        );

        Self {
            session,
            api,
            coordinator,
            reset,
        }
    }

    /// Production wiring: HTTP transport, OS keychain for the credential,
    /// JSON files in the cache directory for snapshots.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to create HTTP transport")?;
        let snapshots = FileStore::new(config.cache_dir()?.join(SNAPSHOT_DIR))?;

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(KeyringStore::new()),
            Arc::new(snapshots),
        ))
    }

    pub fn cache(&self) -> &SnapshotCache {
        self.coordinator.cache()
    }
}
