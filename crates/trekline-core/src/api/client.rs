//! API client for the trek marketplace REST API.
//!
//! Every call goes through the interceptor `Pipeline`, so bearer attachment,
//! proactive expiry and authorization-failure teardown apply uniformly.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::pipeline::Pipeline;
use super::transport::ApiRequest;
use super::ApiError;
use crate::models::{Booking, Review, Trek, WishlistEntry};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

pub const ALL_TREKS_PATH: &str = "/treks";
pub const RECOMMENDED_PATH: &str = "/treks/recommended";
pub const TRENDING_PATH: &str = "/treks/trending";
pub const POPULAR_PATH: &str = "/treks/popular";
pub const BOOKINGS_PATH: &str = "/bookings";
pub const REVIEWS_PATH: &str = "/reviews/mine";
pub const WISHLIST_PATH: &str = "/wishlist";
pub const LOGIN_PATH: &str = "/auth/login";

/// List endpoints return either a bare array or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Wrapped { data } => data,
        }
    }
}

/// Successful login: the credential plus the profile the server returns
/// alongside it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Map<String, Value>,
}

/// Clone is cheap - the pipeline is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first rate-limit backoff delay (doubles on each retry)
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Send a request, retrying with exponential backoff while the server
    /// answers 429.
    async fn send_with_retry(&self, request: ApiRequest) -> Result<super::ApiResponse, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match self.pipeline.execute(request.clone()).await {
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(
                        path = %request.path,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                other => return other,
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send_with_retry(ApiRequest::get(path)).await?;
        response.json()
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let envelope: ListEnvelope<T> = self.get(path).await?;
        let items = envelope.into_vec();
        debug!(path = path, count = items.len(), "List fetched");
        Ok(items)
    }

    // ===== Authentication =====

    /// Exchange email and password for a credential.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH, json!({ "email": email, "password": password }));
        let response = self.send_with_retry(request).await?;
        let login: LoginResponse = response.json()?;
        if login.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("login response has no token".into()));
        }
        Ok(login)
    }

    // ===== Data Fetching Methods =====

    pub async fn fetch_all_treks(&self) -> Result<Vec<Trek>, ApiError> {
        self.get_list(ALL_TREKS_PATH).await
    }

    pub async fn fetch_recommendations(&self) -> Result<Vec<Trek>, ApiError> {
        self.get_list(RECOMMENDED_PATH).await
    }

    pub async fn fetch_trending(&self) -> Result<Vec<Trek>, ApiError> {
        self.get_list(TRENDING_PATH).await
    }

    pub async fn fetch_popular(&self) -> Result<Vec<Trek>, ApiError> {
        self.get_list(POPULAR_PATH).await
    }

    pub async fn fetch_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get_list(BOOKINGS_PATH).await
    }

    pub async fn fetch_reviews(&self) -> Result<Vec<Review>, ApiError> {
        self.get_list(REVIEWS_PATH).await
    }

    pub async fn fetch_wishlist(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        self.get_list(WISHLIST_PATH).await
    }
}
