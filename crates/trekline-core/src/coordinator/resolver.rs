use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::category::{derive_category, Category};
use super::result::{CategoryResult, Provenance};
use crate::api::{ApiClient, ApiError};
use crate::auth::SessionManager;
use crate::cache::SnapshotCache;
use crate::models::{Booking, Review, Trek, WishlistEntry};

/// Every category of the home screen, resolved in one cycle.
#[derive(Debug, Clone)]
pub struct HomeFeed {
    pub all_treks: CategoryResult<Trek>,
    pub recommendations: CategoryResult<Trek>,
    pub trending: CategoryResult<Trek>,
    pub popular: CategoryResult<Trek>,
    pub bookings: CategoryResult<Booking>,
    pub reviews: CategoryResult<Review>,
    pub wishlist: CategoryResult<WishlistEntry>,
}

impl HomeFeed {
    pub fn status_lines(&self) -> Vec<String> {
        vec![
            self.all_treks.status_line(),
            self.recommendations.status_line(),
            self.trending.status_line(),
            self.popular.status_line(),
            self.bookings.status_line(),
            self.reviews.status_line(),
            self.wishlist.status_line(),
        ]
    }
}

/// One fetch cycle. The superset is resolved at most once per cycle and
/// shared by every category that needs to derive from it.
pub struct FetchCycle<'a> {
    coordinator: &'a FetchCoordinator,
    superset: OnceCell<CategoryResult<Trek>>,
}

impl<'a> FetchCycle<'a> {
    pub async fn superset(&self) -> &CategoryResult<Trek> {
        self.superset
            .get_or_init(|| self.coordinator.resolve_superset())
            .await
    }
}

/// Resolves categories through live → cached → derived.
///
/// Tiers within a category run strictly in order; categories run
/// concurrently on the caller's task and never wait on each other except at
/// the final join.
#[derive(Clone)]
pub struct FetchCoordinator {
    api: ApiClient,
    cache: SnapshotCache,
    session: Arc<SessionManager>,
}

impl FetchCoordinator {
    pub fn new(api: ApiClient, cache: SnapshotCache, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            cache,
            session,
        }
    }

    pub fn cycle(&self) -> FetchCycle<'_> {
        FetchCycle {
            coordinator: self,
            superset: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Resolve every home-screen category concurrently.
    pub async fn load_home(&self) -> HomeFeed {
        info!("Loading home feed");
        let cycle = self.cycle();

        let (all_treks, recommendations, trending, popular, bookings, reviews, wishlist) = tokio::join!(
            async { cycle.superset().await.clone() },
            self.resolve_discovery(&cycle, Category::Recommendations),
            self.resolve_discovery(&cycle, Category::Trending),
            self.resolve_discovery(&cycle, Category::Popular),
            self.resolve_bookings(),
            self.resolve_reviews(),
            self.resolve_wishlist(),
        );

        info!("Home feed settled");
        HomeFeed {
            all_treks,
            recommendations,
            trending,
            popular,
            bookings,
            reviews,
            wishlist,
        }
    }

    /// Resolve one discovery category, deriving from the cycle's superset
    /// when neither the network nor the cache can answer.
    pub async fn resolve_discovery(
        &self,
        cycle: &FetchCycle<'_>,
        category: Category,
    ) -> CategoryResult<Trek> {
        let derive = |superset: &[Trek]| derive_category(category, superset);
        match category {
            Category::Recommendations => {
                self.resolve_with_derivation(cycle, category, || self.api.fetch_recommendations(), derive)
                    .await
            }
            Category::Trending => {
                self.resolve_with_derivation(cycle, category, || self.api.fetch_trending(), derive)
                    .await
            }
            Category::Popular => {
                self.resolve_with_derivation(cycle, category, || self.api.fetch_popular(), derive)
                    .await
            }
            Category::AllTreks => cycle.superset().await.clone(),
            other => {
                warn!(category = other.key(), "Not a discovery category");
                CategoryResult::unavailable(other, self.session.epoch(), None)
            }
        }
    }

    pub async fn resolve_bookings(&self) -> CategoryResult<Booking> {
        self.resolve_without_derivation(Category::Bookings, || self.api.fetch_bookings())
            .await
    }

    pub async fn resolve_reviews(&self) -> CategoryResult<Review> {
        self.resolve_without_derivation(Category::Reviews, || self.api.fetch_reviews())
            .await
    }

    pub async fn resolve_wishlist(&self) -> CategoryResult<WishlistEntry> {
        self.resolve_without_derivation(Category::Wishlist, || self.api.fetch_wishlist())
            .await
    }

    /// The superset has no derivation of its own: live, then cached, then
    /// unavailable.
    async fn resolve_superset(&self) -> CategoryResult<Trek> {
        self.resolve_without_derivation(Category::AllTreks, || self.api.fetch_all_treks())
            .await
    }

    async fn resolve_without_derivation<T, F, Fut>(&self, category: Category, live: F) -> CategoryResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        let epoch = self.session.epoch();
        match self.live_or_cached(category, epoch, live).await {
            Ok(result) => result,
            Err(live_error) => {
                debug!(category = category.key(), "No data from any tier");
                self.settle(CategoryResult::unavailable(category, epoch, live_error))
            }
        }
    }

    async fn resolve_with_derivation<T, F, Fut, D>(
        &self,
        cycle: &FetchCycle<'_>,
        category: Category,
        live: F,
        derive: D,
    ) -> CategoryResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
        D: FnOnce(&[Trek]) -> Vec<T>,
    {
        let epoch = self.session.epoch();
        let live_error = match self.live_or_cached(category, epoch, live).await {
            Ok(result) => return result,
            Err(live_error) => live_error,
        };

        let superset = cycle.superset().await;
        if superset.provenance == Provenance::Unavailable {
            debug!(category = category.key(), "Superset unavailable, nothing to derive from");
            return self.settle(CategoryResult::unavailable(category, epoch, live_error));
        }

        let mut items = derive(&superset.items);
        apply_cap(category, &mut items);
        info!(
            category = category.key(),
            count = items.len(),
            superset = %superset.provenance,
            "Derived from superset"
        );
        self.settle(CategoryResult {
            category,
            items,
            provenance: Provenance::Derived,
            fetched_at: superset.fetched_at,
            session_epoch: epoch,
            stale: false,
            live_error,
        })
    }

    /// Tiers one and two. `Err` carries the live failure (if the live tier
    /// ran) when there is no usable snapshot either.
    async fn live_or_cached<T, F, Fut>(
        &self,
        category: Category,
        epoch: u64,
        live: F,
    ) -> Result<CategoryResult<T>, Option<ApiError>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        let mut live_error = None;
        // Snapshots read and written below belong to whoever was signed in
        // when the category started.
        let owner_id = self.session.owner();
        let owner = owner_id.as_deref();

        if category.requires_auth() && !self.session.is_authenticated() {
            debug!(category = category.key(), "No session, skipping live fetch");
        } else {
            let mut outcome = live().await;
            if let Err(ApiError::ExpiredSession) = outcome {
                // The request chain already tore the session down; one more
                // attempt goes out unauthenticated.
                debug!(category = category.key(), "Session expired, retrying unauthenticated");
                outcome = live().await;
            }

            match outcome {
                Ok(mut items) => {
                    apply_cap(category, &mut items);
                    if let Err(e) = self.cache.save(category, owner, &items).await {
                        warn!(category = category.key(), error = %e, "Failed to save snapshot");
                    }
                    debug!(category = category.key(), count = items.len(), "Live fetch succeeded");
                    return Ok(self.settle(CategoryResult {
                        category,
                        items,
                        provenance: Provenance::Live,
                        fetched_at: Some(Utc::now()),
                        session_epoch: epoch,
                        stale: false,
                        live_error: None,
                    }));
                }
                Err(e) => {
                    warn!(
                        category = category.key(),
                        error = %e,
                        retryable = e.is_retryable(),
                        "Live fetch failed, falling back"
                    );
                    live_error = Some(e);
                }
            }
        }

        match self.cache.load::<T>(category, owner).await {
            Ok(Some(cached)) => {
                debug!(category = category.key(), age = %cached.age_display(), "Serving snapshot");
                let fetched_at = cached.cached_at;
                let mut items = cached.data;
                apply_cap(category, &mut items);
                Ok(self.settle(CategoryResult {
                    category,
                    items,
                    provenance: Provenance::Cached,
                    fetched_at: Some(fetched_at),
                    session_epoch: epoch,
                    stale: false,
                    live_error,
                }))
            }
            Ok(None) => Err(live_error),
            Err(e) => {
                warn!(category = category.key(), error = %e, "Unreadable snapshot, treating as missing");
                Err(live_error)
            }
        }
    }

    /// Flag results whose session changed while they were in flight.
    fn settle<T>(&self, mut result: CategoryResult<T>) -> CategoryResult<T> {
        result.stale = result.session_epoch != self.session.epoch();
        if result.stale {
            debug!(category = result.category.key(), "Session changed while fetching");
        }
        result
    }
}

fn apply_cap<T>(category: Category, items: &mut Vec<T>) {
    if let Some(cap) = category.cap() {
        items.truncate(cap);
    }
}
