//! Resilient multi-category fetching.
//!
//! Each category resolves through up to three tiers: the live endpoint, the
//! last live snapshot, and (for discovery categories) a ranking derived from
//! the all-treks superset. A category always settles to a complete, capped
//! result; it never fails.

pub mod category;
pub mod feed;
pub mod resolver;
pub mod result;

pub use category::{derive_category, derive_top, Category, DISCOVERY_CAP};
pub use feed::FeedState;
pub use resolver::{FetchCoordinator, FetchCycle, HomeFeed};
pub use result::{CategoryResult, Provenance};
