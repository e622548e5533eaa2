use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Category;
use crate::api::ApiError;

/// Which tier produced a category result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Fresh from the network
    Live,
    /// Last live snapshot
    Cached,
    /// Computed from the all-treks superset
    Derived,
    /// No tier had data; the result is empty
    Unavailable,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Live => write!(f, "live"),
            Provenance::Cached => write!(f, "cached"),
            Provenance::Derived => write!(f, "derived"),
            Provenance::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A complete, capped result set for one category.
#[derive(Debug, Clone)]
pub struct CategoryResult<T> {
    pub category: Category,
    pub items: Vec<T>,
    pub provenance: Provenance,
    /// When the underlying data was fetched live (snapshot time for cached)
    pub fetched_at: Option<DateTime<Utc>>,
    /// Session epoch observed when the category started resolving
    pub session_epoch: u64,
    /// The session closed while this category was in flight
    pub stale: bool,
    /// Why the live tier failed, when it did
    pub live_error: Option<ApiError>,
}

impl<T> CategoryResult<T> {
    pub fn unavailable(category: Category, session_epoch: u64, live_error: Option<ApiError>) -> Self {
        Self {
            category,
            items: Vec::new(),
            provenance: Provenance::Unavailable,
            fetched_at: None,
            session_epoch,
            stale: false,
            live_error,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_live(&self) -> bool {
        self.provenance == Provenance::Live
    }

    /// Drop the items, keeping the bookkeeping
    pub fn discard(self) -> Self {
        Self {
            items: Vec::new(),
            provenance: Provenance::Unavailable,
            fetched_at: None,
            ..self
        }
    }

    /// One-line status such as "Trending: 5 (cached)"
    pub fn status_line(&self) -> String {
        let mut line = format!("{}: {} ({})", self.category.title(), self.len(), self.provenance);
        if self.stale {
            line.push_str(" [stale]");
        }
        line
    }
}
