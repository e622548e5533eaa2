use crate::models::Trek;

/// Result cap for the discovery categories
pub const DISCOVERY_CAP: usize = 5;

/// A named class of fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// The superset every discovery category can be derived from
    AllTreks,
    Recommendations,
    Trending,
    Popular,
    Bookings,
    Reviews,
    Wishlist,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::AllTreks,
        Category::Recommendations,
        Category::Trending,
        Category::Popular,
        Category::Bookings,
        Category::Reviews,
        Category::Wishlist,
    ];

    /// Stable identifier used for snapshot keys and logs
    pub fn key(&self) -> &'static str {
        match self {
            Category::AllTreks => "all_treks",
            Category::Recommendations => "recommendations",
            Category::Trending => "trending",
            Category::Popular => "popular",
            Category::Bookings => "bookings",
            Category::Reviews => "reviews",
            Category::Wishlist => "wishlist",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::AllTreks => "All Treks",
            Category::Recommendations => "Recommended for You",
            Category::Trending => "Trending",
            Category::Popular => "Popular",
            Category::Bookings => "My Bookings",
            Category::Reviews => "My Reviews",
            Category::Wishlist => "Wishlist",
        }
    }

    pub fn cap(&self) -> Option<usize> {
        match self {
            Category::Recommendations | Category::Trending | Category::Popular => {
                Some(DISCOVERY_CAP)
            }
            _ => None,
        }
    }

    /// Categories whose data belongs to the signed-in user
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Category::Bookings | Category::Reviews | Category::Wishlist
        )
    }

    /// The metric a discovery category is ranked by, if it can be derived
    /// from the superset.
    pub fn metric(&self) -> Option<fn(&Trek) -> f64> {
        match self {
            Category::Recommendations => Some(by_rating),
            Category::Trending => Some(by_bookings),
            Category::Popular => Some(by_reviews),
            _ => None,
        }
    }
}

fn by_rating(trek: &Trek) -> f64 {
    trek.rating
}

fn by_bookings(trek: &Trek) -> f64 {
    f64::from(trek.booking_count)
}

fn by_reviews(trek: &Trek) -> f64 {
    f64::from(trek.review_count)
}

/// Top `cap` treks by `metric`, descending.
///
/// Ties keep their order in `superset` (the sort is stable and there is
/// deliberately no secondary key), so the same superset always derives the
/// same list.
pub fn derive_top(superset: &[Trek], metric: fn(&Trek) -> f64, cap: usize) -> Vec<Trek> {
    let mut ranked = superset.to_vec();
    ranked.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    ranked.truncate(cap);
    ranked
}

/// Derive `category` from the superset. Empty for categories with no metric.
pub fn derive_category(category: Category, superset: &[Trek]) -> Vec<Trek> {
    match category.metric() {
        Some(metric) => derive_top(superset, metric, category.cap().unwrap_or(DISCOVERY_CAP)),
        None => Vec::new(),
    }
}
