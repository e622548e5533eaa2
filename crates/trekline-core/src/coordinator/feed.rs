use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::resolver::{FetchCoordinator, HomeFeed};
use super::result::CategoryResult;
use crate::auth::SessionManager;

/// What the home screen currently shows.
#[derive(Debug, Default)]
pub struct FeedState {
    loading: bool,
    home: Option<HomeFeed>,
    needs_reload: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn home(&self) -> Option<&HomeFeed> {
        self.home.as_ref()
    }

    /// Set when public results from a closed session were committed
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn begin(&mut self) {
        self.loading = true;
    }

    /// Publish a settled feed. The session is checked again here: user data
    /// resolved under a session that has since changed is dropped, public
    /// data is kept but flagged so the screen reloads it.
    pub fn commit(&mut self, mut feed: HomeFeed, session: &SessionManager) {
        let epoch = session.epoch();

        feed.bookings = drop_if_stale(feed.bookings, epoch);
        feed.reviews = drop_if_stale(feed.reviews, epoch);
        feed.wishlist = drop_if_stale(feed.wishlist, epoch);

        let mut reload = false;
        for result in [
            &mut feed.all_treks,
            &mut feed.recommendations,
            &mut feed.trending,
            &mut feed.popular,
        ] {
            if result.session_epoch != epoch {
                result.stale = true;
                reload = true;
            }
        }

        if reload {
            info!("Session changed during fetch, flagging feed for reload");
        }
        self.needs_reload = reload;
        self.home = Some(feed);
        self.loading = false;
        self.last_updated = Some(Utc::now());
    }
}

fn drop_if_stale<T>(mut result: CategoryResult<T>, epoch: u64) -> CategoryResult<T> {
    if result.session_epoch == epoch {
        return result;
    }
    debug!(
        category = result.category.key(),
        count = result.len(),
        "Discarding user data from a previous session"
    );
    result.stale = true;
    result.discard()
}

impl FetchCoordinator {
    /// Run one fetch cycle into `state`. Loading is cleared whatever the
    /// outcome.
    pub async fn refresh(&self, state: &mut FeedState) {
        state.begin();
        let feed = self.load_home().await;
        state.commit(feed, self.session());
    }
}
