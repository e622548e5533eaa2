use tokio::sync::watch;
use tracing::info;

/// Lets the core send the presentation layer back to its unauthenticated
/// entry screen. The presentation layer decides what that screen is.
pub trait NavigationReset: Send + Sync {
    fn reset_to_entry(&self);
}

/// Publishes a reset counter on a watch channel.
///
/// Each reset bumps the counter; subscribers react to changes.
#[derive(Debug)]
pub struct ResetSignal {
    tx: watch::Sender<u64>,
}

impl ResetSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Total resets fired so far
    pub fn count(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ResetSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationReset for ResetSignal {
    fn reset_to_entry(&self) {
        self.tx.send_modify(|count| *count += 1);
        info!(resets = self.count(), "Navigation reset to entry screen");
    }
}
