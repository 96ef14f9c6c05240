//! In-flight markers keyed by deck URL.
//!
//! A marker exists only while its work runs. The first caller becomes the
//! owner; later callers get a receiver that fires when the owner's guard drops.
//! Results are never stored here, callers re-check the cache afterwards.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::core::DeckUrl;

#[derive(Debug, Default)]
pub struct PendingRegistry {
    markers: DashMap<DeckUrl, watch::Receiver<()>>,
}

/// Outcome of [`PendingRegistry::claim`].
pub enum Claim<'a> {
    /// Caller does the work; dropping the guard releases waiters.
    Owner(PendingGuard<'a>),
    /// Someone else is working; wait with [`PendingRegistry::wait`].
    Waiter(watch::Receiver<()>),
}

/// Removes the marker and wakes waiters on drop, success or failure alike.
pub struct PendingGuard<'a> {
    registry: &'a PendingRegistry,
    url: DeckUrl,
    done: Option<watch::Sender<()>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marker for `url`, or join the existing one.
    pub fn claim(&self, url: &DeckUrl) -> Claim<'_> {
        match self.markers.entry(url.clone()) {
            Entry::Occupied(e) => Claim::Waiter(e.get().clone()),
            Entry::Vacant(e) => {
                let (tx, rx) = watch::channel(());
                e.insert(rx);
                Claim::Owner(PendingGuard {
                    registry: self,
                    url: url.clone(),
                    done: Some(tx),
                })
            }
        }
    }

    /// Wait for the owner to finish. Returns immediately if it already has.
    pub async fn wait(mut rx: watch::Receiver<()>) {
        // The owner never sends; the channel closing is the signal.
        let _ = rx.changed().await;
    }

    pub fn is_pending(&self, url: &DeckUrl) -> bool {
        self.markers.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        // Remove first so woken waiters never see a stale marker.
        self.registry.markers.remove(&self.url);
        drop(self.done.take());
    }
}
