//! Shared deck store.
//!
//! One store is shared (via `Arc`) by every embed that should see the same
//! decks. It owns the collaborators, the append-only entry map and the two
//! in-flight registries.
//!
//! # Guarantees
//!
//! - At most one fetch per deck URL is ever in flight
//! - Every caller for a URL observes the same entry
//! - Entries are inserted whole; nobody sees a partial one
//!
//! Map guards are never held across an `.await`.

mod entry;
mod pending;

pub use entry::DeckEntry;
pub use pending::{Claim, PendingGuard, PendingRegistry};

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::EmbedConfig;
use crate::core::DeckUrl;
use crate::extract::{CssProbe, LayoutProbe};
use crate::loader::{self, FetchError, Fetcher, HttpFetcher, LopdfEngine, PdfEngine};
use crate::log;

pub struct DeckStore {
    fetcher: Arc<dyn Fetcher>,
    pdf: Arc<dyn PdfEngine>,
    probe: Arc<dyn LayoutProbe>,
    pdf_extensions: Vec<String>,
    entries: DashMap<DeckUrl, Arc<DeckEntry>>,
    fetches: PendingRegistry,
    measurements: PendingRegistry,
}

impl DeckStore {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        pdf: Arc<dyn PdfEngine>,
        probe: Arc<dyn LayoutProbe>,
        pdf_extensions: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            pdf,
            probe,
            pdf_extensions,
            entries: DashMap::new(),
            fetches: PendingRegistry::new(),
            measurements: PendingRegistry::new(),
        }
    }

    /// Store with the default collaborators.
    pub fn from_config(config: &EmbedConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            Arc::new(HttpFetcher::new(&config.fetch)?),
            Arc::new(LopdfEngine),
            Arc::new(CssProbe),
            config.pdf_extensions(),
        ))
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn probe(&self) -> &dyn LayoutProbe {
        self.probe.as_ref()
    }

    pub fn measurements(&self) -> &PendingRegistry {
        &self.measurements
    }

    pub fn get(&self, url: &DeckUrl) -> Option<Arc<DeckEntry>> {
        self.entries.get(url).map(|e| Arc::clone(e.value()))
    }

    pub fn is_fetching(&self, url: &DeckUrl) -> bool {
        self.fetches.is_pending(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached entry for `url`, fetching it if nobody has yet.
    ///
    /// `hint` only matters to the caller that ends up doing the fetch.
    pub async fn get_or_fetch(&self, url: &DeckUrl, hint: Option<&str>) -> Arc<DeckEntry> {
        loop {
            if let Some(entry) = self.get(url) {
                return entry;
            }

            match self.fetches.claim(url) {
                Claim::Waiter(rx) => {
                    crate::debug!("cache"; "waiting for in-flight fetch of {}", url);
                    PendingRegistry::wait(rx).await;
                }
                Claim::Owner(_guard) => {
                    // The previous owner may have finished between our check and claim.
                    if let Some(entry) = self.get(url) {
                        return entry;
                    }
                    let entry = Arc::new(self.load(url, hint).await);
                    self.entries.insert(url.clone(), Arc::clone(&entry));
                    return entry;
                }
            }
        }
    }

    async fn load(&self, url: &DeckUrl, hint: Option<&str>) -> DeckEntry {
        match loader::load_deck(
            self.fetcher.as_ref(),
            self.pdf.as_ref(),
            url,
            hint,
            &self.pdf_extensions,
        )
        .await
        {
            Ok(deck) => {
                crate::debug!("cache"; "cached {}", url);
                deck.into()
            }
            Err(e) => {
                log!("error"; "{}", e);
                DeckEntry::Error(e.to_string())
            }
        }
    }
}
