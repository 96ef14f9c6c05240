//! Per-embed lifecycle controller.
//!
//! ```text
//! set_*  ──► schedule_cycle (next tick, coalesced, token issued)
//!              │
//!              ▼
//!           get_or_fetch ─► [stale?] ─► render lock ─► [stale?]
//!              ─► extract ─► mount ─► measure ─► [stale?] ─► apply_box
//!              ─► [stale?] ─► settle (aria-busy=false, loaded, load event)
//! ```
//!
//! Every await is followed by a token check: a cycle whose token is no longer
//! the current one returns without committing anything. Box-only changes on a
//! loaded embed skip the fetch and just rescale.

mod attrs;

pub use attrs::{Attr, Attributes, Change};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Mutex as RenderLock, watch};
use url::Url;

use crate::cache::{DeckEntry, DeckStore};
use crate::config::{ConfigError, EmbedConfig};
use crate::core::{RequestedBox, SlideRef};
use crate::extract::{SlideFragment, ensure_intrinsic, extract};
use crate::host::{HostElement, HostEvent};
use crate::log;
use crate::scale::{ScaleOutcome, ScaleSettings, Stage};
use crate::utils::html::{escape, escape_attr};

/// Process-wide embed numbering, for log lines only.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-embed settings derived from configuration.
#[derive(Debug, Clone)]
pub struct EmbedSettings {
    /// Base URL relative sources resolve against.
    pub base: Url,
    pub default_width: u32,
    pub fallback_aspect: f64,
}

impl EmbedSettings {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            default_width: 300,
            fallback_aspect: 9.0 / 16.0,
        }
    }

    pub fn from_config(config: &EmbedConfig, cwd: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            base: config.base_url(cwd)?,
            default_width: config.embed.default_width,
            fallback_aspect: config.fallback_aspect(),
        })
    }

    fn scale(&self) -> ScaleSettings {
        ScaleSettings {
            default_width: f64::from(self.default_width),
            fallback_aspect: self.fallback_aspect,
        }
    }
}

/// One rendered embed.
///
/// Setters must be called from within a tokio runtime: they spawn the
/// deferred cycle.
pub struct SlideEmbed {
    id: u64,
    store: Arc<DeckStore>,
    attrs: Mutex<Attributes>,
    host: Mutex<HostElement>,
    /// Latest issued cycle token.
    cycle: AtomicU64,
    cycle_scheduled: AtomicBool,
    rescale_scheduled: AtomicBool,
    /// Single-slot render lock around extraction and scaling.
    stage: RenderLock<Stage>,
    loads: watch::Sender<u64>,
}

impl SlideEmbed {
    pub fn new(
        store: Arc<DeckStore>,
        settings: EmbedSettings,
        inner_markup: Option<String>,
    ) -> Arc<Self> {
        let (loads, _) = watch::channel(0);
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            store,
            attrs: Mutex::new(Attributes::new(
                settings.base.clone(),
                settings.default_width,
            )),
            host: Mutex::new(HostElement::new(inner_markup)),
            cycle: AtomicU64::new(0),
            cycle_scheduled: AtomicBool::new(false),
            rescale_scheduled: AtomicBool::new(false),
            stage: RenderLock::new(Stage::new(settings.scale())),
            loads,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn store(&self) -> &Arc<DeckStore> {
        &self.store
    }

    // =========================================================================
    // Property adapter
    // =========================================================================

    pub fn set_source(self: &Arc<Self>, src: &str) {
        self.apply(Change::Source(src.to_string()));
    }

    /// `0` resets to the default width.
    pub fn set_width(self: &Arc<Self>, width: u32) {
        self.apply(Change::Width(Some(width)));
    }

    pub fn set_height(self: &Arc<Self>, height: Option<u32>) {
        self.apply(Change::Height(height));
    }

    pub fn set_content_type(self: &Arc<Self>, content_type: Option<&str>) {
        self.apply(Change::ContentType(content_type.map(str::to_string)));
    }

    // =========================================================================
    // Attribute adapter
    // =========================================================================

    /// String attribute write (`None` removes it). Unknown names are ignored.
    pub fn set_attribute(self: &Arc<Self>, name: &str, value: Option<&str>) {
        match Attr::from_name(name) {
            Some(attr) => self.apply(Change::from_attribute(attr, value)),
            None => {
                self.host.lock().set_attribute(name, value);
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.host.lock().attribute(name).map(str::to_string)
    }

    fn apply(self: &Arc<Self>, change: Change) {
        let attr = change.attr();
        let changed = {
            let mut attrs = self.attrs.lock();
            let changed = attrs.apply(change);
            // Reflect even when unchanged so rejected input reads back canonical.
            let reflected = attrs.reflected(attr);
            self.host
                .lock()
                .set_attribute(attr.name(), reflected.as_deref());
            changed
        };
        if !changed {
            return;
        }

        if attr.is_box() && self.is_loaded() {
            self.schedule_rescale();
        } else {
            self.schedule_cycle();
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn is_busy(&self) -> bool {
        self.host.lock().is_busy()
    }

    pub fn is_loaded(&self) -> bool {
        self.host.lock().is_loaded()
    }

    pub fn source(&self) -> SlideRef {
        self.attrs.lock().source().clone()
    }

    pub fn requested_box(&self) -> RequestedBox {
        self.attrs.lock().requested_box()
    }

    /// Run `f` against the host model.
    pub fn with_host<R>(&self, f: impl FnOnce(&HostElement) -> R) -> R {
        f(&self.host.lock())
    }

    /// Number of `load` events fired so far.
    pub fn load_count(&self) -> u64 {
        *self.loads.borrow()
    }

    /// Wait until at least `count` load events have fired.
    pub async fn wait_for_loads(&self, count: u64) {
        let mut rx = self.loads.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// Wait for the first load event.
    pub async fn wait_for_load(&self) {
        self.wait_for_loads(1).await;
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    fn is_current(&self, token: u64) -> bool {
        self.cycle.load(Ordering::SeqCst) == token
    }

    /// Issue a new token and run a cycle on the next tick.
    ///
    /// Writes within the same tick share one cycle, which picks up the latest
    /// token when it starts.
    fn schedule_cycle(self: &Arc<Self>) {
        let token = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        self.host.lock().set_busy(true);
        if self.cycle_scheduled.swap(true, Ordering::SeqCst) {
            crate::debug!("cycle"; "embed #{} coalesced into cycle {}", self.id, token);
            return;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            this.run_cycle().await;
        });
    }

    fn schedule_rescale(self: &Arc<Self>) {
        if self.rescale_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            this.rescale_scheduled.store(false, Ordering::SeqCst);
            let requested = this.requested_box();
            this.notify_resize(requested).await;
        });
    }

    // =========================================================================
    // Cycle
    // =========================================================================

    async fn run_cycle(self: Arc<Self>) {
        self.cycle_scheduled.store(false, Ordering::SeqCst);
        let token = self.cycle.load(Ordering::SeqCst);
        let (slide, hint) = {
            let attrs = self.attrs.lock();
            (
                attrs.source().clone(),
                attrs.content_type().map(str::to_string),
            )
        };
        crate::debug!("cycle"; "embed #{} cycle {} -> {}", self.id, token, slide.source());

        let entry = self.store.get_or_fetch(slide.deck(), hint.as_deref()).await;
        if !self.is_current(token) {
            crate::debug!("cycle"; "embed #{} cycle {} stale after fetch", self.id, token);
            return;
        }

        let mut stage = self.stage.lock().await;
        if !self.is_current(token) {
            return;
        }

        match self.render(&mut stage, &entry, &slide, token).await {
            Ok(true) => {}
            Ok(false) => {
                crate::debug!("cycle"; "embed #{} cycle {} stale during render", self.id, token);
                stage.unmount(&self.host);
                return;
            }
            Err(_) if !self.is_current(token) => return,
            Err(message) => {
                log!("error"; "embed #{}: {}, rendering fallback", self.id, message);
                self.render_fallback(&mut stage, &slide).await;
            }
        }

        if self.is_current(token) {
            self.settle(token);
        }
    }

    /// Extract, mount, measure and scale. `Ok(false)` means the cycle went
    /// stale; `Err` carries the message for the fallback path.
    async fn render(
        &self,
        stage: &mut Stage,
        entry: &DeckEntry,
        slide: &SlideRef,
        token: u64,
    ) -> Result<bool, String> {
        let fragment = extract(entry, slide.fragment()).map_err(|e| e.to_string())?;

        let requested = match fragment {
            SlideFragment::Html(html) => {
                let known = match entry {
                    DeckEntry::Html(deck) => deck.intrinsic(),
                    _ => None,
                };
                stage.mount_html(&self.host, html.to_html(), known);

                match (known, entry) {
                    (None, DeckEntry::Html(deck)) => {
                        stage
                            .apply_box(&self.host, self.requested_box())
                            .await
                            .map_err(|e| e.to_string())?;
                        let size = ensure_intrinsic(&self.store, deck, &html).await;
                        if !self.is_current(token) {
                            return Ok(false);
                        }
                        stage
                            .set_intrinsic(&self.host, size)
                            .unwrap_or_else(|| self.requested_box())
                    }
                    _ => self.requested_box(),
                }
            }
            SlideFragment::Pdf(pdf) => {
                stage.mount_pdf(&self.host, pdf.page);
                self.requested_box()
            }
        };

        let outcome = stage
            .apply_box(&self.host, requested)
            .await
            .map_err(|e| e.to_string())?;
        crate::debug!("scale"; "embed #{} {:?}", self.id, outcome);

        Ok(self.is_current(token))
    }

    async fn render_fallback(&self, stage: &mut Stage, slide: &SlideRef) {
        let markup = self.fallback_markup(slide);
        stage.mount_fallback(markup);
        // Fallback painting never draws, so it cannot fail.
        let _ = stage.apply_box(&self.host, self.requested_box()).await;
    }

    /// Inner markup if the host had any, else a link to the source.
    fn fallback_markup(&self, slide: &SlideRef) -> String {
        if let Some(inner) = self.host.lock().inner_markup() {
            return inner.to_string();
        }
        let href = slide.source().as_str();
        format!("<a href=\"{}\">{}</a>", escape_attr(href), escape(href))
    }

    fn settle(&self, token: u64) {
        {
            let mut host = self.host.lock();
            host.set_busy(false);
            host.set_loaded(true);
            host.emit(HostEvent::Load { cycle: token });
        }
        self.loads.send_modify(|n| *n += 1);
        crate::debug!("cycle"; "embed #{} settled cycle {}", self.id, token);
    }

    // =========================================================================
    // Resize
    // =========================================================================

    /// External layout change. Waits for any in-flight render, then rescales.
    pub async fn notify_resize(&self, requested: RequestedBox) -> ScaleOutcome {
        let mut stage = self.stage.lock().await;
        match stage.apply_box(&self.host, requested).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log!("error"; "embed #{}: {}, rendering fallback", self.id, e);
                let slide = self.source();
                self.render_fallback(&mut stage, &slide).await;
                ScaleOutcome::Fallback
            }
        }
    }
}

#[cfg(test)]
mod tests;
