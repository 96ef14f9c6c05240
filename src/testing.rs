//! Test doubles for the collaborator traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::cache::DeckStore;
use crate::core::{BoxFuture, Size};
use crate::extract::{CssProbe, HtmlSlide, LayoutProbe, LoadedStylesheet};
use crate::loader::{
    FetchError, FetchResponse, Fetcher, LoadError, PdfDocument, PdfEngine, PdfPage, Raster,
};
use crate::utils::mime;

async fn ticks(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Fetcher
// =============================================================================

/// Canned responses by URL; anything else is a 404. Counts calls per URL.
#[derive(Default)]
pub struct MemoryFetcher {
    responses: FxHashMap<String, FetchResponse>,
    calls: Mutex<FxHashMap<String, usize>>,
    delay: usize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, response: FetchResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.respond(url, FetchResponse::ok(mime::types::HTML, body))
    }

    pub fn css(self, url: &str, body: &str) -> Self {
        self.respond(url, FetchResponse::ok(mime::types::CSS, body))
    }

    /// Yield this many times before answering.
    pub fn with_delay(mut self, ticks: usize) -> Self {
        self.delay = ticks;
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        Box::pin(async move {
            *self.calls.lock().entry(url.to_string()).or_default() += 1;
            ticks(self.delay).await;
            Ok(self
                .responses
                .get(url.as_str())
                .cloned()
                .unwrap_or_else(|| FetchResponse::status(404)))
        })
    }
}

// =============================================================================
// PDF engine
// =============================================================================

/// Accepts `%FAKEPDF pages=N size=WxH`. Every page has the same size.
#[derive(Debug, Default, Clone)]
pub struct FakePdfEngine {
    renders: Arc<AtomicUsize>,
}

impl FakePdfEngine {
    pub fn bytes(pages: u32, width_pt: f64, height_pt: f64) -> Vec<u8> {
        format!("%FAKEPDF pages={pages} size={width_pt}x{height_pt}").into_bytes()
    }

    /// Pages drawn through any document this engine opened.
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    fn parse(bytes: &[u8]) -> Option<(u32, Size)> {
        let text = std::str::from_utf8(bytes).ok()?.strip_prefix("%FAKEPDF ")?;
        let mut pages = None;
        let mut size = None;
        for field in text.split_whitespace() {
            match field.split_once('=')? {
                ("pages", n) => pages = n.parse().ok(),
                ("size", wh) => {
                    let (w, h) = wh.split_once('x')?;
                    size = Some(Size::new(w.parse().ok()?, h.parse().ok()?));
                }
                _ => {}
            }
        }
        Some((pages?, size?))
    }
}

impl PdfEngine for FakePdfEngine {
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, LoadError> {
        let (pages, size) =
            Self::parse(&bytes).ok_or_else(|| LoadError::Pdf("not a fake PDF".into()))?;
        Ok(Arc::new(FakeDocument {
            pages,
            size,
            renders: Arc::clone(&self.renders),
        }))
    }
}

#[derive(Debug)]
struct FakeDocument {
    pages: u32,
    size: Size,
    renders: Arc<AtomicUsize>,
}

impl PdfDocument for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page(&self, number: u32) -> Option<Arc<dyn PdfPage>> {
        (1..=self.pages).contains(&number).then(|| {
            Arc::new(FakePage {
                number,
                size: self.size,
                renders: Arc::clone(&self.renders),
            }) as Arc<dyn PdfPage>
        })
    }
}

#[derive(Debug)]
struct FakePage {
    number: u32,
    size: Size,
    renders: Arc<AtomicUsize>,
}

impl PdfPage for FakePage {
    fn number(&self) -> u32 {
        self.number
    }

    fn size_pt(&self) -> Size {
        self.size
    }

    fn render(&self, scale: f64) -> BoxFuture<'_, Result<Raster, LoadError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.renders.fetch_add(1, Ordering::SeqCst);
            let (width, height) = Raster::extent(self.size, scale);
            Ok(Raster {
                page: self.number,
                scale,
                width,
                height,
                operations: 0,
            })
        })
    }
}

// =============================================================================
// Layout probe
// =============================================================================

/// Returns a fixed size (or defers to [`CssProbe`]) and counts measurements.
#[derive(Debug, Default)]
pub struct CountingProbe {
    size: Option<Size>,
    calls: AtomicUsize,
    delay: usize,
}

impl CountingProbe {
    pub fn fixed(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, ticks: usize) -> Self {
        self.delay = ticks;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LayoutProbe for CountingProbe {
    fn measure<'a>(
        &'a self,
        slide: &'a HtmlSlide,
        sheets: &'a [LoadedStylesheet],
    ) -> BoxFuture<'a, Option<Size>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ticks(self.delay).await;
            match self.size {
                Some(size) => Some(size),
                None => CssProbe.measure(slide, sheets).await,
            }
        })
    }
}

// =============================================================================
// Stores
// =============================================================================

pub fn store_with(fetcher: Arc<MemoryFetcher>) -> Arc<DeckStore> {
    store_full(fetcher, FakePdfEngine::default(), Arc::new(CountingProbe::default()))
}

pub fn store_full(
    fetcher: Arc<MemoryFetcher>,
    pdf: FakePdfEngine,
    probe: Arc<CountingProbe>,
) -> Arc<DeckStore> {
    Arc::new(DeckStore::new(
        fetcher,
        Arc::new(pdf),
        probe,
        vec!["pdf".to_string()],
    ))
}
