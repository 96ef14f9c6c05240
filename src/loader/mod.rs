//! Deck loading.
//!
//! Fetch bytes for a deck URL, decide whether they are an HTML deck or a PDF,
//! and produce the in-memory representation stored in the cache.
//!
//! ```text
//! DeckUrl ── Fetcher ──► FetchResponse ── classify ──┬── HtmlDeck::parse
//!                                                     └── PdfEngine::open
//! ```

pub mod fetch;
pub mod html;
pub mod pdf;

pub use fetch::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use html::{DeckStyle, HtmlDeck};
pub use pdf::{LopdfEngine, PdfDocument, PdfEngine, PdfPage, Raster};

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::DeckUrl;
use crate::utils::mime::{self, DeckKind};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse HTML deck {0}")]
    Html(String),

    #[error("failed to load PDF: {0}")]
    Pdf(String),

    #[error("failed to render PDF {0}")]
    Render(String),
}

/// Loaded PDF deck: the shared document handle.
pub struct PdfDeck {
    url: DeckUrl,
    document: Arc<dyn PdfDocument>,
}

impl PdfDeck {
    pub fn new(url: DeckUrl, document: Arc<dyn PdfDocument>) -> Self {
        Self { url, document }
    }

    pub fn url(&self) -> &DeckUrl {
        &self.url
    }

    pub fn document(&self) -> &Arc<dyn PdfDocument> {
        &self.document
    }
}

impl fmt::Debug for PdfDeck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfDeck")
            .field("url", &self.url.as_str())
            .field("pages", &self.document.page_count())
            .finish()
    }
}

#[derive(Debug)]
pub enum LoadedDeck {
    Html(HtmlDeck),
    Pdf(PdfDeck),
}

/// Fetch and parse one deck.
///
/// `hint` is the explicit content-type override; it wins over the response
/// header. Any non-2xx status is an error.
pub async fn load_deck(
    fetcher: &dyn Fetcher,
    pdf_engine: &dyn PdfEngine,
    url: &DeckUrl,
    hint: Option<&str>,
    pdf_exts: &[String],
) -> Result<LoadedDeck, LoadError> {
    let response = fetcher.fetch(url.url()).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        }
        .into());
    }

    let kind = mime::classify(hint, response.content_type.as_deref(), url, pdf_exts);
    crate::debug!("fetch"; "{} -> {:?} ({} bytes)", url, kind, response.body.len());

    match kind {
        DeckKind::Html => {
            let text = response.text();
            HtmlDeck::parse(url.clone(), &text).map(LoadedDeck::Html)
        }
        DeckKind::Pdf => {
            let document = pdf_engine.open(response.body)?;
            Ok(LoadedDeck::Pdf(PdfDeck::new(url.clone(), document)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePdfEngine, MemoryFetcher};

    fn exts() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    #[tokio::test]
    async fn test_load_html_deck() {
        let url = DeckUrl::parse("https://x.org/deck.html").unwrap();
        let fetcher = MemoryFetcher::new().html(url.as_str(), "<div class=\"slide\"></div>");
        let deck = load_deck(&fetcher, &FakePdfEngine::default(), &url, None, &exts())
            .await
            .unwrap();
        assert!(matches!(deck, LoadedDeck::Html(d) if d.slides().len() == 1));
    }

    #[tokio::test]
    async fn test_octet_stream_pdf_by_extension() {
        let url = DeckUrl::parse("https://x.org/talk.pdf").unwrap();
        let fetcher = MemoryFetcher::new().respond(
            url.as_str(),
            FetchResponse::ok(mime::types::OCTET_STREAM, FakePdfEngine::bytes(4, 612.0, 792.0)),
        );
        let deck = load_deck(&fetcher, &FakePdfEngine::default(), &url, None, &exts())
            .await
            .unwrap();
        assert!(matches!(deck, LoadedDeck::Pdf(d) if d.document().page_count() == 4));
    }

    #[tokio::test]
    async fn test_hint_forces_pdf() {
        let url = DeckUrl::parse("https://x.org/export").unwrap();
        let fetcher = MemoryFetcher::new().respond(
            url.as_str(),
            FetchResponse::ok(mime::types::HTML, FakePdfEngine::bytes(2, 612.0, 792.0)),
        );
        let deck = load_deck(
            &fetcher,
            &FakePdfEngine::default(),
            &url,
            Some("application/pdf"),
            &exts(),
        )
        .await
        .unwrap();
        assert!(matches!(deck, LoadedDeck::Pdf(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let url = DeckUrl::parse("https://x.org/missing.pdf").unwrap();
        let fetcher = MemoryFetcher::new().respond(url.as_str(), FetchResponse::status(404));
        let err = load_deck(&fetcher, &FakePdfEngine::default(), &url, None, &exts())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Fetch(FetchError::Status { status: 404, .. })
        ));
        assert!(err.to_string().contains("404"));
    }
}
