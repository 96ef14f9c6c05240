//! Slide extraction.
//!
//! Turns a cache entry plus a fragment into something the scaling engine can
//! mount: an isolated HTML slide, or a handle to one PDF page.

mod html;
mod measure;
mod pdf;

pub use html::{HtmlSlide, extract_html};
pub use measure::{CssProbe, LayoutProbe, LoadedStylesheet, ensure_intrinsic, load_stylesheets};
pub use pdf::{PdfSlide, extract_pdf, parse_page_fragment};

use thiserror::Error;

use crate::cache::DeckEntry;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("slide `{0}` not found")]
    NotFound(String),

    #[error("unrecognized page fragment `{0}`")]
    UnrecognizedFragment(String),

    #[error("{0}")]
    Deck(String),
}

#[derive(Debug, Clone)]
pub enum SlideFragment {
    Html(HtmlSlide),
    Pdf(PdfSlide),
}

/// Extract the slide named by `fragment` from a cached deck.
///
/// An `Error` entry is reported as [`ExtractError::Deck`] so every failure
/// reaches the fallback path the same way.
pub fn extract(entry: &DeckEntry, fragment: &str) -> Result<SlideFragment, ExtractError> {
    match entry {
        DeckEntry::Html(deck) => extract_html(deck, fragment).map(SlideFragment::Html),
        DeckEntry::Pdf(deck) => extract_pdf(deck, fragment).map(SlideFragment::Pdf),
        DeckEntry::Error(message) => Err(ExtractError::Deck(message.clone())),
    }
}
