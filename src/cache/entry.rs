//! Cache entry variants.

use crate::loader::{HtmlDeck, LoadedDeck, PdfDeck};

/// One per deck URL, created once and never replaced.
///
/// The only later change is the HTML intrinsic size, which `HtmlDeck` records
/// at most once.
#[derive(Debug)]
pub enum DeckEntry {
    Html(HtmlDeck),
    Pdf(PdfDeck),
    /// Fetch or parse failed. Terminal for the process lifetime.
    Error(String),
}

impl DeckEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Html(_) => "html",
            Self::Pdf(_) => "pdf",
            Self::Error(_) => "error",
        }
    }
}

impl From<LoadedDeck> for DeckEntry {
    fn from(deck: LoadedDeck) -> Self {
        match deck {
            LoadedDeck::Html(html) => Self::Html(html),
            LoadedDeck::Pdf(pdf) => Self::Pdf(pdf),
        }
    }
}
