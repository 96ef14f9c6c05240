//! PDF page selection.

use std::sync::Arc;

use super::ExtractError;
use crate::loader::{PdfDeck, PdfPage};

#[derive(Debug, Clone)]
pub struct PdfSlide {
    pub page: Arc<dyn PdfPage>,
}

/// Page number from a fragment: `page=N` among `&`-separated params, or bare `N`.
///
/// Empty means page 1. Pages are 1-based.
pub fn parse_page_fragment(fragment: &str) -> Result<u32, ExtractError> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return Ok(1);
    }

    let unrecognized = || ExtractError::UnrecognizedFragment(fragment.to_string());
    let raw = match fragment.parse::<u32>() {
        Ok(n) => n,
        Err(_) => fragment
            .split('&')
            .find_map(|param| param.trim().strip_prefix("page="))
            .ok_or_else(unrecognized)?
            .trim()
            .parse::<u32>()
            .map_err(|_| unrecognized())?,
    };
    if raw == 0 {
        return Err(unrecognized());
    }
    Ok(raw)
}

pub fn extract_pdf(deck: &PdfDeck, fragment: &str) -> Result<PdfSlide, ExtractError> {
    let number = parse_page_fragment(fragment)?;
    let page = deck
        .document()
        .page(number)
        .ok_or_else(|| ExtractError::NotFound(format!("page {number}")))?;
    Ok(PdfSlide { page })
}
