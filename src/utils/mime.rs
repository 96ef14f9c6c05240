//! MIME type detection and deck classification.

use std::path::Path;

use crate::core::DeckUrl;

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const PDF: &str = "application/pdf";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const SVG: &str = "image/svg+xml";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
}

/// What a deck response should be parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckKind {
    Html,
    Pdf,
}

/// Guess MIME type from file extension.
///
/// Used for `file://` decks, which carry no Content-Type header.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext.map(str::to_ascii_lowercase).as_deref() {
        Some("html" | "htm" | "xhtml") => types::HTML,
        Some("css") => types::CSS,
        Some("txt") => types::PLAIN,
        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("pdf") => types::PDF,
        _ => types::OCTET_STREAM,
    }
}

/// Strip parameters and lowercase: `Application/PDF; x=y` -> `application/pdf`.
pub fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_ascii_lowercase()
}

/// Decide how to parse a deck.
///
/// The explicit `type` hint wins over the response header. An
/// `application/octet*` response is still treated as PDF when the deck path
/// ends in one of `pdf_exts`, since many servers mislabel PDFs.
pub fn classify(
    hint: Option<&str>,
    header: Option<&str>,
    deck: &DeckUrl,
    pdf_exts: &[String],
) -> DeckKind {
    let effective = hint
        .filter(|h| !h.trim().is_empty())
        .or(header)
        .map(essence)
        .unwrap_or_default();

    if effective == "application/pdf" {
        return DeckKind::Pdf;
    }
    if effective.starts_with("application/octet") && deck.has_extension(pdf_exts) {
        return DeckKind::Pdf;
    }
    DeckKind::Html
}
