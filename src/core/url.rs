//! Deck and slide references.
//!
//! - `DeckUrl`: absolute deck address without fragment (the cache key)
//! - `SlideRef`: deck + decoded fragment naming one slide or page

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use url::Url;

/// Absolute deck URL with the fragment stripped.
///
/// Invariants:
/// - Always absolute (resolved against the embedding document's base)
/// - Never carries a fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeckUrl(Arc<Url>);

impl DeckUrl {
    /// Build from any absolute URL, dropping its fragment.
    pub fn new(mut url: Url) -> Self {
        url.set_fragment(None);
        Self(Arc::new(url))
    }

    /// Parse an absolute URL string.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Url::parse(input).map(Self::new)
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Check if the URL path ends with one of the given extensions (case-insensitive).
    ///
    /// `exts` are given without the leading dot.
    pub fn has_extension(&self, exts: &[String]) -> bool {
        let path = self.0.path().to_ascii_lowercase();
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        if ext.contains('/') {
            return false;
        }
        exts.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for DeckUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slide of a deck: `(DeckUrl, fragment)`.
///
/// The fragment is percent-decoded and may be empty (first slide / first page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    deck: DeckUrl,
    fragment: String,
    source: Url,
}

impl SlideRef {
    /// Split a resolved source URL into deck and fragment.
    pub fn from_url(source: Url) -> Self {
        let fragment = source
            .fragment()
            .map(|raw| {
                percent_decode_str(raw)
                    .decode_utf8()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.to_string())
            })
            .unwrap_or_default();
        Self {
            deck: DeckUrl::new(source.clone()),
            fragment,
            source,
        }
    }

    /// Resolve a (possibly relative) `src` value against a base URL.
    pub fn resolve(src: &str, base: &Url) -> Result<Self, url::ParseError> {
        base.join(src.trim()).map(Self::from_url)
    }

    #[inline]
    pub fn deck(&self) -> &DeckUrl {
        &self.deck
    }

    #[inline]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Full resolved source, fragment included.
    #[inline]
    pub fn source(&self) -> &Url {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/talks/index.html").unwrap()
    }

    #[test]
    fn test_resolve_relative_source() {
        let slide = SlideRef::resolve("deck.html#2", &base()).unwrap();
        assert_eq!(slide.deck().as_str(), "https://example.com/talks/deck.html");
        assert_eq!(slide.fragment(), "2");
        assert_eq!(
            slide.source().as_str(),
            "https://example.com/talks/deck.html#2"
        );
    }

    #[test]
    fn test_fragment_is_decoded() {
        let slide = SlideRef::resolve("deck.html#caf%C3%A9", &base()).unwrap();
        assert_eq!(slide.fragment(), "café");
    }

    #[test]
    fn test_same_deck_different_slides_share_key() {
        let a = SlideRef::resolve("deck.html#1", &base()).unwrap();
        let b = SlideRef::resolve("/talks/deck.html#intro", &base()).unwrap();
        assert_eq!(a.deck(), b.deck());
    }

    #[test]
    fn test_missing_fragment_is_empty() {
        let slide = SlideRef::resolve("slides.pdf", &base()).unwrap();
        assert_eq!(slide.fragment(), "");
    }

    #[test]
    fn test_has_extension() {
        let pdf = vec!["pdf".to_string()];
        assert!(DeckUrl::parse("https://x.org/a/b.PDF").unwrap().has_extension(&pdf));
        assert!(DeckUrl::parse("https://x.org/b.pdf?dl=1").unwrap().has_extension(&pdf));
        assert!(!DeckUrl::parse("https://x.org/b.html").unwrap().has_extension(&pdf));
        assert!(!DeckUrl::parse("https://x.org/v1.pdf/").unwrap().has_extension(&pdf));
        assert!(!DeckUrl::parse("https://x.org/download").unwrap().has_extension(&pdf));
    }
}
