//! HTML deck loading.
//!
//! Parses the deck once, absolutizes every deck-relative link, detects the
//! deck style and collects the stylesheets each extracted slide carries.
//!
//! # Deck styles
//!
//! | Style     | Slide sequence                               | Active class |
//! |-----------|----------------------------------------------|--------------|
//! | `Reveal`  | direct `section` children of `.reveal .slides` | `present`  |
//! | `Generic` | every `.slide` element, document order       | `active`     |

use std::sync::OnceLock;

use url::Url;

use super::LoadError;
use crate::core::{DeckUrl, Size};
use crate::dom::{Document, Element};

/// Attributes holding a single URL.
const URL_ATTRS: [&str; 4] = ["href", "src", "poster", "data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStyle {
    Reveal,
    Generic,
}

impl DeckStyle {
    /// Size a slide of this style renders at when nothing overrides it.
    pub fn natural_size(self) -> Size {
        match self {
            Self::Reveal => Size::new(960.0, 700.0),
            Self::Generic => Size::new(1024.0, 576.0),
        }
    }

    /// Class that marks a slide as the visible one.
    pub fn active_class(self) -> &'static str {
        match self {
            Self::Reveal => "present",
            Self::Generic => "active",
        }
    }

    fn detect(doc: &Document) -> Self {
        if reveal_container(doc).is_some() {
            Self::Reveal
        } else {
            Self::Generic
        }
    }
}

/// Parsed HTML deck, shared by every embed of the same deck URL.
#[derive(Debug)]
pub struct HtmlDeck {
    url: DeckUrl,
    document: Document,
    style: DeckStyle,
    stylesheets: Vec<Url>,
    inline_styles: Vec<String>,
    /// Set at most once, by the single measurement pass.
    intrinsic: OnceLock<Size>,
}

impl HtmlDeck {
    pub fn parse(url: DeckUrl, html: &str) -> Result<Self, LoadError> {
        let mut document =
            Document::parse(html).map_err(|e| LoadError::Html(format!("{}: {e:?}", url)))?;
        absolutize_links(&mut document, url.url());

        let style = DeckStyle::detect(&document);
        let stylesheets = document
            .find_all(is_stylesheet_link)
            .into_iter()
            .filter_map(|e| e.attr("href"))
            .filter_map(|href| Url::parse(href).ok())
            .collect();
        let inline_styles = document
            .find_all(|e| e.name == "style")
            .into_iter()
            .map(Element::text)
            .filter(|css| !css.trim().is_empty())
            .collect();

        crate::debug!("cache"; "parsed {} as {:?} deck", url, style);

        Ok(Self {
            url,
            document,
            style,
            stylesheets,
            inline_styles,
            intrinsic: OnceLock::new(),
        })
    }

    pub fn url(&self) -> &DeckUrl {
        &self.url
    }

    pub fn style(&self) -> DeckStyle {
        self.style
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn stylesheets(&self) -> &[Url] {
        &self.stylesheets
    }

    pub fn inline_styles(&self) -> &[String] {
        &self.inline_styles
    }

    /// Ordered slide sequence for this deck's style.
    pub fn slides(&self) -> Vec<&Element> {
        match self.style {
            DeckStyle::Reveal => reveal_container(&self.document)
                .map(|slides| slides.child_elements().filter(|e| e.name == "section").collect())
                .unwrap_or_default(),
            DeckStyle::Generic => self.document.find_all(|e| e.has_class("slide")),
        }
    }

    /// Measured slide size, once known.
    pub fn intrinsic(&self) -> Option<Size> {
        self.intrinsic.get().copied()
    }

    /// Record the measured size. Returns false if it was already recorded.
    pub fn record_intrinsic(&self, size: Size) -> bool {
        self.intrinsic.set(size).is_ok()
    }
}

/// `.slides` inside `.reveal`.
fn reveal_container(doc: &Document) -> Option<&Element> {
    let reveal = doc.find(&|e: &Element| e.has_class("reveal"))?;
    reveal
        .find(&|e: &Element| e.has_class("slides"))
        .filter(|slides| !std::ptr::eq(*slides, reveal))
}

fn is_stylesheet_link(e: &Element) -> bool {
    e.name == "link"
        && e.attr("rel")
            .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
}

// =============================================================================
// Link absolutization
// =============================================================================

/// Rewrite deck-relative URLs against the deck URL.
///
/// Values that fail to resolve are left unchanged.
fn absolutize_links(doc: &mut Document, base: &Url) {
    doc.walk_mut(&mut |elem| {
        for (name, value) in &mut elem.attrs {
            if value.trim().is_empty() {
                continue;
            }
            if URL_ATTRS.contains(&name.as_str()) {
                if let Ok(resolved) = base.join(value.trim()) {
                    *value = resolved.to_string();
                }
            } else if name == "srcset" {
                *value = absolutize_srcset(value, base);
            }
        }
    });
}

/// `a.png 1x, b.png 2x` -> each candidate URL resolved, descriptors kept.
fn absolutize_srcset(srcset: &str, base: &Url) -> String {
    srcset
        .split(',')
        .map(|candidate| {
            let candidate = candidate.trim();
            let (url, descriptor) = candidate
                .split_once(char::is_whitespace)
                .map_or((candidate, ""), |(u, d)| (u, d.trim()));
            let url = base
                .join(url)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.to_string());
            if descriptor.is_empty() {
                url
            } else {
                format!("{url} {descriptor}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
