//! Intrinsic size measurement for HTML decks.
//!
//! Runs once per deck URL. The first embed to need it becomes the owner of the
//! measurement marker; everyone else waits on it and reads the recorded size.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::HtmlSlide;
use crate::cache::{Claim, DeckStore, PendingRegistry};
use crate::core::{BoxFuture, Size};
use crate::dom::Element;
use crate::loader::{DeckStyle, Fetcher, HtmlDeck};

/// Reads the rendered box of a slide fragment at natural scale.
///
/// `None` means the probe could not tell; callers fall back to the deck
/// style's natural size.
pub trait LayoutProbe: Send + Sync {
    fn measure<'a>(
        &'a self,
        slide: &'a HtmlSlide,
        sheets: &'a [LoadedStylesheet],
    ) -> BoxFuture<'a, Option<Size>>;
}

/// A linked stylesheet after its load settled. `css` is `None` if it errored.
#[derive(Debug, Clone)]
pub struct LoadedStylesheet {
    pub url: Url,
    pub css: Option<String>,
}

/// Fetch every stylesheet, waiting for each to load or fail.
pub async fn load_stylesheets(fetcher: &dyn Fetcher, urls: &[Url]) -> Vec<LoadedStylesheet> {
    let mut loaded = Vec::with_capacity(urls.len());
    for url in urls {
        let css = match fetcher.fetch(url).await {
            Ok(response) if response.is_success() => Some(response.text()),
            Ok(response) => {
                crate::debug!("measure"; "stylesheet {} returned {}", url, response.status);
                None
            }
            Err(e) => {
                crate::debug!("measure"; "stylesheet {}: {}", url, e);
                None
            }
        };
        loaded.push(LoadedStylesheet {
            url: url.clone(),
            css,
        });
    }
    loaded
}

/// Intrinsic size of `deck`'s slides, measuring with `slide` if nobody has.
pub async fn ensure_intrinsic(store: &DeckStore, deck: &HtmlDeck, slide: &HtmlSlide) -> Size {
    loop {
        if let Some(size) = deck.intrinsic() {
            return size;
        }

        match store.measurements().claim(deck.url()) {
            Claim::Waiter(rx) => PendingRegistry::wait(rx).await,
            Claim::Owner(_guard) => {
                if let Some(size) = deck.intrinsic() {
                    return size;
                }
                let sheets = load_stylesheets(store.fetcher(), deck.stylesheets()).await;
                let size = store
                    .probe()
                    .measure(slide, &sheets)
                    .await
                    .filter(Size::is_usable)
                    .unwrap_or_else(|| deck.style().natural_size());

                crate::debug!("measure"; "{} is {}x{}", deck.url(), size.width, size.height);
                deck.record_intrinsic(size);
                return deck.intrinsic().unwrap_or(size);
            }
        }
    }
}

// =============================================================================
// CssProbe
// =============================================================================

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").expect("valid regex"));

/// Default probe: reads px sizes from CSS instead of running layout.
///
/// Priority:
/// 1. `width`/`height` in the slide's own `style` attribute
/// 2. the last matching declaration across loaded stylesheets, then the
///    deck's inline `<style>` blocks, for rules targeting the slide
///
/// A side found without the other keeps the natural aspect ratio.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssProbe;

impl LayoutProbe for CssProbe {
    fn measure<'a>(
        &'a self,
        slide: &'a HtmlSlide,
        sheets: &'a [LoadedStylesheet],
    ) -> BoxFuture<'a, Option<Size>> {
        Box::pin(async move {
            let mut dims = Dims::default();

            let sources = sheets
                .iter()
                .filter_map(|s| s.css.as_deref())
                .chain(slide.inline_styles.iter().map(String::as_str));
            for css in sources {
                dims.merge(rule_dims(css, &slide.slide, slide.style));
            }
            if let Some(inline) = slide.slide.attr("style") {
                dims.merge(declaration_dims(inline));
            }

            dims.resolve(slide.style.natural_size())
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Dims {
    width: Option<f64>,
    height: Option<f64>,
}

impl Dims {
    /// Later values override earlier ones.
    fn merge(&mut self, other: Dims) {
        self.width = other.width.or(self.width);
        self.height = other.height.or(self.height);
    }

    fn resolve(self, natural: Size) -> Option<Size> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            (Some(w), None) => Some(Size::new(w, w * natural.aspect())),
            (None, Some(h)) => Some(Size::new(h / natural.aspect(), h)),
            (None, None) => None,
        }
    }
}

fn rule_dims(css: &str, slide: &Element, style: DeckStyle) -> Dims {
    let css = COMMENT.replace_all(css, "");
    let mut dims = Dims::default();
    for caps in RULE.captures_iter(&css) {
        let selectors = &caps[1];
        if selectors.trim_start().starts_with('@') {
            continue;
        }
        if selectors.split(',').any(|sel| selector_targets(sel, slide, style)) {
            dims.merge(declaration_dims(&caps[2]));
        }
    }
    dims
}

/// Whether the last compound of `selector` targets the slide.
fn selector_targets(selector: &str, slide: &Element, style: DeckStyle) -> bool {
    let Some(last) = selector
        .split([' ', '>', '+', '~'])
        .filter(|s| !s.is_empty())
        .last()
    else {
        return false;
    };
    let last = last.split(':').next().unwrap_or(last);

    if let Some(id) = slide.attr("id")
        && has_token(last, '#', id)
    {
        return true;
    }
    match style {
        DeckStyle::Generic => has_token(last, '.', "slide"),
        DeckStyle::Reveal => {
            has_token(last, '.', "slides")
                || (last.starts_with("section") && selector.contains(".slides"))
        }
    }
}

/// `.name` or `#name` appears in a compound selector as a whole token.
fn has_token(compound: &str, sigil: char, name: &str) -> bool {
    compound.match_indices(sigil).any(|(i, _)| {
        compound[i + 1..].strip_prefix(name).is_some_and(|after| {
            after
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '-' || c == '_'))
        })
    })
}

/// px `width` / `height` from a declaration block.
fn declaration_dims(block: &str) -> Dims {
    let mut dims = Dims::default();
    for decl in block.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_end_matches("!important").trim();
        let Some(px) = value
            .strip_suffix("px")
            .and_then(|n| n.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n > 0.0)
        else {
            continue;
        };
        match prop.trim().to_ascii_lowercase().as_str() {
            "width" => dims.width = Some(px),
            "height" => dims.height = Some(px),
            _ => {}
        }
    }
    dims
}
