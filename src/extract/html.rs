//! HTML slide isolation.

use url::Url;

use super::ExtractError;
use crate::dom::{Element, Node};
use crate::loader::{DeckStyle, HtmlDeck};
use crate::utils::html::escape_attr;

/// Inline style that pins the slide to the fragment's top-left corner.
const FULL_BLEED: &str =
    "position:relative;left:0;top:0;margin:0;transform:none;display:block";

/// Navigation state classes decks put on non-current slides.
const STATE_CLASSES: [&str; 4] = ["past", "future", "hidden", "inactive"];

/// A slide cloned out of its deck, ready to mount on its own.
#[derive(Debug, Clone)]
pub struct HtmlSlide {
    /// 1-based position in the deck's slide sequence, if it is in it.
    pub index: Option<usize>,
    pub style: DeckStyle,
    pub slide: Element,
    pub stylesheets: Vec<Url>,
    pub inline_styles: Vec<String>,
}

impl HtmlSlide {
    /// Self-contained markup: deck styles, stylesheet links, then the slide
    /// (inside the reveal containers for reveal decks).
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for css in &self.inline_styles {
            out.push_str("<style>");
            out.push_str(css);
            out.push_str("</style>");
        }
        for href in &self.stylesheets {
            out.push_str("<link rel=\"stylesheet\" href=\"");
            out.push_str(&escape_attr(href.as_str()));
            out.push_str("\">");
        }
        self.root().write_html(&mut out);
        out
    }

    /// The element actually mounted: the slide, wrapped for reveal decks.
    pub fn root(&self) -> Element {
        match self.style {
            DeckStyle::Reveal => Element::new("div").with_attr("class", "reveal").with_child(
                Node::Element(
                    Element::new("div")
                        .with_attr("class", "slides")
                        .with_child(Node::Element(self.slide.clone())),
                ),
            ),
            DeckStyle::Generic => self.slide.clone(),
        }
    }
}

/// Find the slide for `fragment`: element id first, then 1-based position.
///
/// An empty fragment selects the first slide.
pub fn extract_html(deck: &HtmlDeck, fragment: &str) -> Result<HtmlSlide, ExtractError> {
    let slides = deck.slides();
    let fragment = fragment.trim();

    let by_id = (!fragment.is_empty())
        .then(|| deck.document().find_by_id(fragment))
        .flatten();
    let found = match by_id {
        Some(elem) => Some(elem),
        None => slide_position(fragment).and_then(|n| slides.get(n - 1).copied()),
    };
    let Some(found) = found else {
        return Err(ExtractError::NotFound(fragment.to_string()));
    };

    let index = slides
        .iter()
        .position(|s| std::ptr::eq(*s, found))
        .map(|i| i + 1);

    let mut slide = found.clone();
    activate(&mut slide, deck.style());

    Ok(HtmlSlide {
        index,
        style: deck.style(),
        slide,
        stylesheets: deck.stylesheets().to_vec(),
        inline_styles: deck.inline_styles().to_vec(),
    })
}

fn slide_position(fragment: &str) -> Option<usize> {
    if fragment.is_empty() {
        return Some(1);
    }
    fragment.parse::<usize>().ok().filter(|n| *n >= 1)
}

/// Make the slide render as the current one, full-bleed.
fn activate(slide: &mut Element, style: DeckStyle) {
    for class in STATE_CLASSES {
        slide.remove_class(class);
    }
    slide.add_class(style.active_class());
    slide.remove_attr("hidden");
    slide.remove_attr("aria-hidden");

    let merged = match slide.attr("style").map(str::trim) {
        Some(existing) if !existing.is_empty() => {
            format!("{};{FULL_BLEED}", existing.trim_end_matches(';'))
        }
        _ => FULL_BLEED.to_string(),
    };
    slide.set_attr("style", merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeckUrl;

    const DECK: &str = r#"<head><style>.slide{width:800px;height:600px}</style>
<link rel="stylesheet" href="theme.css"></head>
<section class="slide future" id="intro" hidden>One</section>
<section class="slide future" style="color: red;">Two</section>
<section class="slide future"><img src="pic.png"></section>
<section class="slide future" aria-hidden="true">Four</section>"#;

    const REVEAL: &str = r#"<div class="reveal"><div class="slides">
<section>A</section><section id="b" class="future">B</section>
</div></div>"#;

    fn deck(html: &str) -> HtmlDeck {
        HtmlDeck::parse(DeckUrl::parse("https://x.org/talk/deck.html").unwrap(), html).unwrap()
    }

    #[test]
    fn test_by_position() {
        let slide = extract_html(&deck(DECK), "2").unwrap();
        assert_eq!(slide.index, Some(2));
        assert_eq!(slide.slide.text(), "Two");
        assert_eq!(slide.slide.attr("class"), Some("slide active"));
        assert_eq!(
            slide.slide.attr("style"),
            Some(format!("color: red;{FULL_BLEED}").as_str())
        );
    }

    #[test]
    fn test_by_id_and_empty_fragment() {
        let deck = deck(DECK);
        let intro = extract_html(&deck, "intro").unwrap();
        assert_eq!(intro.index, Some(1));
        assert!(intro.slide.attr("hidden").is_none());

        let first = extract_html(&deck, "").unwrap();
        assert_eq!(first.slide.text(), "One");
    }

    #[test]
    fn test_not_found() {
        let deck = deck(DECK);
        assert!(matches!(extract_html(&deck, "9"), Err(ExtractError::NotFound(_))));
        assert!(matches!(extract_html(&deck, "0"), Err(ExtractError::NotFound(_))));
        assert!(matches!(extract_html(&deck, "nope"), Err(ExtractError::NotFound(_))));
    }

    #[test]
    fn test_fragment_carries_deck_styles_and_absolute_links() {
        let slide = extract_html(&deck(DECK), "3").unwrap();
        let html = slide.to_html();
        assert!(html.starts_with("<style>.slide{width:800px;height:600px}</style>"));
        assert!(html.contains("href=\"https://x.org/talk/theme.css\""));
        assert!(html.contains("src=\"https://x.org/talk/pic.png\""));
    }

    #[test]
    fn test_reveal_slide_is_wrapped() {
        let slide = extract_html(&deck(REVEAL), "b").unwrap();
        assert_eq!(slide.index, Some(2));
        assert_eq!(slide.slide.attr("class"), Some("present"));
        let html = slide.to_html();
        assert!(html.starts_with("<div class=\"reveal\"><div class=\"slides\"><section id=\"b\""));
    }
}
