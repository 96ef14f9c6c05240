//! `inspect` command.

use anyhow::{Result, bail};
use slide_embed::DeckStore;
use slide_embed::DeckEntry;
use slide_embed::core::SlideRef;
use url::Url;

use crate::log;

pub async fn run_inspect(
    deck: &str,
    content_type: Option<&str>,
    store: &DeckStore,
    base: &Url,
) -> Result<()> {
    let slide = SlideRef::resolve(deck, base)?;
    let entry = store.get_or_fetch(slide.deck(), content_type).await;

    match entry.as_ref() {
        DeckEntry::Html(html) => {
            let slides = html.slides();
            log!("inspect"; "{} ({:?} deck, {} slides)", slide.deck(), html.style(), slides.len());
            for (i, s) in slides.iter().enumerate() {
                match s.attr("id") {
                    Some(id) => println!("{:>4}  #{id}", i + 1),
                    None => println!("{:>4}", i + 1),
                }
            }
        }
        DeckEntry::Pdf(pdf) => {
            let document = pdf.document();
            log!("inspect"; "{} (PDF, {} pages)", slide.deck(), document.page_count());
            for number in 1..=document.page_count() {
                if let Some(page) = document.page(number) {
                    let size = page.size_pt();
                    println!("{number:>4}  {}x{} pt", size.width, size.height);
                }
            }
        }
        DeckEntry::Error(message) => bail!("{message}"),
    }
    Ok(())
}
