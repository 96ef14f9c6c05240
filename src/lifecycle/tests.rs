use std::sync::Arc;

use url::Url;

use super::*;
use crate::core::Size;
use crate::host::{Placement, ShadowContent};
use crate::loader::FetchResponse;
use crate::scale::PDF_UNIT_FACTOR;
use crate::testing::{self, CountingProbe, FakePdfEngine, MemoryFetcher};
use crate::utils::mime;

const BASE: &str = "https://talks.example.com/";
const DECK_URL: &str = "https://talks.example.com/deck.html";

const DECK: &str = r#"<html><head>
<style>.slide { width: 800px; height: 600px; }</style>
</head><body>
<section class="slide" id="intro">One</section>
<section class="slide">Two</section>
<section class="slide">Three</section>
<section class="slide" id="outro">Four</section>
</body></html>"#;

fn settings() -> EmbedSettings {
    EmbedSettings::new(Url::parse(BASE).unwrap())
}

fn embed(store: &Arc<DeckStore>) -> Arc<SlideEmbed> {
    SlideEmbed::new(Arc::clone(store), settings(), None)
}

/// Let spawned tasks (rescales) run to completion.
async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn slide_markup(embed: &SlideEmbed) -> Option<String> {
    embed.with_host(|host| match host.content() {
        ShadowContent::Slide { markup, .. } => Some(markup.clone()),
        _ => None,
    })
}

#[tokio::test]
async fn test_concurrent_embeds_share_one_fetch() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK).with_delay(4));
    let store = testing::store_with(fetcher.clone());

    let embeds: Vec<_> = (1..=4).map(|_| embed(&store)).collect();
    for (i, e) in embeds.iter().enumerate() {
        e.set_source(&format!("deck.html#{}", i + 1));
    }
    for e in &embeds {
        e.wait_for_load().await;
    }

    assert_eq!(fetcher.calls(DECK_URL), 1);
    for (i, e) in embeds.iter().enumerate() {
        let markup = slide_markup(e).unwrap();
        let expected = ["One", "Two", "Three", "Four"][i];
        assert!(markup.contains(expected), "{markup}");
    }
}

#[tokio::test]
async fn test_measurement_runs_once() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK).with_delay(2));
    let probe = Arc::new(CountingProbe::fixed(Size::new(800.0, 600.0)).with_delay(4));
    let store = testing::store_full(fetcher, FakePdfEngine::default(), probe.clone());

    let embeds: Vec<_> = (0..3).map(|_| embed(&store)).collect();
    for e in &embeds {
        e.set_source("deck.html#2");
        e.set_width(500);
    }
    for e in &embeds {
        e.wait_for_load().await;
    }

    assert_eq!(probe.calls(), 1);
    for e in &embeds {
        assert_eq!(
            e.with_host(HostElement::box_size),
            Some(Size::new(500.0, 375.0))
        );
    }

    // A late embed on the same deck reuses the recorded size.
    let late = embed(&store);
    late.set_source("deck.html#outro");
    late.wait_for_load().await;
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
async fn test_only_latest_source_is_observable() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .html("https://talks.example.com/a.html", "<div class=\"slide\">AAA</div>")
            .html("https://talks.example.com/b.html", "<div class=\"slide\">BBB</div>")
            .with_delay(6),
    );
    let store = testing::store_with(fetcher.clone());
    let e = embed(&store);

    e.set_source("a.html");
    while fetcher.calls("https://talks.example.com/a.html") == 0 {
        tokio::task::yield_now().await;
    }
    e.set_source("b.html");
    e.wait_for_load().await;
    drain().await;

    assert_eq!(e.load_count(), 1);
    e.with_host(|host| {
        assert_eq!(host.events(), &[HostEvent::Load { cycle: 2 }]);
        assert!(!host.is_busy());
    });
    let markup = slide_markup(&e).unwrap();
    assert!(markup.contains("BBB"));
    assert!(!markup.contains("AAA"));
}

#[tokio::test]
async fn test_writes_in_one_tick_coalesce() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .html("https://talks.example.com/a.html", "<div class=\"slide\">AAA</div>")
            .html(DECK_URL, DECK),
    );
    let store = testing::store_with(fetcher.clone());
    let e = embed(&store);

    e.set_source("a.html");
    e.set_source("deck.html#3");
    e.set_width(640);
    assert!(e.is_busy());
    e.wait_for_load().await;
    drain().await;

    assert_eq!(fetcher.calls("https://talks.example.com/a.html"), 0);
    assert_eq!(e.load_count(), 1);
    assert!(slide_markup(&e).unwrap().contains("Three"));
}

#[tokio::test]
async fn test_unchanged_box_causes_no_mutation() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher);
    let e = embed(&store);
    e.set_source("deck.html");
    e.wait_for_load().await;

    let before = e.with_host(HostElement::mutations);
    let outcome = e.notify_resize(e.requested_box()).await;
    assert_eq!(outcome, ScaleOutcome::Unchanged);
    assert_eq!(e.with_host(HostElement::mutations), before);
}

#[tokio::test]
async fn test_resize_is_contain_fit() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher);
    let e = embed(&store);
    e.set_source("deck.html#intro");
    e.wait_for_load().await;

    let outcome = e
        .notify_resize(RequestedBox::new(Some(500.0), Some(500.0)))
        .await;
    assert_eq!(
        outcome,
        ScaleOutcome::Applied {
            scale: 0.625,
            target: Size::new(500.0, 500.0)
        }
    );
    e.with_host(|host| {
        let ShadowContent::Slide { scale, placement, .. } = host.content() else {
            panic!("expected slide content");
        };
        assert_eq!(*placement, Placement::Flow);
        assert!(800.0 * scale <= 500.0 && 600.0 * scale <= 500.0);
    });
}

#[tokio::test]
async fn test_height_follows_intrinsic_ratio() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher);
    let e = embed(&store);
    e.set_source("deck.html#2");
    e.set_width(500);
    e.wait_for_load().await;

    // 800x600 deck: 500 wide is 375 tall, not the 16:9 281.25
    assert_eq!(
        e.with_host(HostElement::box_size),
        Some(Size::new(500.0, 375.0))
    );
    assert_eq!(e.attribute("width").as_deref(), Some("500"));
}

#[tokio::test]
async fn test_box_change_after_load_rescales_without_fetch() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher.clone());
    let e = embed(&store);
    e.set_source("deck.html");
    e.wait_for_load().await;

    e.set_width(400);
    drain().await;
    assert_eq!(
        e.with_host(HostElement::box_size),
        Some(Size::new(400.0, 300.0))
    );

    e.set_height(Some(100));
    drain().await;
    assert_eq!(
        e.with_host(HostElement::box_size),
        Some(Size::new(400.0, 100.0))
    );

    assert_eq!(fetcher.calls(DECK_URL), 1);
    assert_eq!(e.load_count(), 1);
}

#[tokio::test]
async fn test_missing_pdf_renders_link() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let store = testing::store_with(fetcher.clone());
    let e = embed(&store);
    e.set_source("missing.pdf");
    e.wait_for_load().await;

    let link = "https://talks.example.com/missing.pdf";
    e.with_host(|host| {
        assert_eq!(
            host.content(),
            &ShadowContent::Fallback {
                markup: format!("<a href=\"{link}\">{link}</a>")
            }
        );
        assert_eq!(host.attribute("aria-busy"), Some("false"));
        assert!(host.is_loaded());
        assert_eq!(host.box_size(), None);
    });
    assert_eq!(e.load_count(), 1);

    // Failed entries are terminal: setting the same deck again does not refetch.
    e.set_source("missing.pdf#2");
    e.wait_for_loads(2).await;
    assert_eq!(fetcher.calls(link), 1);
}

#[tokio::test]
async fn test_unknown_slide_uses_inner_markup() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher);
    let e = SlideEmbed::new(store, settings(), Some("<p>offline copy</p>".into()));
    e.set_source("deck.html#nope");
    e.wait_for_load().await;

    e.with_host(|host| {
        assert_eq!(
            host.content(),
            &ShadowContent::Fallback {
                markup: "<p>offline copy</p>".into()
            }
        );
    });
}

#[tokio::test]
async fn test_pdf_page_scaled_with_unit_factor() {
    let url = "https://talks.example.com/talk.pdf";
    let fetcher = Arc::new(MemoryFetcher::new().respond(
        url,
        FetchResponse::ok(mime::types::PDF, FakePdfEngine::bytes(10, 612.0, 792.0)),
    ));
    let pdf = FakePdfEngine::default();
    let store = testing::store_full(fetcher, pdf.clone(), Arc::new(CountingProbe::default()));
    let e = embed(&store);
    e.set_source("talk.pdf#page=2");
    e.set_width(500);
    e.wait_for_load().await;

    e.with_host(|host| {
        let ShadowContent::Canvas { raster } = host.content() else {
            panic!("expected canvas, got {:?}", host.content());
        };
        assert_eq!(raster.page, 2);
        assert!((raster.scale - 500.0 / 612.0 * PDF_UNIT_FACTOR).abs() < 1e-9);
    });
    assert_eq!(pdf.renders(), 1);

    // Same box again: no redraw.
    e.notify_resize(e.requested_box()).await;
    assert_eq!(pdf.renders(), 1);
}

#[tokio::test]
async fn test_type_hint_forces_pdf() {
    let url = "https://talks.example.com/export";
    let fetcher = Arc::new(MemoryFetcher::new().respond(
        url,
        FetchResponse::ok(mime::types::HTML, FakePdfEngine::bytes(3, 720.0, 405.0)),
    ));
    let store = testing::store_with(fetcher);
    let e = embed(&store);
    e.set_content_type(Some("application/pdf"));
    e.set_source("export#3");
    e.wait_for_load().await;

    e.with_host(|host| {
        assert!(matches!(host.content(), ShadowContent::Canvas { raster } if raster.page == 3));
    });
}

#[tokio::test]
async fn test_attribute_adapter_validates() {
    let fetcher = Arc::new(MemoryFetcher::new().html(DECK_URL, DECK));
    let store = testing::store_with(fetcher);
    let e = embed(&store);

    e.set_attribute("src", Some("deck.html#1"));
    e.set_attribute("width", Some("wide"));
    e.set_attribute("height", Some("240px"));
    e.set_attribute("data-theme", Some("dark"));
    e.wait_for_load().await;

    assert_eq!(e.attribute("width").as_deref(), Some("300"));
    assert_eq!(e.attribute("height").as_deref(), Some("240"));
    assert_eq!(e.attribute("data-theme").as_deref(), Some("dark"));
    assert_eq!(
        e.attribute("src").as_deref(),
        Some("https://talks.example.com/deck.html#1")
    );
    assert_eq!(
        e.with_host(HostElement::box_size),
        Some(Size::new(300.0, 240.0))
    );
}

const THEMED_URL: &str = "https://talks.example.com/themed.html";
const THEME_CSS: &str = "https://talks.example.com/theme.css";
const BROKEN_CSS: &str = "https://talks.example.com/broken.css";

const THEMED: &str = r#"<html><head>
<link rel="stylesheet" href="theme.css">
<link rel="stylesheet" href="broken.css">
</head><body>
<section class="slide">One</section>
<section class="slide">Two</section>
</body></html>"#;

#[tokio::test]
async fn test_linked_stylesheets_drive_measurement() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .html(THEMED_URL, THEMED)
            .css(THEME_CSS, "/* theme */ .slide { width: 1000px; height: 500px }")
            .with_delay(2),
    );
    let probe = Arc::new(CountingProbe::default());
    let store = testing::store_full(fetcher.clone(), FakePdfEngine::default(), probe.clone());

    let embeds: Vec<_> = (1..=3).map(|_| embed(&store)).collect();
    for (i, e) in embeds.iter().enumerate() {
        e.set_source(&format!("themed.html#{}", i % 2 + 1));
        e.set_width(400);
    }
    for e in &embeds {
        e.wait_for_load().await;
    }

    // broken.css is a 404 but still settles the wait
    assert_eq!(fetcher.calls(THEME_CSS), 1);
    assert_eq!(fetcher.calls(BROKEN_CSS), 1);
    assert_eq!(fetcher.total_calls(), 3);
    assert_eq!(probe.calls(), 1);
    for e in &embeds {
        assert_eq!(
            e.with_host(HostElement::box_size),
            Some(Size::new(400.0, 200.0))
        );
    }
}

#[tokio::test]
async fn test_stale_cycle_leaves_host_empty() {
    let other = "https://talks.example.com/other.html";
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .html(DECK_URL, DECK)
            .html(other, "<div class=\"slide\">BBB</div>")
            .with_delay(40),
    );
    let probe = Arc::new(CountingProbe::fixed(Size::new(800.0, 600.0)).with_delay(4));
    let store = testing::store_full(fetcher, FakePdfEngine::default(), probe.clone());
    let e = embed(&store);

    e.set_source("deck.html#2");
    while probe.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(slide_markup(&e).is_some());

    // superseded while measuring; the newer fetch is still in flight
    e.set_source("other.html");
    let mut cleared = false;
    for _ in 0..30 {
        tokio::task::yield_now().await;
        if e.with_host(|host| host.content() == &ShadowContent::Empty) {
            cleared = true;
            break;
        }
    }
    assert!(cleared);
    assert_eq!(e.load_count(), 0);
    assert_eq!(e.with_host(HostElement::box_size), None);

    e.wait_for_load().await;
    assert!(slide_markup(&e).unwrap().contains("BBB"));
    assert_eq!(e.load_count(), 1);
}
