//! `render` command.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use slide_embed::host::HostSnapshot;
use slide_embed::{DeckStore, EmbedSettings, SlideEmbed};

use super::RenderArgs;
use crate::log;

#[derive(Serialize)]
struct RenderedEmbed<'a> {
    src: &'a str,
    html: String,
    host: HostSnapshot,
}

/// One embed per source, all sharing `store`.
pub async fn run_render(
    args: &RenderArgs,
    store: Arc<DeckStore>,
    settings: &EmbedSettings,
) -> Result<()> {
    let output = render_output(args, store, settings).await?;
    println!("{output}");
    Ok(())
}

/// Settle every embed and format the result: HTML per embed, or one JSON array.
async fn render_output(
    args: &RenderArgs,
    store: Arc<DeckStore>,
    settings: &EmbedSettings,
) -> Result<String> {
    let embeds: Vec<Arc<SlideEmbed>> = args
        .sources
        .iter()
        .map(|src| {
            let embed = SlideEmbed::new(Arc::clone(&store), settings.clone(), args.fallback.clone());
            embed.set_attribute("width", args.width.as_deref());
            embed.set_attribute("height", args.height.as_deref());
            embed.set_attribute("type", args.content_type.as_deref());
            embed.set_attribute("src", Some(src));
            embed
        })
        .collect();

    for embed in &embeds {
        embed.wait_for_load().await;
    }
    log!("render"; "{} embed(s) settled, {} deck(s) loaded", embeds.len(), store.len());

    let rendered: Vec<RenderedEmbed<'_>> = args
        .sources
        .iter()
        .zip(&embeds)
        .map(|(src, embed)| {
            embed.with_host(|host| RenderedEmbed {
                src,
                html: host.to_html(),
                host: host.snapshot(),
            })
        })
        .collect();

    if args.json {
        return Ok(serde_json::to_string_pretty(&rendered)?);
    }
    let html: Vec<String> = rendered.into_iter().map(|embed| embed.html).collect();
    Ok(html.join("\n"))
}
