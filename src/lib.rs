//! slide-embed - render one slide of a shared HTML or PDF deck inline.
//!
//! Many embeds may point at the same deck. They share one [`cache::DeckStore`],
//! which guarantees one fetch and one measurement per deck URL. Each embed is a
//! [`lifecycle::SlideEmbed`] that turns attribute writes into coalesced render
//! cycles and keeps its slide fitted to the target box.
//!
//! ```text
//! lifecycle ─► cache ─► loader (fetch, html, pdf)
//!     │          └────► registries (fetch, measurement)
//!     ├──────► extract (html, pdf, measure)
//!     └──────► scale ─► host
//! ```

pub mod logger;

pub mod cache;
pub mod config;
pub mod core;
pub mod dom;
pub mod extract;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod scale;
pub mod utils;

#[cfg(test)]
mod testing;

pub use cache::{DeckEntry, DeckStore};
pub use config::EmbedConfig;
pub use lifecycle::{EmbedSettings, SlideEmbed};
