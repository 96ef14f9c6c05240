//! In-memory model of the embedding element.
//!
//! Everything the outside world can observe about an embed lives here:
//! reflected attributes, inline style, shadow content, `aria-busy`, `loaded`
//! and the event log. `mutations` counts effective changes only, so a no-op
//! write leaves it untouched.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::core::Size;
use crate::loader::Raster;
use crate::utils::html::escape_attr;

/// Element name used when serializing.
pub const TAG: &str = "slide-embed";

/// Custom properties the host is sized through.
pub const WIDTH_PROP: &str = "--embed-width";
pub const HEIGHT_PROP: &str = "--embed-height";

/// Where a mounted HTML slide sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Shifted horizontally out of view while being measured.
    Offscreen,
    Flow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShadowContent {
    #[default]
    Empty,
    Slide {
        markup: String,
        placement: Placement,
        scale: f64,
    },
    Canvas {
        raster: Raster,
    },
    Fallback {
        markup: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostEvent {
    Load { cycle: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct HostElement {
    attributes: BTreeMap<String, String>,
    inner_markup: Option<String>,
    style: BTreeMap<String, String>,
    content: ShadowContent,
    busy: bool,
    loaded: bool,
    events: Vec<HostEvent>,
    mutations: u64,
}

/// Serializable view of a host.
#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub attributes: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub content: ShadowContent,
    pub busy: bool,
    pub loaded: bool,
    pub events: Vec<HostEvent>,
}

impl HostElement {
    /// A host with pre-existing light-DOM markup (used as fallback content).
    pub fn new(inner_markup: Option<String>) -> Self {
        Self {
            inner_markup: inner_markup.filter(|m| !m.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn inner_markup(&self) -> Option<&str> {
        self.inner_markup.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set or remove an attribute. Returns whether anything changed.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> bool {
        let changed = match value {
            Some(v) if self.attribute(name) != Some(v) => {
                self.attributes.insert(name.to_string(), v.to_string());
                true
            }
            None => self.attributes.remove(name).is_some(),
            Some(_) => false,
        };
        self.touch(changed)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.style.get(name).map(String::as_str)
    }

    fn set_style(&mut self, name: &str, value: String) -> bool {
        let changed = self.style.get(name) != Some(&value);
        if changed {
            self.style.insert(name.to_string(), value);
        }
        self.touch(changed)
    }

    /// Size the host through its custom box properties.
    pub fn set_box(&mut self, size: Size) {
        self.set_style(WIDTH_PROP, format!("{}px", round_px(size.width)));
        self.set_style(HEIGHT_PROP, format!("{}px", round_px(size.height)));
    }

    /// Let layout size the host (fallback content).
    pub fn set_box_auto(&mut self) {
        self.set_style(WIDTH_PROP, "auto".into());
        self.set_style(HEIGHT_PROP, "auto".into());
    }

    /// Current box, when it is a px size.
    pub fn box_size(&self) -> Option<Size> {
        let px = |prop: &str| {
            self.style(prop)?
                .strip_suffix("px")?
                .parse::<f64>()
                .ok()
        };
        Some(Size::new(px(WIDTH_PROP)?, px(HEIGHT_PROP)?))
    }

    pub fn content(&self) -> &ShadowContent {
        &self.content
    }

    pub fn set_content(&mut self, content: ShadowContent) -> bool {
        let changed = self.content != content;
        if changed {
            self.content = content;
        }
        self.touch(changed)
    }

    /// Drop any drawn PDF page.
    pub fn clear_drawing(&mut self) {
        if matches!(self.content, ShadowContent::Canvas { .. }) {
            self.set_content(ShadowContent::Empty);
        }
    }

    pub fn set_placement(&mut self, placement: Placement) {
        let changed = match &mut self.content {
            ShadowContent::Slide { placement: p, .. } if *p != placement => {
                *p = placement;
                true
            }
            _ => false,
        };
        self.touch(changed);
    }

    pub fn set_slide_scale(&mut self, scale: f64) {
        let changed = match &mut self.content {
            ShadowContent::Slide { scale: s, .. } if *s != scale => {
                *s = scale;
                true
            }
            _ => false,
        };
        self.touch(changed);
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.set_attribute("aria-busy", Some(if busy { "true" } else { "false" }));
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
        self.set_attribute("loaded", loaded.then_some(""));
    }

    pub fn emit(&mut self, event: HostEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn load_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::Load { .. }))
            .count()
    }

    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.mutations += 1;
        }
        changed
    }

    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            attributes: self.attributes.clone(),
            style: self.style.clone(),
            content: self.content.clone(),
            busy: self.busy,
            loaded: self.loaded,
            events: self.events.clone(),
        }
    }

    /// Serialize with a declarative shadow root.
    pub fn to_html(&self) -> String {
        let mut out = format!("<{TAG}");
        for (name, value) in &self.attributes {
            if value.is_empty() {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
            }
        }
        if !self.style.is_empty() {
            let style = self
                .style
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(";");
            let _ = write!(out, " style=\"{}\"", escape_attr(&style));
        }
        out.push_str("><template shadowrootmode=\"open\">");
        self.write_content(&mut out);
        out.push_str("</template>");
        if let Some(inner) = &self.inner_markup {
            out.push_str(inner);
        }
        let _ = write!(out, "</{TAG}>");
        out
    }

    fn write_content(&self, out: &mut String) {
        match &self.content {
            ShadowContent::Empty => {}
            ShadowContent::Slide {
                markup,
                placement,
                scale,
            } => {
                let position = match placement {
                    Placement::Offscreen => "position:absolute;left:-100000px;top:0",
                    Placement::Flow => "position:relative",
                };
                let _ = write!(
                    out,
                    "<div part=\"viewport\" style=\"{position};transform:scale({scale});transform-origin:0 0\">{markup}</div>"
                );
            }
            ShadowContent::Canvas { raster } => {
                let _ = write!(
                    out,
                    "<canvas part=\"page\" width=\"{}\" height=\"{}\" data-page=\"{}\" data-scale=\"{}\"></canvas>",
                    raster.width, raster.height, raster.page, raster.scale
                );
            }
            ShadowContent::Fallback { markup } => out.push_str(markup),
        }
    }
}

/// Two decimals is plenty for a CSS px length.
fn round_px(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
