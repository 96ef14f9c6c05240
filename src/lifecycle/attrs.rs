//! Canonical attribute state.
//!
//! Two adapters feed one validated setter: string attributes
//! ([`Change::from_attribute`]) and typed properties (the `set_*` methods on
//! `SlideEmbed`). Invalid input reverts to the default silently.

use url::Url;

use crate::core::{RequestedBox, SlideRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    Src,
    Width,
    Height,
    Type,
}

impl Attr {
    pub const ALL: [Attr; 4] = [Attr::Src, Attr::Width, Attr::Height, Attr::Type];

    pub fn name(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Width => "width",
            Self::Height => "height",
            Self::Type => "type",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Only the target box changed; no refetch needed.
    pub fn is_box(self) -> bool {
        matches!(self, Self::Width | Self::Height)
    }
}

/// One write to the canonical state. `None` means "reset to default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Source(String),
    Width(Option<u32>),
    Height(Option<u32>),
    ContentType(Option<String>),
}

impl Change {
    pub fn attr(&self) -> Attr {
        match self {
            Self::Source(_) => Attr::Src,
            Self::Width(_) => Attr::Width,
            Self::Height(_) => Attr::Height,
            Self::ContentType(_) => Attr::Type,
        }
    }

    /// Attribute adapter: string (or removed) attribute value to a change.
    pub fn from_attribute(attr: Attr, value: Option<&str>) -> Self {
        match attr {
            Attr::Src => Self::Source(value.unwrap_or_default().to_string()),
            Attr::Width => Self::Width(value.and_then(parse_px)),
            Attr::Height => Self::Height(value.and_then(parse_px)),
            Attr::Type => Self::ContentType(value.map(str::to_string)),
        }
    }
}

/// `"500"` or `"500px"`; positive integers only.
fn parse_px(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let digits = raw.strip_suffix("px").unwrap_or(raw).trim();
    digits.parse::<u32>().ok().filter(|v| *v > 0)
}

#[derive(Debug, Clone)]
pub struct Attributes {
    base: Url,
    default_width: u32,
    source: SlideRef,
    width: u32,
    height: Option<u32>,
    content_type: Option<String>,
}

impl Attributes {
    pub fn new(base: Url, default_width: u32) -> Self {
        Self {
            source: SlideRef::from_url(base.clone()),
            base,
            default_width,
            width: default_width,
            height: None,
            content_type: None,
        }
    }

    /// Apply a change. Returns whether the canonical value changed.
    pub fn apply(&mut self, change: Change) -> bool {
        match change {
            Change::Source(src) => {
                let source = self.resolve(&src);
                replace(&mut self.source, source)
            }
            Change::Width(width) => {
                let width = width.filter(|w| *w > 0).unwrap_or(self.default_width);
                replace(&mut self.width, width)
            }
            Change::Height(height) => replace(&mut self.height, height.filter(|h| *h > 0)),
            Change::ContentType(ty) => {
                let ty = ty.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
                replace(&mut self.content_type, ty)
            }
        }
    }

    /// Invalid or empty sources fall back to the base URL.
    fn resolve(&self, src: &str) -> SlideRef {
        if src.trim().is_empty() {
            return SlideRef::from_url(self.base.clone());
        }
        SlideRef::resolve(src, &self.base).unwrap_or_else(|_| SlideRef::from_url(self.base.clone()))
    }

    /// Canonical value as reflected back onto the host attribute.
    pub fn reflected(&self, attr: Attr) -> Option<String> {
        match attr {
            Attr::Src => Some(self.source.source().to_string()),
            Attr::Width => Some(self.width.to_string()),
            Attr::Height => self.height.map(|h| h.to_string()),
            Attr::Type => self.content_type.clone(),
        }
    }

    pub fn source(&self) -> &SlideRef {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn requested_box(&self) -> RequestedBox {
        RequestedBox::new(
            Some(f64::from(self.width)),
            self.height.map(f64::from),
        )
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
