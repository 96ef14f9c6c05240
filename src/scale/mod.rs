//! Scaling engine.
//!
//! Fits a mounted slide into its target box (contain-fit, anchored top-left)
//! and keeps the host sized to that box.
//!
//! # Box derivation
//!
//! | requested        | target                                   |
//! |------------------|------------------------------------------|
//! | width + height   | as given                                 |
//! | width only       | `width × aspect`                         |
//! | height only      | `height ÷ aspect`                        |
//! | neither          | default width, derived height            |
//!
//! `aspect` is the slide's intrinsic height/width, or the configured default
//! (16:9) while the slide has not been measured yet.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{RequestedBox, Size};
use crate::host::{HostElement, Placement, ShadowContent};
use crate::loader::{LoadError, PdfPage};

/// PDF geometry is in points; the host is in CSS pixels.
pub const PDF_UNIT_FACTOR: f64 = 72.0 / 96.0;

/// Two scales closer than this are the same scale.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSettings {
    pub default_width: f64,
    /// Height / width used before intrinsic size is known.
    pub fallback_aspect: f64,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            default_width: 300.0,
            fallback_aspect: 9.0 / 16.0,
        }
    }
}

/// Target box for a request, given an aspect ratio (height / width).
pub fn derive_box(requested: RequestedBox, aspect: f64, default_width: f64) -> Size {
    match (requested.width, requested.height) {
        (Some(w), Some(h)) => Size::new(w, h),
        (Some(w), None) => Size::new(w, w * aspect),
        (None, Some(h)) => Size::new(h / aspect, h),
        (None, None) => Size::new(default_width, default_width * aspect),
    }
}

/// Largest scale at which `intrinsic` fits inside `target` on both axes.
pub fn contain_scale(target: Size, intrinsic: Size) -> f64 {
    (target.width / intrinsic.width).min(target.height / intrinsic.height)
}

/// What the engine is currently showing.
#[derive(Debug, Clone)]
pub enum ActiveSlide {
    Html { intrinsic: Option<Size> },
    Pdf { page: Arc<dyn PdfPage> },
    Fallback { markup: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleOutcome {
    /// Nothing measurable is mounted yet; the box was remembered.
    Pending,
    /// Same scale and box as last time; the host was not touched.
    Unchanged,
    Applied { scale: f64, target: Size },
    Fallback,
}

/// Render-local state of one embed.
///
/// Owned behind the embed's render lock; only the holder mutates it.
#[derive(Debug, Default)]
pub struct Stage {
    slide: Option<ActiveSlide>,
    last: Option<(f64, Size)>,
    pending: Option<RequestedBox>,
    settings: ScaleSettings,
}

impl Stage {
    pub fn new(settings: ScaleSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn slide(&self) -> Option<&ActiveSlide> {
        self.slide.as_ref()
    }

    pub fn last_applied(&self) -> Option<(f64, Size)> {
        self.last
    }

    pub fn pending(&self) -> Option<RequestedBox> {
        self.pending
    }

    fn reset(&mut self, slide: ActiveSlide) {
        self.slide = Some(slide);
        self.last = None;
        self.pending = None;
    }

    /// Mount an HTML slide. Unmeasured slides go offscreen until measured.
    pub fn mount_html(&mut self, host: &Mutex<HostElement>, markup: String, intrinsic: Option<Size>) {
        self.reset(ActiveSlide::Html { intrinsic });
        let placement = if intrinsic.is_some() {
            Placement::Flow
        } else {
            Placement::Offscreen
        };
        host.lock().set_content(ShadowContent::Slide {
            markup,
            placement,
            scale: 1.0,
        });
    }

    pub fn mount_pdf(&mut self, host: &Mutex<HostElement>, page: Arc<dyn PdfPage>) {
        self.reset(ActiveSlide::Pdf { page });
        host.lock().clear_drawing();
    }

    pub fn mount_fallback(&mut self, markup: String) {
        self.reset(ActiveSlide::Fallback { markup });
    }

    /// Drop whatever is mounted and leave the host empty and auto-sized.
    pub fn unmount(&mut self, host: &Mutex<HostElement>) {
        self.slide = None;
        self.last = None;
        self.pending = None;
        let mut host = host.lock();
        host.set_content(ShadowContent::Empty);
        host.set_box_auto();
    }

    /// Record the measured size and move the slide back into flow.
    ///
    /// Returns the box remembered while the size was unknown.
    pub fn set_intrinsic(&mut self, host: &Mutex<HostElement>, size: Size) -> Option<RequestedBox> {
        if let Some(ActiveSlide::Html { intrinsic }) = &mut self.slide {
            *intrinsic = Some(size);
            host.lock().set_placement(Placement::Flow);
        }
        self.pending.take()
    }

    /// Fit the mounted slide into `requested`.
    ///
    /// PDF pages are redrawn from scratch on every effective change.
    pub async fn apply_box(
        &mut self,
        host: &Mutex<HostElement>,
        requested: RequestedBox,
    ) -> Result<ScaleOutcome, LoadError> {
        let settings = self.settings;
        let Some(slide) = self.slide.clone() else {
            self.pending = Some(requested);
            return Ok(ScaleOutcome::Pending);
        };

        match slide {
            ActiveSlide::Fallback { markup } => {
                let mut host = host.lock();
                host.set_box_auto();
                host.set_content(ShadowContent::Fallback { markup });
                self.last = None;
                Ok(ScaleOutcome::Fallback)
            }
            ActiveSlide::Html { intrinsic: None } => {
                self.pending = Some(requested);
                let provisional =
                    derive_box(requested, settings.fallback_aspect, settings.default_width);
                host.lock().set_box(provisional);
                Ok(ScaleOutcome::Pending)
            }
            ActiveSlide::Html {
                intrinsic: Some(intrinsic),
            } => {
                let target = derive_box(requested, intrinsic.aspect(), settings.default_width);
                let scale = contain_scale(target, intrinsic);
                if self.is_unchanged(scale, target) {
                    return Ok(ScaleOutcome::Unchanged);
                }

                let mut host = host.lock();
                host.set_slide_scale(scale);
                host.set_box(target);
                Ok(self.applied(scale, target))
            }
            ActiveSlide::Pdf { page } => {
                let size = page.size_pt();
                let target = derive_box(requested, size.aspect(), settings.default_width);
                let scale = contain_scale(target, size) * PDF_UNIT_FACTOR;
                if self.is_unchanged(scale, target) {
                    return Ok(ScaleOutcome::Unchanged);
                }

                host.lock().clear_drawing();
                let raster = page.render(scale).await?;
                crate::debug!("scale"; "page {} drawn at {:.4}", raster.page, scale);

                let mut host = host.lock();
                host.set_content(ShadowContent::Canvas { raster });
                host.set_box(target);
                Ok(self.applied(scale, target))
            }
        }
    }

    fn is_unchanged(&self, scale: f64, target: Size) -> bool {
        self.last.is_some_and(|(s, t)| {
            (s - scale).abs() < EPSILON
                && (t.width - target.width).abs() < EPSILON
                && (t.height - target.height).abs() < EPSILON
        })
    }

    fn applied(&mut self, scale: f64, target: Size) -> ScaleOutcome {
        self.last = Some((scale, target));
        ScaleOutcome::Applied { scale, target }
    }
}
