//! Box geometry shared by the extractor and the scaling engine.

use serde::Serialize;

/// Width/height pair in CSS pixels (or PDF points for page geometry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Height / width.
    #[inline]
    pub fn aspect(&self) -> f64 {
        self.height / self.width
    }

    /// Both sides finite and positive.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Target box as requested by attributes or layout. `None` means "derive".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestedBox {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl RequestedBox {
    pub const fn new(width: Option<f64>, height: Option<f64>) -> Self {
        Self { width, height }
    }
}
