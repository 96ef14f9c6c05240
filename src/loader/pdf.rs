//! PDF backend contract and the lopdf-based default.
//!
//! The core only needs: open bytes, count pages, get one page's geometry in
//! points, and draw a page at an explicit scale. Drawing produces a [`Raster`]
//! description the host paints.

use std::fmt;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use super::LoadError;
use crate::core::{BoxFuture, Size};

/// Fallback page geometry (US Letter) when no MediaBox is found.
const LETTER_PT: Size = Size::new(612.0, 792.0);

pub trait PdfEngine: Send + Sync {
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, LoadError>;
}

pub trait PdfDocument: Send + Sync + fmt::Debug {
    fn page_count(&self) -> u32;

    /// 1-based page lookup.
    fn page(&self, number: u32) -> Option<Arc<dyn PdfPage>>;
}

pub trait PdfPage: Send + Sync + fmt::Debug {
    fn number(&self) -> u32;

    /// Page size in PDF points.
    fn size_pt(&self) -> Size;

    /// Draw the page at `scale`. Not incremental: every call redraws.
    fn render(&self, scale: f64) -> BoxFuture<'_, Result<Raster, LoadError>>;
}

/// A drawn page: pixel size at the given scale plus its display list length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raster {
    pub page: u32,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub operations: usize,
}

impl Raster {
    /// Pixel extent of a page of `size_pt` drawn at `scale`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn extent(size_pt: Size, scale: f64) -> (u32, u32) {
        (
            (size_pt.width * scale).ceil().max(0.0) as u32,
            (size_pt.height * scale).ceil().max(0.0) as u32,
        )
    }
}

// =============================================================================
// lopdf backend
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfEngine;

impl PdfEngine for LopdfEngine {
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, LoadError> {
        let doc = Document::load_mem(&bytes).map_err(|e| LoadError::Pdf(e.to_string()))?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(LoadError::Pdf("document has no pages".into()));
        }
        Ok(Arc::new(LopdfDocument {
            doc: Arc::new(doc),
            pages,
        }))
    }
}

struct LopdfDocument {
    doc: Arc<Document>,
    pages: Vec<ObjectId>,
}

impl fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl PdfDocument for LopdfDocument {
    #[allow(clippy::cast_possible_truncation)]
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Option<Arc<dyn PdfPage>> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        let id = *self.pages.get(index)?;
        let size = media_box(&self.doc, id).unwrap_or(LETTER_PT);
        Some(Arc::new(LopdfPage {
            doc: Arc::clone(&self.doc),
            id,
            number,
            size,
        }))
    }
}

struct LopdfPage {
    doc: Arc<Document>,
    id: ObjectId,
    number: u32,
    size: Size,
}

impl fmt::Debug for LopdfPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LopdfPage")
            .field("number", &self.number)
            .field("size", &self.size)
            .finish()
    }
}

impl PdfPage for LopdfPage {
    fn number(&self) -> u32 {
        self.number
    }

    fn size_pt(&self) -> Size {
        self.size
    }

    fn render(&self, scale: f64) -> BoxFuture<'_, Result<Raster, LoadError>> {
        Box::pin(async move {
            let content = self
                .doc
                .get_page_content(self.id)
                .map_err(|e| LoadError::Render(format!("page {}: {e}", self.number)))?;
            let operations = lopdf::content::Content::decode(&content)
                .map_err(|e| LoadError::Render(format!("page {}: {e}", self.number)))?
                .operations
                .len();
            let (width, height) = Raster::extent(self.size, scale);
            Ok(Raster {
                page: self.number,
                scale,
                width,
                height,
                operations,
            })
        })
    }
}

/// MediaBox of a page, following `Parent` links for inherited values.
fn media_box(doc: &Document, page: ObjectId) -> Option<Size> {
    let mut dict: &Dictionary = doc.get_dictionary(page).ok()?;
    // Page trees are shallow; the bound guards against cycles.
    for _ in 0..32 {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return rect_size(doc, obj);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rect_size(doc: &Document, obj: &Object) -> Option<Size> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values = obj.as_array().ok()?;
    if values.len() < 4 {
        return None;
    }
    let nums: Vec<f64> = values.iter().take(4).filter_map(number).collect();
    let [x1, y1, x2, y2] = nums.as_slice() else {
        return None;
    };
    let size = Size::new((x2 - x1).abs(), (y2 - y1).abs());
    size.is_usable().then_some(size)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
