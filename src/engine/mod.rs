//! Engine seam
//!
//! The boundary layer never talks to MuPDF directly; it sequences calls
//! through [`Engine`]. Implementations report failures as
//! [`BoundaryError`](crate::BoundaryError) values and must not retain anything past the call
//! except the handles they return.
//!
//! [`MupdfEngine`] is the production backend.

mod fitz;
#[cfg(test)]
pub(crate) mod scripted;

use serde::{Deserialize, Serialize};

pub use self::fitz::MupdfEngine;

use crate::config::ContextConfig;
use crate::document::MetadataKey;
use crate::error::Result;
use crate::outline::OutlineEntry;
use crate::pixmap::PixelData;
use crate::text::StructuredText;

/// Document engine operations used by the boundary
pub trait Engine {
    /// Engine-owned document object
    type Document;
    /// Engine-owned page object
    type Page;

    /// Bring the engine up and register every document format handler.
    fn initialize(&mut self, config: &ContextConfig) -> Result<()>;

    fn open_document(&self, path: &str) -> Result<Self::Document>;

    fn page_count(&self, doc: &Self::Document) -> Result<i32>;

    /// Outline tree; an absent outline is an empty vector.
    fn outline(&self, doc: &Self::Document) -> Result<Vec<OutlineEntry>>;

    /// Metadata value; an absent key yields an empty string.
    fn metadata(&self, doc: &Self::Document, key: MetadataKey) -> Result<String>;

    fn load_page(&self, doc: &Self::Document, index: i32) -> Result<Self::Page>;

    fn page_bounds(&self, page: &Self::Page) -> Result<Rect>;

    /// Rasterize with a uniform `zoom` scale into RGB, optionally with alpha.
    fn rasterize(&self, page: &Self::Page, zoom: f32, alpha: bool) -> Result<PixelData>;

    fn structured_text(&self, page: &Self::Page) -> Result<StructuredText>;
}

/// Point in page space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}
