//! MuPDF backend
//!
//! Thin adapter over the `mupdf` crate. Every engine error is converted into
//! a [`BoundaryError`] here; nothing from `mupdf` leaks past this module
//! except the document and page objects held inside handles.

use mupdf::{Colorspace, Matrix, MetadataName, TextPageOptions, WriteMode};
use tracing::debug;

use super::{Engine, Point, Rect};
use crate::config::ContextConfig;
use crate::document::MetadataKey;
use crate::error::{BoundaryError, Result};
use crate::outline::OutlineEntry;
use crate::pixmap::PixelData;
use crate::text::{StextBlock, StextChar, StextFont, StextLine, StructuredText, WritingMode};

/// Production engine backed by MuPDF
#[derive(Debug, Default)]
pub struct MupdfEngine {
    _private: (),
}

impl From<mupdf::Rect> for Rect {
    fn from(r: mupdf::Rect) -> Self {
        Rect::new(r.x0, r.y0, r.x1, r.y1)
    }
}

impl From<MetadataKey> for MetadataName {
    fn from(key: MetadataKey) -> Self {
        match key {
            MetadataKey::Format => MetadataName::Format,
            MetadataKey::Encryption => MetadataName::Encryption,
            MetadataKey::Author => MetadataName::Author,
            MetadataKey::Title => MetadataName::Title,
            MetadataKey::Producer => MetadataName::Producer,
            MetadataKey::Creator => MetadataName::Creator,
            MetadataKey::CreationDate => MetadataName::CreationDate,
            MetadataKey::ModDate => MetadataName::ModDate,
            MetadataKey::Subject => MetadataName::Subject,
            MetadataKey::Keywords => MetadataName::Keywords,
        }
    }
}

fn convert_outline(outlines: &[mupdf::Outline]) -> Vec<OutlineEntry> {
    outlines
        .iter()
        .map(|outline| OutlineEntry {
            title: outline.title.clone(),
            uri: outline.uri.clone().filter(|uri| !uri.is_empty()),
            page: outline.page.map(|p| p as u32),
            x: outline.x,
            y: outline.y,
            children: convert_outline(&outline.down),
        })
        .collect()
}

impl Engine for MupdfEngine {
    type Document = mupdf::Document;
    type Page = mupdf::Page;

    fn initialize(&mut self, config: &ContextConfig) -> Result<()> {
        // brings up the thread's fz_context and its document handlers.
        // The store limit is enforced by ResourceStore, not by the engine.
        let _rgb = Colorspace::device_rgb();
        debug!(store = ?config.store, "mupdf engine ready");
        Ok(())
    }

    fn open_document(&self, path: &str) -> Result<Self::Document> {
        mupdf::Document::open(path).map_err(|e| BoundaryError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn page_count(&self, doc: &Self::Document) -> Result<i32> {
        Ok(doc.page_count()?)
    }

    fn outline(&self, doc: &Self::Document) -> Result<Vec<OutlineEntry>> {
        let outlines = doc.outlines()?;
        Ok(convert_outline(&outlines))
    }

    fn metadata(&self, doc: &Self::Document, key: MetadataKey) -> Result<String> {
        Ok(doc.metadata(key.into())?)
    }

    fn load_page(&self, doc: &Self::Document, index: i32) -> Result<Self::Page> {
        Ok(doc.load_page(index)?)
    }

    fn page_bounds(&self, page: &Self::Page) -> Result<Rect> {
        Ok(page.bounds()?.into())
    }

    fn rasterize(&self, page: &Self::Page, zoom: f32, alpha: bool) -> Result<PixelData> {
        let matrix = Matrix::new_scale(zoom, zoom);
        let colorspace = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&matrix, &colorspace, alpha, true)?;

        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let n = pixmap.n() as usize;
        let row = width as usize * n;
        let samples = pixmap.samples();

        // Rows may be padded past width * n; copy them tightly packed.
        let stride = if height == 0 { row } else { samples.len() / height as usize };
        let mut packed = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            let line = samples.get(start..start + row).ok_or_else(|| {
                BoundaryError::Engine(format!("pixmap row {} out of bounds", y))
            })?;
            packed.extend_from_slice(line);
        }

        PixelData::new(width, height, n as u8, packed)
    }

    fn structured_text(&self, page: &Self::Page) -> Result<StructuredText> {
        let text_page = page.to_text_page(TextPageOptions::empty())?;
        let mut blocks = Vec::new();

        for block in text_page.blocks() {
            let mut lines = Vec::new();

            for line in block.lines() {
                let chars = line
                    .chars()
                    .filter_map(|ch| {
                        let c = ch.char()?;
                        let quad = ch.quad();
                        Some(StextChar {
                            c,
                            origin: Point::new(quad.ll.x, quad.ll.y),
                            size: ch.size(),
                        })
                    })
                    .collect();

                let wmode = match line.wmode() {
                    WriteMode::Horizontal => WritingMode::Horizontal,
                    WriteMode::Vertical => WritingMode::Vertical,
                };

                // TextChar exposes no font in mupdf 0.5
                lines.push(StextLine {
                    bbox: line.bounds().into(),
                    wmode,
                    font: StextFont::default(),
                    chars,
                });
            }

            blocks.push(StextBlock {
                bbox: block.bounds().into(),
                lines,
            });
        }

        Ok(StructuredText { blocks })
    }
}
