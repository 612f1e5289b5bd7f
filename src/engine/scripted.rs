//! Scripted engine for unit tests
//!
//! Produces deterministic documents and can fail or panic at any chosen
//! step, so the boundary's cleanup paths can be driven without MuPDF.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Engine, Rect};
use crate::config::ContextConfig;
use crate::document::MetadataKey;
use crate::error::{BoundaryError, Result};
use crate::outline::OutlineEntry;
use crate::pixmap::PixelData;
use crate::text::StructuredText;

/// Engine call that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Step {
    Initialize,
    Open,
    PageCount,
    Outline,
    Metadata,
    LoadPage,
    Bounds,
    Rasterize,
    StructuredText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Fail,
    Panic,
}

#[derive(Debug)]
pub(crate) struct ScriptedDocument {
    path: String,
}

#[derive(Debug)]
pub(crate) struct ScriptedPage {
    index: usize,
}

#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    faults: HashMap<Step, Fault>,
    pages: Vec<(f32, f32)>,
    metadata: HashMap<MetadataKey, String>,
    outline: Vec<OutlineEntry>,
    text: HashMap<usize, StructuredText>,
    rasterize_calls: Rc<Cell<usize>>,
}

impl ScriptedEngine {
    /// One US Letter page, no metadata, no outline, no text
    pub(crate) fn new() -> Self {
        Self {
            faults: HashMap::new(),
            pages: vec![(612.0, 792.0)],
            metadata: HashMap::new(),
            outline: Vec::new(),
            text: HashMap::new(),
            rasterize_calls: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn failing(mut self, step: Step) -> Self {
        self.faults.insert(step, Fault::Fail);
        self
    }

    pub(crate) fn panicking(mut self, step: Step) -> Self {
        self.faults.insert(step, Fault::Panic);
        self
    }

    /// Page sizes in points
    pub(crate) fn with_pages(mut self, pages: Vec<(f32, f32)>) -> Self {
        self.pages = pages;
        self
    }

    pub(crate) fn with_metadata(mut self, key: MetadataKey, value: &str) -> Self {
        self.metadata.insert(key, value.to_string());
        self
    }

    pub(crate) fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }

    pub(crate) fn with_text(mut self, page: usize, text: StructuredText) -> Self {
        self.text.insert(page, text);
        self
    }

    /// Shared counter of engine rasterizations
    pub(crate) fn rasterize_calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.rasterize_calls)
    }

    fn step(&self, step: Step) -> Result<()> {
        match self.faults.get(&step) {
            None => Ok(()),
            Some(Fault::Fail) => Err(BoundaryError::Engine(format!("scripted failure at {:?}", step))),
            Some(Fault::Panic) => panic!("scripted panic at {:?}", step),
        }
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| BoundaryError::Engine(format!("page {} missing", index)))
    }
}

impl Engine for ScriptedEngine {
    type Document = ScriptedDocument;
    type Page = ScriptedPage;

    fn initialize(&mut self, _config: &ContextConfig) -> Result<()> {
        self.step(Step::Initialize)
    }

    fn open_document(&self, path: &str) -> Result<Self::Document> {
        self.step(Step::Open).map_err(|e| BoundaryError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(ScriptedDocument {
            path: path.to_string(),
        })
    }

    fn page_count(&self, _doc: &Self::Document) -> Result<i32> {
        self.step(Step::PageCount)?;
        Ok(self.pages.len() as i32)
    }

    fn outline(&self, _doc: &Self::Document) -> Result<Vec<OutlineEntry>> {
        self.step(Step::Outline)?;
        Ok(self.outline.clone())
    }

    fn metadata(&self, doc: &Self::Document, key: MetadataKey) -> Result<String> {
        self.step(Step::Metadata)?;
        Ok(match key {
            MetadataKey::Format => self
                .metadata
                .get(&key)
                .cloned()
                .unwrap_or_else(|| format!("scripted ({})", doc.path)),
            _ => self.metadata.get(&key).cloned().unwrap_or_default(),
        })
    }

    fn load_page(&self, _doc: &Self::Document, index: i32) -> Result<Self::Page> {
        self.step(Step::LoadPage)?;
        let index = index as usize;
        self.page_size(index)?;
        Ok(ScriptedPage { index })
    }

    fn page_bounds(&self, page: &Self::Page) -> Result<Rect> {
        self.step(Step::Bounds)?;
        let (w, h) = self.page_size(page.index)?;
        Ok(Rect::new(0.0, 0.0, w, h))
    }

    fn rasterize(&self, page: &Self::Page, zoom: f32, alpha: bool) -> Result<PixelData> {
        self.step(Step::Rasterize)?;
        self.rasterize_calls.set(self.rasterize_calls.get() + 1);

        let (w, h) = self.page_size(page.index)?;
        let width = (w * zoom).round() as u32;
        let height = (h * zoom).round() as u32;
        let n: u8 = if alpha { 4 } else { 3 };

        let mut samples = Vec::with_capacity(width as usize * height as usize * n as usize);
        for y in 0..height {
            for x in 0..width {
                let shade = ((x + y + page.index as u32 * 7) % 251) as u8;
                samples.extend_from_slice(&[shade, shade / 2, 255 - shade]);
                if alpha {
                    samples.push(255);
                }
            }
        }

        PixelData::new(width, height, n, samples)
    }

    fn structured_text(&self, page: &Self::Page) -> Result<StructuredText> {
        self.step(Step::StructuredText)?;
        Ok(self.text.get(&page.index).cloned().unwrap_or_default())
    }
}
