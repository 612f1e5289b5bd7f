//! Page Lifecycle & Rasterization

use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::document::Document;
use crate::engine::{Engine, MupdfEngine, Rect};
use crate::envelope::Envelope;
use crate::error::{BoundaryError, Result};
use crate::ledger::{ResourceKind, Tracked};
use crate::pixmap::Pixmap;
use crate::store::RasterKey;

/// Loaded page handle; borrows the document it was loaded from
pub struct Page<'a, E: Engine = MupdfEngine> {
    doc: &'a Document<'a, E>,
    index: i32,
    inner: E::Page,
    _tracked: Tracked,
}

impl<'a, E: Engine> Page<'a, E> {
    /// Zero-based page index
    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn document(&self) -> &'a Document<'a, E> {
        self.doc
    }

    pub(crate) fn inner(&self) -> &E::Page {
        &self.inner
    }

    pub(crate) fn context_id(&self) -> u64 {
        self.doc.context_id()
    }
}

impl<E: Engine> fmt::Debug for Page<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("document", &self.doc.serial())
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn validate_zoom(zoom: f32) -> Result<()> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(BoundaryError::InvalidArgument(format!(
            "zoom must be a positive finite number, got {}",
            zoom
        )))
    }
}

impl<E: Engine> Context<E> {
    /// Load page `index` of `doc`; `index` must lie in `[0, page_count)`.
    pub fn load_page<'a>(&'a self, doc: &'a Document<'a, E>, index: i32) -> Envelope<Page<'a, E>> {
        self.attempt("load_page", || {
            self.ensure_owns(doc.context_id())?;

            let count = self.engine().page_count(doc.inner())?;
            if index < 0 || index >= count {
                return Err(BoundaryError::PageOutOfRange { index, count });
            }

            let tracked = self.track(ResourceKind::Page);
            let inner = self.engine().load_page(doc.inner(), index)?;
            debug!(document = doc.serial(), index, "page loaded");
            Ok(Page {
                doc,
                index,
                inner,
                _tracked: tracked,
            })
        })
    }

    /// Page rectangle in points at zoom 1.0
    pub fn page_bounds(&self, page: &Page<'_, E>) -> Envelope<Rect> {
        self.attempt("page_bounds", || {
            self.ensure_owns(page.context_id())?;
            self.engine().page_bounds(page.inner())
        })
    }

    /// Rasterize `page` into RGB with a uniform `zoom` scale.
    ///
    /// `alpha` selects whether the raster carries an alpha channel. A repeat
    /// render while an earlier pixmap of the same raster is alive may be
    /// served from the context's store; the pixels are the same either way.
    pub fn render_page(&self, page: &Page<'_, E>, alpha: bool, zoom: f32) -> Envelope<Pixmap<'_, E>> {
        self.attempt("render_page", || {
            self.ensure_owns(page.context_id())?;
            validate_zoom(zoom)?;

            let key = RasterKey::new(page.doc.serial(), page.index, zoom, alpha);
            let tracked = self.track(ResourceKind::Pixmap);

            let cached = self.store_mut().get(&key);
            let data = match cached {
                Some(data) => data,
                None => {
                    let data = self.engine().rasterize(page.inner(), zoom, alpha)?;
                    self.store_mut().put(key, &data);
                    data
                }
            };

            debug!(
                document = key.document,
                page = key.page,
                width = data.width(),
                height = data.height(),
                "page rendered"
            );
            Ok(Pixmap::new(self, data, Some(key), tracked))
        })
    }
}
