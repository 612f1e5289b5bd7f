//! Rendered rasters and Pixel Buffer Encoding

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Weak};

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::buffer::ScratchBuffer;
use crate::context::Context;
use crate::engine::{Engine, MupdfEngine};
use crate::envelope::Envelope;
use crate::error::{BoundaryError, Result};
use crate::ledger::{ResourceKind, Tracked};
use crate::store::RasterKey;

/// Bounds of the JPEG quality scale; other values are clamped into range
pub const JPEG_QUALITY_MIN: u8 = 1;
pub const JPEG_QUALITY_MAX: u8 = 100;

/// Raw RGB(A) samples, row-major, no padding between rows
#[derive(Clone, PartialEq, Eq)]
pub struct PixelData {
    width: u32,
    height: u32,
    components: u8,
    samples: Arc<[u8]>,
}

impl PixelData {
    /// Wrap samples produced by an engine.
    ///
    /// `components` must be 3 (RGB) or 4 (RGBA) and `samples` must hold
    /// exactly `width * height * components` bytes.
    pub fn new(width: u32, height: u32, components: u8, samples: Vec<u8>) -> Result<Self> {
        if components != 3 && components != 4 {
            return Err(BoundaryError::Engine(format!(
                "unsupported pixel layout: {} components",
                components
            )));
        }

        let expected = width as usize * height as usize * components as usize;
        if samples.len() != expected {
            return Err(BoundaryError::Engine(format!(
                "pixmap holds {} bytes, expected {} for {}x{}x{}",
                samples.len(),
                expected,
                width,
                height,
                components
            )));
        }

        Ok(Self {
            width,
            height,
            components,
            samples: samples.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Components per pixel (3 or 4)
    pub fn components(&self) -> u8 {
        self.components
    }

    pub fn has_alpha(&self) -> bool {
        self.components == 4
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Sample bytes held
    pub fn byte_len(&self) -> usize {
        self.samples.len()
    }

    pub(crate) fn downgrade(&self) -> Weak<[u8]> {
        Arc::downgrade(&self.samples)
    }

    /// Rebuild pixel data around samples another holder still keeps alive
    pub(crate) fn from_shared(width: u32, height: u32, components: u8, samples: Arc<[u8]>) -> Self {
        Self {
            width,
            height,
            components,
            samples,
        }
    }

    /// True when no other pixmap shares these samples
    pub(crate) fn is_sole_holder(&self) -> bool {
        Arc::strong_count(&self.samples) == 1
    }

    /// RGB samples with any alpha channel stripped
    pub(crate) fn to_rgb(&self) -> Vec<u8> {
        if !self.has_alpha() {
            return self.samples.to_vec();
        }

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.samples.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        rgb
    }
}

impl fmt::Debug for PixelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

/// Rendered page raster owned by the caller.
///
/// Pixels never borrow from the page they were rendered from; the page may
/// be dropped first. Dropping the last pixmap of a raster frees its samples
/// and removes it from the context store.
pub struct Pixmap<'ctx, E: Engine = MupdfEngine> {
    ctx: &'ctx Context<E>,
    data: PixelData,
    key: Option<RasterKey>,
    _tracked: Tracked,
}

impl<'ctx, E: Engine> Pixmap<'ctx, E> {
    pub(crate) fn new(
        ctx: &'ctx Context<E>,
        data: PixelData,
        key: Option<RasterKey>,
        tracked: Tracked,
    ) -> Self {
        Self {
            ctx,
            data,
            key,
            _tracked: tracked,
        }
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.data.has_alpha()
    }

    pub fn samples(&self) -> &[u8] {
        self.data.samples()
    }

    pub fn pixels(&self) -> &PixelData {
        &self.data
    }

    pub(crate) fn context_id(&self) -> u64 {
        self.ctx.id()
    }
}

impl<E: Engine> Drop for Pixmap<'_, E> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.ctx.release_raster(&key, &self.data);
        }
    }
}

impl<E: Engine> fmt::Debug for Pixmap<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pixmap")
            .field("context", &self.ctx.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("alpha", &self.has_alpha())
            .finish()
    }
}

/// Map a caller quality onto the encoder's `1..=100` scale.
fn jpeg_quality(quality: i32) -> u8 {
    quality.clamp(JPEG_QUALITY_MIN as i32, JPEG_QUALITY_MAX as i32) as u8
}

/// Encode `data` as baseline JPEG into `out`. Alpha is dropped.
fn encode_jpeg<W: Write>(data: &PixelData, quality: i32, out: W) -> Result<()> {
    let rgb = RgbImage::from_raw(data.width(), data.height(), data.to_rgb())
        .ok_or_else(|| BoundaryError::Encode("failed to create image buffer".to_string()))?;

    JpegEncoder::new_with_quality(out, jpeg_quality(quality)).encode_image(&rgb)?;
    Ok(())
}

impl<E: Engine> Context<E> {
    /// Encode `pix` as JPEG. The bytes are owned by the caller.
    pub fn pixmap_as_jpeg_bytes(&self, pix: &Pixmap<'_, E>, quality: i32) -> Envelope<Vec<u8>> {
        self.attempt("pixmap_as_jpeg_bytes", || {
            self.ensure_owns(pix.context_id())?;

            let mut out = ScratchBuffer::new(self.track(ResourceKind::Buffer));
            encode_jpeg(pix.pixels(), quality, &mut out)?;
            debug!(bytes = out.len(), quality, "pixmap encoded");
            Ok(out.into_bytes())
        })
    }

    /// Encode `pix` as JPEG and write it to `path`.
    ///
    /// The image is encoded in memory and written to a temporary file next to
    /// `path`, which then replaces `path`. On failure `path` is left as it
    /// was and the temporary file is removed.
    pub fn save_pixmap_as_jpeg(
        &self,
        pix: &Pixmap<'_, E>,
        quality: i32,
        path: impl AsRef<Path>,
    ) -> Envelope<()> {
        let path = path.as_ref();
        self.attempt("save_pixmap_as_jpeg", || {
            self.ensure_owns(pix.context_id())?;

            let mut out = ScratchBuffer::new(self.track(ResourceKind::Buffer));
            encode_jpeg(pix.pixels(), quality, &mut out)?;
            let bytes = out.into_bytes();

            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut staged = NamedTempFile::new_in(dir)?;
            staged.write_all(&bytes)?;
            staged.flush()?;
            staged.persist(path).map_err(|e| BoundaryError::Io(e.error))?;

            debug!(path = %path.display(), bytes = bytes.len(), quality, "pixmap saved");
            Ok(())
        })
    }
}
