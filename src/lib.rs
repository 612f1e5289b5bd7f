//! MuPDF Envelope
//!
//! Boundary layer over the MuPDF document engine. Every operation returns a
//! tagged [`Envelope`]: a value on success, a single owned message on
//! failure. Intermediates acquired by a failed operation are released
//! before the envelope is returned; values returned on success are owned by
//! the caller.
//!
//! # Modules
//!
//! - `envelope`: Result Protocol (`Envelope`, attempt boundary, `Finally`)
//! - `context`: Context Lifecycle and the resource store
//! - `document`, `outline`: Document Lifecycle
//! - `page`: Page Lifecycle & Rasterization
//! - `text`: Text Extraction
//! - `pixmap`: Pixel Buffer Encoding
//! - `ffi`: C ABI surface
//!
//! # Example
//!
//! ```no_run
//! use mupdf_envelope::{new_context, STORE_DEFAULT};
//!
//! let ctx = new_context(STORE_DEFAULT).into_result()?;
//! let doc = ctx.open_document("book.pdf").into_result()?;
//! let page = ctx.load_page(&doc, 0).into_result()?;
//! let pix = ctx.render_page(&page, false, 2.0).into_result()?;
//! let jpeg = ctx.pixmap_as_jpeg_bytes(&pix, 85).into_result()?;
//! # let _ = jpeg;
//! # Ok::<(), mupdf_envelope::ErrorMessage>(())
//! ```

mod buffer;
mod store;

pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod ffi;
pub mod ledger;
pub mod logging;
pub mod outline;
pub mod page;
pub mod pixmap;
pub mod text;

pub use config::{ContextConfig, StoreLimit, STORE_DEFAULT, STORE_UNLIMITED};
pub use context::{new_context, Context};
pub use document::{Document, MetadataKey, METADATA_BUFFER_LEN};
pub use engine::{Engine, MupdfEngine, Point, Rect};
pub use envelope::{finally, Envelope, ErrorMessage, Finally};
pub use error::{BoundaryError, ErrorKind, Result};
pub use ledger::{LedgerSnapshot, ResourceKind};
pub use outline::{Outline, OutlineEntry};
pub use page::Page;
pub use pixmap::{PixelData, Pixmap};
pub use store::StoreStats;
pub use text::{FontFamily, FontStyle, FontWeight, StextFont, StructuredText, TextLayout, WritingMode};
