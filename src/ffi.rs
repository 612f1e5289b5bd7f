//! C ABI boundary
//!
//! Every `mupdf_env_*` function returns an envelope: `status` says which
//! union member of `value` is live. On failure `value.err` is a NUL
//! terminated message owned by the caller (free it with
//! [`mupdf_env_string_free`]) and `kind` carries the [`ErrorKind`](crate::ErrorKind)
//! discriminant. No panic crosses this boundary.
//!
//! Handles are opaque pointers. A document must be dropped before its
//! context, a page before its document, a pixmap before its context.
//! MuPDF keeps its context per thread: a context and every handle derived
//! from it must be used and dropped on the thread that created the context.

use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use crate::context::Context;
use crate::document::Document;
use crate::engine::MupdfEngine;
use crate::envelope::{panic_message, ErrorMessage};
use crate::error::BoundaryError;
use crate::logging;
use crate::outline::Outline;
use crate::page::Page;
use crate::pixmap::Pixmap;

pub type EnvContext = Context<MupdfEngine>;
pub type EnvDocument = Document<'static, MupdfEngine>;
pub type EnvPage = Page<'static, MupdfEngine>;
pub type EnvPixmap = Pixmap<'static, MupdfEngine>;

/// Live member selected by [`EnvResult::status`]
#[repr(C)]
#[derive(Clone, Copy)]
pub union EnvValue<T: Copy> {
    pub ok: T,
    pub err: *mut c_char,
}

/// Tagged result of a value-returning call
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EnvResult<T: Copy> {
    pub status: bool,
    /// `0` on success, an [`ErrorKind`](crate::ErrorKind) discriminant otherwise
    pub kind: u32,
    pub value: EnvValue<T>,
}

/// Tagged result of a call with no value
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EnvStatus {
    pub status: bool,
    pub kind: u32,
    pub error: *mut c_char,
}

/// Caller-owned byte buffer; release with [`mupdf_env_bytes_free`]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EnvBytes {
    pub data: *mut u8,
    pub len: usize,
}

impl EnvBytes {
    fn from_vec(bytes: Vec<u8>) -> Self {
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        let data = Box::into_raw(boxed) as *mut u8;
        Self { data, len }
    }
}

type Outcome<T> = std::result::Result<T, ErrorMessage>;

fn c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', " "))
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

fn guarded<T>(f: impl FnOnce() -> Outcome<T>) -> Outcome<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(BoundaryError::Panic(panic_message(payload.as_ref())).into()))
}

fn boundary<T: Copy>(f: impl FnOnce() -> Outcome<T>) -> EnvResult<T> {
    match guarded(f) {
        Ok(value) => EnvResult {
            status: true,
            kind: 0,
            value: EnvValue { ok: value },
        },
        Err(message) => EnvResult {
            status: false,
            kind: message.kind() as u32,
            value: EnvValue {
                err: c_string(message.message()),
            },
        },
    }
}

fn boundary_status(f: impl FnOnce() -> Outcome<()>) -> EnvStatus {
    match guarded(f) {
        Ok(()) => EnvStatus {
            status: true,
            kind: 0,
            error: ptr::null_mut(),
        },
        Err(message) => EnvStatus {
            status: false,
            kind: message.kind() as u32,
            error: c_string(message.message()),
        },
    }
}

fn invalid(what: &str) -> ErrorMessage {
    BoundaryError::InvalidArgument(format!("{} is null", what)).into()
}

/// # Safety
/// `ptr` must be null or point to a live `T` that outlives every use of the
/// returned reference.
unsafe fn handle<T>(ptr: *const T, what: &str) -> Outcome<&'static T> {
    ptr.as_ref().ok_or_else(|| invalid(what))
}

/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn utf8_arg<'a>(ptr: *const c_char, what: &str) -> Outcome<&'a str> {
    if ptr.is_null() {
        return Err(invalid(what));
    }
    CStr::from_ptr(ptr).to_str().map_err(|e| {
        BoundaryError::InvalidArgument(format!("{} is not valid UTF-8: {}", what, e)).into()
    })
}

/// Install the tracing subscriber. Returns `false` if one was already set.
#[no_mangle]
pub extern "C" fn mupdf_env_init_logging() -> bool {
    logging::init()
}

#[no_mangle]
pub extern "C" fn mupdf_env_new_context(max_store_bytes: usize) -> EnvResult<*mut EnvContext> {
    boundary(|| {
        let ctx = Context::new(max_store_bytes).into_result()?;
        Ok(Box::into_raw(Box::new(ctx)))
    })
}

/// # Safety
/// `ctx` must be null or a context from [`mupdf_env_new_context`] whose
/// documents and pixmaps have all been dropped.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_drop_context(ctx: *mut EnvContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_context_live_resources(ctx: *const EnvContext) -> usize {
    ctx.as_ref().map_or(0, Context::live_resources)
}

/// # Safety
/// `ctx` must be a live context; `path` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_open_document(
    ctx: *const EnvContext,
    path: *const c_char,
) -> EnvResult<*mut EnvDocument> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let path = utf8_arg(path, "path")?;
        let doc = ctx.open_document(path).into_result()?;
        Ok(Box::into_raw(Box::new(doc)))
    })
}

/// # Safety
/// `doc` must be null or a document from [`mupdf_env_open_document`] with
/// no live pages.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_drop_document(doc: *mut EnvDocument) {
    if !doc.is_null() {
        drop(Box::from_raw(doc));
    }
}

/// # Safety
/// `ctx` and `doc` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_page_count(
    ctx: *const EnvContext,
    doc: *const EnvDocument,
) -> EnvResult<i32> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let doc = handle(doc, "document")?;
        ctx.page_count(doc).into_result()
    })
}

/// # Safety
/// `ctx` and `doc` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_load_outline(
    ctx: *const EnvContext,
    doc: *const EnvDocument,
) -> EnvResult<*mut Outline> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let doc = handle(doc, "document")?;
        let outline = ctx.load_outline(doc).into_result()?;
        Ok(Box::into_raw(Box::new(outline)))
    })
}

/// Total number of outline entries, nested ones included
///
/// # Safety
/// `outline` must be null or a live outline.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_outline_count(outline: *const Outline) -> usize {
    outline.as_ref().map_or(0, Outline::len)
}

/// # Safety
/// `outline` must be a live outline.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_outline_to_json(outline: *const Outline) -> EnvResult<*mut c_char> {
    boundary(|| {
        let outline = handle(outline, "outline")?;
        let json = outline
            .to_json()
            .map_err(|e| ErrorMessage::from(BoundaryError::from(e)))?;
        Ok(c_string(&json))
    })
}

/// # Safety
/// `outline` must be null or an outline from [`mupdf_env_load_outline`].
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_drop_outline(outline: *mut Outline) {
    if !outline.is_null() {
        drop(Box::from_raw(outline));
    }
}

/// # Safety
/// `ctx` and `doc` must be live handles; `key` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_lookup_metadata(
    ctx: *const EnvContext,
    doc: *const EnvDocument,
    key: *const c_char,
) -> EnvResult<*mut c_char> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let doc = handle(doc, "document")?;
        let key = utf8_arg(key, "key")?;
        let value = ctx.lookup_metadata(doc, key).into_result()?;
        Ok(c_string(&value))
    })
}

/// # Safety
/// `ctx` and `doc` must be live handles; `doc` must outlive the page.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_load_page(
    ctx: *const EnvContext,
    doc: *const EnvDocument,
    index: i32,
) -> EnvResult<*mut EnvPage> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let doc = handle(doc, "document")?;
        let page = ctx.load_page(doc, index).into_result()?;
        Ok(Box::into_raw(Box::new(page)))
    })
}

/// # Safety
/// `page` must be null or a page from [`mupdf_env_load_page`].
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_drop_page(page: *mut EnvPage) {
    if !page.is_null() {
        drop(Box::from_raw(page));
    }
}

/// Rasterize a page. Any nonzero `alpha` requests an alpha channel.
///
/// # Safety
/// `ctx` and `page` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_render_page(
    ctx: *const EnvContext,
    page: *const EnvPage,
    alpha: f32,
    zoom: f32,
) -> EnvResult<*mut EnvPixmap> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let page = handle(page, "page")?;
        let pix = ctx.render_page(page, alpha != 0.0, zoom).into_result()?;
        Ok(Box::into_raw(Box::new(pix)))
    })
}

/// # Safety
/// `pix` must be null or a pixmap from [`mupdf_env_render_page`].
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_drop_pixmap(pix: *mut EnvPixmap) {
    if !pix.is_null() {
        drop(Box::from_raw(pix));
    }
}

/// # Safety
/// `pix` must be null or a live pixmap.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_pixmap_width(pix: *const EnvPixmap) -> u32 {
    pix.as_ref().map_or(0, Pixmap::width)
}

/// # Safety
/// `pix` must be null or a live pixmap.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_pixmap_height(pix: *const EnvPixmap) -> u32 {
    pix.as_ref().map_or(0, Pixmap::height)
}

/// Structured text as UTF-8 JSON bytes (not NUL-terminated)
///
/// # Safety
/// `ctx` and `page` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_page_as_json(
    ctx: *const EnvContext,
    page: *const EnvPage,
    scale: f32,
) -> EnvResult<EnvBytes> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let page = handle(page, "page")?;
        let json = ctx.page_as_json(page, scale).into_result()?;
        Ok(EnvBytes::from_vec(json.into_bytes()))
    })
}

/// Plain text as UTF-8 bytes (not NUL-terminated)
///
/// # Safety
/// `ctx` and `page` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_page_as_plain_text(
    ctx: *const EnvContext,
    page: *const EnvPage,
) -> EnvResult<EnvBytes> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let page = handle(page, "page")?;
        let text = ctx.page_as_plain_text(page).into_result()?;
        Ok(EnvBytes::from_vec(text.into_bytes()))
    })
}

/// # Safety
/// `ctx` and `pix` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_pixmap_as_jpeg_bytes(
    ctx: *const EnvContext,
    pix: *const EnvPixmap,
    quality: i32,
) -> EnvResult<EnvBytes> {
    boundary(|| {
        let ctx = handle(ctx, "context")?;
        let pix = handle(pix, "pixmap")?;
        let bytes = ctx.pixmap_as_jpeg_bytes(pix, quality).into_result()?;
        Ok(EnvBytes::from_vec(bytes))
    })
}

/// # Safety
/// `ctx` and `pix` must be live handles; `path` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_save_pixmap_as_jpeg(
    ctx: *const EnvContext,
    pix: *const EnvPixmap,
    quality: i32,
    path: *const c_char,
) -> EnvStatus {
    boundary_status(|| {
        let ctx = handle(ctx, "context")?;
        let pix = handle(pix, "pixmap")?;
        let path = utf8_arg(path, "path")?;
        ctx.save_pixmap_as_jpeg(pix, quality, path).into_result()
    })
}

/// # Safety
/// `s` must be null or a string returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// # Safety
/// `bytes` must come from this library and be freed once.
#[no_mangle]
pub unsafe extern "C" fn mupdf_env_bytes_free(bytes: EnvBytes) {
    if !bytes.data.is_null() {
        drop(Box::from_raw(slice::from_raw_parts_mut(bytes.data, bytes.len)));
    }
}

/// Stable name of an error kind, for hosts that log it
#[no_mangle]
pub extern "C" fn mupdf_env_error_kind_name(kind: u32) -> *const c_char {
    let name: &'static [u8] = match kind {
        0 => b"ok\0",
        1 => b"context_init\0",
        2 => b"open\0",
        3 => b"page_range\0",
        4 => b"metadata_miss\0",
        5 => b"engine\0",
        6 => b"encode\0",
        7 => b"io\0",
        8 => b"invalid_argument\0",
        9 => b"context_mismatch\0",
        10 => b"panic\0",
        _ => b"unknown\0",
    };
    name.as_ptr() as *const c_char
}
