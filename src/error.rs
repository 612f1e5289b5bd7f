//! Boundary error types
//!
//! Every failure that can reach a caller is one of these variants. Only the
//! rendered message (plus a coarse [`ErrorKind`]) crosses the boundary.

use thiserror::Error;

/// Unified boundary error type
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Engine could not be brought up or its format handlers not registered
    #[error("Context initialization failed: {0}")]
    ContextInit(String),

    /// Path missing, unreadable, or not a recognized document format
    #[error("Cannot open document '{path}': {message}")]
    Open { path: String, message: String },

    /// Page index outside `[0, page_count)`
    #[error("Invalid page number: {index} (document has {count} pages)")]
    PageOutOfRange { index: i32, count: i32 },

    /// Metadata key unknown, absent from the document, or too long for the lookup buffer
    #[error("Metadata key '{key}' is not recognized or found")]
    MetadataMiss { key: String },

    /// Opaque engine failure (corrupt content, out of memory, ...)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Serialization or image encoding failure
    #[error("Encode error: {0}")]
    Encode(String),

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Null pointer, interior NUL, non-UTF-8 text or out-of-domain number
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Handle issued by a different context
    #[error("Handle belongs to context {handle}, not context {context}")]
    ContextMismatch { handle: u64, context: u64 },

    /// Unwind caught before it could cross the boundary
    #[error("Engine panicked: {0}")]
    Panic(String),
}

/// Coarse classification of a [`BoundaryError`].
///
/// The discriminants are part of the C ABI (`kind` field of every envelope);
/// `0` is reserved for success.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ContextInit = 1,
    Open = 2,
    PageRange = 3,
    MetadataMiss = 4,
    Engine = 5,
    Encode = 6,
    Io = 7,
    InvalidArgument = 8,
    ContextMismatch = 9,
    Panic = 10,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContextInit => "context_init",
            Self::Open => "open",
            Self::PageRange => "page_range",
            Self::MetadataMiss => "metadata_miss",
            Self::Engine => "engine",
            Self::Encode => "encode",
            Self::Io => "io",
            Self::InvalidArgument => "invalid_argument",
            Self::ContextMismatch => "context_mismatch",
            Self::Panic => "panic",
        }
    }
}

impl BoundaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContextInit(_) => ErrorKind::ContextInit,
            Self::Open { .. } => ErrorKind::Open,
            Self::PageOutOfRange { .. } => ErrorKind::PageRange,
            Self::MetadataMiss { .. } => ErrorKind::MetadataMiss,
            Self::Engine(_) => ErrorKind::Engine,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::ContextMismatch { .. } => ErrorKind::ContextMismatch,
            Self::Panic(_) => ErrorKind::Panic,
        }
    }

    pub(crate) fn metadata_miss(key: impl Into<String>) -> Self {
        Self::MetadataMiss { key: key.into() }
    }
}

/// Result type alias for boundary operations
pub type Result<T> = std::result::Result<T, BoundaryError>;

impl From<mupdf::Error> for BoundaryError {
    fn from(err: mupdf::Error) -> Self {
        BoundaryError::Engine(err.to_string())
    }
}

impl From<image::ImageError> for BoundaryError {
    fn from(err: image::ImageError) -> Self {
        BoundaryError::Encode(err.to_string())
    }
}

impl From<serde_json::Error> for BoundaryError {
    fn from(err: serde_json::Error) -> Self {
        BoundaryError::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_miss_message_is_distinct_from_engine_message() {
        let miss = BoundaryError::metadata_miss("info:Title").to_string();
        let engine = BoundaryError::Engine("syntax error in xref".into()).to_string();

        assert!(miss.contains("not recognized or found"));
        assert!(!engine.contains("not recognized or found"));
    }

    #[test]
    fn test_kind_mapping() {
        let err = BoundaryError::PageOutOfRange { index: 3, count: 3 };
        assert_eq!(err.kind(), ErrorKind::PageRange);
        assert_eq!(err.kind() as u32, 3);

        let io = BoundaryError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Io);
    }
}
