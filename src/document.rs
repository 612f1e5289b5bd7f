//! Document Lifecycle

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::engine::{Engine, MupdfEngine};
use crate::envelope::Envelope;
use crate::error::{BoundaryError, Result};
use crate::ledger::{ResourceKind, Tracked};

/// Capacity of the per-call metadata buffer, terminator included
pub const METADATA_BUFFER_LEN: usize = 500;

/// Metadata keys understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    Format,
    Encryption,
    Author,
    Title,
    Producer,
    Creator,
    CreationDate,
    ModDate,
    Subject,
    Keywords,
}

impl MetadataKey {
    pub const ALL: [MetadataKey; 10] = [
        MetadataKey::Format,
        MetadataKey::Encryption,
        MetadataKey::Author,
        MetadataKey::Title,
        MetadataKey::Producer,
        MetadataKey::Creator,
        MetadataKey::CreationDate,
        MetadataKey::ModDate,
        MetadataKey::Subject,
        MetadataKey::Keywords,
    ];

    /// Engine key string (`"format"`, `"info:Title"`, ...)
    pub fn as_engine_key(self) -> &'static str {
        match self {
            MetadataKey::Format => "format",
            MetadataKey::Encryption => "encryption",
            MetadataKey::Author => "info:Author",
            MetadataKey::Title => "info:Title",
            MetadataKey::Producer => "info:Producer",
            MetadataKey::Creator => "info:Creator",
            MetadataKey::CreationDate => "info:CreationDate",
            MetadataKey::ModDate => "info:ModDate",
            MetadataKey::Subject => "info:Subject",
            MetadataKey::Keywords => "info:Keywords",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_engine_key())
    }
}

impl FromStr for MetadataKey {
    type Err = BoundaryError;

    /// Accepts engine keys and their bare lowercase names (`"title"`, `"mod_date"`).
    fn from_str(s: &str) -> Result<Self> {
        let key = match s {
            "format" => MetadataKey::Format,
            "encryption" => MetadataKey::Encryption,
            "info:Author" | "author" => MetadataKey::Author,
            "info:Title" | "title" => MetadataKey::Title,
            "info:Producer" | "producer" => MetadataKey::Producer,
            "info:Creator" | "creator" => MetadataKey::Creator,
            "info:CreationDate" | "creation_date" => MetadataKey::CreationDate,
            "info:ModDate" | "mod_date" => MetadataKey::ModDate,
            "info:Subject" | "subject" => MetadataKey::Subject,
            "info:Keywords" | "keywords" => MetadataKey::Keywords,
            _ => return Err(BoundaryError::metadata_miss(s)),
        };
        Ok(key)
    }
}

/// Fixed-capacity buffer a single metadata lookup writes into
struct MetadataBuffer {
    value: String,
}

impl MetadataBuffer {
    fn new() -> Self {
        Self {
            value: String::with_capacity(METADATA_BUFFER_LEN),
        }
    }

    /// Copy `value` in. An empty value or one that does not fit with its
    /// terminator is a miss.
    fn fill(&mut self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() || value.len() + 1 > METADATA_BUFFER_LEN {
            return Err(BoundaryError::metadata_miss(key));
        }
        self.value.clear();
        self.value.push_str(value);
        Ok(())
    }

    fn into_value(self) -> String {
        self.value
    }
}

/// Open document handle.
///
/// Borrows its [`Context`]; dropping it closes the document and discards
/// any store entries derived from it.
pub struct Document<'ctx, E: Engine = MupdfEngine> {
    ctx: &'ctx Context<E>,
    serial: u64,
    path: PathBuf,
    inner: E::Document,
    _tracked: Tracked,
}

impl<'ctx, E: Engine> Document<'ctx, E> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn inner(&self) -> &E::Document {
        &self.inner
    }

    pub(crate) fn context_id(&self) -> u64 {
        self.ctx.id()
    }
}

impl<E: Engine> fmt::Debug for Document<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("context", &self.ctx.id())
            .field("serial", &self.serial)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Drop for Document<'_, E> {
    fn drop(&mut self) {
        self.ctx.forget_document(self.serial);
        debug!(context = self.ctx.id(), document = self.serial, "document closed");
    }
}

impl<E: Engine> Context<E> {
    /// Open the document at `path`. The format is chosen by the engine.
    pub fn open_document(&self, path: impl AsRef<Path>) -> Envelope<Document<'_, E>> {
        let path = path.as_ref();
        self.attempt("open_document", || {
            let display = path.display().to_string();
            let utf8 = path.to_str().ok_or_else(|| {
                BoundaryError::InvalidArgument(format!("path is not valid UTF-8: {}", display))
            })?;

            let tracked = self.track(ResourceKind::Document);
            let inner = self
                .engine()
                .open_document(utf8)
                .map_err(|err| match err {
                    BoundaryError::Open { .. } | BoundaryError::InvalidArgument(_) => err,
                    other => BoundaryError::Open {
                        path: display.clone(),
                        message: other.to_string(),
                    },
                })?;

            let serial = self.next_document_serial();
            debug!(context = self.id(), document = serial, path = %display, "document opened");
            Ok(Document {
                ctx: self,
                serial,
                path: path.to_path_buf(),
                inner,
                _tracked: tracked,
            })
        })
    }

    pub fn page_count(&self, doc: &Document<'_, E>) -> Envelope<i32> {
        self.attempt("page_count", || {
            self.ensure_owns(doc.context_id())?;
            self.engine().page_count(doc.inner())
        })
    }

    /// Look up a metadata value by engine key (`"format"`, `"info:Title"`, ...).
    ///
    /// Only the ten [`MetadataKey`] names (or their lowercase aliases) are
    /// recognized; other engine keys such as `"info:Trapped"` are not
    /// forwarded. Unknown keys, absent values and values that do not fit the
    /// lookup buffer fail with a "not recognized or found" message.
    pub fn lookup_metadata(&self, doc: &Document<'_, E>, key: &str) -> Envelope<String> {
        self.attempt("lookup_metadata", || {
            self.ensure_owns(doc.context_id())?;
            let parsed = key.parse::<MetadataKey>()?;
            self.fetch_metadata(doc, key, parsed)
        })
    }

    pub fn lookup_metadata_key(&self, doc: &Document<'_, E>, key: MetadataKey) -> Envelope<String> {
        self.attempt("lookup_metadata", || {
            self.ensure_owns(doc.context_id())?;
            self.fetch_metadata(doc, key.as_engine_key(), key)
        })
    }

    fn fetch_metadata(&self, doc: &Document<'_, E>, name: &str, key: MetadataKey) -> Result<String> {
        let mut buf = MetadataBuffer::new();
        let value = self.engine().metadata(doc.inner(), key)?;
        buf.fill(name, &value)?;
        Ok(buf.into_value())
    }
}
