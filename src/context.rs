//! Context Lifecycle
//!
//! A [`Context`] is the root handle for one unit of work. It owns:
//!
//! - the engine (with its document handlers registered)
//! - the resource store, bounded by [`StoreLimit`]
//! - the diagnostic slot holding the latest error message
//! - the ledger counting live handles and intermediates
//!
//! Documents borrow the context, pages borrow their document, so a handle
//! can never outlive its owner. The context is `!Send`: one thread per
//! context, any number of contexts across threads.

use std::cell::{Cell, RefCell, RefMut};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::config::{ContextConfig, StoreLimit};
use crate::engine::{Engine, MupdfEngine};
use crate::envelope::{self, panic_message, Diagnostics, Envelope, ErrorMessage};
use crate::error::{BoundaryError, Result};
use crate::ledger::{Ledger, LedgerSnapshot, ResourceKind, Tracked};
use crate::pixmap::PixelData;
use crate::store::{RasterKey, ResourceStore, StoreStats};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Root handle owning the engine, the resource store and diagnostics
pub struct Context<E: Engine = MupdfEngine> {
    id: u64,
    engine: E,
    config: ContextConfig,
    store: RefCell<ResourceStore>,
    diagnostics: Diagnostics,
    ledger: Ledger,
    next_document: Cell<u64>,
}

/// Create a MuPDF-backed context.
///
/// `max_store_bytes` is interpreted by [`StoreLimit::from_raw`]: `0` means
/// no eviction limit, [`STORE_DEFAULT`](crate::STORE_DEFAULT) the built-in
/// limit, anything else the exact ceiling.
pub fn new_context(max_store_bytes: usize) -> Envelope<Context> {
    Context::new(max_store_bytes)
}

impl Context<MupdfEngine> {
    pub fn new(max_store_bytes: usize) -> Envelope<Self> {
        Self::with_config(ContextConfig::new(StoreLimit::from_raw(max_store_bytes)))
    }

    pub fn with_config(config: ContextConfig) -> Envelope<Self> {
        Self::with_engine(MupdfEngine::default(), config)
    }
}

impl<E: Engine> Context<E> {
    /// Create a context around an arbitrary engine.
    ///
    /// If initialization fails the engine is dropped before the error is
    /// returned; no half-built context escapes.
    pub fn with_engine(mut engine: E, config: ContextConfig) -> Envelope<Self> {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let init = envelope::attempt(&diagnostics, &ledger, "new_context", || {
            match panic::catch_unwind(AssertUnwindSafe(|| engine.initialize(&config))) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(BoundaryError::ContextInit(message))) => {
                    Err(BoundaryError::ContextInit(message))
                }
                Ok(Err(err)) => Err(BoundaryError::ContextInit(err.to_string())),
                Err(payload) => Err(BoundaryError::ContextInit(panic_message(payload.as_ref()))),
            }
        });

        init.map(|()| {
            let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
            info!(context = id, store = ?config.store, "context created");
            Context {
                id,
                engine,
                store: RefCell::new(ResourceStore::new(config.store)),
                config,
                diagnostics,
                ledger,
                next_document: Cell::new(1),
            }
        })
    }

    /// Process-unique identifier of this context
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn store_limit(&self) -> StoreLimit {
        self.config.store
    }

    /// Handles and intermediates currently alive in this context
    pub fn live_resources(&self) -> usize {
        self.ledger.live_total()
    }

    pub fn ledger(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store.borrow().stats()
    }

    /// Message of the latest failed operation on this context, cleared when
    /// the next operation starts
    pub fn last_error(&self) -> Option<ErrorMessage> {
        self.diagnostics.last()
    }

    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    pub(crate) fn attempt<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<T>,
    ) -> Envelope<T> {
        envelope::attempt(&self.diagnostics, &self.ledger, operation, f)
    }

    pub(crate) fn track(&self, kind: ResourceKind) -> Tracked {
        self.ledger.acquire(kind)
    }

    pub(crate) fn store_mut(&self) -> RefMut<'_, ResourceStore> {
        self.store.borrow_mut()
    }

    pub(crate) fn next_document_serial(&self) -> u64 {
        let serial = self.next_document.get();
        self.next_document.set(serial + 1);
        serial
    }

    /// Drop every cached entry derived from a closed document.
    pub(crate) fn forget_document(&self, serial: u64) {
        if let Ok(mut store) = self.store.try_borrow_mut() {
            let evicted = store.forget_document(serial);
            if evicted > 0 {
                debug!(context = self.id, document = serial, evicted, "store entries dropped");
            }
        }
    }

    /// Release the store entry of a dropping pixmap if it was the last holder.
    pub(crate) fn release_raster(&self, key: &RasterKey, data: &PixelData) {
        if let Ok(mut store) = self.store.try_borrow_mut() {
            if store.release(key, data) {
                debug!(context = self.id, document = key.document, page = key.page, "raster released");
            }
        }
    }

    pub(crate) fn ensure_owns(&self, owner: u64) -> Result<()> {
        if owner == self.id {
            Ok(())
        } else {
            Err(BoundaryError::ContextMismatch {
                handle: owner,
                context: self.id,
            })
        }
    }
}

impl<E: Engine> fmt::Debug for Context<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("store", &self.config.store)
            .field("live", &self.ledger.live_total())
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Drop for Context<E> {
    fn drop(&mut self) {
        let live = self.ledger.live_total();
        if live > 0 {
            warn!(context = self.id, live, "context destroyed with live resources");
        } else {
            debug!(context = self.id, "context destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::scripted::{ScriptedEngine, Step};
    use crate::error::ErrorKind;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn warnings_during(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        logs.contents()
    }

    #[test]
    fn test_drop_with_live_resources_warns() {
        let logs = warnings_during(|| {
            let ctx = Context::with_engine(ScriptedEngine::new(), ContextConfig::default())
                .into_result()
                .unwrap();
            let doc = ctx.open_document("leaked.pdf").into_result().unwrap();
            std::mem::forget(doc);
            assert_eq!(ctx.live_resources(), 1);
        });

        assert!(logs.contains("context destroyed with live resources"), "{}", logs);
        assert!(logs.contains("live=1"), "{}", logs);
    }

    #[test]
    fn test_clean_drop_is_quiet() {
        let logs = warnings_during(|| {
            let ctx = Context::with_engine(ScriptedEngine::new(), ContextConfig::default())
                .into_result()
                .unwrap();
            let doc = ctx.open_document("closed.pdf").into_result().unwrap();
            drop(doc);
            assert_eq!(ctx.live_resources(), 0);
        });

        assert!(logs.is_empty(), "{}", logs);
    }

    #[test]
    fn test_context_ids_are_unique() {
        let a = Context::with_engine(ScriptedEngine::new(), ContextConfig::default())
            .into_result()
            .unwrap();
        let b = Context::with_engine(ScriptedEngine::new(), ContextConfig::default())
            .into_result()
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_init_failure_is_context_init() {
        let env = Context::with_engine(
            ScriptedEngine::new().failing(Step::Initialize),
            ContextConfig::default(),
        );

        let message = env.err().cloned().unwrap();
        assert_eq!(message.kind(), ErrorKind::ContextInit);
    }

    #[test]
    fn test_init_panic_is_context_init() {
        let env = Context::with_engine(
            ScriptedEngine::new().panicking(Step::Initialize),
            ContextConfig::default(),
        );

        let message = env.err().cloned().unwrap();
        assert_eq!(message.kind(), ErrorKind::ContextInit);
    }

    #[test]
    fn test_store_limit_from_raw() {
        let ctx = Context::with_engine(
            ScriptedEngine::new(),
            ContextConfig::new(StoreLimit::from_raw(0)),
        )
        .into_result()
        .unwrap();
        assert_eq!(ctx.store_limit(), StoreLimit::Unlimited);
        assert_eq!(ctx.live_resources(), 0);
    }

    #[test]
    fn test_ensure_owns() {
        let ctx = Context::with_engine(ScriptedEngine::new(), ContextConfig::default())
            .into_result()
            .unwrap();

        assert!(ctx.ensure_owns(ctx.id()).is_ok());
        let err = ctx.ensure_owns(ctx.id() + 1000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContextMismatch);
    }
}
