//! Result Protocol
//!
//! Every operation returns an [`Envelope`]: either `Ok(value)` or
//! `Err(message)`, never both and never neither.
//!
//! # Attempt boundary
//!
//! ```text
//! attempt(op, || { ... })
//!    │
//!    ├── normal completion ──────► Envelope::Ok(value)
//!    ├── Err(BoundaryError) ─────► Envelope::Err(message)   (diagnostics + warn!)
//!    ├── panic ──────────────────► Envelope::Err(Panic)     (unwind stops here)
//!    └── always ─────────────────► Finally guard (trace! ledger state)
//! ```
//!
//! Resources acquired inside the closure are RAII guards: on the abnormal
//! path they are dropped (and released) before the envelope is built.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{trace, warn};

use crate::error::{BoundaryError, ErrorKind};
use crate::ledger::Ledger;

/// Tagged result returned by every boundary operation
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Ok(T),
    Err(ErrorMessage),
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Consume the envelope, discarding any error
    pub fn ok(self) -> Option<T> {
        match self {
            Envelope::Ok(value) => Some(value),
            Envelope::Err(_) => None,
        }
    }

    pub fn err(&self) -> Option<&ErrorMessage> {
        match self {
            Envelope::Ok(_) => None,
            Envelope::Err(message) => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, ErrorMessage> {
        match self {
            Envelope::Ok(value) => Ok(value),
            Envelope::Err(message) => Err(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Envelope::Ok(value) => Envelope::Ok(f(value)),
            Envelope::Err(message) => Envelope::Err(message),
        }
    }
}

impl<T> From<Result<T, BoundaryError>> for Envelope<T> {
    fn from(result: Result<T, BoundaryError>) -> Self {
        match result {
            Ok(value) => Envelope::Ok(value),
            Err(err) => Envelope::Err(err.into()),
        }
    }
}

/// Caller-owned copy of an error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    kind: ErrorKind,
    message: String,
}

impl ErrorMessage {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<BoundaryError> for ErrorMessage {
    fn from(err: BoundaryError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorMessage {}

/// Per-context diagnostic state: the message of the latest failed operation
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    last: RefCell<Option<ErrorMessage>>,
}

impl Diagnostics {
    pub(crate) fn last(&self) -> Option<ErrorMessage> {
        self.last.borrow().clone()
    }

    fn begin(&self) {
        self.last.replace(None);
    }

    fn record(&self, message: &ErrorMessage) {
        self.last.replace(Some(message.clone()));
    }
}

/// Runs the wrapped closure when dropped, on every exit path.
pub struct Finally<F: FnOnce()> {
    f: Option<F>,
}

/// Create a guard that runs `f` when the current scope ends.
pub fn finally<F: FnOnce()>(f: F) -> Finally<F> {
    Finally { f: Some(f) }
}

impl<F: FnOnce()> Drop for Finally<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

/// Run one operation inside an attempt boundary.
pub(crate) fn attempt<T, F>(
    diagnostics: &Diagnostics,
    ledger: &Ledger,
    operation: &'static str,
    f: F,
) -> Envelope<T>
where
    F: FnOnce() -> Result<T, BoundaryError>,
{
    diagnostics.begin();
    let _always = finally(|| {
        trace!(operation, live = ledger.live_total(), "attempt finished");
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(BoundaryError::Panic(panic_message(payload.as_ref()))));

    match outcome {
        Ok(value) => Envelope::Ok(value),
        Err(err) => {
            let message = ErrorMessage::from(err);
            warn!(operation, kind = message.kind().as_str(), "{}", message);
            diagnostics.record(&message);
            Envelope::Err(message)
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::ledger::ResourceKind;

    #[test]
    fn test_attempt_ok() {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let env = attempt(&diagnostics, &ledger, "ok", || Ok(7));

        assert_eq!(env, Envelope::Ok(7));
        assert!(diagnostics.last().is_none());
    }

    #[test]
    fn test_attempt_err_records_diagnostics() {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let env: Envelope<()> = attempt(&diagnostics, &ledger, "err", || {
            Err(BoundaryError::Engine("broken page tree".into()))
        });

        let message = env.err().cloned().unwrap();
        assert_eq!(message.kind(), ErrorKind::Engine);
        assert!(message.message().contains("broken page tree"));
        assert_eq!(diagnostics.last(), Some(message));
    }

    #[test]
    fn test_attempt_releases_partial_resources_on_error() {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let env: Envelope<()> = attempt(&diagnostics, &ledger, "partial", || {
            let _first = ledger.acquire(ResourceKind::Buffer);
            let _second = ledger.acquire(ResourceKind::StructuredText);
            assert_eq!(ledger.live_total(), 2);
            Err(BoundaryError::Engine("late failure".into()))
        });

        assert!(env.is_err());
        assert_eq!(ledger.live_total(), 0);
    }

    #[test]
    fn test_attempt_converts_panic() {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let env: Envelope<()> = attempt(&diagnostics, &ledger, "panic", || {
            let _held = ledger.acquire(ResourceKind::Page);
            panic!("engine exploded");
        });

        let message = env.err().cloned().unwrap();
        assert_eq!(message.kind(), ErrorKind::Panic);
        assert!(message.message().contains("engine exploded"));
        assert_eq!(ledger.live_total(), 0);
    }

    #[test]
    fn test_next_attempt_clears_last_error() {
        let diagnostics = Diagnostics::default();
        let ledger = Ledger::default();

        let _ = attempt::<(), _>(&diagnostics, &ledger, "err", || {
            Err(BoundaryError::Encode("bad".into()))
        });
        assert!(diagnostics.last().is_some());

        let _ = attempt(&diagnostics, &ledger, "ok", || Ok(()));
        assert!(diagnostics.last().is_none());
    }

    #[test]
    fn test_finally_runs_on_both_paths() {
        let hits = Cell::new(0);

        {
            let _guard = finally(|| hits.set(hits.get() + 1));
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = finally(|| hits.set(hits.get() + 1));
            panic!("unwind");
        }));

        assert!(result.is_err());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_envelope_map_and_into_result() {
        let env: Envelope<i32> = Envelope::Ok(2);
        assert_eq!(env.map(|v| v * 10).into_result().unwrap(), 20);

        let failed: Envelope<i32> = Err(BoundaryError::InvalidArgument("zoom".into())).into();
        assert!(failed.is_err());
        assert!(failed.ok().is_none());
    }
}
