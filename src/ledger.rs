//! Live-resource accounting
//!
//! Each context owns one ledger. Every handle and every transient
//! intermediate holds a [`Tracked`] token; dropping the token releases the
//! slot. A failed operation that leaves the live count changed is a leak.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

/// Kind of resource counted by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Page,
    Pixmap,
    StructuredText,
    Buffer,
}

const KINDS: usize = 5;

impl ResourceKind {
    pub const ALL: [ResourceKind; KINDS] = [
        ResourceKind::Document,
        ResourceKind::Page,
        ResourceKind::Pixmap,
        ResourceKind::StructuredText,
        ResourceKind::Buffer,
    ];

    fn slot(self) -> usize {
        match self {
            ResourceKind::Document => 0,
            ResourceKind::Page => 1,
            ResourceKind::Pixmap => 2,
            ResourceKind::StructuredText => 3,
            ResourceKind::Buffer => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Document => "document",
            ResourceKind::Page => "page",
            ResourceKind::Pixmap => "pixmap",
            ResourceKind::StructuredText => "stext",
            ResourceKind::Buffer => "buffer",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    live: [Cell<usize>; KINDS],
    acquired: [Cell<usize>; KINDS],
}

/// Shared counter table; cloned into every [`Tracked`] token
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    counters: Rc<Counters>,
}

impl Ledger {
    pub(crate) fn acquire(&self, kind: ResourceKind) -> Tracked {
        let slot = kind.slot();
        let live = &self.counters.live[slot];
        live.set(live.get() + 1);
        let acquired = &self.counters.acquired[slot];
        acquired.set(acquired.get() + 1);

        Tracked {
            counters: Rc::clone(&self.counters),
            kind,
        }
    }

    pub(crate) fn live_total(&self) -> usize {
        self.counters.live.iter().map(Cell::get).sum()
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        let mut snapshot = LedgerSnapshot::default();
        for kind in ResourceKind::ALL {
            let slot = kind.slot();
            snapshot.live[slot] = self.counters.live[slot].get();
            snapshot.acquired[slot] = self.counters.acquired[slot].get();
        }
        snapshot
    }
}

/// RAII token for one live resource
#[derive(Debug)]
pub(crate) struct Tracked {
    counters: Rc<Counters>,
    kind: ResourceKind,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let live = &self.counters.live[self.kind.slot()];
        let remaining = live.get().saturating_sub(1);
        live.set(remaining);
        debug!(kind = self.kind.as_str(), remaining, "resource released");
    }
}

/// Point-in-time copy of a context's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    live: [usize; KINDS],
    acquired: [usize; KINDS],
}

impl LedgerSnapshot {
    /// Resources of `kind` currently alive
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.live[kind.slot()]
    }

    /// Resources of `kind` ever acquired
    pub fn acquired(&self, kind: ResourceKind) -> usize {
        self.acquired[kind.slot()]
    }

    pub fn total_live(&self) -> usize {
        self.live.iter().sum()
    }
}
