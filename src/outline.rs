//! Document outline (table of contents)

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::document::Document;
use crate::engine::Engine;
use crate::envelope::Envelope;

/// One outline node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    /// Link target when the entry points outside the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Zero-based target page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Target position on `page`, in points
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            title: title.into(),
            page,
            ..Default::default()
        }
    }

    /// Set the target position on the page
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_children(mut self, children: Vec<OutlineEntry>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, including `self`
    fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineEntry::count).sum::<usize>()
    }
}

/// Outline tree owned by the caller. Never borrows from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn new(entries: Vec<OutlineEntry>) -> Self {
        Self { entries }
    }

    /// Total node count across all levels
    pub fn len(&self) -> usize {
        self.entries.iter().map(OutlineEntry::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first walk yielding `(depth, entry)`
    pub fn walk(&self) -> Vec<(usize, &OutlineEntry)> {
        fn visit<'a>(
            entries: &'a [OutlineEntry],
            depth: usize,
            out: &mut Vec<(usize, &'a OutlineEntry)>,
        ) {
            for entry in entries {
                out.push((depth, entry));
                visit(&entry.children, depth + 1, out);
            }
        }

        let mut out = Vec::with_capacity(self.len());
        visit(&self.entries, 0, &mut out);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }
}

impl<E: Engine> Context<E> {
    /// Load the outline tree of `doc`.
    ///
    /// A document without an outline yields an empty tree.
    pub fn load_outline(&self, doc: &Document<'_, E>) -> Envelope<Outline> {
        self.attempt("load_outline", || {
            self.ensure_owns(doc.context_id())?;
            let entries = self.engine().outline(doc.inner())?;
            Ok(Outline::new(entries))
        })
    }
}
