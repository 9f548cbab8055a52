//! Span index: absolute byte ranges of materialized nodes, keyed by tree path.
//!
//! The index is rebuilt from the tree after every completed expansion instead of being patched
//! in place, so a lookup always sees one consistent snapshot of what has been materialized.

use crate::span::ByteRange;
use crate::tree::{NodeId, StructTree, TreePath};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
/// One spanned, materialized node.
pub struct IndexEntry {
    /// Where the node sits in the tree.
    pub path: TreePath,
    /// Arena id of the node when the index was built.
    pub node: NodeId,
    /// Absolute span of the node.
    pub span: ByteRange,
    /// No materialized child of this node has a span of its own, so it is the most specific
    /// node covering its bytes that the tree can currently show.
    pub frontier: bool,
}

#[derive(Debug, Default)]
/// Every spanned node the tree has materialized, in display order.
pub struct SpanIndex {
    /// Entries in display order.
    entries: Vec<IndexEntry>,
    by_path: HashMap<TreePath, usize>,
}

impl SpanIndex {
    /// Records every materialized node that has a span.
    #[must_use]
    pub fn build(tree: &StructTree) -> Self {
        let mut index = Self::default();

        for id in tree.preorder() {
            let Some(span) = tree.span(id) else {
                continue;
            };
            let frontier = tree
                .loaded_children(id)
                .iter()
                .all(|&child| tree.span(child).is_none());
            let path = tree.path_of(id);

            index.by_path.insert(path.clone(), index.entries.len());
            index.entries.push(IndexEntry {
                path,
                node: id,
                span,
                frontier,
            });
        }

        debug!(entries = index.entries.len(), "span index rebuilt");
        index
    }

    /// Number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no node has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in display order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entry for the node at `path`.
    #[must_use]
    pub fn get(&self, path: &TreePath) -> Option<&IndexEntry> {
        self.by_path.get(path).map(|&i| &self.entries[i])
    }

    /// Span of the node at `path`, if it is indexed.
    #[must_use]
    pub fn span_of(&self, path: &TreePath) -> Option<ByteRange> {
        self.get(path).map(|entry| entry.span)
    }

    /// Frontier entries, in display order.
    pub fn frontier(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter().filter(|entry| entry.frontier)
    }
}

#[cfg(test)]
#[path = "tests/index.rs"]
mod tests;
