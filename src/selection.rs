//! Selection synchronization between the tree and the byte view.
//!
//! Selecting tree nodes produces a [`Highlight`] over their bytes. Moving the caret or
//! selecting bytes produces the tree paths whose spans overlap that interval, looked up in the
//! [`SpanIndex`]. Only frontier entries take part in the reverse direction: a collapsed
//! structure is selected as a whole, an expanded one hands over to its children.

use crate::index::SpanIndex;
use crate::palette::Rgb;
use crate::span::ByteRange;
use crate::tree::{NodeId, StructTree, TreePath};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Which overlapping nodes a byte selection selects.
pub enum SelectionPolicy {
    /// The first overlapping node in display order.
    #[default]
    First,
    /// Every overlapping node, in display order.
    All,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown selection policy `{other}` (expected first or all)"
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::All => "all",
        })
    }
}

/// Whether the byte interval `interval` selects a node spanning `span`.
///
/// An interval starting before the span selects it if it reaches past the span's start;
/// otherwise it selects it if it starts before the span's end. A zero-width span is only
/// selected by a caret at exactly its offset.
#[must_use]
pub fn overlaps(interval: ByteRange, span: ByteRange) -> bool {
    if span.is_empty() {
        return interval.is_empty() && interval.start == span.start;
    }
    if interval.start < span.start {
        interval.end > span.start
    } else {
        interval.start < span.end
    }
}

/// Sorts and coalesces ranges, dropping empty ones.
#[must_use]
pub fn merge_ranges(ranges: &[ByteRange]) -> Vec<ByteRange> {
    let mut sorted: Vec<ByteRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort_unstable();

    let mut merged: Vec<ByteRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// What the byte view should show for a tree selection.
pub struct Highlight {
    /// Union of the selected spans, sorted and non-overlapping.
    pub ranges: Vec<ByteRange>,
    /// One range per selected node, with the node's colour.
    pub painted: Vec<(ByteRange, Rgb)>,
    /// Caret position: the start of the first selected span.
    pub caret: Option<u64>,
}

impl Highlight {
    /// True if nothing is highlighted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True if the byte at `offset` is highlighted.
    #[must_use]
    pub fn contains(&self, offset: u64) -> bool {
        self.ranges
            .iter()
            .any(|range| range.start <= offset && offset < range.end)
    }
}

#[derive(Debug, Default)]
/// The span index plus the policy that maps byte selections back onto it.
pub struct SelectionSync {
    policy: SelectionPolicy,
    index: SpanIndex,
}

impl SelectionSync {
    /// A synchronizer with an empty index; call [`SelectionSync::rebuild`] before selecting bytes.
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            index: SpanIndex::default(),
        }
    }

    /// Policy applied by [`SelectionSync::select_bytes`].
    #[must_use]
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Index as of the last rebuild.
    #[must_use]
    pub fn index(&self) -> &SpanIndex {
        &self.index
    }

    /// Re-keys the index against the tree's current materialization.
    pub fn rebuild(&mut self, tree: &StructTree) {
        self.index = SpanIndex::build(tree);
    }

    /// Tree → bytes: highlight for the selected nodes.
    ///
    /// Nodes without a span or with a zero-width span contribute nothing.
    #[must_use]
    pub fn highlight_nodes(tree: &StructTree, selected: &[NodeId]) -> Highlight {
        let painted: Vec<(ByteRange, Rgb)> = selected
            .iter()
            .filter_map(|&id| {
                let span = tree.span(id)?;
                (!span.is_empty()).then(|| (span, tree.node(id).color))
            })
            .collect();

        let spans: Vec<ByteRange> = painted.iter().map(|(span, _)| *span).collect();
        Highlight {
            ranges: merge_ranges(&spans),
            caret: spans.first().map(|span| span.start),
            painted,
        }
    }

    /// Tree → bytes for selections given as paths. Paths not materialized are skipped.
    #[must_use]
    pub fn highlight_paths(tree: &StructTree, paths: &[TreePath]) -> Highlight {
        let nodes: Vec<NodeId> = paths.iter().filter_map(|path| tree.node_at(path)).collect();
        Self::highlight_nodes(tree, &nodes)
    }

    /// Bytes → tree: paths to select for the byte interval `interval`.
    ///
    /// A caret without a selection is the zero-width interval at its offset.
    #[must_use]
    pub fn select_bytes(&self, interval: ByteRange) -> Vec<TreePath> {
        let mut matches = self
            .index
            .frontier()
            .filter(|entry| overlaps(interval, entry.span))
            .map(|entry| entry.path.clone());

        let selected: Vec<TreePath> = match self.policy {
            SelectionPolicy::First => matches.next().into_iter().collect(),
            SelectionPolicy::All => matches.collect(),
        };
        trace!(%interval, count = selected.len(), "byte selection mapped to tree");
        selected
    }
}

#[cfg(test)]
#[path = "tests/selection.rs"]
mod tests;
