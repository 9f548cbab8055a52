//! The structural tree: an arena of lazily expanded nodes behind a generic tree contract.
//!
//! Nodes are stored by [`NodeId`] and keep their parent's id plus the ids of the children they
//! own, so walking up for path reconstruction and down for rendering are both index lookups.
//! A node's children are materialized at most once. Expansion moves a node through
//! [`Expansion::Unexpanded`] → [`Expansion::Expanding`] → [`Expansion::Expanded`] (or
//! [`Expansion::Failed`]); any request on a node that has left `Unexpanded` is a no-op.
//!
//! Expansion can happen inline with [`StructTree::expand_now`], or be split into a detached
//! [`ExpansionJob`] that runs on another thread and whose result is handed back through
//! [`StructTree::attach`].

use crate::error::ExpandError;
use crate::graph::ParsedStruct;
use crate::node::{NodeData, NodeKind};
use crate::palette::{self, Rgb};
use crate::span::{ByteRange, OffsetMode};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the leaf shown under a node whose expansion failed.
pub const ERROR_LEAF_NAME: &str = "[error]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Stable handle to a node within one [`StructTree`].
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Position of a node as child indices from the root; the root itself is the empty path.
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// The empty path, naming the root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of this node's child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    /// Child indices from the root.
    #[must_use]
    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True if `self` is `other` or one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &TreePath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(steps: Vec<usize>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("/"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Where a node is in its one-time child materialization.
pub enum Expansion {
    /// Children have not been requested.
    Unexpanded,
    /// A job for this node is in flight.
    Expanding,
    /// Children are attached.
    Expanded,
    /// The job failed; the node holds a single error leaf.
    Failed,
}

#[derive(Debug)]
/// A node together with its links in the arena.
pub struct TreeNode {
    /// What the node holds.
    pub data: NodeData,
    /// Owning node; `None` for the root.
    pub parent: Option<NodeId>,
    /// Materialized children, in order.
    pub children: Vec<NodeId>,
    /// Expansion state.
    pub expansion: Expansion,
    /// Highlight colour for this node's bytes.
    pub color: Rgb,
    /// Position among the parent's children.
    pub sibling_index: usize,
}

/// Child materialization detached from the tree, safe to run on a worker thread.
pub struct ExpansionJob {
    /// Node whose children the job builds.
    pub node: NodeId,
    data: NodeData,
    mode: OffsetMode,
}

impl ExpansionJob {
    /// Builds the children of the job's node.
    #[must_use]
    pub fn run(self) -> ExpansionResult {
        debug!(node = self.node.index(), name = %self.data.name, "materializing children");
        ExpansionResult {
            node: self.node,
            children: Ok(self.data.children(self.mode)),
        }
    }
}

#[derive(Debug)]
/// Outcome of an [`ExpansionJob`], ready to be attached.
pub struct ExpansionResult {
    /// Node the children belong to.
    pub node: NodeId,
    /// The built children, or why they could not be built.
    pub children: Result<Vec<NodeData>, ExpandError>,
}

#[derive(Debug)]
/// Arena-backed tree rooted at one parsed structure.
pub struct StructTree {
    nodes: Vec<TreeNode>,
    mode: OffsetMode,
}

impl StructTree {
    /// Wraps a parsed root structure; only the root is materialized.
    #[must_use]
    pub fn new(root: Arc<dyn ParsedStruct>, mode: OffsetMode) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            mode,
        };
        tree.push(NodeData::root(root), None, 0);
        tree
    }

    /// The root node.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Offset convention the tree was built with.
    #[must_use]
    pub fn offset_mode(&self) -> OffsetMode {
        self.mode
    }

    /// Number of materialized nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is materialized on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for `id`, or `None` if the id is out of range.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Node for an id handed out by this tree.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Parent of `id`; `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Kind of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).data.kind()
    }

    /// Absolute span of `id`, if it has one.
    #[must_use]
    pub fn span(&self, id: NodeId) -> Option<ByteRange> {
        self.node(id).data.span
    }

    /// Display string of `id`.
    #[must_use]
    pub fn label(&self, id: NodeId, bytes_preview: usize) -> String {
        self.node(id).data.label(bytes_preview)
    }

    /// Expansion state of `id`.
    #[must_use]
    pub fn expansion(&self, id: NodeId) -> Expansion {
        self.node(id).expansion
    }

    /// Children materialized so far, without triggering expansion.
    #[must_use]
    pub fn loaded_children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Children of `id`, materializing them first if needed.
    pub fn children(&mut self, id: NodeId) -> &[NodeId] {
        self.expand_now(id);
        &self.node(id).children
    }

    /// Number of children of `id`, materializing them first if needed.
    pub fn child_count(&mut self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Child `index` of `id`, materializing the children first if needed.
    pub fn child_at(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// True if the node has no children once materialized.
    ///
    /// A node whose job is still in flight is not a leaf unless it can never have children.
    pub fn is_leaf(&mut self, id: NodeId) -> bool {
        let node = self.node(id);
        if node.data.is_terminal() {
            return true;
        }
        if node.expansion == Expansion::Expanding {
            return false;
        }
        self.child_count(id) == 0
    }

    /// True if the node may have children, without materializing anything.
    #[must_use]
    pub fn may_have_children(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.expansion {
            Expansion::Unexpanded | Expansion::Expanding => !node.data.is_terminal(),
            Expansion::Expanded | Expansion::Failed => !node.children.is_empty(),
        }
    }

    /// Materializes the children of `id` inline. No-op unless the node is unexpanded.
    pub fn expand_now(&mut self, id: NodeId) {
        if let Some(job) = self.begin_expansion(id) {
            let result = job.run();
            self.attach(result);
        }
    }

    /// Marks `id` as expanding and returns the detached job that builds its children.
    ///
    /// Returns `None` if the node has already left the unexpanded state, or if it is a leaf
    /// (which is marked expanded on the spot).
    pub fn begin_expansion(&mut self, id: NodeId) -> Option<ExpansionJob> {
        let mode = self.mode;
        let node = self.nodes.get_mut(id.0)?;
        if node.expansion != Expansion::Unexpanded {
            return None;
        }
        if node.data.is_terminal() {
            node.expansion = Expansion::Expanded;
            return None;
        }
        node.expansion = Expansion::Expanding;
        Some(ExpansionJob {
            node: id,
            data: node.data.clone(),
            mode,
        })
    }

    /// Installs the result of a job started by [`StructTree::begin_expansion`].
    ///
    /// Returns `false` and changes nothing if the node is not waiting for a result.
    pub fn attach(&mut self, result: ExpansionResult) -> bool {
        let id = result.node;
        match self.get(id) {
            Some(node) if node.expansion == Expansion::Expanding => {}
            _ => {
                debug!(node = id.index(), "ignoring stale expansion result");
                return false;
            }
        }

        match result.children {
            Ok(children) => {
                debug!(node = id.index(), count = children.len(), "attaching children");
                for (i, child) in children.into_iter().enumerate() {
                    let child_id = self.push(child, Some(id), i);
                    self.nodes[id.0].children.push(child_id);
                }
                self.nodes[id.0].expansion = Expansion::Expanded;
            }
            Err(error) => {
                warn!(node = id.index(), %error, "expansion failed");
                let leaf = NodeData::error(ERROR_LEAF_NAME, None, error);
                let child_id = self.push(leaf, Some(id), 0);
                self.nodes[id.0].children.push(child_id);
                self.nodes[id.0].expansion = Expansion::Failed;
            }
        }
        true
    }

    /// Expands every node in the tree.
    pub fn materialize_all(&mut self) {
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            self.expand_now(id);
            pending.extend(self.node(id).children.iter().rev().copied());
        }
    }

    /// Path of child indices leading from the root to `id`.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> TreePath {
        let mut steps = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            steps.push(self.node(current).sibling_index);
            current = parent;
        }
        steps.reverse();
        TreePath(steps)
    }

    /// Materialized node at `path`, if every step along it has been loaded.
    #[must_use]
    pub fn node_at(&self, path: &TreePath) -> Option<NodeId> {
        let mut current = self.root();
        for &step in path.steps() {
            current = *self.node(current).children.get(step)?;
        }
        Some(current)
    }

    /// Number of ancestors of `id`.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Materialized nodes in display order (parents before children, siblings in order).
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    fn push(&mut self, data: NodeData, parent: Option<NodeId>, sibling_index: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            data,
            parent,
            children: Vec::new(),
            expansion: Expansion::Unexpanded,
            color: palette::color(id.0),
            sibling_index,
        });
        id
    }
}

#[cfg(test)]
#[path = "tests/tree.rs"]
mod tests;
