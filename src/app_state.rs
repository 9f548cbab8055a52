//! The state machine bridging the structural tree and the byte view.
//!
//! The viewer keeps one source of truth: the tree arena, the span index built from it, and the
//! current selection on each side. Selecting a row highlights its bytes; moving the caret or
//! selecting bytes selects the tree rows whose spans overlap, opening their ancestors so they
//! can be seen. Expansions run in the background and are picked up on [`AppState::tick`].

use crate::config::Config;
use crate::expand::Expander;
use crate::selection::{Highlight, SelectionSync};
use crate::span::ByteRange;
use crate::tree::{NodeId, StructTree};
use std::collections::HashSet;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Which pane receives navigation keys.
pub enum Focus {
    /// The tree pane.
    Tree,
    /// The hex pane.
    Bytes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// One line of the flattened tree list.
pub struct VisibleRow {
    /// Node shown on this line.
    pub node: NodeId,
    /// Distance from the root; the root itself is at level 0.
    pub tree_level: usize,
}

/// Session state for the viewer.
pub struct AppState {
    /// The structural tree being browsed.
    pub tree: StructTree,
    /// Background expansions in flight for `tree`.
    pub expander: Expander,
    /// Span index and selection policy.
    pub sync: SelectionSync,
    /// The file being inspected.
    pub data: Vec<u8>,
    /// Tree rows currently on screen, in display order.
    pub rows: Vec<VisibleRow>,
    /// Nodes the user has opened.
    pub open: HashSet<NodeId>,
    /// Selected rows; the first is the cursor row.
    pub selected: Vec<NodeId>,
    /// Index into `rows` of the cursor.
    pub current_row: usize,
    /// Byte under the hex cursor.
    pub caret: u64,
    /// Other end of a byte selection while one is being extended.
    pub anchor: Option<u64>,
    /// Pane receiving navigation keys.
    pub focus: Focus,
    /// Bytes to paint for the current tree selection.
    pub highlight: Highlight,
    /// Status feedback displayed in the help bar.
    pub message: Option<String>,
    /// Bytes shown per hex row.
    pub bytes_per_row: usize,
    /// Bytes shown in a byte-buffer value before it is elided.
    pub bytes_preview: usize,
}

impl AppState {
    #[must_use]
    /// Sets up the viewer with the root open and its children on their way.
    pub fn new(mut tree: StructTree, data: Vec<u8>, cfg: &Config) -> Self {
        if cfg.eager_index {
            tree.materialize_all();
        }
        let root = tree.root();

        let mut app = Self {
            tree,
            expander: Expander::new(),
            sync: SelectionSync::new(cfg.selection_policy()),
            data,
            rows: Vec::new(),
            open: HashSet::from([root]),
            selected: vec![root],
            current_row: 0,
            caret: 0,
            anchor: None,
            focus: Focus::Tree,
            highlight: Highlight::default(),
            message: None,
            bytes_per_row: cfg.bytes_per_row.max(1),
            bytes_preview: cfg.bytes_preview,
        };
        app.start();
        app
    }

    /// Swaps in a freshly loaded tree and file, discarding every node of the old one.
    ///
    /// The expander is replaced too, so results still in flight for the old tree are dropped.
    pub fn replace_tree(&mut self, mut tree: StructTree, data: Vec<u8>, eager_index: bool) {
        if eager_index {
            tree.materialize_all();
        }
        let root = tree.root();
        self.tree = tree;
        self.data = data;
        self.expander = Expander::new();
        self.rows.clear();
        self.open = HashSet::from([root]);
        self.selected = vec![root];
        self.current_row = 0;
        self.caret = 0;
        self.anchor = None;
        self.start();
        self.message = Some("Reloaded".to_string());
    }

    /// Requests the root's children and shows the root selected.
    fn start(&mut self) {
        let root = self.tree.root();
        self.expander.request(&mut self.tree, root);
        self.sync.rebuild(&self.tree);
        self.refresh_rows();
        self.highlight_selection();
    }

    /// Attaches finished background expansions. Returns true if anything changed.
    pub fn tick(&mut self) -> bool {
        if self.expander.drain(&mut self.tree) == 0 {
            return false;
        }
        self.after_expansion();
        true
    }

    /// Blocks until every pending expansion has been attached.
    pub fn wait_for_expansions(&mut self) {
        if self.expander.in_flight() == 0 {
            return;
        }
        self.expander.wait_all(&mut self.tree);
        self.after_expansion();
    }

    fn after_expansion(&mut self) {
        self.sync.rebuild(&self.tree);
        self.refresh_rows();
        // deeper nodes may now cover the selected bytes
        if self.focus == Focus::Bytes {
            self.select_from_bytes();
        }
    }

    /// Re-flattens the tree, keeping the cursor on the same node when it is still visible.
    pub fn refresh_rows(&mut self) {
        let current = self.current_node();
        self.rows.clear();

        let mut pending = vec![(self.tree.root(), 0)];
        while let Some((node, tree_level)) = pending.pop() {
            self.rows.push(VisibleRow { node, tree_level });
            if self.open.contains(&node) {
                pending.extend(
                    self.tree
                        .loaded_children(node)
                        .iter()
                        .rev()
                        .map(|&child| (child, tree_level + 1)),
                );
            }
        }

        self.current_row = current
            .and_then(|node| self.row_of(node))
            .unwrap_or_else(|| self.current_row.min(self.rows.len().saturating_sub(1)));
    }

    /// Node under the tree cursor.
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.rows.get(self.current_row).map(|row| row.node)
    }

    /// Row showing `node`, if it is visible.
    #[must_use]
    pub fn row_of(&self, node: NodeId) -> Option<usize> {
        self.rows.iter().position(|row| row.node == node)
    }

    /// Moves the tree cursor to `row` and highlights that node's bytes.
    pub fn select_row(&mut self, row: usize) {
        let Some(visible) = self.rows.get(row) else {
            return;
        };
        self.current_row = row;
        self.selected = vec![visible.node];
        self.highlight_selection();
    }

    /// Tree → bytes for the current selection.
    pub fn highlight_selection(&mut self) {
        self.highlight = SelectionSync::highlight_nodes(&self.tree, &self.selected);
        self.anchor = None;
        if let Some(caret) = self.highlight.caret {
            self.caret = caret;
        }
        self.message = None;
    }

    /// Moves the cursor one row up.
    pub fn move_up(&mut self) {
        if self.current_row > 0 {
            self.select_row(self.current_row - 1);
        }
    }

    /// Moves the cursor one row down.
    pub fn move_down(&mut self) {
        if self.current_row + 1 < self.rows.len() {
            self.select_row(self.current_row + 1);
        }
    }

    /// Moves the cursor to the root row.
    pub fn move_to_first(&mut self) {
        self.select_row(0);
    }

    /// Moves the cursor to the last visible row.
    pub fn move_to_last(&mut self) {
        self.select_row(self.rows.len().saturating_sub(1));
    }

    /// Opens the current node, expanding it in the background if needed.
    pub fn open_current(&mut self) {
        let Some(node) = self.current_node() else {
            return;
        };
        if !self.tree.may_have_children(node) {
            return;
        }
        self.open.insert(node);
        if self.expander.request(&mut self.tree, node) {
            debug!(node = node.index(), "expansion requested");
        }
        self.refresh_rows();
    }

    /// Closes the current node, or moves to its parent if it is already closed.
    pub fn close_current(&mut self) {
        let Some(node) = self.current_node() else {
            return;
        };
        if self.open.remove(&node) {
            self.refresh_rows();
        } else if let Some(parent) = self.tree.parent(node) {
            if let Some(row) = self.row_of(parent) {
                self.select_row(row);
            }
        }
    }

    /// Opens the current node if it is closed, closes it otherwise.
    pub fn toggle_current(&mut self) {
        match self.current_node() {
            Some(node) if self.open.contains(&node) => self.close_current(),
            Some(_) => self.open_current(),
            None => {}
        }
    }

    /// Materializes the whole tree so byte selections can reach every field.
    pub fn expand_all(&mut self) {
        self.wait_for_expansions();
        self.tree.materialize_all();
        self.sync.rebuild(&self.tree);
        self.message = Some(format!("{} nodes loaded", self.tree.len()));
        self.refresh_rows();
    }

    /// Opens every ancestor of `node` so it gets a row.
    pub fn reveal(&mut self, node: NodeId) {
        let mut current = node;
        while let Some(parent) = self.tree.parent(current) {
            self.open.insert(parent);
            current = parent;
        }
    }

    /// Current byte interval: the extended selection, or the caret on its own.
    #[must_use]
    pub fn byte_interval(&self) -> ByteRange {
        match self.anchor {
            Some(anchor) => ByteRange::new(anchor.min(self.caret), anchor.max(self.caret) + 1),
            None => ByteRange::point(self.caret),
        }
    }

    /// Moves the hex cursor by `delta` bytes, optionally extending the selection.
    pub fn move_caret(&mut self, delta: i64, extend: bool) {
        if self.data.is_empty() {
            return;
        }
        if extend {
            self.anchor.get_or_insert(self.caret);
        } else {
            self.anchor = None;
        }
        let last = u64::try_from(self.data.len() - 1).unwrap_or(u64::MAX);
        let target = self.caret.saturating_add_signed(delta);
        self.caret = target.min(last);
        self.select_from_bytes();
    }

    /// Bytes → tree: selects the rows covering the current byte interval.
    pub fn select_from_bytes(&mut self) {
        let interval = self.byte_interval();
        let nodes: Vec<NodeId> = self
            .sync
            .select_bytes(interval)
            .iter()
            .filter_map(|path| self.tree.node_at(path))
            .collect();

        if nodes.is_empty() {
            self.message = Some(format!("No node covers {interval}"));
            self.selected.clear();
            self.highlight = Highlight::default();
            return;
        }

        for &node in &nodes {
            self.reveal(node);
        }
        self.refresh_rows();
        if let Some(row) = self.row_of(nodes[0]) {
            self.current_row = row;
        }
        self.highlight = SelectionSync::highlight_nodes(&self.tree, &nodes);
        self.selected = nodes;
        self.message = None;
    }

    /// Switches keyboard focus between the panes, dropping any byte selection anchor.
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Bytes,
            Focus::Bytes => Focus::Tree,
        };
        self.anchor = None;
    }

    /// Text for the status bar describing the cursor row.
    #[must_use]
    pub fn status(&self) -> String {
        let Some(node) = self.current_node() else {
            return String::new();
        };
        let path = self.tree.path_of(node);
        match self.tree.span(node) {
            Some(span) => format!("{path}  {span}  {} bytes", span.len()),
            None => format!("{path}  (no span)"),
        }
    }
}

#[cfg(test)]
#[path = "tests/app_state.rs"]
mod tests;
