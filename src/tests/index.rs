use super::SpanIndex;
use crate::fixtures;
use crate::span::{ByteRange, OffsetMode};
use crate::tree::{StructTree, TreePath};

#[test]
fn test_fresh_tree_indexes_root_only() {
    let tree = StructTree::new(fixtures::array_of_records(), OffsetMode::Relative);
    let index = SpanIndex::build(&tree);

    assert_eq!(index.len(), 1);
    let root = index.get(&TreePath::root()).unwrap();
    assert_eq!(root.span, ByteRange::new(0, 12));
    assert!(root.frontier);
}

#[test]
fn test_partial_materialization() {
    let mut tree = StructTree::new(fixtures::array_of_records(), OffsetMode::Relative);
    let root = tree.root();
    let records = tree.child_at(root, 0).unwrap();
    tree.expand_now(records);

    let index = SpanIndex::build(&tree);
    // root, array, three unexpanded elements
    assert_eq!(index.len(), 5);
    assert!(!index.get(&TreePath::root()).unwrap().frontier);
    assert!(!index.get(&TreePath::from(vec![0])).unwrap().frontier);

    let frontier: Vec<TreePath> = index.frontier().map(|entry| entry.path.clone()).collect();
    assert_eq!(
        frontier,
        vec![
            TreePath::from(vec![0, 0]),
            TreePath::from(vec![0, 1]),
            TreePath::from(vec![0, 2])
        ]
    );
    // grandchildren are not materialized yet
    assert!(index.get(&TreePath::from(vec![0, 0, 0])).is_none());
}

#[test]
fn test_full_materialization_matches_tree() {
    let mut tree = StructTree::new(fixtures::header_and_records(false), OffsetMode::Relative);
    tree.materialize_all();
    let index = SpanIndex::build(&tree);

    for entry in index.entries() {
        assert_eq!(tree.path_of(entry.node), entry.path);
        assert_eq!(tree.span(entry.node), Some(entry.span));
    }
    assert_eq!(
        index.span_of(&TreePath::from(vec![1, 1, 0])),
        Some(ByteRange::new(8, 10))
    );
}

#[test]
fn test_entries_are_in_display_order() {
    let mut tree = StructTree::new(fixtures::header_and_records(false), OffsetMode::Relative);
    tree.materialize_all();
    let index = SpanIndex::build(&tree);

    let paths: Vec<&TreePath> = index.entries().iter().map(|entry| &entry.path).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn test_spanless_nodes_are_skipped() {
    let mut tree = StructTree::new(fixtures::kitchen_sink(), OffsetMode::Relative);
    tree.materialize_all();
    let index = SpanIndex::build(&tree);

    for entry in index.entries() {
        let name = &tree.node(entry.node).data.name;
        assert!(
            !matches!(name.as_str(), "missing" | "broken" | "checksum"),
            "{name} should not be indexed"
        );
    }
    // skewed keeps its field span even though its elements could not be placed
    assert!(index
        .entries()
        .iter()
        .any(|entry| tree.node(entry.node).data.name == "skewed"));
}

#[test]
fn test_absolute_fields_under_derived_owner_are_indexed() {
    let mut tree = StructTree::new(fixtures::derived_inner(), OffsetMode::Absolute);
    tree.materialize_all();
    let index = SpanIndex::build(&tree);

    assert!(index.get(&TreePath::from(vec![0])).is_none());
    assert_eq!(
        index.span_of(&TreePath::from(vec![0, 0])),
        Some(ByteRange::new(8, 10))
    );
    assert!(index.get(&TreePath::from(vec![0, 1])).is_none());
    let frontier: Vec<TreePath> = index.frontier().map(|entry| entry.path.clone()).collect();
    // the root's only child is spanless, so the root stays on the frontier too
    assert_eq!(
        frontier,
        vec![
            TreePath::root(),
            TreePath::from(vec![0, 0]),
            TreePath::from(vec![0, 2, 0]),
            TreePath::from(vec![0, 2, 1])
        ]
    );
}
