use super::Expander;
use crate::error::{AccessError, ExpandError};
use crate::fixtures;
use crate::graph::{ParsedStruct, Value};
use crate::node::NodeKind;
use crate::schema::StructType;
use crate::span::OffsetMode;
use crate::tree::{Expansion, StructTree, ERROR_LEAF_NAME};
use std::sync::Arc;

/// Structure whose accessors panic instead of returning.
#[derive(Debug)]
struct Exploding {
    struct_type: Arc<StructType>,
}

impl Exploding {
    fn new() -> Arc<dyn ParsedStruct> {
        Arc::new(Self {
            struct_type: Arc::new(StructType::new(
                "exploding",
                vec![fixtures::field("fuse", fixtures::scalar("u1"))],
            )),
        })
    }
}

impl ParsedStruct for Exploding {
    fn struct_type(&self) -> &Arc<StructType> {
        &self.struct_type
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        panic!("accessor for {name} blew up");
    }

    fn field_span(&self, _name: &str) -> Option<(u64, u64)> {
        None
    }

    fn element_offsets(&self, _name: &str) -> Option<(&[u64], &[u64])> {
        None
    }

    fn consumed_len(&self) -> u64 {
        1
    }
}

#[test]
fn test_background_expansion_attaches_children() {
    let mut tree = StructTree::new(fixtures::array_of_records(), OffsetMode::Relative);
    let mut expander = Expander::new();
    let root = tree.root();

    assert!(expander.request(&mut tree, root));
    assert_eq!(expander.in_flight(), 1);
    assert_eq!(tree.expansion(root), Expansion::Expanding);

    expander.wait_all(&mut tree);
    assert_eq!(expander.in_flight(), 0);
    assert_eq!(tree.expansion(root), Expansion::Expanded);
    assert_eq!(tree.loaded_children(root).len(), 1);
}

#[test]
fn test_second_request_is_ignored() {
    let mut tree = StructTree::new(fixtures::array_of_records(), OffsetMode::Relative);
    let mut expander = Expander::new();
    let root = tree.root();

    assert!(expander.request(&mut tree, root));
    assert!(!expander.request(&mut tree, root));
    expander.wait_all(&mut tree);
    assert!(!expander.request(&mut tree, root));

    assert_eq!(tree.loaded_children(root).len(), 1);
}

#[test]
fn test_leaf_request_starts_nothing() {
    let mut tree = StructTree::new(fixtures::kitchen_sink(), OffsetMode::Relative);
    let mut expander = Expander::new();
    let letter = tree.child_at(tree.root(), 0).unwrap();

    assert!(!expander.request(&mut tree, letter));
    assert_eq!(expander.in_flight(), 0);
}

#[test]
fn test_panicking_job_becomes_error_leaf() {
    let mut tree = StructTree::new(Exploding::new(), OffsetMode::Relative);
    let mut expander = Expander::new();
    let root = tree.root();

    assert!(expander.request(&mut tree, root));
    expander.wait_all(&mut tree);

    assert_eq!(tree.expansion(root), Expansion::Failed);
    let children = tree.loaded_children(root).to_vec();
    assert_eq!(children.len(), 1);

    let leaf = tree.node(children[0]);
    assert_eq!(leaf.data.name, ERROR_LEAF_NAME);
    assert_eq!(leaf.data.kind(), NodeKind::Error);
    match leaf.data.error_detail() {
        Some(ExpandError::TaskFailed(message)) => assert!(message.contains("blew up")),
        other => panic!("unexpected error detail: {other:?}"),
    }

    // the failed node is not retried
    assert!(!expander.request(&mut tree, root));
}

#[test]
fn test_drain_attaches_only_finished_jobs() {
    let mut tree = StructTree::new(fixtures::header_and_records(false), OffsetMode::Relative);
    let mut expander = Expander::new();
    let root = tree.root();

    expander.request(&mut tree, root);
    let mut attached = 0;
    while attached == 0 {
        attached = expander.drain(&mut tree);
        std::thread::yield_now();
    }
    assert_eq!(attached, 1);
    assert_eq!(expander.drain(&mut tree), 0);
    assert_eq!(tree.loaded_children(root).len(), 2);
}

#[test]
fn test_siblings_expand_independently() {
    let mut tree = StructTree::new(fixtures::header_and_records(false), OffsetMode::Relative);
    let mut expander = Expander::new();
    let records = tree.child_at(tree.root(), 1).unwrap();
    tree.expand_now(records);

    let elements = tree.loaded_children(records).to_vec();
    for &element in &elements {
        assert!(expander.request(&mut tree, element));
    }
    assert_eq!(expander.in_flight(), elements.len());

    expander.wait_all(&mut tree);
    for &element in &elements {
        assert_eq!(tree.expansion(element), Expansion::Expanded);
        assert_eq!(tree.loaded_children(element).len(), 1);
    }
}
