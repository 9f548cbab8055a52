use super::{AppState, Focus};
use crate::config::Config;
use crate::fixtures;
use crate::span::{ByteRange, OffsetMode};
use crate::tree::{StructTree, TreePath};

fn app_for(root: std::sync::Arc<dyn crate::graph::ParsedStruct>, cfg: &Config) -> AppState {
    let tree = StructTree::new(root, OffsetMode::Relative);
    let data: Vec<u8> = (0..16).collect();
    let mut app = AppState::new(tree, data, cfg);
    app.wait_for_expansions();
    app
}

fn path_of_current(app: &AppState) -> TreePath {
    app.tree.path_of(app.current_node().unwrap())
}

#[test]
fn test_root_opens_on_start() {
    let app = app_for(fixtures::header_and_records(false), &Config::default());
    // root, header, records
    assert_eq!(app.rows.len(), 3);
    assert_eq!(app.rows[1].tree_level, 1);
    assert_eq!(app.highlight.ranges, vec![ByteRange::new(0, 16)]);
}

#[test]
fn test_selecting_a_row_highlights_its_bytes() {
    let mut app = app_for(fixtures::header_and_records(false), &Config::default());
    app.move_down();
    app.move_down();

    assert_eq!(path_of_current(&app), TreePath::from(vec![1]));
    assert_eq!(app.highlight.ranges, vec![ByteRange::new(4, 16)]);
    assert_eq!(app.caret, 4);
}

#[test]
fn test_open_and_close_rows() {
    let mut app = app_for(fixtures::header_and_records(false), &Config::default());
    app.select_row(2);
    app.open_current();
    app.wait_for_expansions();
    assert_eq!(app.rows.len(), 6);
    assert_eq!(path_of_current(&app), TreePath::from(vec![1]));

    app.close_current();
    assert_eq!(app.rows.len(), 3);

    // closing a closed node moves to its parent
    app.close_current();
    assert_eq!(path_of_current(&app), TreePath::root());
}

#[test]
fn test_leaf_does_not_open() {
    let mut app = app_for(fixtures::header_and_records(false), &Config::default());
    app.select_row(1);
    app.open_current();
    assert!(!app.open.contains(&app.current_node().unwrap()));
    assert_eq!(app.expander.in_flight(), 0);
}

#[test]
fn test_caret_selects_and_reveals_loaded_node() {
    let mut app = app_for(fixtures::header_and_records(false), &Config::default());
    app.select_row(2);
    app.open_current();
    app.wait_for_expansions();
    app.close_current();
    assert_eq!(app.rows.len(), 3);

    app.toggle_focus();
    app.caret = 8;
    app.move_caret(1, false);

    assert_eq!(app.focus, Focus::Bytes);
    assert_eq!(path_of_current(&app), TreePath::from(vec![1, 1]));
    assert_eq!(app.rows.len(), 6, "records should be reopened");
    assert_eq!(app.caret, 9);
}

#[test]
fn test_extended_byte_selection() {
    let cfg = Config {
        selection_policy: "all".to_string(),
        eager_index: true,
        ..Config::default()
    };
    let mut app = app_for(fixtures::header_and_records(false), &cfg);
    app.toggle_focus();
    app.caret = 4;
    app.move_caret(5, true);

    assert_eq!(app.byte_interval(), ByteRange::new(4, 10));
    let paths: Vec<TreePath> = app
        .selected
        .iter()
        .map(|&node| app.tree.path_of(node))
        .collect();
    assert_eq!(
        paths,
        vec![TreePath::from(vec![1, 0, 0]), TreePath::from(vec![1, 1, 0])]
    );
    assert_eq!(
        app.highlight.ranges,
        vec![ByteRange::new(4, 6), ByteRange::new(8, 10)]
    );
}

#[test]
fn test_caret_outside_every_node() {
    let mut app = app_for(fixtures::array_of_records(), &Config::default());
    app.expand_all();
    app.toggle_focus();
    app.caret = 6;
    app.move_caret(0, false);

    assert!(app.selected.is_empty());
    assert!(app.highlight.is_empty());
    assert!(app.message.is_some());
}

#[test]
fn test_caret_stays_in_file() {
    let mut app = app_for(fixtures::array_of_records(), &Config::default());
    app.move_caret(100, false);
    assert_eq!(app.caret, 15);
    app.move_caret(-100, false);
    assert_eq!(app.caret, 0);
}

#[test]
fn test_status_shows_path_and_span() {
    let mut app = app_for(fixtures::kitchen_sink(), &Config::default());
    app.select_row(1);
    assert_eq!(app.status(), "/0  [0x0, 0x1)  1 bytes");
    app.move_to_last();
    assert_eq!(app.status(), "/7  (no span)");
}

#[test]
fn test_replace_tree_discards_old_nodes() {
    let mut app = app_for(fixtures::header_and_records(false), &Config::default());
    app.select_row(2);
    app.open_current();

    let tree = StructTree::new(fixtures::kitchen_sink(), OffsetMode::Relative);
    app.replace_tree(tree, vec![0; 16], false);
    app.wait_for_expansions();

    assert_eq!(app.current_row, 0);
    assert_eq!(app.rows.len(), 9);
    assert_eq!(app.tree.label(app.rows[1].node, 8), "letter: Letter::B (0x1)");
    assert_eq!(app.expander.in_flight(), 0);
}
