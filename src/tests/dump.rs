use super::{load_dump, parse_dump};
use crate::error::LoadError;
use crate::graph::Value;
use crate::node::NodeKind;
use crate::schema::{FieldRole, TypeTag};
use crate::span::{ByteRange, OffsetMode};
use crate::tree::{StructTree, TreePath};
use std::io::Write;
use tempfile::NamedTempFile;

const PNG_LIKE: &str = r#"{
  "types": {
    "image": {
      "seq": [
        { "name": "magic", "type": "bytes" },
        { "name": "kind", "type": "u1", "enum": "color_kind" },
        { "name": "chunks", "type": "chunk", "repeat": true }
      ],
      "instances": [
        { "name": "chunk_count", "type": "u4" }
      ]
    },
    "chunk": {
      "seq": [
        { "name": "len", "type": "u2" },
        { "name": "body", "type": "bytes" }
      ]
    }
  },
  "enums": {
    "color_kind": [
      { "name": "gray", "value": 0 },
      { "name": "rgb", "value": 2 }
    ]
  },
  "root": {
    "type": "image",
    "end": 13,
    "fields": {
      "magic": { "bytes": [137, 80, 78, 71] },
      "kind": { "enum": 2 },
      "chunks": { "array": [
        { "struct": {
          "type": "chunk", "end": 4,
          "fields": { "len": { "u": 2 }, "body": { "bytes": [1, 2] } },
          "attr_start": { "len": 0, "body": 2 },
          "attr_end": { "len": 2, "body": 4 }
        } },
        { "struct": {
          "type": "chunk", "end": 4,
          "fields": { "len": { "u": 2 }, "body": { "bytes": [3, 4] } },
          "attr_start": { "len": 0, "body": 2 },
          "attr_end": { "len": 2, "body": 4 }
        } }
      ] },
      "chunk_count": { "u": 2 }
    },
    "attr_start": { "magic": 0, "kind": 4, "chunks": 5 },
    "attr_end": { "magic": 4, "kind": 5, "chunks": 13 },
    "arr_start": { "chunks": [0, 4] },
    "arr_end": { "chunks": [4, 8] }
  }
}"#;

#[test]
fn test_parse_types_and_root() {
    let loaded = parse_dump(PNG_LIKE).unwrap();

    let image = loaded.registry.struct_type("image").unwrap();
    let names: Vec<&str> = image.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["magic", "kind", "chunks", "chunk_count"]);
    assert_eq!(image.field("chunk_count").unwrap().role, FieldRole::Derived);
    assert!(image.field("chunks").unwrap().repeated);
    assert!(matches!(
        &image.field("chunks").unwrap().tag,
        TypeTag::Struct(name) if name == "chunk"
    ));
    assert!(matches!(&image.field("kind").unwrap().tag, TypeTag::Enum(_)));

    assert_eq!(loaded.root.consumed_len(), 13);
    assert_eq!(loaded.root.field_span("kind"), Some((4, 5)));
    assert!(matches!(loaded.root.field("kind"), Ok(Value::Enum(2))));
}

#[test]
fn test_loaded_dump_builds_a_tree() {
    let loaded = parse_dump(PNG_LIKE).unwrap();
    let mut tree = StructTree::new(loaded.root, OffsetMode::Relative);
    tree.materialize_all();

    let kind = tree.node_at(&TreePath::from(vec![1])).unwrap();
    assert_eq!(tree.kind(kind), NodeKind::Enum);
    assert_eq!(tree.label(kind, 8), "kind: color_kind::rgb (0x2)");

    let body = tree.node_at(&TreePath::from(vec![2, 1, 1])).unwrap();
    assert_eq!(tree.span(body), Some(ByteRange::new(11, 13)));
    assert_eq!(tree.label(body, 8), "body: bytes = [0x03, 0x04]");

    let count = tree.node_at(&TreePath::from(vec![3])).unwrap();
    assert_eq!(tree.span(count), None);
}

#[test]
fn test_unknown_enum_is_rejected() {
    let json = r#"{
      "types": { "t": { "seq": [ { "name": "k", "type": "u1", "enum": "nope" } ] } },
      "root": { "type": "t" }
    }"#;
    match parse_dump(json) {
        Err(LoadError::UnknownType { owner, name }) => {
            assert_eq!(owner, "t");
            assert_eq!(name, "nope");
        }
        other => panic!("expected unknown type, got {:?}", other.err()),
    }
}

#[test]
fn test_unknown_struct_value_is_rejected() {
    let json = r#"{
      "types": { "t": { "seq": [ { "name": "inner", "type": "t" } ] } },
      "root": { "type": "t", "fields": { "inner": { "struct": { "type": "ghost" } } } }
    }"#;
    assert!(matches!(
        parse_dump(json),
        Err(LoadError::UnknownStruct(name)) if name == "ghost"
    ));
}

#[test]
fn test_struct_under_unknown_type_name_is_rejected() {
    let json = r#"{
      "types": {
        "t": { "seq": [ { "name": "parts", "type": "prat", "repeat": true } ] },
        "part": { "seq": [] }
      },
      "root": {
        "type": "t",
        "fields": { "parts": { "array": [ { "struct": { "type": "part" } } ] } }
      }
    }"#;
    match parse_dump(json) {
        Err(LoadError::UnknownType { owner, name }) => {
            assert_eq!(owner, "t");
            assert_eq!(name, "prat");
        }
        other => panic!("expected unknown type, got {:?}", other.err()),
    }
}

#[test]
fn test_malformed_json() {
    assert!(matches!(parse_dump("{ not json"), Err(LoadError::Json(_))));
}

#[test]
fn test_recorded_errors_reach_the_accessor() {
    let json = r#"{
      "types": { "t": { "seq": [ { "name": "tail", "type": "u4" } ] } },
      "root": { "type": "t", "end": 2, "errors": { "tail": "end of stream" } }
    }"#;
    let loaded = parse_dump(json).unwrap();
    let err = loaded.root.field("tail").unwrap_err();
    assert!(err.to_string().contains("end of stream"));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(PNG_LIKE.as_bytes()).unwrap();

    let loaded = load_dump(file.path()).unwrap();
    assert_eq!(loaded.root.struct_type().name, "image");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_dump(&dir.path().join("absent.json")),
        Err(LoadError::Io(_))
    ));
}
