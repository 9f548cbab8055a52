use super::Config;
use crate::selection::SelectionPolicy;
use crate::span::OffsetMode;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.bytes_per_row, 16);
    assert_eq!(cfg.bytes_preview, 8);
    assert_eq!(cfg.offset_mode(), OffsetMode::Relative);
    assert_eq!(cfg.selection_policy(), SelectionPolicy::First);
    assert!(!cfg.eager_index);
}

#[test]
fn test_unknown_mode_falls_back() {
    let cfg = Config {
        offset_mode: "diagonal".to_string(),
        selection_policy: "most".to_string(),
        ..Config::default()
    };
    assert_eq!(cfg.offset_mode(), OffsetMode::Relative);
    assert_eq!(cfg.selection_policy(), SelectionPolicy::First);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load_from(&dir.path().join("bytescope.toml"));
    assert_eq!(cfg.bytes_per_row, 16);
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "bytes_per_row = 8\nbytes_preview = 4\noffset_mode = \"absolute\"\nselection_policy = \"all\"\neager_index = true"
    )
    .unwrap();

    let cfg = Config::load_from(file.path());
    assert_eq!(cfg.bytes_per_row, 8);
    assert_eq!(cfg.bytes_preview, 4);
    assert_eq!(cfg.offset_mode(), OffsetMode::Absolute);
    assert_eq!(cfg.selection_policy(), SelectionPolicy::All);
    assert!(cfg.eager_index);
}
