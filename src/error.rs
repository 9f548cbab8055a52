//! Error types for loading parse dumps and materializing subtrees.
//!
//! Loading errors abort a load. Everything that goes wrong while expanding a single node is an
//! [`ExpandError`], which the tree turns into an `[error]` leaf so the rest stays navigable.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
/// A parse dump could not be loaded.
pub enum LoadError {
    /// The dump file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The dump is not valid JSON or does not have the expected shape.
    #[error("Invalid parse dump: {0}")]
    Json(#[from] serde_json::Error),
    /// A field declaration names a type that was never declared.
    #[error("Type `{owner}` refers to unknown type `{name}`")]
    UnknownType {
        /// Structure type holding the field.
        owner: String,
        /// The unresolved type name.
        name: String,
    },
    /// A structure value carries an undeclared type name.
    #[error("Structure value refers to unknown type `{0}`")]
    UnknownStruct(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// A field accessor could not produce a value.
pub enum AccessError {
    /// The structure's type has no field by this name.
    #[error("no field `{0}` on this structure")]
    NoSuchField(String),
    /// The accessor ran and failed.
    #[error("accessor for `{field}` failed: {reason}")]
    Failed {
        /// Field whose accessor failed.
        field: String,
        /// What the parser reported.
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Something went wrong while materializing one node or its children.
pub enum ExpandError {
    /// A field accessor failed.
    #[error(transparent)]
    FieldAccess(#[from] AccessError),
    /// An array's recorded offsets do not line up with its elements.
    #[error("array `{field}` has {elements} elements but {starts} start and {ends} end offsets")]
    OffsetMismatch {
        /// The repeated field.
        field: String,
        /// Number of elements the accessor returned.
        elements: usize,
        /// Number of recorded start offsets.
        starts: usize,
        /// Number of recorded end offsets.
        ends: usize,
    },
    /// A value does not have the shape its declared type calls for.
    #[error("field `{field}` is declared as {expected} but holds {found}")]
    KindMismatch {
        /// The offending field or element.
        field: String,
        /// Shape the type tag asks for.
        expected: &'static str,
        /// Shape actually found.
        found: &'static str,
    },
    /// The background job could not run or panicked.
    #[error("expansion task failed: {0}")]
    TaskFailed(String),
}
