//! bytescope: structural tree and byte-range correlation for parsed binary files.
//!
//! A parser's object graph is wrapped in a lazily expanded [`tree::StructTree`] whose nodes
//! carry absolute byte spans, and a [`selection::SelectionSync`] maps tree selections to byte
//! highlights and byte selections back to tree paths.
#![allow(clippy::multiple_crate_versions)]

pub mod app_state;
pub mod config;
pub mod dump;
pub mod error;
pub mod expand;
pub mod graph;
pub mod index;
pub mod node;
pub mod palette;
pub mod schema;
pub mod selection;
pub mod span;
pub mod tree;
pub mod ui;

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;
