//! Configuration to acknowledge developer preferences as well as set defaults.
//!
//! Specifically, we try to find a bytescope.toml, and if present we load settings from there.
//! This provides the hex view layout, the value preview length, and the offset and selection
//! conventions used when a tree is built.

use crate::selection::SelectionPolicy;
use crate::span::OffsetMode;
use facet::Facet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// File looked up in the working directory.
pub const CONFIG_FILE: &str = "bytescope.toml";

#[derive(Facet, Clone, Debug)]
/// User preferences loaded from bytescope.toml or falling back to defaults.
pub struct Config {
    #[facet(default = 16)]
    /// Bytes shown per row of the hex view.
    pub bytes_per_row: usize,
    #[facet(default = 8)]
    /// Bytes shown in a byte-buffer value before it is elided.
    pub bytes_preview: usize,
    #[facet(default = "relative".to_string())]
    /// How recorded offsets relate to file positions: relative, absolute or inferred.
    pub offset_mode: String,
    #[facet(default = "first".to_string())]
    /// Which overlapping nodes a byte selection selects: first or all.
    pub selection_policy: String,
    #[facet(default = false)]
    /// Materialize the whole tree up front so byte selections can reach collapsed fields.
    pub eager_index: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bytes_per_row: 16,
            bytes_preview: 8,
            offset_mode: OffsetMode::default().to_string(),
            selection_policy: SelectionPolicy::default().to_string(),
            eager_index: false,
        }
    }
}

impl Config {
    #[must_use]
    /// Load configuration from bytescope.toml if present.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    #[must_use]
    /// Load configuration from `path`, falling back to defaults if it is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        Self::from_toml(&contents).unwrap_or_else(|| {
            warn!(path = %path.display(), "ignoring invalid configuration file");
            Self::default()
        })
    }

    #[must_use]
    /// Parse configuration from TOML text, or `None` if it is invalid.
    pub fn from_toml(contents: &str) -> Option<Self> {
        facet_toml::from_str::<Self>(contents).ok()
    }

    #[must_use]
    /// The configured offset mode, or the default if the setting is not recognised.
    pub fn offset_mode(&self) -> OffsetMode {
        self.offset_mode.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "falling back to the default offset mode");
            OffsetMode::default()
        })
    }

    #[must_use]
    /// The configured selection policy, or the default if the setting is not recognised.
    pub fn selection_policy(&self) -> SelectionPolicy {
        self.selection_policy.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "falling back to the default selection policy");
            SelectionPolicy::default()
        })
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
