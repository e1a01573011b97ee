//! Remapping configuration, loadable from TOML.
//!
//! ```toml
//! slots = 4
//! strict = false
//!
//! [[share]]
//! guest = 5
//! host = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RemapError, Result};
use crate::group::{ColorGroups, Share, DEFAULT_SLOTS};
use crate::simulate::PausePolicy;

/// User remapping settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemapConfig {
    /// Number of physical AMS slots.
    pub slots: u32,
    /// Treat adjacent same-slot requests across a layer change as conflicts.
    pub strict: bool,
    /// Slot shares.
    pub share: Vec<Share>,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            strict: false,
            share: Vec::new(),
        }
    }
}

impl RemapConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RemapError::ConfigParse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| RemapError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(
            "Loaded remap config from {} ({} shares)",
            path.display(),
            config.share.len()
        );
        Ok(config)
    }

    /// Pause policy selected by `strict`.
    pub fn policy(&self) -> PausePolicy {
        if self.strict {
            PausePolicy::Strict
        } else {
            PausePolicy::LayerBoundary
        }
    }

    /// Resolve the shares for a job with `color_count` colors.
    pub fn resolve(&self, color_count: u32) -> Result<ColorGroups> {
        ColorGroups::resolve(color_count, self.slots, &self.share)
    }
}
