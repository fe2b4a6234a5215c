//! Configuration structures for Vellum.

use crate::error::{Result, VellumError};
use serde::{Deserialize, Serialize};

/// Configuration for a number tree instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Rebuild a damaged tree from its recoverable entries instead of
    /// failing with a structural error.
    pub auto_repair: bool,
    /// Maximum number of (key, value) pairs per leaf node.
    pub leaf_capacity: usize,
    /// Maximum traversal depth before a tree is considered damaged.
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            auto_repair: true,
            leaf_capacity: 32,
            max_depth: 64,
        }
    }
}

impl TreeConfig {
    /// Returns a configuration with auto-repair disabled; structural
    /// problems surface as errors instead of being repaired.
    pub fn strict() -> Self {
        Self {
            auto_repair: false,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Any `leaf_capacity >= 2` preserves tree invariants; smaller values
    /// cannot host a split.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_capacity < 2 {
            return Err(VellumError::InvalidConfig {
                name: "leaf_capacity".to_string(),
                value: self.leaf_capacity.to_string(),
            });
        }
        if self.max_depth == 0 {
            return Err(VellumError::InvalidConfig {
                name: "max_depth".to_string(),
                value: self.max_depth.to_string(),
            });
        }
        Ok(())
    }
}
