//! Configuration types for the engine.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::MIN_SIDE;
use crate::neighborhood::Neighborhood;
use crate::partition::{Band, partition};
use crate::transition::Ruleset;

/// Top-level engine configuration.
///
/// Fixed for the lifetime of a run. Loaded from JSON or assembled from CLI
/// flags; missing fields fall back to [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global grid rows
    pub rows: usize,

    /// Global grid columns
    pub cols: usize,

    /// Birth / loneliness / overpopulation thresholds
    pub rules: Ruleset,

    /// Neighbour definition
    pub neighborhood: Neighborhood,

    /// Number of generations to compute and persist
    pub iterations: u64,

    /// Worker count; each worker owns one row band
    pub workers: usize,

    /// How long the driver waits for one gathered generation (milliseconds)
    pub gather_timeout_ms: u64,

    /// Local partitions with at least this many cells step in parallel
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: 64,
            cols: 64,
            rules: Ruleset::CONWAY,
            neighborhood: Neighborhood::Moore,
            iterations: 100,
            workers: 4,
            gather_timeout_ms: 10_000,
            parallel_threshold: 64 * 1024,
        }
    }
}

impl EngineConfig {
    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Check every startup invariant and compute the band assignment.
    pub fn validate(&self) -> Result<Vec<Band>, ConfigError> {
        if self.rows < MIN_SIDE || self.cols < MIN_SIDE {
            return Err(ConfigError::GridTooSmall {
                rows: self.rows,
                cols: self.cols,
                min: MIN_SIDE,
            });
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        partition(self.rows, self.workers)
    }
}
