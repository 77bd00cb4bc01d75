//! Initial grid states.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};
use crate::grid::{ALIVE, Grid};

/// The five-cell glider the classic runs start from.
pub const GLIDER: [(usize, usize); 5] = [(1, 3), (2, 1), (2, 3), (3, 2), (3, 3)];

/// How to populate generation 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Seed {
    /// A single glider near the top-left corner.
    #[default]
    Glider,
    /// Exactly these `(row, col)` cells alive.
    Cells { cells: Vec<(usize, usize)> },
    /// Each interior cell alive with probability `density`, reproducible from
    /// `seed`.
    Random { density: f64, seed: u64 },
}

impl Seed {
    /// Build the global grid for generation 0.
    pub fn build(&self, rows: usize, cols: usize) -> Result<Grid, EngineError> {
        let mut grid = Grid::new(rows, cols);
        match self {
            Seed::Glider => {
                for (r, c) in GLIDER {
                    grid.set(r, c, ALIVE)?;
                }
            }
            Seed::Cells { cells } => {
                for &(r, c) in cells {
                    grid.set(r, c, ALIVE)?;
                }
            }
            Seed::Random { density, seed } => {
                if !(0.0..=1.0).contains(density) {
                    return Err(ConfigError::InvalidDensity(*density).into());
                }
                let mut rng = StdRng::seed_from_u64(*seed);
                // The outer ring never changes, so keep it dead.
                for r in 1..rows.saturating_sub(1) {
                    for c in 1..cols.saturating_sub(1) {
                        if rng.gen_bool(*density) {
                            grid.set(r, c, ALIVE)?;
                        }
                    }
                }
            }
        }
        Ok(grid)
    }
}
