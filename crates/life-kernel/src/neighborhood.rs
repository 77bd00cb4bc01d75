//! Neighbourhood rules: how many live cells surround an interior cell.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::Grid;

/// Counts live neighbours of the interior cell at `(row, col)`.
///
/// Callers must keep `1 <= row <= height - 2` and `1 <= col <= width - 2`;
/// the ghost rows exist so every authoritative interior row satisfies this.
pub type NeighborCount = fn(&Grid, usize, usize) -> u8;

/// Which cells count as neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// The 8 cells of the surrounding 3x3 block.
    #[default]
    Moore,
    /// The 4 orthogonally adjacent cells.
    VonNeumann,
}

impl Neighborhood {
    /// Resolve the counting function once, so the per-cell loop never branches
    /// on the variant.
    pub fn counter(self) -> NeighborCount {
        match self {
            Neighborhood::Moore => moore,
            Neighborhood::VonNeumann => von_neumann,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Neighborhood::Moore => "moore",
            Neighborhood::VonNeumann => "von-neumann",
        }
    }
}

impl fmt::Display for Neighborhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Neighborhood {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moore" | "m" => Ok(Neighborhood::Moore),
            "von-neumann" | "von_neumann" | "vonneumann" | "vn" => Ok(Neighborhood::VonNeumann),
            other => Err(ConfigError::InvalidNeighborhood(other.to_string())),
        }
    }
}

/// Moore neighbourhood: all 8 cells around `(row, col)`.
pub fn moore(grid: &Grid, row: usize, col: usize) -> u8 {
    let above = grid.row(row - 1);
    let here = grid.row(row);
    let below = grid.row(row + 1);
    above[col - 1]
        + above[col]
        + above[col + 1]
        + here[col - 1]
        + here[col + 1]
        + below[col - 1]
        + below[col]
        + below[col + 1]
}

/// Von Neumann neighbourhood: north, south, west and east of `(row, col)`.
pub fn von_neumann(grid: &Grid, row: usize, col: usize) -> u8 {
    let here = grid.row(row);
    grid.row(row - 1)[col] + here[col - 1] + here[col + 1] + grid.row(row + 1)[col]
}
