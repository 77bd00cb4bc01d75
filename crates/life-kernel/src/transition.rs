//! The threshold transition: birth, loneliness and overpopulation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::{ALIVE, Cell, DEAD, Grid};
use crate::neighborhood::{NeighborCount, Neighborhood};

/// Birth/survival thresholds, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Neighbour count that turns a dead cell alive.
    pub birth: u8,
    /// A live cell with strictly fewer neighbours dies.
    pub loneliness: u8,
    /// A live cell with strictly more neighbours dies.
    pub overpopulation: u8,
}

impl Ruleset {
    /// Conway's B3/S23.
    pub const CONWAY: Ruleset = Ruleset {
        birth: 3,
        loneliness: 2,
        overpopulation: 3,
    };

    /// Next state of one cell given its live neighbour count.
    #[inline]
    pub fn apply(&self, cell: Cell, neighbors: u8) -> Cell {
        if cell != DEAD {
            if neighbors < self.loneliness || neighbors > self.overpopulation {
                DEAD
            } else {
                cell
            }
        } else if neighbors == self.birth {
            ALIVE
        } else {
            DEAD
        }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::CONWAY
    }
}

/// A ruleset bound to a neighbourhood counter.
///
/// Only interior cells (rows `1..height-1`, cols `1..width-1`) are written;
/// ghost rows and the outer columns of `next` are left untouched.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    rules: Ruleset,
    neighborhood: Neighborhood,
    count: NeighborCount,
}

impl Transition {
    pub fn new(rules: Ruleset, neighborhood: Neighborhood) -> Self {
        Self {
            rules,
            neighborhood,
            count: neighborhood.counter(),
        }
    }

    pub fn rules(&self) -> Ruleset {
        self.rules
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Compute `next` from `current`, one row at a time.
    pub fn step(&self, current: &Grid, next: &mut Grid) {
        debug_assert_eq!(current.height(), next.height());
        debug_assert_eq!(current.width(), next.width());
        let height = current.height();
        for row in 1..height.saturating_sub(1) {
            self.step_row(current, row, next.row_mut(row));
        }
    }

    /// Same as [`Transition::step`] with interior rows spread over the rayon
    /// pool. Every output cell reads only `current`, so rows are independent.
    pub fn step_parallel(&self, current: &Grid, next: &mut Grid) {
        debug_assert_eq!(current.height(), next.height());
        debug_assert_eq!(current.width(), next.width());
        let width = current.width();
        let height = current.height();
        if height < 3 || width < 3 {
            return;
        }
        next.as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .skip(1)
            .take(height - 2)
            .for_each(|(row, out)| self.step_row(current, row, out));
    }

    fn step_row(&self, current: &Grid, row: usize, out: &mut [Cell]) {
        let width = current.width();
        let cells = current.row(row);
        for col in 1..width.saturating_sub(1) {
            let n = (self.count)(current, row, col);
            out[col] = self.rules.apply(cells[col], n);
        }
    }
}
