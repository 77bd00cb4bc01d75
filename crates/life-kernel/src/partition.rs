//! Row-band decomposition of the global grid.
//!
//! Each worker owns a contiguous band of global rows plus one ghost row on
//! every side that has a neighbouring band. Band assignment is computed once
//! at startup and never changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{Cell, Grid};

/// Identity of one worker within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerContext {
    pub rank: usize,
    pub world_size: usize,
}

impl WorkerContext {
    pub fn new(rank: usize, world_size: usize) -> Self {
        debug_assert!(rank < world_size);
        Self { rank, world_size }
    }

    /// Rank of the band above, if any.
    pub fn north(&self) -> Option<usize> {
        self.rank.checked_sub(1)
    }

    /// Rank of the band below, if any.
    pub fn south(&self) -> Option<usize> {
        (self.rank + 1 < self.world_size).then_some(self.rank + 1)
    }

    pub fn is_first(&self) -> bool {
        self.rank == 0
    }

    pub fn is_last(&self) -> bool {
        self.rank + 1 == self.world_size
    }
}

/// Global rows `[row_start, row_end)` owned by `rank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Band {
    pub rank: usize,
    pub row_start: usize,
    pub row_end: usize,
}

impl Band {
    pub fn rows(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn contains(&self, global_row: usize) -> bool {
        (self.row_start..self.row_end).contains(&global_row)
    }
}

/// Split `global_rows` into `worker_count` contiguous bands.
///
/// Every band but the last gets `ceil(global_rows / worker_count)` rows and the
/// last absorbs the remainder. When that would leave the last band empty (or
/// negative), bands shrink to `floor(global_rows / worker_count)` instead so
/// the last band absorbs a non-empty remainder. With `worker_count <=
/// global_rows` every band therefore holds at least one row.
pub fn partition(global_rows: usize, worker_count: usize) -> Result<Vec<Band>, ConfigError> {
    if worker_count == 0 {
        return Err(ConfigError::NoWorkers);
    }
    if worker_count > global_rows {
        return Err(ConfigError::TooManyWorkers {
            workers: worker_count,
            rows: global_rows,
        });
    }

    let ceil_band = global_rows.div_ceil(worker_count);
    let band = if ceil_band * (worker_count - 1) < global_rows {
        ceil_band
    } else {
        global_rows / worker_count
    };

    let bands: Vec<Band> = (0..worker_count)
        .map(|rank| {
            let row_start = rank * band;
            let row_end = if rank + 1 == worker_count {
                global_rows
            } else {
                row_start + band
            };
            Band {
                rank,
                row_start,
                row_end,
            }
        })
        .collect();

    debug_assert!(bands.iter().all(|b| b.row_end > b.row_start));
    Ok(bands)
}

/// One worker's slice of the grid, double buffered.
///
/// Local row 0 is the north ghost row when the worker has a northern
/// neighbour; the last local row is the south ghost row when it has a
/// southern one. The rows between are authoritative.
#[derive(Debug, Clone, Default)]
pub struct LocalPartition {
    band: Band,
    has_north: bool,
    has_south: bool,
    current: Grid,
    next: Grid,
}

impl LocalPartition {
    /// Cut this worker's band (and ghost rows) out of the global seed grid.
    pub fn from_global(seed: &Grid, band: Band, ctx: WorkerContext) -> Self {
        let has_north = !ctx.is_first();
        let has_south = !ctx.is_last();
        let first = band.row_start - usize::from(has_north);
        let last = band.row_end + usize::from(has_south);

        let mut current = Grid::new(last - first, seed.width());
        current.copy_rows_from(0, seed.rows(first, last));
        let next = current.clone();

        Self {
            band,
            has_north,
            has_south,
            current,
            next,
        }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn width(&self) -> usize {
        self.current.width()
    }

    pub fn has_north(&self) -> bool {
        self.has_north
    }

    pub fn has_south(&self) -> bool {
        self.has_south
    }

    /// The live buffer, including ghost rows.
    pub fn current(&self) -> &Grid {
        &self.current
    }

    fn first_own_row(&self) -> usize {
        usize::from(self.has_north)
    }

    fn last_own_row(&self) -> usize {
        self.first_own_row() + self.band.rows() - 1
    }

    /// Topmost authoritative row.
    pub fn top_row(&self) -> &[Cell] {
        self.current.row(self.first_own_row())
    }

    /// Bottommost authoritative row.
    pub fn bottom_row(&self) -> &[Cell] {
        self.current.row(self.last_own_row())
    }

    /// Authoritative rows only, row-major.
    pub fn own_rows(&self) -> &[Cell] {
        self.current.rows(self.first_own_row(), self.last_own_row() + 1)
    }

    pub fn north_ghost(&self) -> Option<&[Cell]> {
        self.has_north.then(|| self.current.row(0))
    }

    pub fn south_ghost(&self) -> Option<&[Cell]> {
        self.has_south.then(|| self.current.row(self.current.height() - 1))
    }

    /// Overwrite the north ghost row. No-op for the first band.
    pub fn set_north_ghost(&mut self, cells: &[Cell]) {
        if self.has_north {
            self.current.row_mut(0).copy_from_slice(cells);
        }
    }

    /// Overwrite the south ghost row. No-op for the last band.
    pub fn set_south_ghost(&mut self, cells: &[Cell]) {
        if self.has_south {
            let last = self.current.height() - 1;
            self.current.row_mut(last).copy_from_slice(cells);
        }
    }

    /// Split borrow of both buffers for a transition step.
    pub fn buffers(&mut self) -> (&Grid, &mut Grid) {
        (&self.current, &mut self.next)
    }

    /// Promote `next` to `current`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Cell count of the local buffer, ghost rows included.
    pub fn cell_count(&self) -> usize {
        self.current.as_slice().len()
    }
}
