//! Gathered generations and the sink that persists them.

use std::collections::BTreeMap;

use crate::error::TransferError;
use crate::grid::Grid;
use crate::messages::PartitionSnapshot;
use crate::partition::Band;

/// The full grid for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSnapshot {
    pub generation: u64,
    pub grid: Grid,
}

/// Output collaborator: receives every gathered generation, in order.
///
/// Implementations decide file naming and rendering; the engine only hands
/// over the grid and its generation index.
pub trait SnapshotSink: Send {
    fn persist(&mut self, snapshot: &GenerationSnapshot) -> anyhow::Result<()>;
}

/// Keeps every snapshot in memory.
impl SnapshotSink for Vec<GenerationSnapshot> {
    fn persist(&mut self, snapshot: &GenerationSnapshot) -> anyhow::Result<()> {
        self.push(snapshot.clone());
        Ok(())
    }
}

/// Discards every snapshot; useful when only the run report matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl SnapshotSink for DiscardSink {
    fn persist(&mut self, _snapshot: &GenerationSnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A generation whose bands are still arriving.
#[derive(Debug, Clone)]
struct PendingGather {
    grid: Grid,
    received: Vec<bool>,
}

impl PendingGather {
    fn is_complete(&self) -> bool {
        self.received.iter().all(|r| *r)
    }
}

/// Assembles per-worker bands into global grids.
///
/// Bands may arrive in any order and for several generations at once; a
/// generation is released as soon as its last band lands.
#[derive(Debug, Clone, Default)]
pub struct Gather {
    bands: Vec<Band>,
    height: usize,
    width: usize,
    pending: BTreeMap<u64, PendingGather>,
}

impl Gather {
    pub fn new(bands: Vec<Band>, width: usize) -> Self {
        let height = bands.last().map(|b| b.row_end).unwrap_or(0);
        Self {
            bands,
            height,
            width,
            pending: BTreeMap::new(),
        }
    }

    /// Place one band. Returns the finished generation if this was its last
    /// missing band.
    pub fn accept(
        &mut self,
        part: PartitionSnapshot,
    ) -> Result<Option<GenerationSnapshot>, TransferError> {
        let bad = |reason: String| TransferError::BadSnapshot {
            rank: part.rank,
            reason,
        };

        let Some(band) = self.bands.get(part.rank).copied() else {
            return Err(bad(format!("unknown rank in a {}-worker run", self.bands.len())));
        };
        if part.row_start != band.row_start || part.rows != band.rows() {
            return Err(bad(format!(
                "rows {}..{} do not match band {}..{}",
                part.row_start,
                part.row_start + part.rows,
                band.row_start,
                band.row_end
            )));
        }
        if part.cells.len() != part.rows * self.width {
            return Err(bad(format!(
                "{} cells for {} rows of width {}",
                part.cells.len(),
                part.rows,
                self.width
            )));
        }

        let (height, width, workers) = (self.height, self.width, self.bands.len());
        let entry = self
            .pending
            .entry(part.generation)
            .or_insert_with(|| PendingGather {
                grid: Grid::new(height, width),
                received: vec![false; workers],
            });
        if entry.received[part.rank] {
            return Err(bad(format!("duplicate band for generation {}", part.generation)));
        }
        entry.grid.copy_rows_from(part.row_start, &part.cells);
        entry.received[part.rank] = true;

        if !entry.is_complete() {
            return Ok(None);
        }
        Ok(self
            .pending
            .remove(&part.generation)
            .map(|done| GenerationSnapshot {
                generation: part.generation,
                grid: done.grid,
            }))
    }

    /// Generations with at least one band outstanding.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
