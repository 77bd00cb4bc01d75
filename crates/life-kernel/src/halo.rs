//! Halo exchange: the per-generation refresh of ghost rows between
//! neighbouring bands.
//!
//! ```text
//! rank r-1   ... | bottom row | south ghost |
//!                      │             ▲
//!                      ▼             │
//! rank r     | north ghost | top row ... bottom row | south ghost |
//!                                          │              ▲
//!                                          ▼              │
//! rank r+1                         | north ghost | top row | ...
//! ```
//!
//! Every worker posts its boundary rows for generation `g` without waiting,
//! then buffers incoming rows by generation until both ghost slots it needs
//! for `g` are present. That single readiness check is the generation's
//! barrier. A neighbour can run at most one generation ahead, since it cannot
//! finish `g` without this worker's rows for `g`.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::TransferError;
use crate::grid::Cell;
use crate::messages::HaloRow;
use crate::partition::{LocalPartition, WorkerContext};

/// Which ghost slot of the *receiving* worker a halo row fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaloSlot {
    /// Row sent downward by the band above.
    North,
    /// Row sent upward by the band below.
    South,
}

impl HaloSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            HaloSlot::North => "north",
            HaloSlot::South => "south",
        }
    }
}

impl fmt::Display for HaloSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A halo row addressed to a neighbouring rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to_rank: usize,
    pub row: HaloRow,
}

/// Boundary rows this worker owes its neighbours for `generation`.
///
/// The top row goes north (into that worker's south ghost), the bottom row
/// goes south (into that worker's north ghost). Edge bands skip the missing
/// side.
pub fn outbound_rows(local: &LocalPartition, ctx: WorkerContext, generation: u64) -> Vec<Outbound> {
    let mut out = Vec::with_capacity(2);
    if let Some(north) = ctx.north() {
        out.push(Outbound {
            to_rank: north,
            row: HaloRow {
                generation,
                from_rank: ctx.rank,
                slot: HaloSlot::South,
                cells: local.top_row().to_vec(),
            },
        });
    }
    if let Some(south) = ctx.south() {
        out.push(Outbound {
            to_rank: south,
            row: HaloRow {
                generation,
                from_rank: ctx.rank,
                slot: HaloSlot::North,
                cells: local.bottom_row().to_vec(),
            },
        });
    }
    out
}

/// Ghost rows received for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GhostRows {
    pub north: Option<Vec<Cell>>,
    pub south: Option<Vec<Cell>>,
}

impl GhostRows {
    fn slot_mut(&mut self, slot: HaloSlot) -> &mut Option<Vec<Cell>> {
        match slot {
            HaloSlot::North => &mut self.north,
            HaloSlot::South => &mut self.south,
        }
    }

    fn satisfies(&self, ctx: WorkerContext) -> bool {
        (ctx.north().is_none() || self.north.is_some())
            && (ctx.south().is_none() || self.south.is_some())
    }
}

/// Incoming halo rows, keyed by generation.
#[derive(Debug, Clone, Default)]
pub struct HaloBuffer {
    pending: BTreeMap<u64, GhostRows>,
}

impl HaloBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and buffer a received row.
    ///
    /// `current_generation` is the generation the receiver is waiting to
    /// compute; anything older has already been consumed and is an error.
    pub fn accept(
        &mut self,
        ctx: WorkerContext,
        width: usize,
        current_generation: u64,
        row: HaloRow,
    ) -> Result<(), TransferError> {
        if row.cells.len() != width {
            return Err(TransferError::RowWidth {
                from_rank: row.from_rank,
                expected: width,
                actual: row.cells.len(),
            });
        }

        let expected_sender = match row.slot {
            HaloSlot::North => ctx.north(),
            HaloSlot::South => ctx.south(),
        };
        if expected_sender != Some(row.from_rank) {
            return Err(TransferError::UnexpectedSender {
                from_rank: row.from_rank,
                to_rank: ctx.rank,
                slot: row.slot.as_str(),
            });
        }

        if row.generation < current_generation {
            return Err(TransferError::StaleRow {
                generation: row.generation,
                current: current_generation,
            });
        }

        let slot = self
            .pending
            .entry(row.generation)
            .or_default()
            .slot_mut(row.slot);
        if slot.is_some() {
            return Err(TransferError::DuplicateRow {
                generation: row.generation,
                slot: row.slot.as_str(),
            });
        }
        *slot = Some(row.cells);
        Ok(())
    }

    /// Remove and return the ghost rows for `generation` if every slot this
    /// worker needs has arrived.
    pub fn take_ready(&mut self, ctx: WorkerContext, generation: u64) -> Option<GhostRows> {
        if ctx.world_size == 1 {
            return Some(GhostRows::default());
        }
        let ready = self
            .pending
            .get(&generation)
            .is_some_and(|rows| rows.satisfies(ctx));
        if ready {
            self.pending.remove(&generation)
        } else {
            None
        }
    }

    /// Generations with at least one buffered row.
    pub fn pending_generations(&self) -> usize {
        self.pending.len()
    }
}

/// Write received ghost rows into the partition's current buffer.
pub fn install(local: &mut LocalPartition, ghosts: GhostRows) {
    if let Some(north) = ghosts.north {
        local.set_north_ghost(&north);
    }
    if let Some(south) = ghosts.south {
        local.set_south_ghost(&south);
    }
}
