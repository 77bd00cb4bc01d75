//! Message types for acton-reactive actor communication.
//!
//! Every message that belongs to a generation carries it explicitly, so a
//! receiver can buffer traffic from a neighbour that is already one
//! generation ahead.

use acton_reactive::prelude::ActorHandle;

use crate::grid::Cell;
use crate::halo::HaloSlot;

// ============================================================================
// Worker setup
// ============================================================================

/// Wire a worker to its neighbours and the collector.
///
/// Sent once by the engine after every worker has been spawned.
#[derive(Debug, Clone)]
pub struct ConnectWorker {
    /// Worker owning the band above, if any
    pub north: Option<ActorHandle>,
    /// Worker owning the band below, if any
    pub south: Option<ActorHandle>,
    /// Collector that assembles gathered generations
    pub collector: ActorHandle,
}

/// Start computing `iterations` generations.
#[derive(Debug, Clone)]
pub struct BeginRun {
    pub iterations: u64,
}

// ============================================================================
// Halo exchange
// ============================================================================

/// One boundary row, sent to an adjacent worker.
///
/// `slot` names the ghost slot it fills at the receiver. `cells` is always
/// exactly one grid row wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloRow {
    pub generation: u64,
    pub from_rank: usize,
    pub slot: HaloSlot,
    pub cells: Vec<Cell>,
}

// ============================================================================
// Gather
// ============================================================================

/// A worker's authoritative rows for one generation, sent to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSnapshot {
    pub generation: u64,
    pub rank: usize,
    /// First global row of the band
    pub row_start: usize,
    /// Number of rows in `cells`
    pub rows: usize,
    /// Row-major cells, `rows * width` long
    pub cells: Vec<Cell>,
}

/// A worker hit an unrecoverable protocol error and stopped.
///
/// Sent to the collector, which forwards it to the engine driver.
#[derive(Debug, Clone)]
pub struct WorkerFault {
    pub rank: usize,
    pub generation: u64,
    pub reason: String,
}
