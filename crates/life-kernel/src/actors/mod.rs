//! Acton-reactive actors for the life engine.
//!
//! ```text
//! Engine
//!   ├─ ConnectWorker → WorkerActor (north, south, collector handles)
//!   └─ BeginRun → WorkerActor
//!        per generation g:
//!        ├─ HaloRow(g) → north / south neighbour
//!        ├─ waits for HaloRow(g) from both neighbours
//!        ├─ PartitionSnapshot(g) → Collector
//!        └─ steps its band to g + 1
//! Collector
//!   └─ CollectorEvent::Gathered(g) → Engine (mpsc) → SnapshotSink
//! ```
//!
//! Each WorkerActor owns its band exclusively; neighbours only ever see
//! copies of boundary rows. A protocol error turns into `WorkerFault`, which
//! the collector forwards to the engine as `CollectorEvent::Fault`.

mod collector;
mod worker;

pub use collector::{Collector, CollectorEvent, CollectorState, WorkerProgress};
pub use worker::{WorkerActor, WorkerActorState};
