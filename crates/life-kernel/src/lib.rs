//! Life Kernel: distributed evolution of a two-state cellular automaton.
//!
//! The global grid is split into contiguous row bands, one per worker actor.
//! Workers exchange boundary rows with their neighbours every generation,
//! apply a threshold transition rule to their interior cells and send their
//! band to a collector, which assembles full-grid snapshots for the engine.

pub mod actors;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod halo;
pub mod messages;
pub mod neighborhood;
pub mod partition;
pub mod seed;
pub mod snapshot;
pub mod transition;

pub use config::EngineConfig;
pub use engine::{Engine, RunReport};
pub use error::{BoundsError, ConfigError, EngineError, TransferError};
pub use grid::{ALIVE, Cell, DEAD, Grid};
pub use neighborhood::Neighborhood;
pub use partition::{Band, WorkerContext, partition};
pub use seed::{GLIDER, Seed};
pub use snapshot::{DiscardSink, GenerationSnapshot, SnapshotSink};
pub use transition::{Ruleset, Transition};
