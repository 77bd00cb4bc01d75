//! The engine driver: partitions the seed, runs the workers and persists
//! every gathered generation in order.
//!
//! ## Usage
//!
//! ```ignore
//! use life_kernel::{Engine, EngineConfig, Seed};
//!
//! let config = EngineConfig { rows: 32, cols: 32, workers: 4, ..Default::default() };
//! let seed = Seed::Glider.build(config.rows, config.cols)?;
//!
//! let engine = Engine::new(config)?;
//! let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
//! let report = engine.run(&seed, &mut snapshots).await?;
//! ```

use std::time::{Duration, Instant};

use acton_reactive::prelude::*;
use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::actors::{Collector, CollectorEvent, WorkerActor, WorkerProgress};
use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, TransferError};
use crate::grid::Grid;
use crate::messages::{BeginRun, ConnectWorker};
use crate::partition::{Band, LocalPartition, WorkerContext};
use crate::snapshot::{Gather, GenerationSnapshot, SnapshotSink};
use crate::transition::Transition;

/// Gathered generations the collector may queue ahead of the sink.
const GATHER_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Generations gathered and persisted
    pub generations: u64,
    /// Live cells per gathered generation, starting with generation 0
    pub population: Vec<usize>,
    /// Last gathered grid
    pub final_grid: Grid,
    /// Wall time from launch to the last persisted generation
    pub elapsed: Duration,
    /// Worker count the grid was split across
    pub workers: usize,
}

/// A validated engine, ready to run any seed of the configured shape.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    bands: Vec<Band>,
}

impl Engine {
    /// Validate the configuration and fix the band assignment.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let bands = config.validate()?;
        Ok(Self { config, bands })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Evolve `seed` for the configured number of iterations.
    ///
    /// Generations `0..iterations` are handed to `sink` in order. The actor
    /// runtime is shut down whether or not the run succeeds. Engine failures
    /// are returned as [`EngineError`] inside the `anyhow::Error`.
    pub async fn run(&self, seed: &Grid, sink: &mut dyn SnapshotSink) -> anyhow::Result<RunReport> {
        if seed.height() != self.config.rows || seed.width() != self.config.cols {
            return Err(EngineError::from(ConfigError::SeedShape {
                rows: self.config.rows,
                cols: self.config.cols,
                actual_rows: seed.height(),
                actual_cols: seed.width(),
            })
            .into());
        }
        if let Some((row, col, value)) = seed.first_invalid_cell() {
            return Err(EngineError::from(ConfigError::InvalidCell { row, col, value }).into());
        }

        info!(
            rows = self.config.rows,
            cols = self.config.cols,
            workers = self.bands.len(),
            iterations = self.config.iterations,
            neighborhood = %self.config.neighborhood,
            rules = ?self.config.rules,
            "Starting run"
        );

        let started = Instant::now();
        let mut runtime = ActonApp::launch_async().await;
        let result = self.drive(&mut runtime, seed, sink, started).await;
        let _ = runtime.shutdown_all().await;

        match &result {
            Ok(report) => info!(
                generations = report.generations,
                population = report.final_grid.population(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Run complete"
            ),
            Err(e) => warn!(error = %e, "Run aborted"),
        }
        result
    }

    async fn drive(
        &self,
        runtime: &mut ActorRuntime,
        seed: &Grid,
        sink: &mut dyn SnapshotSink,
        started: Instant,
    ) -> anyhow::Result<RunReport> {
        let world_size = self.bands.len();
        let transition = Transition::new(self.config.rules, self.config.neighborhood);
        let progress = WorkerProgress::default();

        let (tx, mut rx) = mpsc::channel::<CollectorEvent>(GATHER_CHANNEL_CAPACITY);
        let collector = Collector::new(
            Gather::new(self.bands.clone(), self.config.cols),
            tx,
            progress.clone(),
        )
        .spawn(runtime)
        .await;

        // Spawn every worker before wiring, so each can be handed both neighbours.
        let mut workers = Vec::with_capacity(world_size);
        for band in &self.bands {
            let ctx = WorkerContext::new(band.rank, world_size);
            let local = LocalPartition::from_global(seed, *band, ctx);
            let worker = WorkerActor::new(ctx, local, transition, self.config.parallel_threshold);
            debug!(
                rank = band.rank,
                rows = ?(band.row_start..band.row_end),
                parallel = worker.parallel,
                "Spawning worker"
            );
            workers.push(worker.spawn(runtime).await);
        }

        for (rank, handle) in workers.iter().enumerate() {
            let north = rank.checked_sub(1).map(|r| workers[r].clone());
            let south = workers.get(rank + 1).cloned();
            handle
                .send(ConnectWorker {
                    north,
                    south,
                    collector: collector.clone(),
                })
                .await;
        }

        for handle in &workers {
            handle
                .send(BeginRun {
                    iterations: self.config.iterations,
                })
                .await;
        }

        let timeout_ms = self.config.gather_timeout_ms;
        let mut population = Vec::new();
        let mut final_grid = Grid::default();

        for expected in 0..self.config.iterations {
            let snapshot = next_generation(&mut rx, &progress, world_size, expected, timeout_ms)
                .await
                .map_err(fail)?;

            sink.persist(&snapshot)
                .with_context(|| format!("persisting generation {expected}"))?;

            let live = snapshot.grid.population();
            debug!(generation = expected, population = live, "Generation persisted");
            population.push(live);
            final_grid = snapshot.grid;
        }

        Ok(RunReport {
            generations: self.config.iterations,
            population,
            final_grid,
            elapsed: started.elapsed(),
            workers: world_size,
        })
    }
}

/// Wait for generation `expected` from the collector.
///
/// A stalled worker, a lost band or a dropped collector all surface here as
/// a `TransferError`; nothing is retried.
async fn next_generation(
    rx: &mut mpsc::Receiver<CollectorEvent>,
    progress: &WorkerProgress,
    world_size: usize,
    expected: u64,
    timeout_ms: u64,
) -> Result<GenerationSnapshot, TransferError> {
    let event = match tokio::time::timeout(Duration::from_millis(timeout_ms), rx.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            return Err(TransferError::ChannelClosed {
                generation: expected,
            });
        }
        Err(_) => {
            let lagging = lagging_ranks(progress, world_size, expected);
            warn!(generation = expected, ?lagging, timeout_ms, "Gather timed out");
            return Err(TransferError::Timeout {
                generation: expected,
                timeout_ms,
            });
        }
    };

    let snapshot = match event {
        CollectorEvent::Gathered(snapshot) => snapshot,
        CollectorEvent::Fault(err) => return Err(err),
    };
    if snapshot.generation != expected {
        return Err(TransferError::OutOfOrder {
            expected,
            actual: snapshot.generation,
        });
    }
    Ok(snapshot)
}

fn fail(err: TransferError) -> anyhow::Error {
    EngineError::from(err).into()
}

/// Ranks that have not yet delivered `generation`.
fn lagging_ranks(progress: &WorkerProgress, world_size: usize, generation: u64) -> Vec<usize> {
    (0..world_size)
        .filter(|rank| {
            progress
                .get(rank)
                .map(|delivered| *delivered <= generation)
                .unwrap_or(true)
        })
        .collect()
}
