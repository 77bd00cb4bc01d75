//! Integration tests for distributed runs.
//!
//! Covers:
//! - Whole runs through `Engine::run` against a single-buffer reference
//! - Collector assembly driven directly with `PartitionSnapshot` messages
//! - Worker faults, stalled neighbours, bad seeds and sink failures

use std::sync::Arc;

use acton_reactive::prelude::*;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::Duration;

use life_kernel::actors::{Collector, CollectorEvent, WorkerActor};
use life_kernel::halo::HaloSlot;
use life_kernel::messages::{BeginRun, ConnectWorker, HaloRow, PartitionSnapshot};
use life_kernel::partition::LocalPartition;
use life_kernel::snapshot::Gather;
use life_kernel::{
    ConfigError, Engine, EngineConfig, EngineError, GLIDER, GenerationSnapshot, Grid,
    Neighborhood, Seed, SnapshotSink, Transition, TransferError, WorkerContext, partition,
};

/// Evolve `seed` on one buffer pair, collecting generations `0..iterations`.
fn reference_run(config: &EngineConfig, seed: &Grid) -> Vec<Grid> {
    let transition = Transition::new(config.rules, config.neighborhood);
    let mut current = seed.clone();
    let mut next = seed.clone();
    let mut out = Vec::new();
    for _ in 0..config.iterations {
        out.push(current.clone());
        transition.step(&current, &mut next);
        std::mem::swap(&mut current, &mut next);
    }
    out
}

async fn run_engine(config: EngineConfig, seed: &Grid) -> Vec<GenerationSnapshot> {
    let engine = Engine::new(config).expect("valid config");
    let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
    engine.run(seed, &mut snapshots).await.expect("run succeeds");
    snapshots
}

fn random_config(workers: usize, neighborhood: Neighborhood) -> EngineConfig {
    EngineConfig {
        rows: 23,
        cols: 17,
        workers,
        iterations: 12,
        neighborhood,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_worker_count_does_not_change_result() {
    let seed = Seed::Random {
        density: 0.4,
        seed: 2024,
    }
    .build(23, 17)
    .unwrap();

    let expected = reference_run(&random_config(1, Neighborhood::Moore), &seed);
    for workers in [1, 3, 7] {
        let snapshots = run_engine(random_config(workers, Neighborhood::Moore), &seed).await;
        assert_eq!(snapshots.len(), expected.len(), "{workers} workers");
        for (snapshot, grid) in snapshots.iter().zip(&expected) {
            assert_eq!(
                &snapshot.grid, grid,
                "{workers} workers diverged at generation {}",
                snapshot.generation
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_steps_on_multi_thread_runtime() {
    // More workers than runtime threads, every band stepped on rayon.
    let config = EngineConfig {
        parallel_threshold: 0,
        ..random_config(5, Neighborhood::Moore)
    };
    let seed = Seed::Random {
        density: 0.35,
        seed: 77,
    }
    .build(23, 17)
    .unwrap();

    let expected = reference_run(&config, &seed);
    let snapshots = run_engine(config, &seed).await;
    let grids: Vec<Grid> = snapshots.into_iter().map(|s| s.grid).collect();
    assert_eq!(grids, expected);
}

#[tokio::test]
async fn test_von_neumann_across_workers() {
    let seed = Seed::Random {
        density: 0.5,
        seed: 9,
    }
    .build(23, 17)
    .unwrap();

    let single = run_engine(random_config(1, Neighborhood::VonNeumann), &seed).await;
    let banded = run_engine(random_config(4, Neighborhood::VonNeumann), &seed).await;
    assert_eq!(single, banded);
    assert_eq!(
        single.last().map(|s| &s.grid),
        reference_run(&random_config(1, Neighborhood::VonNeumann), &seed).last()
    );
}

#[tokio::test]
async fn test_glider_on_five_by_five() {
    let config = EngineConfig {
        rows: 5,
        cols: 5,
        workers: 2,
        iterations: 2,
        ..Default::default()
    };
    let seed = Seed::Glider.build(5, 5).unwrap();
    let snapshots = run_engine(config, &seed).await;

    assert_eq!(snapshots[0].generation, 0);
    assert_eq!(snapshots[0].grid.live_cells(), GLIDER.to_vec());

    // (2, 4) would be born on an unbounded plane but sits on the static border.
    assert_eq!(snapshots[1].generation, 1);
    assert_eq!(
        snapshots[1].grid.live_cells(),
        vec![(1, 2), (2, 3), (3, 2), (3, 3)]
    );
}

#[tokio::test]
async fn test_border_cells_stay_static() {
    let config = EngineConfig {
        rows: 6,
        cols: 6,
        workers: 2,
        iterations: 3,
        ..Default::default()
    };
    let seed = Seed::Cells {
        cells: vec![(0, 0), (0, 5)],
    }
    .build(6, 6)
    .unwrap();
    let snapshots = run_engine(config, &seed).await;
    assert_eq!(snapshots.len(), 3);

    for snapshot in &snapshots {
        assert_eq!(
            snapshot.grid.live_cells(),
            vec![(0, 0), (0, 5)],
            "generation {}",
            snapshot.generation
        );
    }
}

#[tokio::test]
async fn test_minimum_grid_single_iteration() {
    let config = EngineConfig {
        rows: 3,
        cols: 3,
        workers: 3,
        iterations: 1,
        ..Default::default()
    };
    let mut seed = Grid::new(3, 3);
    seed.set(1, 1, 1).unwrap();

    let engine = Engine::new(config).unwrap();
    let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
    let report = engine.run(&seed, &mut snapshots).await.unwrap();

    assert_eq!(report.generations, 1);
    assert_eq!(report.workers, 3);
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].grid, seed);
}

#[tokio::test]
async fn test_generations_arrive_in_order() {
    let config = EngineConfig {
        rows: 40,
        cols: 12,
        workers: 6,
        iterations: 25,
        ..Default::default()
    };
    let seed = Seed::Random {
        density: 0.3,
        seed: 1,
    }
    .build(40, 12)
    .unwrap();

    let engine = Engine::new(config).unwrap();
    let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
    let report = engine.run(&seed, &mut snapshots).await.unwrap();

    let generations: Vec<u64> = snapshots.iter().map(|s| s.generation).collect();
    assert_eq!(generations, (0..25).collect::<Vec<_>>());
    assert_eq!(report.population.len(), 25);
    assert_eq!(report.population[0], seed.population());
    assert_eq!(report.final_grid, snapshots[24].grid);
}

#[test]
fn test_more_workers_than_rows_is_rejected() {
    let config = EngineConfig {
        rows: 4,
        cols: 8,
        workers: 5,
        ..Default::default()
    };
    assert_eq!(
        Engine::new(config).unwrap_err(),
        ConfigError::TooManyWorkers {
            workers: 5,
            rows: 4
        }
    );
}

#[tokio::test]
async fn test_collector_assembles_out_of_order_bands() {
    let mut runtime = ActonApp::launch_async().await;

    let bands = partition(6, 3).unwrap();
    let progress = Arc::new(DashMap::new());
    let (tx, mut rx) = mpsc::channel(8);
    let collector = Collector::new(Gather::new(bands.clone(), 4), tx, progress.clone())
        .spawn(&mut runtime)
        .await;

    for band in bands.iter().rev() {
        collector
            .send(PartitionSnapshot {
                generation: 0,
                rank: band.rank,
                row_start: band.row_start,
                rows: band.rows(),
                cells: vec![band.rank as u8 % 2; band.rows() * 4],
            })
            .await;
    }

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("collector answered")
        .expect("channel open");
    let snapshot = match event {
        CollectorEvent::Gathered(snapshot) => snapshot,
        other => panic!("expected a gathered generation, got {other:?}"),
    };
    assert_eq!(snapshot.generation, 0);
    assert_eq!(snapshot.grid.population(), bands[1].rows() * 4);
    assert_eq!(progress.get(&2).map(|g| *g), Some(1));

    runtime.shutdown_all().await.unwrap();
}

#[tokio::test]
async fn test_bad_halo_row_faults_worker() {
    let mut runtime = ActonApp::launch_async().await;

    let seed = Grid::new(6, 5);
    let bands = partition(6, 2).unwrap();
    let (tx, mut rx) = mpsc::channel(8);
    let collector = Collector::new(Gather::new(bands.clone(), 5), tx, Arc::new(DashMap::new()))
        .spawn(&mut runtime)
        .await;

    // Rank 1 of a two-worker run, with no real neighbour wired in.
    let ctx = WorkerContext::new(1, 2);
    let local = LocalPartition::from_global(&seed, bands[1], ctx);
    let transition = Transition::new(Default::default(), Neighborhood::Moore);
    let worker = WorkerActor::new(ctx, local, transition, usize::MAX)
        .spawn(&mut runtime)
        .await;

    worker
        .send(ConnectWorker {
            north: None,
            south: None,
            collector,
        })
        .await;
    worker
        .send(HaloRow {
            generation: 0,
            from_rank: 0,
            slot: HaloSlot::North,
            cells: vec![0; 3],
        })
        .await;
    worker.send(BeginRun { iterations: 4 }).await;

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("collector answered")
        .expect("channel open");
    assert!(
        matches!(
            event,
            CollectorEvent::Fault(TransferError::WorkerFault { rank: 1, .. })
        ),
        "unexpected event {event:?}"
    );

    runtime.shutdown_all().await.unwrap();
}

/// An actor that accepts any message and never answers.
#[derive(Debug, Default, Clone)]
struct SilentNeighbourState;

#[tokio::test]
async fn test_worker_waits_for_missing_neighbour() {
    let mut runtime = ActonApp::launch_async().await;

    let seed = Seed::Glider.build(8, 6).unwrap();
    let bands = partition(8, 2).unwrap();
    let progress = Arc::new(DashMap::new());
    let (tx, mut rx) = mpsc::channel(8);
    let collector = Collector::new(Gather::new(bands.clone(), 6), tx, progress.clone())
        .spawn(&mut runtime)
        .await;

    let silent = runtime
        .new_actor_with_name::<SilentNeighbourState>("SilentNeighbour".to_string())
        .start()
        .await;

    let ctx = WorkerContext::new(0, 2);
    let local = LocalPartition::from_global(&seed, bands[0], ctx);
    let transition = Transition::new(Default::default(), Neighborhood::Moore);
    let worker = WorkerActor::new(ctx, local, transition, usize::MAX)
        .spawn(&mut runtime)
        .await;
    worker
        .send(ConnectWorker {
            north: None,
            south: Some(silent),
            collector,
        })
        .await;
    worker.send(BeginRun { iterations: 3 }).await;

    // No south ghost row for generation 0 ever arrives, so nothing is gathered.
    let waited = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(waited.is_err(), "unexpected event {waited:?}");
    assert!(progress.get(&0).is_none());

    runtime.shutdown_all().await.unwrap();
}

#[tokio::test]
async fn test_non_binary_seed_is_a_config_error() {
    let config = EngineConfig {
        rows: 6,
        cols: 6,
        workers: 2,
        iterations: 2,
        gather_timeout_ms: 1_500,
        ..Default::default()
    };
    let mut seed = Grid::new(6, 6);
    seed.set(2, 3, 40).unwrap();

    let engine = Engine::new(config).unwrap();
    let err = engine
        .run(&seed, &mut life_kernel::DiscardSink)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Config(ConfigError::InvalidCell {
                row: 2,
                col: 3,
                value: 40
            }))
        ),
        "unexpected error {err:#}"
    );
    assert_eq!(format!("{err:#}"), "seed cell (2, 3) holds 40, expected 0 or 1");
}

/// Sink that refuses a given generation.
struct FailingSink {
    fail_at: u64,
    seen: Vec<u64>,
}

impl SnapshotSink for FailingSink {
    fn persist(&mut self, snapshot: &GenerationSnapshot) -> anyhow::Result<()> {
        if snapshot.generation == self.fail_at {
            anyhow::bail!("disk full");
        }
        self.seen.push(snapshot.generation);
        Ok(())
    }
}

#[tokio::test]
async fn test_sink_failure_stops_run() {
    let config = EngineConfig {
        rows: 16,
        cols: 16,
        workers: 4,
        iterations: 6,
        ..Default::default()
    };
    let seed = Seed::Glider.build(16, 16).unwrap();
    let engine = Engine::new(config).unwrap();
    let mut sink = FailingSink {
        fail_at: 2,
        seen: Vec::new(),
    };

    let err = engine.run(&seed, &mut sink).await.unwrap_err();
    assert_eq!(sink.seen, vec![0, 1]);
    assert!(format!("{err:#}").contains("persisting generation 2"));
    assert!(format!("{err:#}").contains("disk full"));
    assert!(err.downcast_ref::<EngineError>().is_none());
}
