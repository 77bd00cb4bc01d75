//! End-to-end: run the engine into a directory and read the files back.

use std::path::PathBuf;

use chrono::Utc;

use life_kernel::{Engine, EngineConfig, Seed};
use life_runner::output::TextFileSink;
use life_runner::summary::RunSummary;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("life_runner_it_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn test_glider_run_writes_every_generation() {
    let dir = scratch_dir("glider");
    let config = EngineConfig {
        rows: 5,
        cols: 5,
        workers: 2,
        iterations: 3,
        ..Default::default()
    };
    let seed = Seed::Glider;
    let initial = seed.build(config.rows, config.cols).unwrap();

    let engine = Engine::new(config.clone()).unwrap();
    let mut sink = TextFileSink::new(&dir).unwrap();
    let started_at = Utc::now();
    let report = engine.run(&initial, &mut sink).await.unwrap();

    assert_eq!(sink.written(), 3);
    for generation in 0..3 {
        assert!(dir.join(format!("save_{generation}")).is_file());
    }
    assert!(!dir.join("save_3").exists());

    let first = std::fs::read_to_string(dir.join("save_0")).unwrap();
    assert_eq!(first, "_____\n___X_\n_X_X_\n__XX_\n_____\n");
    let second = std::fs::read_to_string(dir.join("save_1")).unwrap();
    assert_eq!(second, "_____\n__X__\n___X_\n__XX_\n_____\n");

    let summary = RunSummary::new(config, seed, &report, started_at, Utc::now());
    let summary_path = dir.join("summary.json");
    summary.save(&summary_path).unwrap();
    let loaded = RunSummary::load(&summary_path).unwrap();
    assert_eq!(loaded.population_history, vec![5, 4, report.population[2]]);
    assert_eq!(loaded.workers, 2);

    std::fs::remove_dir_all(&dir).unwrap();
}
