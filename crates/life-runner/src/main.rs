//! Distributed Life CLI.
//!
//! Evolves a seed grid across a set of row-band workers and writes every
//! generation to `<output-dir>/save_<generation>`, followed by a JSON run
//! summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use life_kernel::{Engine, EngineConfig, Neighborhood, Seed};
use life_runner::output::TextFileSink;
use life_runner::summary::{RunSummary, format_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SeedKind {
    /// Single glider near the top-left corner
    Glider,
    /// Uniform random fill of the interior
    Random,
}

#[derive(Parser)]
#[command(name = "life")]
#[command(version)]
#[command(about = "Distributed Game of Life with row-band halo exchange")]
struct Cli {
    /// JSON engine configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Global grid rows
    #[arg(long)]
    rows: Option<usize>,

    /// Global grid columns
    #[arg(long)]
    cols: Option<usize>,

    /// Exact neighbour count that brings a dead cell to life
    #[arg(long)]
    birth: Option<u8>,

    /// Live cells with fewer neighbours than this die
    #[arg(long)]
    loneliness: Option<u8>,

    /// Live cells with more neighbours than this die
    #[arg(long)]
    overpopulation: Option<u8>,

    /// Neighbourhood: moore or von-neumann
    #[arg(long)]
    neighborhood: Option<String>,

    /// Generations to compute and write
    #[arg(long)]
    iterations: Option<u64>,

    /// Number of row-band workers
    #[arg(long, env = "LIFE_WORKERS")]
    workers: Option<usize>,

    /// Initial state
    #[arg(long, value_enum, default_value = "glider")]
    seed: SeedKind,

    /// Live-cell probability for the random seed
    #[arg(long, default_value = "0.3")]
    density: f64,

    /// RNG seed for the random seed (defaults to the current time)
    #[arg(long = "rng-seed")]
    rng_seed: Option<u64>,

    /// Directory for save_<generation> files
    #[arg(long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Summary file (defaults to <output-dir>/summary.json)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Start from the config file (or defaults) and apply explicit flags.
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(birth) = self.birth {
            config.rules.birth = birth;
        }
        if let Some(loneliness) = self.loneliness {
            config.rules.loneliness = loneliness;
        }
        if let Some(overpopulation) = self.overpopulation {
            config.rules.overpopulation = overpopulation;
        }
        if let Some(name) = &self.neighborhood {
            config.neighborhood = name.parse::<Neighborhood>()?;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        Ok(config)
    }

    fn seed(&self) -> Seed {
        match self.seed {
            SeedKind::Glider => Seed::Glider,
            SeedKind::Random => Seed::Random {
                density: self.density,
                seed: self
                    .rng_seed
                    .unwrap_or_else(|| Utc::now().timestamp_millis() as u64),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let config = cli.engine_config()?;
    let seed = cli.seed();
    let engine = Engine::new(config.clone())?;
    let initial = seed.build(config.rows, config.cols)?;

    info!(
        seed = ?seed,
        population = initial.population(),
        output_dir = %cli.output_dir.display(),
        "Seed ready"
    );

    let mut sink = TextFileSink::new(&cli.output_dir)?;
    let started_at = Utc::now();
    let report = engine.run(&initial, &mut sink).await?;
    let ended_at = Utc::now();

    let summary = RunSummary::new(config, seed, &report, started_at, ended_at);
    let summary_path = cli
        .summary
        .clone()
        .unwrap_or_else(|| cli.output_dir.join("summary.json"));
    summary
        .save(&summary_path)
        .with_context(|| format!("writing summary {}", summary_path.display()))?;

    println!("\n=== Run Complete ===");
    println!("Grid: {}x{}", summary.config.rows, summary.config.cols);
    println!("Workers: {}", summary.workers);
    println!("Generations written: {}", sink.written());
    println!("Final population: {}", summary.final_population());
    if let Some((generation, live)) = summary.peak_population() {
        println!("Peak population: {} (generation {})", live, generation);
    }
    println!("Elapsed: {}", format_duration(summary.elapsed_ms));
    println!("Output: {}", sink.dir().display());
    println!("Summary: {}", summary_path.display());

    Ok(())
}
