//! Run summary written alongside the generation files.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use life_kernel::{EngineConfig, RunReport, Seed};

/// Record of one run and its population history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Engine configuration used for the run
    pub config: EngineConfig,
    /// Initial state
    pub seed: Seed,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Generations gathered and persisted
    pub generations: u64,
    /// Worker count
    pub workers: usize,
    /// Live cells per generation, starting with generation 0
    pub population_history: Vec<usize>,
    /// Engine wall time in milliseconds
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn new(
        config: EngineConfig,
        seed: Seed,
        report: &RunReport,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            seed,
            started_at,
            ended_at,
            generations: report.generations,
            workers: report.workers,
            population_history: report.population.clone(),
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }

    /// Live cells in the last generation.
    pub fn final_population(&self) -> usize {
        self.population_history.last().copied().unwrap_or(0)
    }

    /// Highest population seen and the generation it occurred at.
    pub fn peak_population(&self) -> Option<(u64, usize)> {
        self.population_history
            .iter()
            .enumerate()
            .max_by_key(|(generation, live)| (**live, std::cmp::Reverse(*generation)))
            .map(|(generation, live)| (generation as u64, *live))
    }

    /// Save the summary to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let summary = serde_json::from_str(&json)?;
        Ok(summary)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use life_kernel::Grid;

    fn report(population: Vec<usize>) -> RunReport {
        RunReport {
            generations: population.len() as u64,
            population,
            final_grid: Grid::new(3, 3),
            elapsed: Duration::from_millis(1_250),
            workers: 2,
        }
    }

    #[test]
    fn test_summary_from_report() {
        let now = Utc::now();
        let summary = RunSummary::new(
            EngineConfig::default(),
            Seed::Glider,
            &report(vec![5, 4, 7, 7, 3]),
            now,
            now,
        );
        assert_eq!(summary.generations, 5);
        assert_eq!(summary.elapsed_ms, 1_250);
        assert_eq!(summary.final_population(), 3);
        assert_eq!(summary.peak_population(), Some((2, 7)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "life_runner_summary_{}.json",
            std::process::id()
        ));
        let now = Utc::now();
        let summary = RunSummary::new(
            EngineConfig::default(),
            Seed::Random {
                density: 0.25,
                seed: 11,
            },
            &report(vec![1, 2]),
            now,
            now,
        );

        summary.save(&path).unwrap();
        let loaded = RunSummary::load(&path).unwrap();
        assert_eq!(loaded, summary);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["seed"]["kind"], "random");
        assert_eq!(raw["population_history"], serde_json::json!([1, 2]));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500), "500ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(65_000), "1m 5s");
    }

    #[test]
    fn test_empty_history() {
        let now = Utc::now();
        let summary = RunSummary::new(EngineConfig::default(), Seed::Glider, &report(vec![]), now, now);
        assert_eq!(summary.final_population(), 0);
        assert_eq!(summary.peak_population(), None);
    }
}
