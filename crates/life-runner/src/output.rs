//! Per-generation text output.
//!
//! Each gathered generation lands in `<dir>/save_<generation>`, one line per
//! grid row, `X` for a live cell and `_` for a dead one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::trace;

use life_kernel::{GenerationSnapshot, SnapshotSink};

/// Writes every snapshot to its own text file.
#[derive(Debug, Clone)]
pub struct TextFileSink {
    dir: PathBuf,
    written: u64,
}

impl TextFileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path_for(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("save_{generation}"))
    }
}

impl SnapshotSink for TextFileSink {
    fn persist(&mut self, snapshot: &GenerationSnapshot) -> Result<()> {
        let path = self.path_for(snapshot.generation);
        std::fs::write(&path, snapshot.grid.to_string())
            .with_context(|| format!("writing {}", path.display()))?;
        trace!(path = %path.display(), "Generation written");
        self.written += 1;
        Ok(())
    }
}
