//! Error taxonomy for the engine.
//!
//! Every category is fatal: configuration problems stop a run before the
//! first generation, bounds violations indicate a sizing bug, and transfer
//! failures abort the run since desynchronised ghost rows cannot be detected
//! later.

use thiserror::Error;

/// Invalid startup configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid must be at least {min}x{min}, got {rows}x{cols}")]
    GridTooSmall { rows: usize, cols: usize, min: usize },

    #[error("iteration count must be positive")]
    NoIterations,

    #[error("worker count must be positive")]
    NoWorkers,

    #[error("{workers} workers cannot share {rows} rows")]
    TooManyWorkers { workers: usize, rows: usize },

    #[error("unknown neighborhood '{0}' (expected moore or von-neumann)")]
    InvalidNeighborhood(String),

    #[error("random density {0} is outside [0, 1]")]
    InvalidDensity(f64),

    #[error("seed grid is {actual_rows}x{actual_cols}, configuration expects {rows}x{cols}")]
    SeedShape {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("seed cell ({row}, {col}) holds {value}, expected 0 or 1")]
    InvalidCell { row: usize, col: usize, value: u8 },
}

/// A cell address outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cell ({row}, {col}) is outside a {height}x{width} grid")]
pub struct BoundsError {
    pub row: usize,
    pub col: usize,
    pub height: usize,
    pub width: usize,
}

/// A halo or gather transfer that failed, stalled, or carried bad data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("generation {generation} was not gathered within {timeout_ms} ms")]
    Timeout { generation: u64, timeout_ms: u64 },

    #[error("collector channel closed before generation {generation}")]
    ChannelClosed { generation: u64 },

    #[error("worker {rank} failed at generation {generation}: {reason}")]
    WorkerFault {
        rank: usize,
        generation: u64,
        reason: String,
    },

    #[error("halo row from rank {from_rank} has {actual} cells, expected {expected}")]
    RowWidth {
        from_rank: usize,
        expected: usize,
        actual: usize,
    },

    #[error("rank {to_rank} received a {slot} halo row from non-adjacent rank {from_rank}")]
    UnexpectedSender {
        from_rank: usize,
        to_rank: usize,
        slot: &'static str,
    },

    #[error("duplicate {slot} halo row for generation {generation}")]
    DuplicateRow { generation: u64, slot: &'static str },

    #[error("halo row for generation {generation} arrived after generation {current} started")]
    StaleRow { generation: u64, current: u64 },

    #[error("snapshot from rank {rank} does not match its band: {reason}")]
    BadSnapshot { rank: usize, reason: String },

    #[error("expected generation {expected}, collector delivered {actual}")]
    OutOfOrder { expected: u64, actual: u64 },
}

/// Any engine failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bounds(#[from] BoundsError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_reports_inner_message_once() {
        let err = anyhow::Error::from(EngineError::from(TransferError::Timeout {
            generation: 0,
            timeout_ms: 1_500,
        }));
        assert_eq!(
            format!("{err:#}"),
            "generation 0 was not gathered within 1500 ms"
        );

        let err = EngineError::from(ConfigError::NoIterations);
        assert_eq!(err.to_string(), "iteration count must be positive");
    }
}
