//! Crate-wide error hierarchy for relevance-graph.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GraphResult<T> = Result<T, GraphError>;

/// Root error type for the relevance-graph crate.
#[derive(Debug, Error)]
pub enum GraphError {
    /// PageRank restart parameter outside `[0, 1)`.
    #[error("alpha must be in [0, 1), got {0}")]
    InvalidAlpha(f64),

    /// Early-stop threshold below zero.
    #[error("tau must be >= 0, got {0}")]
    InvalidTau(f64),
}
