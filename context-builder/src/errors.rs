//! Crate-wide error hierarchy for context-builder.
//!
//! One root `Error` for every public function; adapter and graph failures
//! pass through transparently, precondition violations get their own
//! variant so callers can map them to a distinct exit code.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type CtxResult<T> = Result<T, Error>;

/// Root error type for the context-builder crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid `alpha`, `tau`, or `budget_tokens`.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Underlying VCS adapter failure.
    #[error(transparent)]
    Git(#[from] git_diff_engine::GitError),

    /// Relevance engine precondition failure.
    #[error(transparent)]
    Graph(#[from] relevance_graph::GraphError),

    /// Filesystem failure while enumerating or reading neighbors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization failure.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yml::Error),
}
