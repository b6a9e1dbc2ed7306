//! Crate-wide error hierarchy for git-diff-engine.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GitResult<T> = Result<T, GitError>;

/// Root error type for the git adapter.
#[derive(Debug, Error)]
pub enum GitError {
    /// Underlying libgit2 failure (open, object lookup, diff).
    #[error("git error: {0}")]
    Repo(#[from] git2::Error),

    /// A diff range that could not be resolved to revisions.
    #[error("cannot resolve revision range '{spec}': {source}")]
    Revision {
        spec: String,
        #[source]
        source: git2::Error,
    },

    /// File I/O outside of libgit2 (worktree reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
