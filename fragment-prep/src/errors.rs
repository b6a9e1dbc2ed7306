//! Crate-wide error hierarchy for fragment-prep.
//!
//! Parse failures are internal: the builder catches them and falls back to
//! the generic chunk profile, so callers normally never see these.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type FragmentResult<T> = Result<T, FragmentError>;

/// Root error type for the fragment-prep crate.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// Tree-sitter could not be initialized for a language.
    #[error("grammar error: {0}")]
    Grammar(String),

    /// The tolerant parse still produced an unusable tree.
    #[error("parse error: {0}")]
    Parse(String),
}
