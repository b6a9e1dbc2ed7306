//! Configuration for a diff-context build.
//!
//! Split into logical groups:
//! - [`BuildConfig`]: top-level container
//! - [`Filters`]: which neighbor files to skip
//! - [`Limits`]: size caps keeping pathological repositories bounded
//!
//! All structs are `serde`-friendly. The core never reads the environment;
//! `load_from_env_or_default` exists for the CLI layer, is intentionally
//! tolerant (bad values fall back to defaults), and validates afterwards.

use crate::errors::{CtxResult, Error};
use serde::{Deserialize, Serialize};
use std::env;

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Which neighbor files to skip.
    pub filters: Filters,
    /// Size caps.
    pub limits: Limits,
}

impl BuildConfig {
    /// Load configuration from environment variables or fall back to
    /// defaults.
    ///
    /// Supported ENV vars (all optional):
    /// - `DIFFCTX_MAX_FILE_BYTES`      (usize)
    /// - `DIFFCTX_MAX_NEIGHBOR_FILES`  (usize)
    /// - `DIFFCTX_IGNORE_GLOBS`        (comma-separated)
    pub fn load_from_env_or_default() -> CtxResult<Self> {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("DIFFCTX_MAX_FILE_BYTES") {
            cfg.limits.max_file_bytes = v;
        }
        if let Some(v) = env_usize("DIFFCTX_MAX_NEIGHBOR_FILES") {
            cfg.limits.max_neighbor_files = v;
        }
        if let Some(v) = env_list("DIFFCTX_IGNORE_GLOBS") {
            cfg.filters.ignore_globs = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Basic validation — ensures limits are usable.
    pub fn validate(&self) -> CtxResult<()> {
        if self.limits.max_file_bytes == 0 {
            return Err(Error::Precondition(
                "max_file_bytes must be greater than 0".into(),
            ));
        }
        if self.limits.max_neighbor_files == 0 {
            return Err(Error::Precondition(
                "max_neighbor_files must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Neighbor filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filters {
    /// Glob patterns for files to skip during neighbor enumeration.
    pub ignore_globs: Vec<String>,
    /// Name of the per-repo ignore file read from the root.
    pub ignore_file: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            ignore_globs: vec![
                String::from("**/.git/**"),
                String::from("**/node_modules/**"),
                String::from("**/build/**"),
                String::from("**/target/**"),
                String::from("**/dist/**"),
                String::from("**/__pycache__/**"),
                String::from("**/*.min.js"),
                String::from("**/*.lock"),
            ],
            ignore_file: String::from(".diffctxignore"),
        }
    }
}

/// Size caps for scanning and fragmenting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum file size to fragment (bytes).
    pub max_file_bytes: usize,
    /// Maximum number of neighbor files in the universe; changed files are
    /// always kept regardless.
    pub max_neighbor_files: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: 2 * 1024 * 1024, // 2 MB
            max_neighbor_files: 4000,
        }
    }
}

/* ------------------------- ENV helpers ------------------------- */

fn env_usize(key: &str) -> Option<usize> {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let list = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    Some(list)
}
