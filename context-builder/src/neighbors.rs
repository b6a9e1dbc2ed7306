//! Neighbor enumeration: candidate files for the fragment universe.
//!
//! Walks the repository with an early prune of vendor/VCS directories, then
//! applies glob ignore rules (built-in defaults plus an optional ignore file
//! at the root) and a size cap. Output is repo-relative, sorted, and
//! deterministic; changed files survive every filter.

use crate::config::BuildConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Enumerate candidate neighbor files under `root`.
///
/// Returns repo-relative paths with forward slashes, sorted. Changed paths
/// are always part of the result when they still exist on disk, even if an
/// ignore rule matches them.
pub fn enumerate_neighbors(
    root: &Path,
    changed: &BTreeSet<PathBuf>,
    config: &BuildConfig,
) -> Vec<PathBuf> {
    let ignore = build_ignore_set(root, config);

    let mut skipped_ignored = 0usize;
    let mut skipped_too_big = 0usize;
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(keep_entry);
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_path_buf();

        if is_ignored(&rel, ignore.as_ref()) && !changed.contains(&rel) {
            skipped_ignored += 1;
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size as usize > config.limits.max_file_bytes {
            skipped_too_big += 1;
            debug!(path = %rel.display(), size, "neighbors: skip oversized file");
            continue;
        }
        found.insert(rel);
    }

    // Cap the universe while never dropping a changed file.
    let cap = config.limits.max_neighbor_files;
    let mut result: Vec<PathBuf> = Vec::with_capacity(found.len().min(cap));
    let mut extra = 0usize;
    for path in found {
        if changed.contains(&path) {
            result.push(path);
        } else if extra < cap {
            result.push(path);
            extra += 1;
        }
    }
    result.sort();

    info!(
        total = result.len(),
        ignored = skipped_ignored,
        too_big = skipped_too_big,
        "neighbors enumerated"
    );
    result
}

/// Coarse directory filter to avoid descending into heavy/vendor folders.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.file_type().is_dir() {
        if let Some(name) = entry.file_name().to_str() {
            return !matches!(
                name,
                ".git"
                    | "node_modules"
                    | "build"
                    | "target"
                    | "dist"
                    | "__pycache__"
                    | ".venv"
                    | "venv"
                    | ".idea"
                    | ".vscode"
            );
        }
    }
    true
}

fn build_ignore_set(root: &Path, config: &BuildConfig) -> Option<GlobSet> {
    let mut patterns = config.filters.ignore_globs.clone();
    patterns.extend(read_ignore_file(&root.join(&config.filters.ignore_file)));
    build_globset(&patterns)
}

/// One glob per line, `#` starts a comment. Missing file means no rules.
fn read_ignore_file(path: &Path) -> Vec<String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            // Bare names match anywhere in the tree, like gitignore entries.
            if l.contains('/') || l.contains('*') {
                l.to_string()
            } else {
                format!("**/{l}")
            }
        })
        .collect()
}

/// Build a `GlobSet` from patterns, skipping invalid or empty ones.
fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if pattern.trim().is_empty() {
            continue;
        }
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().ok()
}

fn is_ignored(rel: &Path, set: Option<&GlobSet>) -> bool {
    set.is_some_and(|gs| gs.is_match(to_unix_sep(&rel.to_string_lossy())))
}

/// Replace OS-specific separators with `/`.
pub fn to_unix_sep<S: AsRef<str>>(s: S) -> String {
    s.as_ref().replace('\\', "/")
}
