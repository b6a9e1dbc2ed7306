//! Repository access over libgit2: range resolution, diff construction, and
//! worktree reads with binary classification.

use crate::errors::{GitError, GitResult};
use crate::parser::parse_unified_diff;
use crate::types::Hunk;
use git2::{Diff, DiffFormat, DiffOptions, ObjectType, Repository, Tree};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Context lines around each hunk, matching plain `git diff`.
const CONTEXT_LINES: u32 = 3;

/// A decoded worktree file.
pub struct ReadFile {
    pub content: String,
    /// False when invalid UTF-8 was replaced during decoding.
    pub encoding_ok: bool,
}

/// Read and decode a file; `None` classifies it as binary.
pub fn read_file(path: &Path) -> GitResult<Option<ReadFile>> {
    let bytes = fs::read(path)?;
    if is_binary(&bytes) {
        debug!(path = %path.display(), "classified as binary");
        return Ok(None);
    }
    match String::from_utf8(bytes) {
        Ok(content) => Ok(Some(ReadFile {
            content,
            encoding_ok: true,
        })),
        Err(err) => {
            let content = String::from_utf8_lossy(err.as_bytes()).into_owned();
            Ok(Some(ReadFile {
                content,
                encoding_ok: false,
            }))
        }
    }
}

/// NUL byte in the leading window marks a binary blob, as git itself does.
fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8000).any(|&b| b == 0)
}

/// Files modified in the range, repo-relative, sorted and deduplicated.
pub fn get_changed_files(root: &Path, range: &str) -> GitResult<Vec<PathBuf>> {
    let repo = Repository::discover(root)?;
    let diff = build_diff(&repo, range)?;
    let mut files: Vec<PathBuf> = diff
        .deltas()
        .filter_map(|delta| {
            delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(Path::to_path_buf)
        })
        .collect();
    files.sort();
    files.dedup();
    debug!(range, files = files.len(), "changed files resolved");
    Ok(files)
}

/// Full unified diff text for the range.
pub fn get_diff_text(root: &Path, range: &str) -> GitResult<String> {
    let repo = Repository::discover(root)?;
    let diff = build_diff(&repo, range)?;
    render_patch(&diff)
}

/// Parsed hunks for the range.
pub fn parse_diff(root: &Path, range: &str) -> GitResult<Vec<Hunk>> {
    Ok(parse_unified_diff(&get_diff_text(root, range)?))
}

fn render_patch(diff: &Diff<'_>) -> GitResult<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(text)
}

/// Resolve the range grammar into a libgit2 diff.
fn build_diff<'r>(repo: &'r Repository, range: &str) -> GitResult<Diff<'r>> {
    let mut opts = DiffOptions::new();
    opts.context_lines(CONTEXT_LINES);
    let range = range.trim();

    if range == "--staged" || range == "--cached" {
        let head = head_tree(repo)?;
        return Ok(repo.diff_tree_to_index(head.as_ref(), None, Some(&mut opts))?);
    }

    if let Some((left, right)) = range.split_once("...") {
        let from = rev_commit_tree(repo, range, or_head(left))?;
        let to = rev_commit_tree(repo, range, or_head(right))?;
        let base_oid = repo
            .merge_base(from.1, to.1)
            .map_err(|source| GitError::Revision {
                spec: range.to_string(),
                source,
            })?;
        let base_tree = repo.find_commit(base_oid)?.tree()?;
        return Ok(repo.diff_tree_to_tree(Some(&base_tree), Some(&to.0), Some(&mut opts))?);
    }

    if let Some((left, right)) = range.split_once("..") {
        let from = rev_commit_tree(repo, range, or_head(left))?;
        let to = rev_commit_tree(repo, range, or_head(right))?;
        return Ok(repo.diff_tree_to_tree(Some(&from.0), Some(&to.0), Some(&mut opts))?);
    }

    // Single revision: its tree against the working directory (staged and
    // unstaged changes both show, like `git diff <rev>`).
    let (tree, _) = rev_commit_tree(repo, range, range)?;
    Ok(repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?)
}

fn or_head(side: &str) -> &str {
    let side = side.trim();
    if side.is_empty() { "HEAD" } else { side }
}

fn head_tree(repo: &Repository) -> GitResult<Option<Tree<'_>>> {
    match repo.head() {
        Ok(reference) => Ok(Some(reference.peel_to_tree()?)),
        // Unborn branch: nothing committed yet.
        Err(_) => Ok(None),
    }
}

fn rev_commit_tree<'r>(
    repo: &'r Repository,
    range: &str,
    spec: &str,
) -> GitResult<(Tree<'r>, git2::Oid)> {
    let object = repo
        .revparse_single(spec)
        .map_err(|source| GitError::Revision {
            spec: range.to_string(),
            source,
        })?;
    let commit = object
        .peel(ObjectType::Commit)
        .map_err(|source| GitError::Revision {
            spec: range.to_string(),
            source,
        })?;
    let oid = commit.id();
    let tree = commit
        .peel(ObjectType::Tree)
        .and_then(|t| {
            t.into_tree()
                .map_err(|_| git2::Error::from_str("object is not a tree"))
        })
        .map_err(|source| GitError::Revision {
            spec: range.to_string(),
            source,
        })?;
    Ok((tree, oid))
}
