//! Provider-agnostic diff types consumed by the context pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One contiguous run of changes in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Repo-relative path (the new side unless the file was deleted).
    pub path: PathBuf,
    /// 1-based first line of the hunk on the old side.
    pub old_start: u32,
    pub old_len: u32,
    /// 1-based first line of the hunk on the new side.
    pub new_start: u32,
    pub new_len: u32,
    /// The whole file is new (`--- /dev/null`).
    pub is_addition: bool,
    /// The whole file was deleted (`+++ /dev/null`).
    pub is_deletion: bool,
    /// Raw hunk body: the `+`/`-`/context lines, without the `@@` header.
    pub body: String,
    /// Parsed body lines with both-side line numbers.
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// 1-based line numbers added on the new side of this hunk.
    pub fn added_lines(&self) -> Vec<u32> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                DiffLine::Added { new_line, .. } => Some(*new_line),
                _ => None,
            })
            .collect()
    }

    /// Whether the hunk only removes lines.
    pub fn is_pure_deletion(&self) -> bool {
        self.new_len == 0 && self.old_len > 0
    }
}

/// A single line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}
