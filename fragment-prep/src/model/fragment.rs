//! Fragment identity and payload types.
//!
//! `FragmentId` stores 1-based inclusive line ranges, as commonly reported to
//! users and as used by diff hunks. Ordering is `(path, start_line, end_line)`
//! so that sorted id sequences are stable across runs and platforms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Unique identity of a span: `(path, start_line, end_line)`.
///
/// Lines are 1-based and inclusive. Equality is structural; the derived
/// ordering compares the path first, then the line range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId {
    pub path: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
}

impl FragmentId {
    /// Build an id from a path and a 1-based inclusive line range.
    pub fn new(path: impl Into<PathBuf>, start_line: u32, end_line: u32) -> Self {
        debug_assert!(start_line >= 1 && start_line <= end_line);
        Self {
            path: path.into(),
            start_line,
            end_line,
        }
    }

    /// Lines spanned (1-based inclusive).
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }

    /// Whether `line` falls inside this span.
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Whether `other` lies fully inside this span on the same path.
    pub fn contains(&self, other: &FragmentId) -> bool {
        self.path == other.path
            && self.start_line <= other.start_line
            && self.end_line >= other.end_line
    }

    /// Strict containment: contained and not the same range.
    pub fn strictly_contains(&self, other: &FragmentId) -> bool {
        self.contains(other)
            && (self.start_line != other.start_line || self.end_line != other.end_line)
    }

    /// `self` is a subset of `other` (same path, range contained).
    pub fn is_subset_of(&self, other: &FragmentId) -> bool {
        other.contains(self)
    }

    /// Whether the two ranges intersect on the same path.
    pub fn overlaps(&self, other: &FragmentId) -> bool {
        self.path == other.path
            && self.start_line <= other.end_line
            && other.start_line <= self.end_line
    }

    /// Partial overlap: ranges intersect but neither contains the other.
    pub fn partially_overlaps(&self, other: &FragmentId) -> bool {
        self.overlaps(other) && !self.contains(other) && !other.contains(self)
    }
}

impl Display for FragmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.path.display(),
            self.start_line,
            self.end_line
        )
    }
}

/// Kind of span a fragment covers.
///
/// `Function` and `Class` come from the structured (Tree-sitter) profiles;
/// the remaining kinds are line-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Function,
    Class,
    Chunk,
    Section,
    Block,
    Config,
}

impl Display for FragmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use FragmentKind::*;
        let s = match self {
            Function => "function",
            Class => "class",
            Chunk => "chunk",
            Section => "section",
            Block => "block",
            Config => "config",
        };
        f.write_str(s)
    }
}

/// A contiguous span of one file plus everything the selector needs to know
/// about it: verbatim content, normalized identifiers, and a token estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub kind: FragmentKind,
    pub content: String,
    pub identifiers: BTreeSet<String>,
    pub token_count: u32,
}

impl Fragment {
    pub fn path(&self) -> &Path {
        &self.id.path
    }

    pub fn start_line(&self) -> u32 {
        self.id.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.id.end_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(start: u32, end: u32) -> FragmentId {
        FragmentId::new("src/lib.rs", start, end)
    }

    #[test]
    fn ordering_is_path_then_range() {
        let a = FragmentId::new("a.py", 10, 20);
        let b = FragmentId::new("b.py", 1, 2);
        assert!(a < b);
        assert!(id(1, 5) < id(1, 9));
        assert!(id(1, 9) < id(2, 3));
    }

    #[test]
    fn display_matches_path_colon_range() {
        assert_eq!(id(1, 3).to_string(), "src/lib.rs:1-3");
    }

    #[test]
    fn containment_predicates() {
        let outer = id(1, 100);
        let inner = id(10, 50);
        assert!(outer.strictly_contains(&inner));
        assert!(inner.is_subset_of(&outer));
        assert!(!inner.strictly_contains(&outer));
        assert!(!outer.strictly_contains(&outer.clone()));
        assert!(outer.contains(&outer.clone()));
    }

    #[test]
    fn overlap_predicates() {
        assert!(id(1, 100).overlaps(&id(95, 200)));
        assert!(id(1, 100).partially_overlaps(&id(95, 200)));
        assert!(!id(1, 50).overlaps(&id(60, 100)));
        assert!(!id(1, 100).partially_overlaps(&id(10, 50)));
        let other_path = FragmentId::new("other.rs", 1, 100);
        assert!(!other_path.overlaps(&id(1, 100)));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&FragmentKind::Function).unwrap();
        assert_eq!(json, "\"function\"");
        assert_eq!(FragmentKind::Config.to_string(), "config");
    }
}
