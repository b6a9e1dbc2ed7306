//! Tolerant unified-diff parser.
//!
//! Accepts full `git diff` output as well as hunks-only snippets: file
//! headers (`---`/`+++`) update the current path when present, only `@@`
//! headers are strictly required. `\ No newline at end of file` markers are
//! ignored, and binary patch notices produce no hunks.

use crate::types::{DiffLine, Hunk};
use std::path::PathBuf;

/// Parse unified diff text into hunks.
pub fn parse_unified_diff(text: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();

    let mut path = PathBuf::new();
    let mut old_path: Option<PathBuf> = None;
    let mut is_addition = false;
    let mut is_deletion = false;
    let mut binary_file = false;

    let mut current: Option<Hunk> = None;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("--- ") {
            flush(&mut current, &mut hunks);
            binary_file = false;
            let rest = rest.trim();
            is_addition = rest == "/dev/null";
            old_path = (!is_addition).then(|| strip_prefix_marker(rest));
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            flush(&mut current, &mut hunks);
            let rest = rest.trim();
            is_deletion = rest == "/dev/null";
            // Deleted files keep their old path so hunks stay addressable.
            path = if is_deletion {
                old_path.clone().unwrap_or_default()
            } else {
                strip_prefix_marker(rest)
            };
            continue;
        }
        if line.starts_with("diff --git") {
            flush(&mut current, &mut hunks);
            binary_file = false;
            continue;
        }
        if line.starts_with("index ") {
            flush(&mut current, &mut hunks);
            continue;
        }
        // Binary patch payloads (base85 data) can start with '@@'/'+'/'-';
        // skip everything until the next file header. Only prelude lines are
        // checked so hunk bodies mentioning the markers stay untouched.
        if current.is_none() && looks_like_binary_patch(line) {
            binary_file = true;
            continue;
        }
        if binary_file {
            continue;
        }
        if line.starts_with("@@") {
            flush(&mut current, &mut hunks);
            if let Some((o_start, o_len, n_start, n_len)) = parse_hunk_header(line) {
                old_line = o_start;
                new_line = n_start;
                current = Some(Hunk {
                    path: path.clone(),
                    old_start: o_start,
                    old_len: o_len,
                    new_start: n_start,
                    new_len: n_len,
                    is_addition,
                    is_deletion,
                    body: String::new(),
                    lines: Vec::new(),
                });
            }
            continue;
        }

        // Marker lines are not diff content.
        if line.starts_with("\\ ") {
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            // Prelude (mode changes, binary notices) before the first @@.
            continue;
        };

        hunk.body.push_str(line);
        hunk.body.push('\n');
        if let Some(rest) = line.strip_prefix('+') {
            hunk.lines.push(DiffLine::Added {
                new_line,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            hunk.lines.push(DiffLine::Removed {
                old_line,
                content: rest.to_string(),
            });
            old_line += 1;
        } else {
            let rest = line.strip_prefix(' ').unwrap_or(line);
            hunk.lines.push(DiffLine::Context {
                old_line,
                new_line,
                content: rest.to_string(),
            });
            old_line += 1;
            new_line += 1;
        }
    }
    flush(&mut current, &mut hunks);
    hunks
}

fn flush(current: &mut Option<Hunk>, hunks: &mut Vec<Hunk>) {
    if let Some(hunk) = current.take() {
        if !hunk.lines.is_empty() {
            hunks.push(hunk);
        }
    }
}

/// `a/src/lib.rs` -> `src/lib.rs`; quoted and bare paths pass through.
fn strip_prefix_marker(raw: &str) -> PathBuf {
    let raw = raw.trim_matches('"');
    let stripped = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    PathBuf::from(stripped)
}

/// Parse `@@ -12,7 +12,9 @@ ...` into (old_start, old_len, new_start, new_len).
/// Trailing context after the closing `@@` (which may itself contain `@`)
/// is ignored.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@")?;
    let nums = rest.split_once("@@").map(|(n, _)| n).unwrap_or(rest);
    let mut parts = nums.split_whitespace();
    let (o_start, o_len) = split_nums(parts.next()?.trim_start_matches('-'));
    let (n_start, n_len) = split_nums(parts.next()?.trim_start_matches('+'));
    Some((o_start, o_len, n_start, n_len))
}

/// Splits "12,7" or "12" into (start, len); a missing len means 1.
fn split_nums(s: &str) -> (u32, u32) {
    let s = s.trim();
    match s.split_once(',') {
        Some((a, b)) => (a.parse().unwrap_or(0), b.parse().unwrap_or(0)),
        None => (s.parse().unwrap_or(0), 1),
    }
}

/// Heuristic for binary patch notices inside unified diff text.
pub fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}
