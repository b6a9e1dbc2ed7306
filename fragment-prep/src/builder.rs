//! Fragment builder: profile dispatch, span materialization, and the
//! disjoint-or-strictly-nested guarantee.
//!
//! `fragment_file` never fails: a structured parse that rejects the input
//! silently degrades to the generic chunk profile, and any span pair that
//! would partially overlap is resolved by dropping the later span before
//! fragments are materialized.

use crate::identifiers::{TokenProfile, extract_identifiers};
use crate::model::{Fragment, FragmentId, FragmentKind};
use crate::profiles::{self, LanguageProfile, ProfileSpan, code, config, generic, heading};
use crate::tokens::estimate_tokens;
use std::path::Path;
use tracing::debug;

/// Split `content` into fragments for `path`.
///
/// The returned list is sorted by `(start_line, end_line desc)` so parents
/// precede their nested children. Within the list, any two fragments are
/// either disjoint or strictly nested.
pub fn fragment_file(path: &Path, content: &str) -> Vec<Fragment> {
    if content.is_empty() {
        return Vec::new();
    }
    let lines: Vec<&str> = content.lines().collect();

    let spans = match profiles::detect(path, content) {
        LanguageProfile::Structured(grammar) => match code::fragment_spans(grammar, content) {
            Ok(spans) => spans,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "structured parse failed, chunking");
                generic::chunk_spans(&lines)
            }
        },
        LanguageProfile::Config(flavor) => config::fragment_spans(flavor, content),
        LanguageProfile::Heading(flavor) => heading::fragment_spans(flavor, content),
        LanguageProfile::Generic => generic::chunk_spans(&lines),
    };

    let spans = drop_partial_overlaps(spans);
    materialize(path, content, spans)
}

/// Smallest fragment whose range contains `line`; ties go to the smaller
/// `start_line`. Returns `None` when no fragment covers the line.
pub fn enclosing_fragment<'a>(fragments: &'a [Fragment], line: u32) -> Option<&'a Fragment> {
    fragments
        .iter()
        .filter(|f| f.id.contains_line(line))
        .min_by_key(|f| (f.id.line_count(), f.id.start_line))
}

/// Keep spans sorted and drop any span that partially overlaps an earlier
/// one. Profiles uphold the invariant themselves; this is the final gate.
fn drop_partial_overlaps(mut spans: Vec<ProfileSpan>) -> Vec<ProfileSpan> {
    spans.sort_by_key(|s| (s.start_line, std::cmp::Reverse(s.end_line)));
    spans.dedup_by_key(|s| (s.start_line, s.end_line));

    let mut kept: Vec<ProfileSpan> = Vec::with_capacity(spans.len());
    // Open spans that can still contain upcoming ones, innermost last.
    let mut open: Vec<ProfileSpan> = Vec::new();
    for span in spans {
        while let Some(top) = open.last() {
            if top.end_line < span.start_line {
                open.pop();
            } else {
                break;
            }
        }
        if let Some(top) = open.last() {
            let nested = top.start_line <= span.start_line && span.end_line <= top.end_line;
            if !nested {
                debug!(
                    start = span.start_line,
                    end = span.end_line,
                    "dropping partially overlapping span"
                );
                continue;
            }
        }
        kept.push(span);
        open.push(span);
    }
    kept
}

fn materialize(path: &Path, content: &str, spans: Vec<ProfileSpan>) -> Vec<Fragment> {
    let index = LineIndex::new(content);
    spans
        .into_iter()
        .filter_map(|span| {
            let text = index.slice(content, span.start_line, span.end_line)?;
            let profile = match span.kind {
                FragmentKind::Section | FragmentKind::Config => TokenProfile::Prose,
                _ => TokenProfile::Code,
            };
            Some(Fragment {
                id: FragmentId::new(path, span.start_line, span.end_line),
                kind: span.kind,
                content: text.to_string(),
                identifiers: extract_identifiers(text, profile),
                token_count: estimate_tokens(text),
            })
        })
        .collect()
}

/// Byte offsets of line starts, for verbatim span slicing.
struct LineIndex {
    starts: Vec<usize>,
    total_lines: u32,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = Vec::with_capacity(1024);
        starts.push(0usize);
        for (idx, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(idx + 1);
            }
        }
        // A trailing newline opens no new line.
        let total_lines = if text.ends_with('\n') {
            starts.len() - 1
        } else {
            starts.len()
        } as u32;
        starts.push(text.len());
        Self {
            starts,
            total_lines,
        }
    }

    /// Verbatim text of the 1-based inclusive line range, line endings kept.
    fn slice<'a>(&self, text: &'a str, start_line: u32, end_line: u32) -> Option<&'a str> {
        if start_line < 1 || start_line > end_line || start_line > self.total_lines {
            return None;
        }
        let start = *self.starts.get((start_line - 1) as usize)?;
        let end = *self
            .starts
            .get(end_line.min(self.total_lines) as usize)
            .unwrap_or(&text.len());
        Some(&text[start..end])
    }
}
