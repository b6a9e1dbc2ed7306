//! Heading profile for Markdown and reStructuredText documents.
//!
//! Every heading opens a `section` span running through the last line before
//! the next heading of equal or lesser depth, so deeper subsections nest
//! strictly inside their parents. Content before the first heading is
//! chunked.

use crate::model::FragmentKind;
use crate::profiles::{ProfileSpan, generic};
use lazy_static::lazy_static;
use regex::Regex;

/// Heading dialect picked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingFlavor {
    Markdown,
    Rst,
}

lazy_static! {
    static ref ATX_HEADING: Regex = Regex::new(r"^(#{1,6})\s+\S").expect("static regex");
    static ref RST_UNDERLINE: Regex = Regex::new(r#"^(=+|-+|~+|\^+|"+)\s*$"#).expect("static regex");
}

#[derive(Debug, Clone, Copy)]
struct Heading {
    line: u32,
    depth: u8,
}

/// Fragment `content` with the heading profile.
pub fn fragment_spans(flavor: HeadingFlavor, content: &str) -> Vec<ProfileSpan> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let total = lines.len() as u32;

    let headings = match flavor {
        HeadingFlavor::Markdown => markdown_headings(&lines),
        HeadingFlavor::Rst => rst_headings(&lines),
    };

    let mut spans = Vec::new();
    for (i, h) in headings.iter().enumerate() {
        // Section ends before the next heading of equal or lesser depth.
        let end = headings[i + 1..]
            .iter()
            .find(|next| next.depth <= h.depth)
            .map(|next| next.line - 1)
            .unwrap_or(total);
        spans.push(ProfileSpan::new(h.line, end, FragmentKind::Section));
    }

    // Preamble (and any trailing uncovered lines) become chunks.
    let first_heading = headings.first().map(|h| h.line).unwrap_or(total + 1);
    if first_heading > 1 {
        spans.extend(generic::chunk_range(&lines, 1, first_heading - 1));
    }
    if headings.is_empty() {
        spans.extend(generic::chunk_range(&lines, 1, total));
    }

    spans.sort_by_key(|s| (s.start_line, std::cmp::Reverse(s.end_line)));
    spans
}

fn markdown_headings(lines: &[&str]) -> Vec<Heading> {
    let mut in_fence = false;
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = ATX_HEADING.captures(line) {
            out.push(Heading {
                line: i as u32 + 1,
                depth: caps[1].len() as u8,
            });
        }
    }
    out
}

/// Setext-style reST headings: a title line followed by a full underline.
/// Depth is assigned per underline character in order of first appearance.
fn rst_headings(lines: &[&str]) -> Vec<Heading> {
    let mut depth_by_char: Vec<char> = Vec::new();
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i == 0 || !RST_UNDERLINE.is_match(line) {
            continue;
        }
        let title = lines[i - 1].trim_end();
        if title.is_empty() || line.trim_end().len() < title.len() {
            continue;
        }
        let marker = line.chars().next().unwrap_or('=');
        let depth = match depth_by_char.iter().position(|&c| c == marker) {
            Some(pos) => pos as u8 + 1,
            None => {
                depth_by_char.push(marker);
                depth_by_char.len() as u8
            }
        };
        out.push(Heading {
            line: i as u32, // the title line, 1-based
            depth,
        });
    }
    out
}
