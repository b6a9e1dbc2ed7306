//! Diff concepts: the coverage targets the selector optimizes for.
//!
//! Every identifier on an added or removed hunk-body line (never the
//! `+++`/`---` file headers) of length >= 3 becomes a concept.

use fragment_prep::{TokenProfile, extract_identifier_list};
use std::collections::BTreeSet;

/// Minimum concept length in characters.
const MIN_CONCEPT_CHARS: usize = 3;

/// Extract the concept set from unified diff text.
pub fn concepts_from_diff_text(diff_text: &str) -> BTreeSet<String> {
    let mut concepts = BTreeSet::new();
    for line in diff_text.lines() {
        let body = if line.starts_with("+++") || line.starts_with("---") {
            continue;
        } else if let Some(rest) = line.strip_prefix('+') {
            rest
        } else if let Some(rest) = line.strip_prefix('-') {
            rest
        } else {
            continue;
        };
        for ident in extract_identifier_list(body, TokenProfile::Code) {
            if ident.chars().count() >= MIN_CONCEPT_CHARS {
                concepts.insert(ident);
            }
        }
    }
    concepts
}
