//! Identifier extraction with code and prose token profiles.
//!
//! The code profile targets source text: tokens are maximal runs of Unicode
//! alphanumerics plus `_`, casefolded, with camelCase / snake_case / digit
//! boundaries additionally contributing their segments. The prose profile
//! targets headings, config values, and documentation: whitespace-separated
//! words with internal punctuation (hyphens, dots) kept as-is.
//!
//! Both profiles are Unicode-aware: any letter or number category counts as
//! an identifier character, so Cyrillic, Greek, or CJK identifiers survive,
//! and bidirectional text or combining marks never crash the tokenizer.

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashSet};

/// Which tokenization rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProfile {
    /// Source code: split on non-alphanumerics, segment compound identifiers.
    Code,
    /// Headings / config prose: whitespace split, keep internal punctuation.
    Prose,
}

/// Tokens longer than this are truncated before normalization.
const MAX_TOKEN_CHARS: usize = 128;

/// Minimum token length kept by the code profile.
const MIN_CODE_TOKEN_CHARS: usize = 2;

lazy_static! {
    /// Language keywords that carry no cross-fragment signal.
    static ref STOP_WORDS: HashSet<&'static str> = [
        "and", "as", "async", "await", "break", "case", "catch", "class",
        "const", "continue", "def", "del", "elif", "else", "enum", "except",
        "false", "finally", "fn", "for", "from", "function", "if", "impl",
        "import", "in", "let", "match", "mod", "none", "not", "null", "or",
        "pass", "private", "public", "pub", "raise", "return", "self",
        "static", "struct", "switch", "this", "true", "try", "use", "var",
        "void", "while", "yield",
    ]
    .into_iter()
    .collect();
}

/// Extract the set of normalized identifier-like terms from `text`.
pub fn extract_identifiers(text: &str, profile: TokenProfile) -> BTreeSet<String> {
    extract_identifier_list(text, profile).into_iter().collect()
}

/// Extract identifier-like terms preserving occurrence order and frequency.
pub fn extract_identifier_list(text: &str, profile: TokenProfile) -> Vec<String> {
    let cleaned = strip_noise(text);
    match profile {
        TokenProfile::Code => code_tokens(&cleaned),
        TokenProfile::Prose => prose_tokens(&cleaned),
    }
}

/// Remove NUL bytes, BOMs, and control characters that would otherwise leak
/// into tokens. Newlines and tabs become plain separators.
fn strip_noise(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c == '\u{FEFF}' || c == '\0' || (c.is_control() && c != '\n' && c != '\t') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn code_tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.split(|c: char| !is_ident_char(c)) {
        if raw.is_empty() {
            continue;
        }
        let raw = truncate_chars(raw, MAX_TOKEN_CHARS);
        push_code_token(raw, &mut out);
        let segments = segment_compound(raw);
        if segments.len() > 1 {
            for seg in segments {
                push_code_token(&seg, &mut out);
            }
        }
    }
    out
}

fn push_code_token(raw: &str, out: &mut Vec<String>) {
    let lowered = raw.to_lowercase();
    if lowered.chars().count() < MIN_CODE_TOKEN_CHARS {
        return;
    }
    if lowered.chars().all(|c| c.is_numeric() || c == '_') {
        return;
    }
    if STOP_WORDS.contains(lowered.as_str()) {
        return;
    }
    out.push(lowered);
}

/// Split a compound identifier at `_`, lower→upper, and letter/digit
/// boundaries: `parseHTTPResponse2` → `parse`, `HTTP`, `Response`, `2`.
fn segment_compound(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_numeric() != c.is_numeric() && prev != '_')
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && chars.get(i + 1).is_some_and(|n| n.is_lowercase()));
            if boundary {
                segments.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn prose_tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text.split_whitespace() {
        // Trim surrounding punctuation but keep internal hyphens/dots/underscores.
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.is_empty() {
            continue;
        }
        let trimmed = truncate_chars(trimmed, MAX_TOKEN_CHARS);
        let mut chars = trimmed.chars();
        let first = chars.next().expect("non-empty after trim");
        if chars.next().is_none() && !first.is_alphabetic() {
            continue;
        }
        out.push(trimmed.to_lowercase());
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
