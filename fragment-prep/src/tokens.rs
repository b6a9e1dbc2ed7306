//! Token-count estimation for budgeting.
//!
//! The estimate must be stable across runs and cheap; it is the maximum of a
//! bytes-per-token heuristic (~4 bytes per token, the usual BPE ballpark) and
//! a whitespace/punctuation split count, so that dense punctuation-heavy code
//! is not undercounted.

/// Heuristic bytes-per-token divisor.
const BYTES_PER_TOKEN: usize = 4;

/// Estimate the number of tokens in `text`. An empty string is 0 tokens.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let by_bytes = text.len().div_ceil(BYTES_PER_TOKEN);
    let by_words = text
        .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '_'))
        .filter(|s| !s.is_empty())
        .count();
    by_bytes.max(by_words) as u32
}
