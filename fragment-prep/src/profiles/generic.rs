//! Generic chunk profile: the fallback for unknown formats and for files the
//! structured parse rejects.
//!
//! Emits `chunk` spans of at most [`MAX_CHUNK_LINES`] lines, preferring to
//! break after a blank line so chunks align with paragraph/definition
//! boundaries. Lines are never split.

use crate::model::FragmentKind;
use crate::profiles::ProfileSpan;

/// Upper bound on the number of lines in one generic chunk.
pub const MAX_CHUNK_LINES: u32 = 200;

/// Chunk an entire file of `total_lines` lines.
pub fn chunk_spans(lines: &[&str]) -> Vec<ProfileSpan> {
    chunk_range(lines, 1, lines.len() as u32)
}

/// Chunk the inclusive 1-based line range `[start, end]` of `lines`.
///
/// Used both for whole-file fallback chunking and for gap regions between
/// structured definitions.
pub fn chunk_range(lines: &[&str], start: u32, end: u32) -> Vec<ProfileSpan> {
    let mut spans = Vec::new();
    if start > end || start < 1 || end as usize > lines.len() {
        return spans;
    }
    let mut cursor = start;
    while cursor <= end {
        let hard_stop = (cursor + MAX_CHUNK_LINES - 1).min(end);
        let mut stop = hard_stop;
        if hard_stop < end {
            // Prefer the last blank line inside the window, keeping at least
            // one content line in the chunk.
            for line_no in (cursor..=hard_stop).rev() {
                if lines[(line_no - 1) as usize].trim().is_empty() && line_no > cursor {
                    stop = line_no;
                    break;
                }
            }
        }
        spans.push(ProfileSpan::new(cursor, stop, FragmentKind::Chunk));
        cursor = stop + 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn small_file_single_chunk() {
        let owned = lines_of(10);
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let spans = chunk_spans(&lines);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_line, 1);
        assert_eq!(spans[0].end_line, 10);
        assert_eq!(spans[0].kind, FragmentKind::Chunk);
    }

    #[test]
    fn long_file_splits_at_limit() {
        let owned = lines_of(250);
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let spans = chunk_spans(&lines);
        assert!(spans.len() >= 2);
        assert_eq!(spans[0].start_line, 1);
        assert!(spans[0].end_line - spans[0].start_line + 1 <= MAX_CHUNK_LINES);
        // Chunks are contiguous and cover the file.
        for pair in spans.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }
        assert_eq!(spans.last().unwrap().end_line, 250);
    }

    #[test]
    fn split_prefers_blank_lines() {
        let mut owned = lines_of(250);
        owned[99] = String::new(); // blank at line 100
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let spans = chunk_spans(&lines);
        assert_eq!(spans[0].end_line, 100);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let owned = lines_of(5);
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        assert!(chunk_range(&lines, 4, 3).is_empty());
    }
}
