//! Line-structured config profile for YAML/TOML/INI/.env files.
//!
//! Emits one `config` span per top-level key or section header, covering the
//! header line and everything up to the next top-level header. Nested keys
//! (YAML second level, dotted TOML tables) become child `config` spans
//! strictly inside their section. Uncovered prelude lines are chunked so the
//! whole file stays addressable.

use crate::model::FragmentKind;
use crate::profiles::{ProfileSpan, generic};
use lazy_static::lazy_static;
use regex::Regex;

/// Config dialect picked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFlavor {
    Yaml,
    Toml,
    Ini,
    Env,
}

lazy_static! {
    static ref YAML_KEY: Regex =
        Regex::new(r#"^[A-Za-z0-9_$"'.-]+\s*:(\s|$)"#).expect("static regex");
    static ref SECTION_HEADER: Regex = Regex::new(r"^\[+[^\]]+\]+").expect("static regex");
    static ref KEY_VALUE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+\s*=").expect("static regex");
}

/// Fragment `content` with the config profile.
pub fn fragment_spans(flavor: ConfigFlavor, content: &str) -> Vec<ProfileSpan> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let mut spans = match flavor {
        ConfigFlavor::Yaml => yaml_spans(&lines),
        ConfigFlavor::Toml | ConfigFlavor::Ini => section_spans(&lines, flavor),
        ConfigFlavor::Env => env_spans(&lines),
    };
    add_gap_chunks(&mut spans, &lines);
    spans.sort_by_key(|s| (s.start_line, std::cmp::Reverse(s.end_line)));
    spans
}

fn is_yaml_top_key(line: &str) -> bool {
    YAML_KEY.is_match(line)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn yaml_spans(lines: &[&str]) -> Vec<ProfileSpan> {
    let total = lines.len() as u32;
    let top_keys: Vec<u32> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_yaml_top_key(l))
        .map(|(i, _)| i as u32 + 1)
        .collect();

    let mut spans = Vec::new();
    for (i, &start) in top_keys.iter().enumerate() {
        let end = top_keys.get(i + 1).map(|&n| n - 1).unwrap_or(total);
        spans.push(ProfileSpan::new(start, end, FragmentKind::Config));
        spans.extend(yaml_child_spans(lines, start, end));
    }
    spans
}

/// Child keys of one YAML section: key lines at the section's first child
/// indent, each spanning until the next key at the same or smaller indent.
fn yaml_child_spans(lines: &[&str], section_start: u32, section_end: u32) -> Vec<ProfileSpan> {
    let body = (section_start + 1)..=section_end;
    let child_indent = body
        .clone()
        .filter_map(|n| {
            let line = lines[(n - 1) as usize];
            let trimmed = line.trim_start_matches(' ');
            (!trimmed.is_empty() && is_yaml_top_key(trimmed)).then(|| indent_of(line))
        })
        .filter(|&i| i > 0)
        .min();
    let Some(child_indent) = child_indent else {
        return Vec::new();
    };

    let child_starts: Vec<u32> = body
        .filter(|&n| {
            let line = lines[(n - 1) as usize];
            indent_of(line) == child_indent && is_yaml_top_key(line.trim_start_matches(' '))
        })
        .collect();

    let mut out = Vec::new();
    for (i, &start) in child_starts.iter().enumerate() {
        let mut end = child_starts.get(i + 1).map(|&n| n - 1).unwrap_or(section_end);
        // Multi-line children keep their deeper continuation lines only.
        while end > start {
            let line = lines[(end - 1) as usize];
            if line.trim().is_empty() || indent_of(line) < child_indent {
                end -= 1;
            } else {
                break;
            }
        }
        // A child covering the whole section would not nest strictly.
        if start == section_start + 1 && end == section_end && child_starts.len() == 1 {
            continue;
        }
        if end > start || child_starts.len() > 1 {
            out.push(ProfileSpan::new(start, end, FragmentKind::Config));
        }
    }
    out
}

fn section_spans(lines: &[&str], flavor: ConfigFlavor) -> Vec<ProfileSpan> {
    let total = lines.len() as u32;

    #[derive(Clone, Copy)]
    struct Header {
        line: u32,
        nested: bool,
    }

    let headers: Vec<Header> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| SECTION_HEADER.is_match(l.trim_start()))
        .map(|(i, l)| {
            let name = l
                .trim_start()
                .trim_start_matches('[')
                .split(']')
                .next()
                .unwrap_or_default();
            Header {
                line: i as u32 + 1,
                nested: flavor == ConfigFlavor::Toml && name.contains('.'),
            }
        })
        .collect();

    let mut spans = Vec::new();

    // Prelude keys before the first header: one span per top-level key.
    let prelude_end = headers.first().map(|h| h.line - 1).unwrap_or(total);
    let key_lines: Vec<u32> = (1..=prelude_end)
        .filter(|&n| KEY_VALUE.is_match(lines[(n - 1) as usize]))
        .collect();
    for (i, &start) in key_lines.iter().enumerate() {
        let end = key_lines.get(i + 1).map(|&n| n - 1).unwrap_or(prelude_end);
        spans.push(ProfileSpan::new(start, trim_trailing_blank(lines, start, end), FragmentKind::Config));
    }

    // Top-level sections span to the next top-level header; nested (dotted)
    // tables become children inside them.
    let top: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.nested)
        .map(|(i, _)| i)
        .collect();
    for (ti, &hi) in top.iter().enumerate() {
        let start = headers[hi].line;
        let end = top
            .get(ti + 1)
            .map(|&next| headers[next].line - 1)
            .unwrap_or(total);
        spans.push(ProfileSpan::new(start, end, FragmentKind::Config));

        for (j, header) in headers.iter().enumerate() {
            if header.nested && header.line > start && header.line <= end {
                let child_end = headers
                    .get(j + 1)
                    .map(|h| h.line - 1)
                    .unwrap_or(total)
                    .min(end);
                if header.line > start {
                    spans.push(ProfileSpan::new(
                        header.line,
                        child_end,
                        FragmentKind::Config,
                    ));
                }
            }
        }
    }

    // Dotted tables with no enclosing plain section still get a span.
    for (j, header) in headers.iter().enumerate() {
        if header.nested
            && !spans
                .iter()
                .any(|s| s.start_line < header.line && s.end_line >= header.line)
        {
            let child_end = headers.get(j + 1).map(|h| h.line - 1).unwrap_or(total);
            spans.push(ProfileSpan::new(header.line, child_end, FragmentKind::Config));
        }
    }

    spans
}

fn env_spans(lines: &[&str]) -> Vec<ProfileSpan> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| KEY_VALUE.is_match(l))
        .map(|(i, _)| ProfileSpan::new(i as u32 + 1, i as u32 + 1, FragmentKind::Config))
        .collect()
}

fn trim_trailing_blank(lines: &[&str], start: u32, end: u32) -> u32 {
    let mut end = end;
    while end > start && lines[(end - 1) as usize].trim().is_empty() {
        end -= 1;
    }
    end
}

/// Chunk every line not covered by a top-level config span.
fn add_gap_chunks(spans: &mut Vec<ProfileSpan>, lines: &[&str]) {
    let total = lines.len() as u32;
    let mut covered: Vec<(u32, u32)> = spans
        .iter()
        .filter(|s| !spans.iter().any(|o| o != *s && o.start_line <= s.start_line && o.end_line >= s.end_line))
        .map(|s| (s.start_line, s.end_line))
        .collect();
    covered.sort_unstable();

    let mut cursor = 1u32;
    let mut chunks = Vec::new();
    for (start, end) in covered {
        if start > cursor {
            chunks.extend(generic::chunk_range(lines, cursor, start - 1));
        }
        cursor = cursor.max(end + 1);
    }
    if cursor <= total {
        chunks.extend(generic::chunk_range(lines, cursor, total));
    }
    spans.extend(chunks);
}
