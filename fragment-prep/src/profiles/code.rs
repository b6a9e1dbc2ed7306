//! Structured code profile: Tree-sitter based function/class extraction.
//!
//! On a clean parse we emit one span per definition at any nesting depth
//! (nested definitions are emitted in addition to their enclosing one and are
//! always strictly inside it). Each span is extended upward over attached
//! decorators/attributes and the contiguous leading comment block. Lines not
//! covered by a top-level definition become `chunk` spans.
//!
//! A parse that leaves ERROR nodes in the tree is treated as a failure; the
//! builder then falls back to the generic chunk profile.

use crate::errors::{FragmentError, FragmentResult};
use crate::model::FragmentKind;
use crate::profiles::{ProfileSpan, generic};
use tree_sitter::{Node, Parser};

/// Supported Tree-sitter grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Grammar {
    fn language(self) -> tree_sitter::Language {
        match self {
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Line prefixes that count as attached comments/attributes/decorators
    /// when extending a definition span upward.
    fn attachment_prefixes(self) -> &'static [&'static str] {
        match self {
            Grammar::Python => &["#", "@"],
            Grammar::Rust => &["//", "/*", "*", "#[", "#!["],
            Grammar::JavaScript | Grammar::TypeScript | Grammar::Tsx => &["//", "/*", "*", "@"],
        }
    }
}

enum Classified {
    Def(FragmentKind),
    /// Python `decorated_definition`: wrapper whose span already includes the
    /// decorator lines.
    Decorated,
    Other,
}

fn classify(grammar: Grammar, node: &Node) -> Classified {
    use FragmentKind::{Class, Function};
    let kind = node.kind();
    match grammar {
        Grammar::Python => match kind {
            "function_definition" => Classified::Def(Function),
            "class_definition" => Classified::Def(Class),
            "decorated_definition" => Classified::Decorated,
            _ => Classified::Other,
        },
        Grammar::Rust => match kind {
            "function_item" => Classified::Def(Function),
            "struct_item" | "enum_item" | "union_item" | "trait_item" | "impl_item" => {
                Classified::Def(Class)
            }
            _ => Classified::Other,
        },
        Grammar::JavaScript | Grammar::TypeScript | Grammar::Tsx => match kind {
            "function_declaration" | "generator_function_declaration" | "method_definition"
            | "function_signature" => Classified::Def(Function),
            "class_declaration" | "abstract_class_declaration" | "interface_declaration"
            | "enum_declaration" => Classified::Def(Class),
            "lexical_declaration" | "variable_declaration" if binds_function(node) => {
                Classified::Def(Function)
            }
            _ => Classified::Other,
        },
    }
}

/// `const f = () => {...}` and friends count as function definitions.
fn binds_function(node: &Node) -> bool {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).any(|child| {
        child.kind() == "variable_declarator"
            && child.child_by_field_name("value").is_some_and(|v| {
                matches!(
                    v.kind(),
                    "arrow_function" | "function_expression" | "function" | "generator_function"
                )
            })
    })
}

/// Fragment `content` with the structured profile for `grammar`.
///
/// Returns `Err` when the grammar cannot be loaded or the parse leaves
/// errors; the caller falls back to generic chunking.
pub fn fragment_spans(grammar: Grammar, content: &str) -> FragmentResult<Vec<ProfileSpan>> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .map_err(|e| FragmentError::Grammar(e.to_string()))?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| FragmentError::Parse("tree-sitter returned no tree".into()))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(FragmentError::Parse("syntax errors in parse tree".into()));
    }

    let lines: Vec<&str> = content.lines().collect();
    let total_lines = lines.len() as u32;
    if total_lines == 0 {
        return Ok(Vec::new());
    }

    let mut defs = Vec::new();
    collect_definitions(grammar, root, &mut defs);
    defs.sort_by_key(|s| (s.start_line, std::cmp::Reverse(s.end_line)));
    defs.dedup();

    let (floors, is_top_level) = attachment_floors(&defs);
    for (span, floor) in defs.iter_mut().zip(floors) {
        extend_upward(span, floor, &lines, grammar.attachment_prefixes());
    }

    let mut spans = defs.clone();
    spans.extend(gap_chunks(&defs, &is_top_level, &lines, total_lines));
    spans.sort_by_key(|s| (s.start_line, std::cmp::Reverse(s.end_line)));
    Ok(spans)
}

fn collect_definitions(grammar: Grammar, node: Node, out: &mut Vec<ProfileSpan>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match classify(grammar, &child) {
            Classified::Decorated => {
                let mut c2 = child.walk();
                let inner = child.named_children(&mut c2).find_map(|grandchild| {
                    match classify(grammar, &grandchild) {
                        Classified::Def(kind) => Some((grandchild, kind)),
                        _ => None,
                    }
                });
                if let Some((inner, kind)) = inner {
                    // The wrapper span already covers decorators + definition;
                    // descend only for definitions nested deeper inside.
                    out.push(node_span(&child, kind));
                    collect_definitions(grammar, inner, out);
                }
            }
            Classified::Def(kind) => {
                out.push(node_span(&child, kind));
                collect_definitions(grammar, child, out);
            }
            Classified::Other => collect_definitions(grammar, child, out),
        }
    }
}

fn node_span(node: &Node, kind: FragmentKind) -> ProfileSpan {
    let start = node.start_position().row as u32 + 1;
    let mut end = node.end_position().row as u32 + 1;
    // A node ending exactly at column 0 stops before that line.
    if node.end_position().column == 0 && end > start {
        end -= 1;
    }
    ProfileSpan::new(start, end.max(start), kind)
}

/// For each definition, the lowest line its upward extension may reach, plus
/// whether it is top-level (not contained in any other definition).
///
/// The floor is one line past whichever is nearer: the start of the innermost
/// enclosing definition, or the end of the closest definition that finished
/// before this one starts. This keeps extended spans disjoint-or-nested.
fn attachment_floors(defs: &[ProfileSpan]) -> (Vec<u32>, Vec<bool>) {
    let mut ends: Vec<u32> = defs.iter().map(|s| s.end_line).collect();
    ends.sort_unstable();

    let mut floors = Vec::with_capacity(defs.len());
    let mut top_level = Vec::with_capacity(defs.len());
    let mut stack: Vec<usize> = Vec::new();
    for (i, span) in defs.iter().enumerate() {
        while let Some(&top) = stack.last() {
            if defs[top].end_line < span.start_line {
                stack.pop();
            } else {
                break;
            }
        }
        let parent_floor = stack
            .last()
            .map(|&p| defs[p].start_line + 1)
            .unwrap_or(1);
        let idx = ends.partition_point(|&e| e < span.start_line);
        let closed_floor = if idx > 0 { ends[idx - 1] + 1 } else { 1 };
        floors.push(parent_floor.max(closed_floor));
        top_level.push(stack.is_empty());
        stack.push(i);
    }
    (floors, top_level)
}

fn extend_upward(span: &mut ProfileSpan, floor: u32, lines: &[&str], prefixes: &[&str]) {
    let mut start = span.start_line;
    while start > floor {
        let above = lines[(start - 2) as usize].trim_start();
        if above.is_empty() || !prefixes.iter().any(|p| above.starts_with(p)) {
            break;
        }
        start -= 1;
    }
    span.start_line = start;
}

/// Chunk every line range not covered by a top-level definition.
fn gap_chunks(
    defs: &[ProfileSpan],
    is_top_level: &[bool],
    lines: &[&str],
    total_lines: u32,
) -> Vec<ProfileSpan> {
    let mut covered: Vec<(u32, u32)> = defs
        .iter()
        .zip(is_top_level)
        .filter(|(_, top)| **top)
        .map(|(s, _)| (s.start_line, s.end_line))
        .collect();
    covered.sort_unstable();

    let mut chunks = Vec::new();
    let mut cursor = 1u32;
    for (start, end) in covered {
        if start > cursor {
            chunks.extend(generic::chunk_range(lines, cursor, start - 1));
        }
        cursor = cursor.max(end + 1);
    }
    if cursor <= total_lines {
        chunks.extend(generic::chunk_range(lines, cursor, total_lines));
    }
    chunks
}
