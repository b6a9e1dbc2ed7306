//! Output model: the `DiffContextTree` and its serializers.

use crate::errors::CtxResult;
use crate::neighbors::to_unix_sep;
use fragment_prep::{Fragment, FragmentKind};
use relevance_graph::SelectionReason;
use serde::{Deserialize, Serialize};

/// Final, ordered answer of a diff-context run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffContextTree {
    /// Always `"diff_context"`.
    #[serde(rename = "type")]
    pub node_type: String,
    pub fragment_count: usize,
    pub used_tokens: u64,
    pub selection_reason: String,
    pub fragments: Vec<FragmentNode>,
}

/// One emitted fragment, sorted by `(path, start_line)` within the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentNode {
    /// Repo-relative path with forward slashes.
    pub path: String,
    /// `"<start>-<end>"`, 1-based inclusive.
    pub lines: String,
    pub kind: FragmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DiffContextTree {
    /// Shape of an empty-diff run.
    pub fn empty() -> Self {
        Self {
            node_type: "diff_context".into(),
            fragment_count: 0,
            used_tokens: 0,
            selection_reason: SelectionReason::NoCandidates.to_string(),
            fragments: Vec::new(),
        }
    }

    /// Assemble the tree from selected fragments.
    pub fn from_selection(
        mut selected: Vec<Fragment>,
        used_tokens: u64,
        reason: SelectionReason,
        no_content: bool,
    ) -> Self {
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        let fragments: Vec<FragmentNode> = selected
            .into_iter()
            .map(|frag| FragmentNode {
                path: to_unix_sep(frag.id.path.to_string_lossy()),
                lines: format!("{}-{}", frag.id.start_line, frag.id.end_line),
                kind: frag.kind,
                content: (!no_content).then_some(frag.content),
            })
            .collect();
        Self {
            node_type: "diff_context".into(),
            fragment_count: fragments.len(),
            used_tokens,
            selection_reason: reason.to_string(),
            fragments,
        }
    }

    pub fn to_yaml(&self) -> CtxResult<String> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn to_json(&self) -> CtxResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text rendering: a header plus one `path:lines [kind]` block per
    /// fragment, content indented underneath unless omitted.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "diff_context: {} fragments, {} tokens, reason={}\n",
            self.fragment_count, self.used_tokens, self.selection_reason
        ));
        for frag in &self.fragments {
            out.push_str(&format!("\n{}:{} [{}]\n", frag.path, frag.lines, frag.kind));
            if let Some(content) = &frag.content {
                for line in content.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }
}
