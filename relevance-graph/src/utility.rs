//! Submodular coverage utility for the selector.
//!
//! The objective is `F(S) = Σ_c max_{f ∈ S, c ∈ idents(f)} rel(f)
//! + γ · Σ_{f ∈ S} rel(f)`: per-concept best relevance plus a small
//! tie-break toward high-relevance fragments. Marginal gains shrink as the
//! state grows, which is what lets the selector run lazily.

use fragment_prep::Fragment;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Tie-break coefficient rewarding raw relevance on top of coverage.
pub const GAMMA: f64 = 0.1;

/// Gain factor for fragments covering no diff concept at all. Kept positive
/// so a relevant fragment is never completely invisible to the selector.
const EMPTY_CONCEPT_FALLBACK: f64 = 0.1;

/// Running coverage state of the selection.
#[derive(Debug, Clone, Default)]
pub struct UtilityState {
    /// Best relevance of any selected fragment covering each concept.
    pub max_rel: BTreeMap<String, f64>,
    /// Paths touched by the selection so far.
    pub covered_paths: BTreeSet<PathBuf>,
    /// Token total of the selection so far.
    pub total_tokens: u64,
}

impl UtilityState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Marginal utility of adding `frag` with relevance `rel` to `state`.
///
/// Covering fragments earn the per-concept improvement plus `γ · rel`;
/// fragments sharing no concept fall back to a flat `0.1 · rel`.
pub fn marginal_gain(
    frag: &Fragment,
    rel: f64,
    concepts: &BTreeSet<String>,
    state: &UtilityState,
) -> f64 {
    let mut covered_any = false;
    let mut gain = 0.0;
    for concept in frag.identifiers.intersection(concepts) {
        covered_any = true;
        let prev = state.max_rel.get(concept).copied().unwrap_or(0.0);
        gain += (rel - prev).max(0.0);
    }
    if !covered_any {
        return EMPTY_CONCEPT_FALLBACK * rel;
    }
    gain + GAMMA * rel
}

/// Gain per token; fragments with no tokens have zero density.
pub fn compute_density(
    frag: &Fragment,
    rel: f64,
    concepts: &BTreeSet<String>,
    state: &UtilityState,
) -> f64 {
    if frag.token_count == 0 {
        return 0.0;
    }
    marginal_gain(frag, rel, concepts, state) / frag.token_count as f64
}

/// Fold `frag` into the state: raise per-concept maxima, record the path and
/// the token cost.
pub fn apply_fragment(
    frag: &Fragment,
    rel: f64,
    concepts: &BTreeSet<String>,
    state: &mut UtilityState,
) {
    for concept in frag.identifiers.intersection(concepts) {
        let entry = state.max_rel.entry(concept.clone()).or_insert(0.0);
        if rel > *entry {
            *entry = rel;
        }
    }
    state.covered_paths.insert(frag.id.path.clone());
    state.total_tokens += frag.token_count as u64;
}

/// Current coverage value: the sum of per-concept best relevances.
pub fn utility_value(state: &UtilityState) -> f64 {
    state.max_rel.values().sum()
}
