//! Lazy-greedy budgeted selection.
//!
//! Mandatory core fragments (the changed spans) are applied first, in sorted
//! id order, even when they overflow the budget. Expansion candidates then
//! compete through a max-priority queue keyed on stale density upper bounds;
//! submodularity guarantees a popped candidate's true density never exceeds
//! its stored key, so a candidate whose recomputed density is unchanged is
//! safe to commit without scanning the rest of the queue.

use crate::utility::{
    UtilityState, apply_fragment, compute_density, marginal_gain, utility_value,
};
use fragment_prep::{Fragment, FragmentId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tracing::debug;

/// Why the selector stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    BudgetExhausted,
    StoppedByTau,
    NoCandidates,
    NoUtility,
    BestSingleton,
}

impl Display for SelectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use SelectionReason::*;
        let s = match self {
            BudgetExhausted => "budget_exhausted",
            StoppedByTau => "stopped_by_tau",
            NoCandidates => "no_candidates",
            NoUtility => "no_utility",
            BestSingleton => "best_singleton",
        };
        f.write_str(s)
    }
}

/// Outcome of one selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected fragments in stable insertion order (core first).
    pub selected: Vec<Fragment>,
    pub used_tokens: u64,
    pub utility: f64,
    pub reason: SelectionReason,
}

/// Per-path index of the selected, mutually non-overlapping line ranges.
/// A candidate overlapping any selected range on its path is blocked, which
/// covers strict containment in both directions.
#[derive(Debug, Clone, Default)]
struct SelectedIndex {
    by_path: BTreeMap<PathBuf, Vec<(u32, u32)>>,
}

impl SelectedIndex {
    fn blocks(&self, id: &FragmentId) -> bool {
        let Some(ranges) = self.by_path.get(&id.path) else {
            return false;
        };
        // Ranges are sorted and disjoint: only the last range starting at or
        // before the candidate's end can intersect it.
        let i = ranges.partition_point(|&(start, _)| start <= id.end_line);
        i > 0 && ranges[i - 1].1 >= id.start_line
    }

    fn insert(&mut self, id: &FragmentId) {
        let ranges = self.by_path.entry(id.path.clone()).or_default();
        let i = ranges.partition_point(|&(start, _)| start < id.start_line);
        ranges.insert(i, (id.start_line, id.end_line));
    }
}

/// Priority-queue entry: max density first, smaller id on ties.
struct Candidate {
    density: f64,
    id: FragmentId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.density
            .total_cmp(&other.density)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Select fragments maximizing concept coverage under `budget_tokens`.
///
/// `core_ids` are unconditionally included (sorted order, overlap-filtered
/// among themselves); expansion never evicts them. `tau > 0` enables early
/// stopping once candidate density falls below `tau` times the best density
/// committed so far.
pub fn lazy_greedy_select(
    fragments: &[Fragment],
    core_ids: &BTreeSet<FragmentId>,
    rel: &BTreeMap<FragmentId, f64>,
    concepts: &BTreeSet<String>,
    budget_tokens: u64,
    tau: f64,
) -> SelectionResult {
    let by_id: BTreeMap<&FragmentId, &Fragment> =
        fragments.iter().map(|f| (&f.id, f)).collect();
    let rel_of = |id: &FragmentId| rel.get(id).copied().unwrap_or(0.0);

    let mut state = UtilityState::new();
    let mut selected: Vec<Fragment> = Vec::new();
    let mut index = SelectedIndex::default();
    let mut used: u64 = 0;
    let mut budget_pressure = false;

    // Mandatory core, in deterministic id order. Core overflowing the budget
    // is still included; only expansion honors the remaining budget.
    for id in core_ids {
        let Some(frag) = by_id.get(id) else { continue };
        if index.blocks(id) {
            continue;
        }
        apply_fragment(frag, rel_of(id), concepts, &mut state);
        used += frag.token_count as u64;
        index.insert(id);
        selected.push((*frag).clone());
    }
    let core_count = selected.len();
    let core_used = used;
    let core_state = state.clone();
    let core_index = index.clone();
    let baseline = utility_value(&core_state);
    if used > budget_tokens {
        budget_pressure = true;
    }

    let mut tau_stopped = false;
    let mut any_positive_gain = false;
    let mut has_candidates = false;

    if used < budget_tokens {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        for frag in fragments {
            if core_ids.contains(&frag.id) {
                continue;
            }
            has_candidates = true;
            heap.push(Candidate {
                density: compute_density(frag, rel_of(&frag.id), concepts, &state),
                id: frag.id.clone(),
            });
        }

        let mut max_density: f64 = 0.0;
        while let Some(candidate) = heap.pop() {
            let frag = by_id[&candidate.id];
            if index.blocks(&frag.id) {
                continue;
            }
            if frag.token_count as u64 > budget_tokens - used {
                budget_pressure = true;
                continue;
            }
            let r = rel_of(&frag.id);
            let gain = marginal_gain(frag, r, concepts, &state);
            if gain <= 0.0 {
                continue;
            }
            let density = compute_density(frag, r, concepts, &state);
            if density != candidate.density {
                // Stale upper bound: refresh and keep popping.
                heap.push(Candidate {
                    density,
                    id: candidate.id,
                });
                continue;
            }

            apply_fragment(frag, r, concepts, &mut state);
            used += frag.token_count as u64;
            index.insert(&frag.id);
            selected.push(frag.clone());
            any_positive_gain = true;
            max_density = max_density.max(density);

            if tau > 0.0 {
                let achieved =
                    baseline > 0.0 && utility_value(&state) / baseline >= 1.0 + tau;
                if !achieved
                    && heap
                        .peek()
                        .is_some_and(|next| next.density < tau * max_density)
                {
                    tau_stopped = true;
                    break;
                }
            }
        }
    } else if used > 0 {
        budget_pressure = true;
    }

    // Reason priority: budget pressure outranks the tau label even when the
    // early stop is what ended the loop.
    let reason = if budget_pressure {
        SelectionReason::BudgetExhausted
    } else if tau_stopped {
        SelectionReason::StoppedByTau
    } else if has_candidates && !any_positive_gain {
        SelectionReason::NoUtility
    } else {
        SelectionReason::NoCandidates
    };

    let mut result = SelectionResult {
        utility: utility_value(&state),
        selected,
        used_tokens: used,
        reason,
    };

    apply_best_singleton_guard(
        &mut result,
        fragments,
        core_ids,
        rel,
        concepts,
        budget_tokens,
        core_count,
        core_used,
        &core_state,
        &core_index,
        baseline,
    );

    debug!(
        selected = result.selected.len(),
        used_tokens = result.used_tokens,
        reason = %result.reason,
        "selection finished"
    );
    result
}

/// Replace the greedy expansion with the single best non-core fragment when
/// that singleton alone contributes strictly more utility. Greedy density
/// ordering can paint itself into a corner on tight budgets; the guard makes
/// the result at least as good as the best single pick.
#[allow(clippy::too_many_arguments)]
fn apply_best_singleton_guard(
    result: &mut SelectionResult,
    fragments: &[Fragment],
    core_ids: &BTreeSet<FragmentId>,
    rel: &BTreeMap<FragmentId, f64>,
    concepts: &BTreeSet<String>,
    budget_tokens: u64,
    core_count: usize,
    core_used: u64,
    core_state: &UtilityState,
    core_index: &SelectedIndex,
    baseline: f64,
) {
    if core_used >= budget_tokens {
        return;
    }
    let remaining = budget_tokens - core_used;

    let mut best: Option<(&Fragment, f64)> = None;
    let mut sorted: Vec<&Fragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    for frag in sorted {
        if core_ids.contains(&frag.id)
            || frag.token_count as u64 > remaining
            || core_index.blocks(&frag.id)
        {
            continue;
        }
        let r = rel.get(&frag.id).copied().unwrap_or(0.0);
        let scale = if frag.token_count == 0 {
            1.0
        } else {
            (budget_tokens as f64 / frag.token_count as f64).min(1.0)
        };
        let score = r * scale;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((frag, score));
        }
    }
    let Some((single, _)) = best else { return };

    let mut singleton_state = core_state.clone();
    let r = rel.get(&single.id).copied().unwrap_or(0.0);
    apply_fragment(single, r, concepts, &mut singleton_state);
    let singleton_contribution = utility_value(&singleton_state) - baseline;
    let greedy_contribution = result.utility - baseline;

    if singleton_contribution > greedy_contribution {
        result.selected.truncate(core_count);
        result.selected.push(single.clone());
        result.used_tokens = core_used + single.token_count as u64;
        result.utility = utility_value(&singleton_state);
        result.reason = SelectionReason::BestSingleton;
    }
}
