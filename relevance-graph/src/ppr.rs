//! Personalized PageRank over the fragment graph.
//!
//! The convention here assigns `alpha` to the neighbor-following step and
//! `1 - alpha` to the restart onto the personalization vector. Mass sitting
//! on dangling nodes (no outgoing edges) is redistributed uniformly over all
//! nodes each step, so the iterate always remains a probability
//! distribution. Convergence for `alpha < 1` holds regardless of cycles.

use crate::errors::{GraphError, GraphResult};
use crate::graph::Graph;
use fragment_prep::FragmentId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Default L1 convergence tolerance.
pub const DEFAULT_TOL: f64 = 1e-6;

/// Default iteration cap.
pub const DEFAULT_MAX_ITER: usize = 100;

/// Compute personalized PageRank with default tolerance and iteration cap.
pub fn personalized_pagerank(
    graph: &Graph,
    seeds: &BTreeSet<FragmentId>,
    alpha: f64,
) -> GraphResult<BTreeMap<FragmentId, f64>> {
    personalized_pagerank_with(graph, seeds, alpha, DEFAULT_TOL, DEFAULT_MAX_ITER)
}

/// Compute personalized PageRank scores for every node of `graph`.
///
/// The personalization vector is uniform over `seeds ∩ nodes`; when that
/// intersection is empty it falls back to uniform over all nodes. Scores are
/// non-negative, sum to 1 within `|nodes| * 1e-9`, and are bitwise
/// deterministic for identical inputs.
///
/// # Errors
/// `GraphError::InvalidAlpha` when `alpha` is outside `[0, 1)`.
pub fn personalized_pagerank_with(
    graph: &Graph,
    seeds: &BTreeSet<FragmentId>,
    alpha: f64,
    tol: f64,
    max_iter: usize,
) -> GraphResult<BTreeMap<FragmentId, f64>> {
    if !alpha.is_finite() || !(0.0..1.0).contains(&alpha) {
        return Err(GraphError::InvalidAlpha(alpha));
    }

    let ids = graph.node_ids();
    let n = ids.len();
    if n == 0 {
        return Ok(BTreeMap::new());
    }

    let adjacency = clamp_outliers(graph.adjacency());
    let out_weight: Vec<f64> = adjacency
        .iter()
        .map(|targets| targets.iter().map(|&(_, w)| w).sum())
        .collect();

    // Personalization: uniform over present seeds, else uniform over all.
    let seed_positions: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| seeds.contains(**id))
        .map(|(i, _)| i)
        .collect();
    let personalization: Vec<f64> = if seed_positions.is_empty() {
        vec![1.0 / n as f64; n]
    } else {
        let share = 1.0 / seed_positions.len() as f64;
        let mut p = vec![0.0; n];
        for &i in &seed_positions {
            p[i] = share;
        }
        p
    };

    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];
    for iteration in 0..max_iter {
        let dangling_mass: f64 = scores
            .iter()
            .zip(&out_weight)
            .filter(|&(_, &ow)| ow <= 0.0)
            .map(|(&s, _)| s)
            .sum::<f64>()
            * alpha;

        let base = dangling_mass / n as f64;
        for (v, slot) in next.iter_mut().enumerate() {
            *slot = (1.0 - alpha) * personalization[v] + base;
        }
        for (u, targets) in adjacency.iter().enumerate() {
            if out_weight[u] <= 0.0 {
                continue;
            }
            let factor = alpha * scores[u] / out_weight[u];
            if !factor.is_finite() {
                continue;
            }
            for &(v, w) in targets {
                next[v] += factor * w;
            }
        }
        for slot in next.iter_mut() {
            if !slot.is_finite() {
                *slot = 0.0;
            }
        }

        let delta: f64 = scores
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);
        if delta <= tol {
            debug!(iteration, delta, "pagerank converged");
            break;
        }
    }

    Ok(ids
        .into_iter()
        .zip(scores)
        .map(|(id, s)| (id.clone(), if s.is_finite() { s.max(0.0) } else { 0.0 }))
        .collect())
}

/// Clamp per-source outlier weights to the 99th percentile of that source's
/// edge weights. For fewer than ~100 outgoing edges this is the identity.
fn clamp_outliers(mut adjacency: Vec<Vec<(usize, f64)>>) -> Vec<Vec<(usize, f64)>> {
    for targets in &mut adjacency {
        if targets.len() < 2 {
            continue;
        }
        let mut weights: Vec<f64> = targets.iter().map(|&(_, w)| w).collect();
        weights.sort_unstable_by(|a, b| a.total_cmp(b));
        let rank = ((weights.len() as f64) * 0.99).ceil() as usize;
        let p99 = weights[rank.clamp(1, weights.len()) - 1];
        for entry in targets.iter_mut() {
            if entry.1 > p99 {
                entry.1 = p99;
            }
        }
    }
    adjacency
}
