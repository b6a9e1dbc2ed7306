//! Weighted fragment graph and its construction from a fragment universe.
//!
//! Storage is a `petgraph` digraph with fragment ids as node payloads.
//! Parallel edges collapse to the maximum weight, non-finite and non-positive
//! weights are rejected at the insertion boundary, and self-loops may sit in
//! storage but never appear in `neighbors()` — the PageRank engine only ever
//! sees clean adjacency.

use fragment_prep::{Fragment, FragmentId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Identifiers shared by at least this many fragments are hubs; their
/// pairwise affinity edges are suppressed entirely.
pub const HUB_THRESHOLD: usize = 6;

/// Weight of the bidirectional containment edge between a fragment and a
/// fragment strictly nested inside it.
const CONTAINMENT_WEIGHT: f64 = 0.6;

/// Base weight of same-file locality edges; the actual weight decays with
/// line distance and never exceeds this cap.
const LOCALITY_CAP: f64 = 0.3;

/// How many following siblings each fragment links to within its file. A
/// bounded window keeps a 10k-fragment file linear instead of quadratic.
const LOCALITY_WINDOW: usize = 4;

/// Directed weighted graph over fragment ids.
///
/// Node iteration order is insertion order; [`build_graph`] inserts sorted
/// ids, which makes every downstream traversal deterministic.
#[derive(Debug, Default)]
pub struct Graph {
    inner: DiGraph<FragmentId, f64>,
    index: HashMap<FragmentId, NodeIndex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node if absent; returns its index either way.
    pub fn add_node(&mut self, id: FragmentId) -> NodeIndex {
        match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.inner.add_node(id.clone());
                self.index.insert(id, idx);
                idx
            }
        }
    }

    /// Insert a directed edge, collapsing parallel edges to the max weight.
    ///
    /// Non-finite and non-positive weights are dropped at this boundary.
    /// Self-loops are stored but never surface through [`Graph::neighbors`].
    pub fn add_edge(&mut self, from: FragmentId, to: FragmentId, weight: f64) {
        if !weight.is_finite() || weight <= 0.0 {
            debug!(%from, %to, weight, "rejecting edge with invalid weight");
            return;
        }
        let u = self.add_node(from);
        let v = self.add_node(to);
        match self.inner.find_edge(u, v) {
            Some(edge) => {
                let existing = self.inner[edge];
                if weight > existing {
                    self.inner[edge] = weight;
                }
            }
            None => {
                self.inner.add_edge(u, v, weight);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn contains(&self, id: &FragmentId) -> bool {
        self.index.contains_key(id)
    }

    /// Node ids in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &FragmentId> {
        self.inner.node_indices().map(|idx| &self.inner[idx])
    }

    /// Outgoing neighbors of `id` with weights, self-loops excluded.
    pub fn neighbors(&self, id: &FragmentId) -> BTreeMap<FragmentId, f64> {
        let Some(&u) = self.index.get(id) else {
            return BTreeMap::new();
        };
        self.inner
            .edges(u)
            .filter(|edge| edge.target() != u)
            .map(|edge| (self.inner[edge.target()].clone(), *edge.weight()))
            .collect()
    }

    /// Index-based adjacency for the PageRank engine: for each node in
    /// insertion order, its outgoing `(target, weight)` pairs with self-loops
    /// and invalid weights filtered.
    pub(crate) fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut out = vec![Vec::new(); self.inner.node_count()];
        for edge in self.inner.edge_indices() {
            let Some((u, v)) = self.inner.edge_endpoints(edge) else {
                continue;
            };
            if u == v {
                continue;
            }
            let w = self.inner[edge];
            if !w.is_finite() || w <= 0.0 {
                continue;
            }
            out[u.index()].push((v.index(), w));
        }
        for targets in &mut out {
            targets.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }
        out
    }

    pub(crate) fn node_ids(&self) -> Vec<&FragmentId> {
        self.inner
            .node_indices()
            .map(|idx| &self.inner[idx])
            .collect()
    }
}

/// Build the relevance graph over a fragment universe.
///
/// Edges:
/// 1. shared-identifier affinity weighted by `ln(N / df)`, with hub
///    identifiers (`df >= HUB_THRESHOLD`) suppressed;
/// 2. bidirectional containment edges for strictly nested pairs;
/// 3. same-file locality edges decaying with line distance.
///
/// Every fragment becomes a node whether or not it has edges. Input order is
/// irrelevant: nodes are inserted in sorted-id order.
pub fn build_graph(fragments: &[Fragment]) -> Graph {
    let mut sorted: Vec<&Fragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted.dedup_by(|a, b| a.id == b.id);

    let mut graph = Graph::new();
    for frag in &sorted {
        graph.add_node(frag.id.clone());
    }
    let total = sorted.len();
    if total == 0 {
        return graph;
    }

    shared_identifier_edges(&mut graph, &sorted, total);
    within_path_edges(&mut graph, &sorted);

    debug!(
        nodes = graph.node_count(),
        fragments = total,
        "relevance graph built"
    );
    graph
}

fn shared_identifier_edges(graph: &mut Graph, sorted: &[&Fragment], total: usize) {
    let mut by_identifier: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, frag) in sorted.iter().enumerate() {
        for ident in &frag.identifiers {
            by_identifier.entry(ident.as_str()).or_default().push(i);
        }
    }

    for (ident, holders) in by_identifier {
        let df = holders.len();
        if df < 2 {
            continue;
        }
        if df >= HUB_THRESHOLD {
            debug!(ident, df, "suppressing hub identifier");
            continue;
        }
        let idf = (total as f64 / df as f64).ln();
        if !idf.is_finite() || idf <= 0.0 {
            continue;
        }
        for &a in &holders {
            for &b in &holders {
                if a != b {
                    graph.add_edge(sorted[a].id.clone(), sorted[b].id.clone(), idf);
                }
            }
        }
    }
}

/// Containment and locality edges within each file.
fn within_path_edges(graph: &mut Graph, sorted: &[&Fragment]) {
    let mut start = 0;
    while start < sorted.len() {
        let path = sorted[start].path();
        let mut end = start;
        while end < sorted.len() && sorted[end].path() == path {
            end += 1;
        }
        // Parents-first order: an open ancestor stack then captures every
        // strictly containing span.
        let mut group: Vec<&Fragment> = sorted[start..end].to_vec();
        group.sort_by_key(|f| (f.id.start_line, std::cmp::Reverse(f.id.end_line)));

        let mut stack: Vec<usize> = Vec::new();
        for (i, frag) in group.iter().enumerate() {
            while let Some(&top) = stack.last() {
                if group[top].id.end_line < frag.id.start_line {
                    stack.pop();
                } else {
                    break;
                }
            }
            for &ancestor in &stack {
                if group[ancestor].id.strictly_contains(&frag.id) {
                    graph.add_edge(
                        group[ancestor].id.clone(),
                        frag.id.clone(),
                        CONTAINMENT_WEIGHT,
                    );
                    graph.add_edge(
                        frag.id.clone(),
                        group[ancestor].id.clone(),
                        CONTAINMENT_WEIGHT,
                    );
                }
            }
            stack.push(i);
        }

        // Locality: link each fragment to its next few disjoint successors.
        for (i, frag) in group.iter().enumerate() {
            let mut linked = 0usize;
            for other in group.iter().skip(i + 1) {
                if linked >= LOCALITY_WINDOW {
                    break;
                }
                if frag.id.overlaps(&other.id) {
                    continue;
                }
                let distance = other.id.start_line.saturating_sub(frag.id.end_line) as f64;
                let weight = (LOCALITY_CAP / (1.0 + distance)).min(LOCALITY_CAP);
                graph.add_edge(frag.id.clone(), other.id.clone(), weight);
                graph.add_edge(other.id.clone(), frag.id.clone(), weight);
                linked += 1;
            }
        }

        start = end;
    }
}
