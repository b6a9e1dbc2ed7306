//! Property-style invariants over generated graphs.
//!
//! A small deterministic LCG drives the generation so failures reproduce
//! exactly; every case checks the probability-distribution invariants the
//! engine promises regardless of topology or junk weights.

use fragment_prep::{Fragment, FragmentId, FragmentKind};
use relevance_graph::{
    Graph, SelectionReason, lazy_greedy_select, personalized_pagerank,
};
use std::collections::{BTreeMap, BTreeSet};

/// Deterministic linear congruential generator (numerical recipes constants).
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound.max(1)
    }

    fn unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / f64::from(u32::MAX)
    }
}

fn node(i: u32) -> FragmentId {
    FragmentId::new(format!("node{i:02}.py"), i * 10 + 1, i * 10 + 5)
}

fn fragment(i: u32, idents: &[String], tokens: u32) -> Fragment {
    Fragment {
        id: node(i),
        kind: FragmentKind::Function,
        content: String::new(),
        identifiers: idents.iter().cloned().collect(),
        token_count: tokens,
    }
}

#[test]
fn random_graphs_yield_probability_distributions() {
    let mut rng = Lcg(0x5eed);
    for case in 0..60 {
        let n = 1 + rng.below(20);
        let mut graph = Graph::new();
        for i in 0..n {
            graph.add_node(node(i));
        }
        let edges = rng.below(51);
        for _ in 0..edges {
            let u = rng.below(n);
            let v = rng.below(n);
            // Mix in junk weights; the graph must filter them.
            let weight = match rng.below(6) {
                0 => 0.0,
                1 => -rng.unit(),
                2 => f64::NAN,
                3 => f64::INFINITY,
                _ => rng.unit() + 1e-6,
            };
            graph.add_edge(node(u), node(v), weight);
        }
        let alpha = 0.1 + 0.8 * rng.unit();
        let seeds: BTreeSet<FragmentId> = (0..1 + rng.below(3)).map(|_| node(rng.below(n))).collect();

        let scores = personalized_pagerank(&graph, &seeds, alpha)
            .unwrap_or_else(|e| panic!("case {case}: {e}"));
        assert_eq!(scores.len(), n as usize, "case {case}");
        let total: f64 = scores.values().sum();
        assert!(
            (total - 1.0).abs() < 1e-5,
            "case {case}: sum {total} (alpha {alpha})"
        );
        for (id, score) in &scores {
            assert!(
                score.is_finite() && *score >= 0.0,
                "case {case}: score {score} for {id}"
            );
        }
    }
}

#[test]
fn junk_weights_and_self_loops_never_reach_neighbors() {
    let mut rng = Lcg(0xfeed);
    for _ in 0..20 {
        let n = 2 + rng.below(10);
        let mut graph = Graph::new();
        for i in 0..n {
            graph.add_node(node(i));
        }
        for i in 0..n {
            graph.add_edge(node(i), node(i), 0.5); // self-loop
            graph.add_edge(node(i), node((i + 1) % n), 0.0);
            graph.add_edge(node(i), node((i + 1) % n), -1.0);
            graph.add_edge(node(i), node((i + 1) % n), f64::NAN);
        }
        for i in 0..n {
            let neighbors = graph.neighbors(&node(i));
            assert!(!neighbors.contains_key(&node(i)), "self-loop leaked");
            assert!(
                neighbors.values().all(|w| w.is_finite() && *w > 0.0),
                "junk weight leaked: {neighbors:?}"
            );
        }
    }
}

#[test]
fn selection_respects_budget_on_random_universes() {
    let mut rng = Lcg(0xabcdef);
    for case in 0..40 {
        let n = 1 + rng.below(30);
        let vocabulary: Vec<String> = (0..8).map(|i| format!("shared_term_{i}")).collect();
        let fragments: Vec<Fragment> = (0..n)
            .map(|i| {
                let mut idents = Vec::new();
                for _ in 0..rng.below(4) {
                    idents.push(vocabulary[rng.below(8) as usize].clone());
                }
                fragment(i, &idents, 10 + rng.below(200))
            })
            .collect();
        let rel: BTreeMap<FragmentId, f64> = fragments
            .iter()
            .map(|f| (f.id.clone(), rng.unit()))
            .collect();
        let concepts: BTreeSet<String> = vocabulary.iter().cloned().collect();
        let budget = u64::from(50 + rng.below(500));

        let result = lazy_greedy_select(&fragments, &BTreeSet::new(), &rel, &concepts, budget, 0.0);
        assert!(
            result.used_tokens <= budget,
            "case {case}: {} > {budget}",
            result.used_tokens
        );
        if result.selected.is_empty() {
            assert!(matches!(
                result.reason,
                SelectionReason::NoCandidates
                    | SelectionReason::NoUtility
                    | SelectionReason::BudgetExhausted
            ));
        }
        // No overlapping pair is ever selected.
        for (i, a) in result.selected.iter().enumerate() {
            for b in &result.selected[i + 1..] {
                assert!(!a.id.overlaps(&b.id), "case {case}: {} vs {}", a.id, b.id);
            }
        }
    }
}

#[test]
fn ten_thousand_node_chain_converges() {
    let mut graph = Graph::new();
    for i in 0..10_000 {
        graph.add_node(node(i));
    }
    for i in 0..9_999 {
        graph.add_edge(node(i), node(i + 1), 0.5);
        graph.add_edge(node(i + 1), node(i), 0.3);
    }
    let seeds: BTreeSet<FragmentId> = [node(0)].into_iter().collect();
    let scores = personalized_pagerank(&graph, &seeds, 0.6).expect("ppr");
    assert_eq!(scores.len(), 10_000);
    let total: f64 = scores.values().sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert!(scores.values().all(|s| s.is_finite() && *s >= 0.0));
}
