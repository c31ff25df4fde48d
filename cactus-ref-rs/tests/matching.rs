/// The layered matching driver against recording and misbehaving solvers.
use anyhow::Result;
use cactus_ref_rs::{
    Edge, GreedyCycleMatcher, LayeredMatching, MatchingProblem, MatchingSolver, WeightedEdge,
    DEFAULT_MAX_CHAINS_PER_ROUND,
};
use std::cell::RefCell;
use std::collections::BTreeSet;

// ── helpers ──────────────────────────────────────────────────────────────────

fn e(a: u32, b: u32) -> Edge {
    Edge::new(a, b).unwrap()
}

fn w(a: u32, b: u32, weight: i64) -> WeightedEdge {
    WeightedEdge::new(e(a, b), weight)
}

fn no_adjacencies(_: &BTreeSet<u32>) -> Result<Vec<WeightedEdge>> {
    Ok(Vec::new())
}

/// Delegates to the greedy matcher, keeping what each round was handed.
#[derive(Default)]
struct Recorder {
    flags: RefCell<Vec<bool>>,
    chains: RefCell<Vec<Vec<Edge>>>,
}

impl MatchingSolver for Recorder {
    fn solve(&self, problem: &MatchingProblem<'_>) -> Result<Vec<Edge>> {
        self.flags.borrow_mut().push(problem.make_stub_cycles_disjoint);
        self.chains.borrow_mut().push(problem.chain_edges.to_vec());
        GreedyCycleMatcher.solve(problem)
    }
}

struct Empty;

impl MatchingSolver for Empty {
    fn solve(&self, _: &MatchingProblem<'_>) -> Result<Vec<Edge>> {
        Ok(Vec::new())
    }
}

// ── tests ────────────────────────────────────────────────────────────────────

#[test]
fn child_level_relaxes_only_the_first_round() {
    let chains = vec![w(0, 1, 1), w(2, 3, 2), w(4, 5, 3)];
    let mut driver = LayeredMatching::new(chains, vec![e(6, 7)], true, 1).unwrap();
    assert_eq!(driver.remaining_chains(), 3);
    let recorder = Recorder::default();
    let first = driver.step(no_adjacencies, &recorder).unwrap();
    assert!(!first.make_stub_cycles_disjoint);
    assert_eq!(driver.remaining_chains(), 2);
    let rest = driver.run(no_adjacencies, &recorder).unwrap();

    assert_eq!(rest.len(), 2);
    assert_eq!(driver.rounds(), 3);
    assert_eq!(*recorder.flags.borrow(), vec![false, true, true]);
    assert_eq!(
        *recorder.chains.borrow(),
        vec![vec![e(4, 5)], vec![e(2, 3)], vec![e(0, 1)]]
    );
    assert!(driver.is_done());
    assert_eq!(driver.stub_edges().len(), 4);
}

#[test]
fn root_level_is_strict_from_the_start() {
    let chains = vec![w(0, 1, 5), w(2, 3, 7)];
    let mut driver =
        LayeredMatching::new(chains, vec![e(4, 5)], false, DEFAULT_MAX_CHAINS_PER_ROUND).unwrap();
    let recorder = Recorder::default();
    let rounds = driver.run(no_adjacencies, &recorder).unwrap();

    assert_eq!(rounds.len(), 1);
    assert!(rounds[0].make_stub_cycles_disjoint);
    assert_eq!(rounds[0].chain_edges, vec![w(2, 3, 7), w(0, 1, 5)]);
    assert_eq!(rounds[0].active_nodes, 6);
    assert_eq!(*recorder.flags.borrow(), vec![true]);
}

#[test]
fn adjacency_callback_sees_the_active_nodes() {
    let chains = vec![w(0, 1, 4), w(2, 3, 9)];
    let mut driver = LayeredMatching::new(chains, vec![e(4, 5)], false, 1).unwrap();
    let mut seen = Vec::new();
    driver
        .run(
            |active: &BTreeSet<u32>| {
                seen.push(active.iter().copied().collect::<Vec<_>>());
                Ok(Vec::new())
            },
            &GreedyCycleMatcher,
        )
        .unwrap();
    assert_eq!(seen, vec![vec![2, 3, 4, 5], vec![0, 1, 2, 3, 4, 5]]);
}

#[test]
fn heavy_adjacencies_steer_the_matching() {
    // Threads join 0-2 and 1-3; the chain 0-1 and stub 2-3 close one cycle.
    let mut driver = LayeredMatching::new(vec![w(0, 1, 10)], vec![e(2, 3)], false, 1).unwrap();
    let rounds = driver
        .run(
            |_: &BTreeSet<u32>| Ok(vec![w(0, 2, 3), w(1, 3, 3), w(0, 3, 1)]),
            &GreedyCycleMatcher,
        )
        .unwrap();
    assert_eq!(rounds[0].matching_weight, 6);
    assert_eq!(rounds[0].matching_cardinality, 2);
    assert_eq!(driver.into_stub_edges(), vec![e(0, 2), e(1, 3)]);
}

#[test]
fn invalid_solver_output_is_rejected() {
    let mut driver = LayeredMatching::new(vec![w(0, 1, 1)], vec![e(2, 3)], false, 1).unwrap();
    let err = driver.run(no_adjacencies, &Empty).unwrap_err();
    assert!(format!("{:#}", err).contains("invalid edge set"));
}

#[test]
fn zero_chains_per_round_is_rejected() {
    assert!(LayeredMatching::new(vec![w(0, 1, 1)], vec![e(2, 3)], false, 0).is_err());
}

#[test]
fn no_chains_means_no_rounds() {
    let mut driver = LayeredMatching::new(Vec::new(), vec![e(0, 1)], true, 1).unwrap();
    assert!(driver.is_done());
    let rounds = driver.run(no_adjacencies, &GreedyCycleMatcher).unwrap();
    assert!(rounds.is_empty());
    assert_eq!(driver.into_stub_edges(), vec![e(0, 1)]);
}
