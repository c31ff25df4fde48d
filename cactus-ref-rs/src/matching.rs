//! Perfect matchings over the reference nodes of one round.
//!
//! The driver hands a [`MatchingSolver`] the active nodes, the adjacency
//! edges (completed to a clique) and the two required edge sets. The chosen
//! edges must cover every active node exactly once; together with the chain
//! and stub edges they close into cycles, each holding at least one stub
//! edge.

use crate::edges::{Edge, WeightedEdge};
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt, NodeId};
use anyhow::{anyhow, bail, ensure, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct MatchingProblem<'a> {
    pub nodes: &'a BTreeSet<NodeId>,
    pub adjacency_edges: &'a [WeightedEdge],
    pub stub_edges: &'a [Edge],
    pub chain_edges: &'a [Edge],
    /// Every closed cycle must hold exactly one stub edge.
    pub make_stub_cycles_disjoint: bool,
}

pub trait MatchingSolver {
    fn solve(&self, problem: &MatchingProblem<'_>) -> Result<Vec<Edge>>;
}

/// Add a `default_weight` edge for every pair of `nodes` not already joined.
pub fn make_clique(edges: &mut Vec<WeightedEdge>, nodes: &BTreeSet<NodeId>, default_weight: i64) {
    let present: HashSet<Edge> = edges.iter().map(|e| e.edge).collect();
    let nodes: Vec<NodeId> = nodes.iter().copied().collect();
    for (i, &a) in nodes.iter().enumerate() {
        for &b in &nodes[i + 1..] {
            if let Some(edge) = Edge::new(a, b) {
                if !present.contains(&edge) {
                    edges.push(WeightedEdge::new(edge, default_weight));
                }
            }
        }
    }
}

/// Total weight of `chosen` under `weighted`; unknown edges weigh nothing.
pub fn matching_weight(chosen: &[Edge], weighted: &[WeightedEdge]) -> i64 {
    let weights: HashMap<Edge, i64> = weighted.iter().map(|e| (e.edge, e.weight)).collect();
    chosen
        .iter()
        .map(|edge| weights.get(edge).copied().unwrap_or(0))
        .sum()
}

/// Number of chosen edges backed by at least one real adjacency.
pub fn matching_cardinality(chosen: &[Edge], weighted: &[WeightedEdge]) -> usize {
    let weights: HashMap<Edge, i64> = weighted.iter().map(|e| (e.edge, e.weight)).collect();
    chosen
        .iter()
        .filter(|edge| weights.get(edge).copied().unwrap_or(0) > 0)
        .count()
}

/// `edges` touch every node of `nodes` exactly once and nothing else.
pub fn check_perfect_matching(nodes: &BTreeSet<NodeId>, edges: &[Edge]) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for edge in edges {
        for node in edge.nodes() {
            ensure!(nodes.contains(&node), "edge {:?} leaves the node set", edge);
            ensure!(seen.insert(node), "node {} is matched twice", node);
        }
    }
    ensure!(
        seen.len() == nodes.len(),
        "{} of {} nodes are unmatched",
        nodes.len() - seen.len(),
        nodes.len()
    );
    Ok(())
}

/// Heaviest-first greedy matching, repaired with 2-exchanges until every
/// cycle holds a stub edge (and, when asked, exactly one).
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCycleMatcher;

struct Cycles {
    /// Nodes in walk order: even positions start a required edge, odd
    /// positions start a chosen edge.
    members: Vec<Vec<usize>>,
}

struct State {
    nodes: Vec<NodeId>,
    required: Vec<usize>,
    stub: Vec<bool>,
    chosen: Vec<usize>,
    weights: HashMap<Edge, i64>,
}

impl State {
    fn weight(&self, a: usize, b: usize) -> i64 {
        Edge::new(self.nodes[a], self.nodes[b])
            .and_then(|edge| self.weights.get(&edge).copied())
            .unwrap_or(0)
    }

    fn cycles(&self) -> Cycles {
        let mut visited = vec![false; self.nodes.len()];
        let mut members = Vec::new();
        for start in 0..self.nodes.len() {
            if visited[start] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut node = start;
            loop {
                let partner = self.required[node];
                visited[node] = true;
                visited[partner] = true;
                cycle.push(node);
                cycle.push(partner);
                node = self.chosen[partner];
                if node == start {
                    break;
                }
            }
            members.push(cycle);
        }
        Cycles { members }
    }

    fn stub_count(&self, cycle: &[usize]) -> usize {
        cycle.chunks_exact(2).filter(|pair| self.stub[pair[0]]).count()
    }

    /// Chosen edges of a cycle as (a, b) with a ending a required edge.
    fn chosen_edges(cycle: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..cycle.len() / 2).map(move |i| (cycle[2 * i + 1], cycle[(2 * i + 2) % cycle.len()]))
    }

    fn set_chosen(&mut self, a: usize, b: usize) {
        self.chosen[a] = b;
        self.chosen[b] = a;
    }

    /// Join a stubless cycle to a stub-bearing one through the exchange
    /// that loses the least weight.
    fn merge_stubless(&mut self) -> Result<bool> {
        let cycles = self.cycles();
        let Some(lonely) = cycles
            .members
            .iter()
            .find(|cycle| self.stub_count(cycle) == 0)
        else {
            return Ok(false);
        };
        let mut best: Option<(i64, (usize, usize), (usize, usize))> = None;
        for target in cycles.members.iter().filter(|c| self.stub_count(c) > 0) {
            for (a, b) in Self::chosen_edges(lonely) {
                for (c, d) in Self::chosen_edges(target) {
                    let removed = self.weight(a, b) + self.weight(c, d);
                    for (x, y) in [((a, c), (b, d)), ((a, d), (b, c))] {
                        let gain = self.weight(x.0, x.1) + self.weight(y.0, y.1) - removed;
                        if best.map_or(true, |(g, _, _)| gain > g) {
                            best = Some((gain, x, y));
                        }
                    }
                }
            }
        }
        let (_, x, y) = best.ok_or_else(|| anyhow!("no cycle holds a stub edge"))?;
        self.set_chosen(x.0, x.1);
        self.set_chosen(y.0, y.1);
        Ok(true)
    }

    /// Cut one single-stub loop off a cycle holding several stubs.
    fn split_multi_stub(&mut self) -> Result<bool> {
        let cycles = self.cycles();
        let Some(cycle) = cycles
            .members
            .iter()
            .find(|cycle| self.stub_count(cycle) > 1)
        else {
            return Ok(false);
        };
        let pairs = cycle.len() / 2;
        let is_stub = |i: usize| self.stub[cycle[2 * i]];
        let mut best: Option<(i64, (usize, usize), (usize, usize))> = None;
        // Removing chosen edges i and j leaves required edges i+1..=j on one
        // side; keep that side to exactly one stub.
        for i in 0..pairs {
            let mut stubs = 0;
            for j in i + 1..pairs {
                if is_stub(j) {
                    stubs += 1;
                }
                if stubs > 1 {
                    break;
                }
                if stubs == 0 {
                    continue;
                }
                let (x, y) = (cycle[2 * i + 1], cycle[(2 * i + 2) % cycle.len()]);
                let (p, q) = (cycle[2 * j + 1], cycle[(2 * j + 2) % cycle.len()]);
                let gain = self.weight(y, p) + self.weight(x, q)
                    - self.weight(x, y)
                    - self.weight(p, q);
                if best.map_or(true, |(g, _, _)| gain > g) {
                    best = Some((gain, (y, p), (x, q)));
                }
            }
        }
        let (_, first, second) =
            best.ok_or_else(|| anyhow!("cycle with several stubs admits no split"))?;
        self.set_chosen(first.0, first.1);
        self.set_chosen(second.0, second.1);
        Ok(true)
    }
}

impl MatchingSolver for GreedyCycleMatcher {
    fn solve(&self, problem: &MatchingProblem<'_>) -> Result<Vec<Edge>> {
        if problem.nodes.is_empty() {
            return Ok(Vec::new());
        }
        ensure!(
            !problem.stub_edges.is_empty(),
            "matching over {} nodes has no stub edges",
            problem.nodes.len()
        );

        let nodes: Vec<NodeId> = problem.nodes.iter().copied().collect();
        let index: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let lookup = |node: NodeId| {
            index
                .get(&node)
                .copied()
                .ok_or_else(|| anyhow!("edge endpoint {} is not an active node", node))
        };

        let unset = usize::MAX;
        let mut required = vec![unset; nodes.len()];
        let mut stub = vec![false; nodes.len()];
        let tagged = problem
            .stub_edges
            .iter()
            .map(|e| (e, true))
            .chain(problem.chain_edges.iter().map(|e| (e, false)));
        for (edge, is_stub) in tagged {
            let (a, b) = (lookup(edge.from)?, lookup(edge.to)?);
            if required[a] != unset || required[b] != unset {
                bail!("required edges overlap at {:?}", edge);
            }
            required[a] = b;
            required[b] = a;
            stub[a] = is_stub;
            stub[b] = is_stub;
        }
        ensure!(
            required.iter().all(|&r| r != unset),
            "stub and chain edges do not cover every active node"
        );

        let mut candidates: Vec<WeightedEdge> = problem.adjacency_edges.to_vec();
        candidates.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.edge.cmp(&b.edge)));
        let mut chosen = vec![unset; nodes.len()];
        for candidate in &candidates {
            let (a, b) = (lookup(candidate.edge.from)?, lookup(candidate.edge.to)?);
            if chosen[a] == unset && chosen[b] == unset {
                chosen[a] = b;
                chosen[b] = a;
            }
        }
        let leftover: Vec<usize> = (0..nodes.len()).filter(|&i| chosen[i] == unset).collect();
        for pair in leftover.chunks_exact(2) {
            chosen[pair[0]] = pair[1];
            chosen[pair[1]] = pair[0];
        }

        let weights: HashMap<Edge, i64> = problem
            .adjacency_edges
            .iter()
            .map(|e| (e.edge, e.weight))
            .collect();
        let mut state = State {
            nodes,
            required,
            stub,
            chosen,
            weights,
        };

        while state.merge_stubless()? {}
        if problem.make_stub_cycles_disjoint {
            while state.split_multi_stub()? {}
        }

        let mut result: Vec<Edge> = (0..state.nodes.len())
            .filter(|&i| i < state.chosen[i])
            .filter_map(|i| Edge::new(state.nodes[i], state.nodes[state.chosen[i]]))
            .collect();
        result.sort();
        Ok(result)
    }
}
