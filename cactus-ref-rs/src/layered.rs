use crate::edges::{node_set, Edge, WeightedEdge};
use crate::matching::{
    check_perfect_matching, make_clique, matching_cardinality, matching_weight, MatchingProblem,
    MatchingSolver,
};
use crate::types::NodeId;
use anyhow::{anyhow, ensure, Context, Result};
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_MAX_CHAINS_PER_ROUND: usize = 100;

/// Summary of one matching round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub index: usize,
    pub chain_edges: Vec<WeightedEdge>,
    pub active_nodes: usize,
    pub adjacency_edges: usize,
    pub make_stub_cycles_disjoint: bool,
    /// Adjacency weight carried by the chosen edges.
    pub matching_weight: i64,
    /// Chosen edges backed by at least one thread adjacency.
    pub matching_cardinality: usize,
}

/// Feeds chain edges to the solver a batch at a time, heaviest first, each
/// round's chosen edges becoming the next round's stub edges.
#[derive(Debug, Clone)]
pub struct LayeredMatching {
    /// Sorted ascending so the heaviest chain pops first.
    remaining: Vec<WeightedEdge>,
    stub_edges: Vec<Edge>,
    make_stub_cycles_disjoint: bool,
    max_chains_per_round: usize,
    rounds: usize,
}

impl LayeredMatching {
    pub fn new(
        mut chain_edges: Vec<WeightedEdge>,
        stub_edges: Vec<Edge>,
        has_parent: bool,
        max_chains_per_round: usize,
    ) -> Result<Self> {
        ensure!(
            max_chains_per_round >= 1,
            "max chains per round must be at least 1"
        );
        chain_edges.sort_by(|a, b| a.weight.cmp(&b.weight).then(a.edge.cmp(&b.edge)));
        Ok(Self {
            remaining: chain_edges,
            stub_edges,
            // False only for the first round of a child level.
            make_stub_cycles_disjoint: !has_parent,
            max_chains_per_round,
            rounds: 0,
        })
    }

    pub fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn remaining_chains(&self) -> usize {
        self.remaining.len()
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn stub_edges(&self) -> &[Edge] {
        &self.stub_edges
    }

    pub fn into_stub_edges(self) -> Vec<Edge> {
        self.stub_edges
    }

    /// Run one round. `adjacencies` yields the weighted adjacency edges over
    /// the round's active nodes.
    pub fn step<F, M>(&mut self, mut adjacencies: F, solver: &M) -> Result<RoundReport>
    where
        F: FnMut(&BTreeSet<NodeId>) -> Result<Vec<WeightedEdge>>,
        M: MatchingSolver + ?Sized,
    {
        ensure!(!self.is_done(), "no chain edges left to match");
        let take = self.max_chains_per_round.min(self.remaining.len());
        let batch: Vec<WeightedEdge> = self
            .remaining
            .split_off(self.remaining.len() - take)
            .into_iter()
            .rev()
            .collect();
        let chain: Vec<Edge> = batch.iter().map(|e| e.edge).collect();
        let active = node_set(chain.iter().chain(self.stub_edges.iter()));

        let mut adjacency = adjacencies(&active)?;
        make_clique(&mut adjacency, &active, 0);
        let flag = self.make_stub_cycles_disjoint;

        let chosen = solver.solve(&MatchingProblem {
            nodes: &active,
            adjacency_edges: &adjacency,
            stub_edges: &self.stub_edges,
            chain_edges: &chain,
            make_stub_cycles_disjoint: flag,
        })?;
        let mut chosen = chosen
            .into_iter()
            .map(|e| Edge::new(e.from, e.to).ok_or_else(|| anyhow!("solver chose a self edge")))
            .collect::<Result<Vec<_>>>()?;
        chosen.sort();
        check_perfect_matching(&active, &chosen)
            .with_context(|| format!("matching round {} returned an invalid edge set", self.rounds))?;

        let report = RoundReport {
            index: self.rounds,
            chain_edges: batch,
            active_nodes: active.len(),
            adjacency_edges: adjacency.len(),
            make_stub_cycles_disjoint: flag,
            matching_weight: matching_weight(&chosen, &adjacency),
            matching_cardinality: matching_cardinality(&chosen, &adjacency),
        };
        debug!(
            round = report.index,
            chains = report.chain_edges.len(),
            remaining = self.remaining_chains(),
            nodes = report.active_nodes,
            adjacencies = report.adjacency_edges,
            disjoint = flag,
            weight = report.matching_weight,
            cardinality = report.matching_cardinality,
            "matching round"
        );
        self.stub_edges = chosen;
        self.make_stub_cycles_disjoint = true;
        self.rounds += 1;
        Ok(report)
    }

    /// Run rounds until every chain edge has been consumed.
    pub fn run<F, M>(&mut self, mut adjacencies: F, solver: &M) -> Result<Vec<RoundReport>>
    where
        F: FnMut(&BTreeSet<NodeId>) -> Result<Vec<WeightedEdge>>,
        M: MatchingSolver + ?Sized,
    {
        let mut reports = Vec::new();
        while !self.is_done() {
            reports.push(self.step(&mut adjacencies, solver)?);
        }
        Ok(reports)
    }
}
