use crate::edges::{self, Edge};
use crate::graph::AlignmentGraph;
use crate::layered::{LayeredMatching, RoundReport, DEFAULT_MAX_CHAINS_PER_ROUND};
use crate::level::{Changeset, LevelView};
use crate::materialize;
use crate::matching::{check_perfect_matching, MatchingSolver};
use crate::node_map::NodeMap;
use crate::types::{BlockId, EndId, FlowerId, Name, NodeId};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Parameters of a reference build.
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    /// Header of the event that carries the reference thread.
    pub reference_event_header: String,
    /// Chain edges handed to each matching round.
    pub max_chains_per_round: usize,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            reference_event_header: "reference".to_string(),
            max_chains_per_round: DEFAULT_MAX_CHAINS_PER_ROUND,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSummary {
    pub reference_event: Name,
    pub nodes: usize,
    pub chain_edges: usize,
    pub rounds: Vec<RoundReport>,
    pub stub_edges: Vec<Edge>,
    pub imported_ends: Vec<EndId>,
    pub link_adjacencies: usize,
    pub bridge_blocks: Vec<BlockId>,
    pub adjacencies: usize,
}

/// Plan the reference for `flower` without touching the graph.
pub fn plan_reference<G, M>(
    graph: &G,
    flower: FlowerId,
    config: &ReferenceConfig,
    solver: &M,
) -> Result<(Changeset, ReferenceSummary)>
where
    G: AlignmentGraph,
    M: MatchingSolver + ?Sized,
{
    let mut view = LevelView::open(graph, flower, &config.reference_event_header)?;
    view.import_parent_ends()?;
    let map = NodeMap::build(&view)?;

    let chain_edges = edges::chain_edges(&view, &map)?;
    let chain_count = chain_edges.len();
    let stub_edges = if view.has_parent() {
        edges::stub_edges_from_parent(&view, &map)?
    } else {
        edges::arbitrary_stub_edges(&map, &chain_edges)?
    };
    debug!(
        flower = ?flower,
        nodes = map.len(),
        chains = chain_count,
        stubs = stub_edges.len(),
        "reference problem"
    );

    let mut driver = LayeredMatching::new(
        chain_edges,
        stub_edges,
        view.has_parent(),
        config.max_chains_per_round,
    )?;
    let rounds = driver.run(|active| edges::adjacency_edges(&view, &map, active), solver)?;
    let stub_edges = driver.into_stub_edges();

    let all_nodes: BTreeSet<NodeId> = map.nodes().collect();
    check_perfect_matching(&all_nodes, &stub_edges)
        .context("final stub edges do not pair every reference node")?;

    let link_adjacencies = materialize::add_link_adjacencies(&mut view)?;
    materialize::add_tangle_adjacencies(&mut view, &map, &stub_edges)?;
    materialize::assign_groups(&mut view)?;

    let changeset = view.into_changeset();
    debug!(
        flower = ?flower,
        adjacencies = changeset.adjacency_count(),
        bridges = changeset.bridge_count(),
        "reference planned"
    );
    let summary = ReferenceSummary {
        nodes: map.len(),
        chain_edges: chain_count,
        rounds,
        stub_edges,
        link_adjacencies,
        adjacencies: changeset.adjacency_count(),
        ..Default::default()
    };
    Ok((changeset, summary))
}

/// Build the reference for one flower: choose the adjacencies and write
/// them, with every cap, bridge block and group assignment they need, into
/// `graph`. On error the graph is left untouched.
pub fn build_reference<G, M>(
    graph: &mut G,
    flower: FlowerId,
    config: &ReferenceConfig,
    solver: &M,
) -> Result<ReferenceSummary>
where
    G: AlignmentGraph,
    M: MatchingSolver + ?Sized,
{
    let (changeset, mut summary) = plan_reference(&*graph, flower, config, solver)
        .with_context(|| format!("failed to build the reference for flower {:?}", flower))?;
    let applied = changeset.apply(graph);
    summary.reference_event = applied.reference_event;
    summary.imported_ends = applied.imported_ends;
    summary.bridge_blocks = applied.bridge_blocks;
    info!(
        "Flower {:?}: {} nodes, {} chains over {} rounds, {} adjacencies, {} bridges",
        flower,
        summary.nodes,
        summary.chain_edges,
        summary.rounds.len(),
        summary.adjacencies,
        summary.bridge_blocks.len()
    );
    Ok(summary)
}
