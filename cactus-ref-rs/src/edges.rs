//! Edge sets of the integer reference problem: chain edges, stub edges and
//! weighted adjacency edges.

use crate::graph::{AlignmentGraph, Attachment, EndKind};
use crate::level::{EndRef, LevelView};
use crate::node_map::NodeMap;
use crate::types::{CapId, HashSet, HashSetExt, NodeId};
use anyhow::{anyhow, ensure, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Undirected edge between two distinct nodes, stored with `from < to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { from: a, to: b }),
            std::cmp::Ordering::Greater => Some(Self { from: b, to: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn nodes(self) -> [NodeId; 2] {
        [self.from, self.to]
    }

    pub fn other(self, node: NodeId) -> Option<NodeId> {
        if node == self.from {
            Some(self.to)
        } else if node == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeightedEdge {
    pub edge: Edge,
    pub weight: i64,
}

impl WeightedEdge {
    pub fn new(edge: Edge, weight: i64) -> Self {
        Self { edge, weight }
    }
}

/// Every node touched by `edges`.
pub fn node_set<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> BTreeSet<NodeId> {
    edges.into_iter().flat_map(|edge| edge.nodes()).collect()
}

fn node_of(map: &NodeMap, end: EndRef) -> Result<NodeId> {
    map.node(end)
        .ok_or_else(|| anyhow!("end {:?} is not a reference node", end))
}

/// One edge per nontrivial chain, between the outer ends of its first and
/// last blocks, weighted by the chain's average instance length; one edge
/// per block whose two ends both lie in tangle groups, weighted by the
/// block length.
pub fn chain_edges<G: AlignmentGraph>(
    view: &LevelView<'_, G>,
    map: &NodeMap,
) -> Result<Vec<WeightedEdge>> {
    let graph = view.graph();
    let flower = view.flower();
    let mut edges = Vec::new();

    for chain in graph.flower_chains(flower) {
        let (first, last) = graph.chain_ends(chain);
        let (Some(end1), Some(end2)) = (graph.other_block_end(first), graph.other_block_end(last))
        else {
            continue;
        };
        let node1 = node_of(map, EndRef::Local(end1))
            .with_context(|| format!("outer end of chain {:?}", chain))?;
        let node2 = node_of(map, EndRef::Local(end2))
            .with_context(|| format!("outer end of chain {:?}", chain))?;
        let edge = Edge::new(node1, node2)
            .ok_or_else(|| anyhow!("chain {:?} starts and ends at the same node", chain))?;
        edges.push(WeightedEdge::new(
            edge,
            graph.chain_average_instance_length(chain),
        ));
    }

    for block in graph.flower_blocks(flower) {
        let info = graph.block(block);
        let five_group = graph
            .end(info.five_end)
            .group
            .ok_or_else(|| anyhow!("5' end of block {:?} has no group", block))?;
        let three_group = graph
            .end(info.three_end)
            .group
            .ok_or_else(|| anyhow!("3' end of block {:?} has no group", block))?;
        if graph.is_tangle(five_group) && graph.is_tangle(three_group) {
            let edge = Edge::new(
                node_of(map, EndRef::Local(info.five_end))?,
                node_of(map, EndRef::Local(info.three_end))?,
            )
            .ok_or_else(|| anyhow!("block {:?} maps both ends to one node", block))?;
            edges.push(WeightedEdge::new(edge, info.length));
        }
    }

    Ok(edges)
}

/// Pair each stub node with the node of the end its parent-level
/// counterpart is adjacent to along the parent's reference, each pair once,
/// walking stubs in node order.
pub fn stub_edges_from_parent<G: AlignmentGraph>(
    view: &LevelView<'_, G>,
    map: &NodeMap,
) -> Result<Vec<Edge>> {
    let parent_group = view
        .parent_group()
        .ok_or_else(|| anyhow!("flower {:?} has no parent level", view.flower()))?;
    let graph = view.graph();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (node, end) in map.iter() {
        if !view.kind(end).is_stub() || seen.contains(&end) {
            continue;
        }
        let parent_cap = view.parent_reference_cap(end, parent_group)?;
        let adjacent_cap = graph.cap(parent_cap).adjacency.ok_or_else(|| {
            anyhow!("parent reference cap of end {:?} has no adjacency", end)
        })?;
        let adjacent_name = graph.end(graph.cap(adjacent_cap).end).name;
        let adjacent = view.find_end(adjacent_name).ok_or_else(|| {
            anyhow!(
                "end {} adjacent in the parent reference is missing from flower {:?}",
                adjacent_name,
                view.flower()
            )
        })?;
        ensure!(
            !seen.contains(&adjacent),
            "end {:?} is adjacent to an end already paired",
            end
        );
        let edge = Edge::new(node, node_of(map, adjacent)?)
            .ok_or_else(|| anyhow!("end {:?} is adjacent to itself in the parent", end))?;
        seen.insert(end);
        seen.insert(adjacent);
        edges.push(edge);
    }

    Ok(edges)
}

/// Pair the nodes not touched by a chain edge consecutively in node order.
pub fn arbitrary_stub_edges(map: &NodeMap, chain_edges: &[WeightedEdge]) -> Result<Vec<Edge>> {
    let chained = node_set(chain_edges.iter().map(|e| &e.edge));
    let free: Vec<NodeId> = map.nodes().filter(|n| !chained.contains(n)).collect();
    ensure!(
        free.len() % 2 == 0,
        "odd number ({}) of nodes outside chains",
        free.len()
    );
    Ok(free
        .chunks_exact(2)
        .filter_map(|pair| Edge::new(pair[0], pair[1]))
        .collect())
}

/// Weighted edges between active nodes, one unit of weight per thread
/// adjacency joining them once every non-active end in between is walked
/// through.
pub fn adjacency_edges<G: AlignmentGraph>(
    view: &LevelView<'_, G>,
    map: &NodeMap,
    active: &BTreeSet<NodeId>,
) -> Result<Vec<WeightedEdge>> {
    let graph = view.graph();
    let mut edges = Vec::new();

    for &node in active {
        let Some(EndRef::Local(end)) = map.end(node) else {
            continue;
        };
        for cap in graph.end_caps(end) {
            let info = graph.cap(cap);
            if !info.has_sequence || !info.is_tracing_side() {
                continue;
            }
            let Some(other) = trace_adjacency(view, map, active, cap)? else {
                continue;
            };
            if let Some(edge) = Edge::new(node, other) {
                edges.push(edge);
            }
        }
    }

    Ok(collapse_adjacencies(edges))
}

/// Follow the adjacency of `start`, passing through blocks whose ends are not
/// active, until an active node is reached. A stub or a return to `start`
/// ends the walk with nothing.
fn trace_adjacency<G: AlignmentGraph>(
    view: &LevelView<'_, G>,
    map: &NodeMap,
    active: &BTreeSet<NodeId>,
    start: CapId,
) -> Result<Option<NodeId>> {
    let graph = view.graph();
    let mut cap = start;
    loop {
        let adjacent = graph
            .cap(cap)
            .adjacency
            .ok_or_else(|| anyhow!("cap {:?} with sequence has no adjacency", cap))?;
        let info = graph.cap(adjacent);
        if let Some(node) = map.node(EndRef::Local(info.end)) {
            if active.contains(&node) {
                return Ok(Some(node));
            }
        }
        match graph.end(info.end).kind {
            EndKind::Stub(attachment) => {
                if attachment == Attachment::Attached {
                    trace!(end = ?info.end, "adjacency walk stopped at an inactive attached stub");
                }
                return Ok(None);
            }
            EndKind::Block { .. } => {
                cap = info.other_segment_cap.ok_or_else(|| {
                    anyhow!("block cap {:?} has no opposite segment cap", adjacent)
                })?;
                if cap == start {
                    return Ok(None);
                }
            }
        }
    }
}

/// Merge duplicate edges, weight = multiplicity.
pub fn collapse_adjacencies(edges: Vec<Edge>) -> Vec<WeightedEdge> {
    let mut counts: BTreeMap<Edge, i64> = BTreeMap::new();
    for edge in edges {
        *counts.entry(edge).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(edge, weight)| WeightedEdge::new(edge, weight))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_canonical() {
        assert_eq!(Edge::new(5, 2), Some(Edge { from: 2, to: 5 }));
        assert_eq!(Edge::new(3, 3), None);
        assert_eq!(Edge::new(1, 4).and_then(|e| e.other(4)), Some(1));
    }

    #[test]
    fn collapse_counts_multiplicity() {
        let e = |a, b| Edge::new(a, b).unwrap();
        let collapsed = collapse_adjacencies(vec![e(1, 2), e(0, 3), e(2, 1), e(1, 2)]);
        assert_eq!(
            collapsed,
            vec![WeightedEdge::new(e(0, 3), 1), WeightedEdge::new(e(1, 2), 3)]
        );
    }
}
