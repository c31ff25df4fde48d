//! Turning the final stub edges into reference caps and adjacencies.

use crate::edges::Edge;
use crate::graph::{AlignmentGraph, BlockSide, GroupKind};
use crate::level::{EndRef, LevelView};
use crate::node_map::NodeMap;
use crate::types::GroupId;
use anyhow::{anyhow, bail, Result};

/// Join the two ends of every link group. Returns the number of joins.
pub fn add_link_adjacencies<G: AlignmentGraph>(view: &mut LevelView<'_, G>) -> Result<usize> {
    let graph = view.graph();
    let mut joined = 0;
    for group in graph.flower_groups(view.flower()) {
        if let GroupKind::Link { three_end, five_end } = graph.group_kind(group) {
            view.join(EndRef::Local(three_end), EndRef::Local(five_end))?;
            joined += 1;
        }
    }
    Ok(joined)
}

/// Join the two ends of every stub edge. Ends lying in different tangle
/// groups are joined through a new length-one bridge block. Returns the
/// number of bridges planned.
pub fn add_tangle_adjacencies<G: AlignmentGraph>(
    view: &mut LevelView<'_, G>,
    map: &NodeMap,
    stub_edges: &[Edge],
) -> Result<usize> {
    let mut bridges = 0;
    for edge in stub_edges {
        let end1 = map
            .end(edge.from)
            .ok_or_else(|| anyhow!("stub edge {:?} names an unknown node", edge))?;
        let end2 = map
            .end(edge.to)
            .ok_or_else(|| anyhow!("stub edge {:?} names an unknown node", edge))?;
        match (tangle_group(view, end1)?, tangle_group(view, end2)?) {
            (Some(group1), Some(group2)) if group1 != group2 => {
                let bridge = view.add_bridge(group1, group2);
                view.join(end1, EndRef::Bridge(bridge, BlockSide::Five))?;
                view.join(end2, EndRef::Bridge(bridge, BlockSide::Three))?;
                bridges += 1;
            }
            _ => view.join(end1, end2)?,
        }
    }
    Ok(bridges)
}

/// Give every imported end the group of the end its reference cap was
/// joined to; when that end is ungrouped too, both go to the lowest-id
/// tangle group. Returns the number of ends assigned.
pub fn assign_groups<G: AlignmentGraph>(view: &mut LevelView<'_, G>) -> Result<usize> {
    let mut assigned = 0;
    for end in view.imported_ends() {
        if view.group(end).is_some() {
            continue;
        }
        let cap = view
            .reference_cap(end)
            .ok_or_else(|| anyhow!("imported end {:?} has no reference cap", end))?;
        let adjacent = view
            .cap_adjacency(cap)
            .ok_or_else(|| anyhow!("reference cap of imported end {:?} is unjoined", end))?;
        let adjacent_end = view.cap_end(adjacent);
        let group = match view.group(adjacent_end) {
            Some(group) => group,
            None => {
                let group = view.first_tangle_group().ok_or_else(|| {
                    anyhow!("flower {:?} has no tangle group for ungrouped ends", view.flower())
                })?;
                view.set_group(adjacent_end, group);
                group
            }
        };
        view.set_group(end, group);
        assigned += 1;
    }
    Ok(assigned)
}

fn tangle_group<G: AlignmentGraph>(view: &LevelView<'_, G>, end: EndRef) -> Result<Option<GroupId>> {
    match view.group(end) {
        Some(group) if view.is_tangle(group) => Ok(Some(group)),
        Some(group) => bail!("end {:?} of a stub edge lies in link group {:?}", end, group),
        None if view.kind(end).is_attached_stub() => Ok(None),
        None => bail!("ungrouped end {:?} is not an attached stub", end),
    }
}
