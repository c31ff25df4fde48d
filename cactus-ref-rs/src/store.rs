//! In-memory alignment graph.
//!
//! `MemoryGraph` keeps every flower of a hierarchy in flat arenas indexed by
//! the typed ids of [`crate::types`]. Besides implementing
//! [`AlignmentGraph`] it offers a small builder API used by tests and by
//! callers that assemble flowers programmatically.

use crate::graph::{
    AlignmentGraph, Attachment, BlockInfo, BlockSide, CapInfo, EndInfo, EndKind, GroupKind,
};
use crate::types::{
    BlockId, CapId, ChainId, EndId, FlowerId, GroupId, HashMap, HashMapExt, Name, SegmentId,
};
use anyhow::{bail, ensure, Result};

const ROOT_EVENT_HEADER: &str = "ROOT";

#[derive(Debug, Clone)]
struct FlowerRecord {
    parent_group: Option<GroupId>,
    ends: Vec<EndId>,
    groups: Vec<GroupId>,
    blocks: Vec<BlockId>,
    chains: Vec<ChainId>,
    // (name, header); the first entry is the root event.
    events: Vec<(Name, String)>,
    built_trees: bool,
}

#[derive(Debug, Clone)]
struct GroupRecord {
    flower: FlowerId,
    kind: GroupKind,
    ends: Vec<EndId>,
}

#[derive(Debug, Clone)]
struct EndRecord {
    name: Name,
    flower: FlowerId,
    kind: EndKind,
    group: Option<GroupId>,
    caps: Vec<CapId>,
    root_instance: Option<CapId>,
}

#[derive(Debug, Clone)]
struct BlockRecord {
    length: i64,
    five_end: EndId,
    three_end: EndId,
    segments: Vec<SegmentId>,
    root_instance: Option<SegmentId>,
}

#[derive(Debug, Clone)]
struct ChainRecord {
    links: Vec<GroupId>,
}

#[derive(Debug, Clone)]
struct SegmentRecord {
    five_cap: CapId,
    three_cap: CapId,
    parent: Option<SegmentId>,
    children: Vec<SegmentId>,
}

#[derive(Debug, Clone)]
struct CapRecord {
    name: Name,
    end: EndId,
    event: Name,
    strand: bool,
    side: bool,
    sequence: Option<Name>,
    adjacency: Option<CapId>,
    segment: Option<SegmentId>,
    parent: Option<CapId>,
    children: Vec<CapId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    flowers: Vec<FlowerRecord>,
    groups: Vec<GroupRecord>,
    ends: Vec<EndRecord>,
    blocks: Vec<BlockRecord>,
    chains: Vec<ChainRecord>,
    segments: Vec<SegmentRecord>,
    caps: Vec<CapRecord>,
    end_names: HashMap<(FlowerId, Name), EndId>,
    next_name: Name,
}

/// A cap's `side` flag for a cap whose adjacency leads rightwards (or not)
/// along its sequence, given the strand it lies on.
fn cap_side(strand: bool, rightward: bool) -> bool {
    if strand {
        rightward
    } else {
        !rightward
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            end_names: HashMap::new(),
            next_name: 1,
            ..Default::default()
        }
    }

    fn fresh_name(&mut self) -> Name {
        let name = self.next_name.max(1);
        self.next_name = name + 1;
        name
    }

    /// Add a flower; with `parent_group` it becomes the nested flower of that group.
    pub fn add_flower(&mut self, parent_group: Option<GroupId>) -> FlowerId {
        let id = FlowerId(self.flowers.len() as u32);
        let root = self.fresh_name();
        self.flowers.push(FlowerRecord {
            parent_group,
            ends: Vec::new(),
            groups: Vec::new(),
            blocks: Vec::new(),
            chains: Vec::new(),
            events: vec![(root, ROOT_EVENT_HEADER.to_string())],
            built_trees: false,
        });
        id
    }

    pub fn set_built_trees(&mut self, flower: FlowerId, built: bool) {
        self.flowers[flower.index()].built_trees = built;
    }

    pub fn add_event(&mut self, flower: FlowerId, header: &str) -> Name {
        let name = self.fresh_name();
        self.flowers[flower.index()]
            .events
            .push((name, header.to_string()));
        name
    }

    pub fn add_group(&mut self, flower: FlowerId) -> GroupId {
        self.push_group(flower, GroupKind::Tangle)
    }

    /// Add a link group holding `three_end` and `five_end`.
    pub fn add_link_group(
        &mut self,
        flower: FlowerId,
        three_end: EndId,
        five_end: EndId,
    ) -> GroupId {
        let group = self.push_group(flower, GroupKind::Link { three_end, five_end });
        self.set_group(three_end, group);
        self.set_group(five_end, group);
        group
    }

    fn push_group(&mut self, flower: FlowerId, kind: GroupKind) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(GroupRecord {
            flower,
            kind,
            ends: Vec::new(),
        });
        self.flowers[flower.index()].groups.push(id);
        id
    }

    /// Add a stub end. Pass the parent-level name to mirror an end of the
    /// enclosing flower.
    pub fn add_stub(
        &mut self,
        flower: FlowerId,
        name: Option<Name>,
        attachment: Attachment,
        group: Option<GroupId>,
    ) -> EndId {
        let name = match name {
            Some(name) => {
                self.next_name = self.next_name.max(name + 1);
                name
            }
            None => self.fresh_name(),
        };
        let end = self.push_end(flower, name, EndKind::Stub(attachment));
        if let Some(group) = group {
            self.set_group(end, group);
        }
        end
    }

    /// Add a block with its two ends, optionally placing each end in a group.
    pub fn add_block(
        &mut self,
        flower: FlowerId,
        length: i64,
        five_group: Option<GroupId>,
        three_group: Option<GroupId>,
    ) -> BlockId {
        let block = self.construct_block(flower, length);
        let info = self.block(block);
        if let Some(group) = five_group {
            self.set_group(info.five_end, group);
        }
        if let Some(group) = three_group {
            self.set_group(info.three_end, group);
        }
        block
    }

    /// Add a chain made of the given link groups, in order.
    pub fn add_chain(&mut self, flower: FlowerId, links: &[GroupId]) -> Result<ChainId> {
        ensure!(!links.is_empty(), "a chain needs at least one link");
        for &group in links {
            if !matches!(self.group_kind(group), GroupKind::Link { .. }) {
                bail!("group {:?} is not a link group", group);
            }
        }
        let id = ChainId(self.chains.len() as u32);
        self.chains.push(ChainRecord {
            links: links.to_vec(),
        });
        self.flowers[flower.index()].chains.push(id);
        Ok(id)
    }

    /// Thread a sequence of `event` through the flower: left stub, the given
    /// blocks (`true` = traversed 5'->3'), right stub. Creates one cap per
    /// visited end and the adjacencies between consecutive caps. Returns the
    /// sequence name.
    pub fn add_thread(
        &mut self,
        event: Name,
        left_stub: EndId,
        blocks: &[(BlockId, bool)],
        right_stub: EndId,
    ) -> Result<Name> {
        for end in [left_stub, right_stub] {
            ensure!(
                matches!(self.end(end).kind, EndKind::Stub(_)),
                "thread must start and finish on stub ends, {:?} is a block end",
                end
            );
        }
        let sequence = self.fresh_name();
        let mut previous = self.push_cap(left_stub, event, true, true, Some(sequence));
        for &(block, forward) in blocks {
            let info = self.block(block);
            let (entry_end, exit_end) = if forward {
                (info.five_end, info.three_end)
            } else {
                (info.three_end, info.five_end)
            };
            let entry = self.push_cap(
                entry_end,
                event,
                forward,
                cap_side(forward, false),
                Some(sequence),
            );
            let exit = self.push_cap(
                exit_end,
                event,
                forward,
                cap_side(forward, true),
                Some(sequence),
            );
            let (five_cap, three_cap) = if forward { (entry, exit) } else { (exit, entry) };
            let segment = self.push_segment(block, five_cap, three_cap);
            self.caps[entry.index()].segment = Some(segment);
            self.caps[exit.index()].segment = Some(segment);
            self.make_adjacent(previous, entry);
            previous = exit;
        }
        let last = self.push_cap(right_stub, event, true, false, Some(sequence));
        self.make_adjacent(previous, last);
        Ok(sequence)
    }

    /// The end joined to `end` by the adjacency of its `event` cap.
    pub fn adjacent_end(&self, end: EndId, event: Name) -> Option<EndId> {
        let cap = self.cap_with_event(end, event)?;
        let adjacent = self.caps[cap.index()].adjacency?;
        Some(self.caps[adjacent.index()].end)
    }

    pub fn cap_parent(&self, cap: CapId) -> Option<CapId> {
        self.caps[cap.index()].parent
    }

    pub fn segment_parent(&self, segment: SegmentId) -> Option<SegmentId> {
        self.segments[segment.index()].parent
    }

    pub fn cap_name(&self, cap: CapId) -> Name {
        self.caps[cap.index()].name
    }

    pub fn block_segments(&self, block: BlockId) -> Vec<SegmentId> {
        self.blocks[block.index()].segments.clone()
    }

    pub fn set_end_root_instance(&mut self, end: EndId, cap: CapId) {
        self.ends[end.index()].root_instance = Some(cap);
    }

    fn push_end(&mut self, flower: FlowerId, name: Name, kind: EndKind) -> EndId {
        let id = EndId(self.ends.len() as u32);
        self.ends.push(EndRecord {
            name,
            flower,
            kind,
            group: None,
            caps: Vec::new(),
            root_instance: None,
        });
        self.flowers[flower.index()].ends.push(id);
        self.end_names.insert((flower, name), id);
        id
    }

    fn push_cap(
        &mut self,
        end: EndId,
        event: Name,
        strand: bool,
        side: bool,
        sequence: Option<Name>,
    ) -> CapId {
        let name = self.fresh_name();
        let id = CapId(self.caps.len() as u32);
        self.caps.push(CapRecord {
            name,
            end,
            event,
            strand,
            side,
            sequence,
            adjacency: None,
            segment: None,
            parent: None,
            children: Vec::new(),
        });
        self.ends[end.index()].caps.push(id);
        id
    }

    fn push_segment(&mut self, block: BlockId, five_cap: CapId, three_cap: CapId) -> SegmentId {
        let id = SegmentId(self.segments.len() as u32);
        self.segments.push(SegmentRecord {
            five_cap,
            three_cap,
            parent: None,
            children: Vec::new(),
        });
        self.blocks[block.index()].segments.push(id);
        id
    }
}

impl AlignmentGraph for MemoryGraph {
    fn parent_group(&self, flower: FlowerId) -> Option<GroupId> {
        self.flowers[flower.index()].parent_group
    }

    fn group_flower(&self, group: GroupId) -> FlowerId {
        self.groups[group.index()].flower
    }

    fn built_trees(&self, flower: FlowerId) -> bool {
        self.flowers[flower.index()].built_trees
    }

    fn flower_ends(&self, flower: FlowerId) -> Vec<EndId> {
        self.flowers[flower.index()].ends.clone()
    }

    fn flower_groups(&self, flower: FlowerId) -> Vec<GroupId> {
        self.flowers[flower.index()].groups.clone()
    }

    fn flower_blocks(&self, flower: FlowerId) -> Vec<BlockId> {
        self.flowers[flower.index()].blocks.clone()
    }

    fn flower_chains(&self, flower: FlowerId) -> Vec<ChainId> {
        self.flowers[flower.index()].chains.clone()
    }

    fn find_end(&self, flower: FlowerId, name: Name) -> Option<EndId> {
        self.end_names.get(&(flower, name)).copied()
    }

    fn event_by_header(&self, flower: FlowerId, header: &str) -> Option<Name> {
        self.flowers[flower.index()]
            .events
            .iter()
            .find(|(_, h)| h == header)
            .map(|(name, _)| *name)
    }

    fn root_event(&self, flower: FlowerId) -> Name {
        self.flowers[flower.index()].events[0].0
    }

    fn end(&self, end: EndId) -> EndInfo {
        let record = &self.ends[end.index()];
        EndInfo {
            name: record.name,
            flower: record.flower,
            kind: record.kind,
            group: record.group,
        }
    }

    fn end_caps(&self, end: EndId) -> Vec<CapId> {
        self.ends[end.index()].caps.clone()
    }

    fn end_root_instance(&self, end: EndId) -> Option<CapId> {
        self.ends[end.index()].root_instance
    }

    fn group_kind(&self, group: GroupId) -> GroupKind {
        self.groups[group.index()].kind
    }

    fn group_ends(&self, group: GroupId) -> Vec<EndId> {
        self.groups[group.index()].ends.clone()
    }

    fn group_end(&self, group: GroupId, name: Name) -> Option<EndId> {
        let flower = self.group_flower(group);
        self.find_end(flower, name)
            .filter(|&end| self.ends[end.index()].group == Some(group))
    }

    fn chain_ends(&self, chain: ChainId) -> (EndId, EndId) {
        let links = &self.chains[chain.index()].links;
        let three = match self.group_kind(links[0]) {
            GroupKind::Link { three_end, .. } => three_end,
            GroupKind::Tangle => unreachable!("chains are built from link groups only"),
        };
        let five = match self.group_kind(links[links.len() - 1]) {
            GroupKind::Link { five_end, .. } => five_end,
            GroupKind::Tangle => unreachable!("chains are built from link groups only"),
        };
        (three, five)
    }

    fn chain_average_instance_length(&self, chain: ChainId) -> i64 {
        // The block behind each link's 3' end, then the block past the last link.
        let links = &self.chains[chain.index()].links;
        let block_ends = links.iter().filter_map(|&group| match self.group_kind(group) {
            GroupKind::Link { three_end, .. } => Some(three_end),
            GroupKind::Tangle => None,
        });
        let (_, last) = self.chain_ends(chain);
        block_ends
            .chain(std::iter::once(last))
            .filter_map(|end| match self.end(end).kind {
                EndKind::Block { block, .. } => Some(self.blocks[block.index()].length),
                EndKind::Stub(_) => None,
            })
            .sum()
    }

    fn block(&self, block: BlockId) -> BlockInfo {
        let record = &self.blocks[block.index()];
        BlockInfo {
            length: record.length,
            five_end: record.five_end,
            three_end: record.three_end,
            root_instance: record.root_instance,
        }
    }

    fn cap(&self, cap: CapId) -> CapInfo {
        let record = &self.caps[cap.index()];
        let other_segment_cap = record.segment.map(|segment| {
            let seg = &self.segments[segment.index()];
            if seg.five_cap == cap {
                seg.three_cap
            } else {
                seg.five_cap
            }
        });
        CapInfo {
            end: record.end,
            event: record.event,
            strand: record.strand,
            side: record.side,
            has_sequence: record.sequence.is_some(),
            adjacency: record.adjacency,
            other_segment_cap,
        }
    }

    fn segment_caps(&self, segment: SegmentId) -> (CapId, CapId) {
        let record = &self.segments[segment.index()];
        (record.five_cap, record.three_cap)
    }

    fn construct_event(&mut self, flower: FlowerId, header: &str, name: Option<Name>) -> Name {
        let name = name.unwrap_or_else(|| self.fresh_name());
        self.flowers[flower.index()]
            .events
            .push((name, header.to_string()));
        name
    }

    fn copy_end(&mut self, flower: FlowerId, parent_end: EndId) -> EndId {
        let name = self.ends[parent_end.index()].name;
        self.push_end(flower, name, EndKind::Stub(Attachment::Attached))
    }

    fn construct_block(&mut self, flower: FlowerId, length: i64) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let five_name = self.fresh_name();
        let three_name = self.fresh_name();
        let five_end = self.push_end(
            flower,
            five_name,
            EndKind::Block { block: id, side: BlockSide::Five },
        );
        let three_end = self.push_end(
            flower,
            three_name,
            EndKind::Block { block: id, side: BlockSide::Three },
        );
        self.blocks.push(BlockRecord {
            length,
            five_end,
            three_end,
            segments: Vec::new(),
            root_instance: None,
        });
        self.flowers[flower.index()].blocks.push(id);
        id
    }

    fn construct_segment(&mut self, block: BlockId, event: Name) -> SegmentId {
        let info = self.block(block);
        let five_cap = self.push_cap(info.five_end, event, true, false, None);
        let three_cap = self.push_cap(info.three_end, event, true, true, None);
        let segment = self.push_segment(block, five_cap, three_cap);
        self.caps[five_cap.index()].segment = Some(segment);
        self.caps[three_cap.index()].segment = Some(segment);
        segment
    }

    fn set_block_root_instance(&mut self, block: BlockId, segment: SegmentId) {
        self.blocks[block.index()].root_instance = Some(segment);
    }

    fn set_segment_parent(&mut self, parent: SegmentId, child: SegmentId) {
        self.segments[child.index()].parent = Some(parent);
        self.segments[parent.index()].children.push(child);
    }

    fn construct_cap(&mut self, end: EndId, event: Name) -> CapId {
        self.push_cap(end, event, true, false, None)
    }

    fn copy_cap(&mut self, end: EndId, parent_cap: CapId) -> CapId {
        let parent = self.caps[parent_cap.index()].clone();
        let id = CapId(self.caps.len() as u32);
        self.caps.push(CapRecord {
            name: parent.name,
            end,
            event: parent.event,
            strand: parent.strand,
            side: parent.side,
            sequence: parent.sequence,
            adjacency: None,
            segment: None,
            parent: None,
            children: Vec::new(),
        });
        self.ends[end.index()].caps.push(id);
        id
    }

    fn set_cap_parent(&mut self, parent: CapId, child: CapId) {
        self.caps[child.index()].parent = Some(parent);
        self.caps[parent.index()].children.push(child);
    }

    fn make_adjacent(&mut self, cap1: CapId, cap2: CapId) {
        self.caps[cap1.index()].adjacency = Some(cap2);
        self.caps[cap2.index()].adjacency = Some(cap1);
    }

    fn set_group(&mut self, end: EndId, group: GroupId) {
        if let Some(old) = self.ends[end.index()].group {
            self.groups[old.index()].ends.retain(|&e| e != end);
        }
        self.ends[end.index()].group = Some(group);
        self.groups[group.index()].ends.push(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_caps_alternate_tracing_sides() {
        let mut g = MemoryGraph::new();
        let f = g.add_flower(None);
        let t = g.add_group(f);
        let event = g.add_event(f, "human");
        let left = g.add_stub(f, None, Attachment::Attached, Some(t));
        let right = g.add_stub(f, None, Attachment::Attached, Some(t));
        let block = g.add_block(f, 4, Some(t), Some(t));
        g.add_thread(event, left, &[(block, false)], right).unwrap();

        let info = g.block(block);
        let left_cap = g.cap(g.end_caps(left)[0]);
        assert!(left_cap.is_tracing_side());
        let entry = g.cap(left_cap.adjacency.unwrap());
        assert_eq!(entry.end, info.three_end);
        assert!(!entry.is_tracing_side());
        let exit = g.cap(entry.other_segment_cap.unwrap());
        assert_eq!(exit.end, info.five_end);
        assert!(exit.is_tracing_side());
        assert_eq!(g.cap(exit.adjacency.unwrap()).end, right);
    }

    #[test]
    fn chain_length_sums_every_block() {
        let mut g = MemoryGraph::new();
        let f = g.add_flower(None);
        let a = g.add_block(f, 3, None, None);
        let b = g.add_block(f, 7, None, None);
        let c = g.add_block(f, 5, None, None);
        let l1 = g.add_link_group(f, g.block(a).three_end, g.block(b).five_end);
        let l2 = g.add_link_group(f, g.block(b).three_end, g.block(c).five_end);
        let chain = g.add_chain(f, &[l1, l2]).unwrap();
        assert_eq!(g.chain_average_instance_length(chain), 15);
        assert_eq!(g.chain_ends(chain), (g.block(a).three_end, g.block(c).five_end));
    }

    #[test]
    fn chain_rejects_tangle_groups() {
        let mut g = MemoryGraph::new();
        let f = g.add_flower(None);
        let t = g.add_group(f);
        assert!(g.add_chain(f, &[t]).is_err());
    }
}
