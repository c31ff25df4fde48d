//! The alignment graph as seen by the reference engine.
//!
//! The engine never touches storage directly: it reads a flower through the
//! query half of [`AlignmentGraph`] and writes through the mutation half, and
//! only from [`crate::level::Changeset::apply`].

use crate::types::{BlockId, CapId, ChainId, EndId, FlowerId, GroupId, Name, SegmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// The stub continues into the enclosing flower.
    Attached,
    /// The stub is a sequence end with nothing beyond it.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockSide {
    Five,
    Three,
}

impl BlockSide {
    pub fn opposite(self) -> Self {
        match self {
            BlockSide::Five => BlockSide::Three,
            BlockSide::Three => BlockSide::Five,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndKind {
    Stub(Attachment),
    Block { block: BlockId, side: BlockSide },
}

impl EndKind {
    pub fn is_attached_stub(self) -> bool {
        matches!(self, EndKind::Stub(Attachment::Attached))
    }

    /// Ends that take part in the reference problem: attached stubs and block ends.
    pub fn is_attached_or_block(self) -> bool {
        match self {
            EndKind::Stub(Attachment::Attached) | EndKind::Block { .. } => true,
            EndKind::Stub(Attachment::Free) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Exactly two ends joined by a link of a chain.
    Link { three_end: EndId, five_end: EndId },
    Tangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndInfo {
    pub name: Name,
    pub flower: FlowerId,
    pub kind: EndKind,
    pub group: Option<GroupId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub length: i64,
    pub five_end: EndId,
    pub three_end: EndId,
    pub root_instance: Option<SegmentId>,
}

impl BlockInfo {
    pub fn end(&self, side: BlockSide) -> EndId {
        match side {
            BlockSide::Five => self.five_end,
            BlockSide::Three => self.three_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapInfo {
    pub end: EndId,
    pub event: Name,
    /// True when the cap lies on the positive strand of its end.
    pub strand: bool,
    /// On the positive strand, true when the cap's adjacency leads 3'-wards.
    pub side: bool,
    pub has_sequence: bool,
    pub adjacency: Option<CapId>,
    /// The cap at the opposite end of the same segment, for block-end caps.
    pub other_segment_cap: Option<CapId>,
}

impl CapInfo {
    /// The designated side of the positive-orientation view of this cap.
    /// Tracing adjacencies only from caps where this holds visits each
    /// adjacency once.
    pub fn is_tracing_side(&self) -> bool {
        if self.strand {
            self.side
        } else {
            !self.side
        }
    }
}

pub trait AlignmentGraph {
    fn parent_group(&self, flower: FlowerId) -> Option<GroupId>;
    fn group_flower(&self, group: GroupId) -> FlowerId;
    fn built_trees(&self, flower: FlowerId) -> bool;

    fn flower_ends(&self, flower: FlowerId) -> Vec<EndId>;
    fn flower_groups(&self, flower: FlowerId) -> Vec<GroupId>;
    fn flower_blocks(&self, flower: FlowerId) -> Vec<BlockId>;
    fn flower_chains(&self, flower: FlowerId) -> Vec<ChainId>;
    fn find_end(&self, flower: FlowerId, name: Name) -> Option<EndId>;

    fn event_by_header(&self, flower: FlowerId, header: &str) -> Option<Name>;
    fn root_event(&self, flower: FlowerId) -> Name;

    fn end(&self, end: EndId) -> EndInfo;
    fn end_caps(&self, end: EndId) -> Vec<CapId>;
    fn end_root_instance(&self, end: EndId) -> Option<CapId>;

    fn group_kind(&self, group: GroupId) -> GroupKind;
    fn group_ends(&self, group: GroupId) -> Vec<EndId>;
    fn group_end(&self, group: GroupId, name: Name) -> Option<EndId>;

    /// The outer ends of a chain: the 3' end of its first link and the 5'
    /// end of its last link.
    fn chain_ends(&self, chain: ChainId) -> (EndId, EndId);
    fn chain_average_instance_length(&self, chain: ChainId) -> i64;

    fn block(&self, block: BlockId) -> BlockInfo;
    fn cap(&self, cap: CapId) -> CapInfo;
    fn segment_caps(&self, segment: SegmentId) -> (CapId, CapId);

    fn construct_event(&mut self, flower: FlowerId, header: &str, name: Option<Name>) -> Name;
    /// Copy a parent-level end into `flower` as an ungrouped attached stub.
    fn copy_end(&mut self, flower: FlowerId, parent_end: EndId) -> EndId;
    fn construct_block(&mut self, flower: FlowerId, length: i64) -> BlockId;
    fn construct_segment(&mut self, block: BlockId, event: Name) -> SegmentId;
    fn set_block_root_instance(&mut self, block: BlockId, segment: SegmentId);
    fn set_segment_parent(&mut self, parent: SegmentId, child: SegmentId);
    fn construct_cap(&mut self, end: EndId, event: Name) -> CapId;
    fn copy_cap(&mut self, end: EndId, parent_cap: CapId) -> CapId;
    fn set_cap_parent(&mut self, parent: CapId, child: CapId);
    fn make_adjacent(&mut self, cap1: CapId, cap2: CapId);
    fn set_group(&mut self, end: EndId, group: GroupId);

    /// The first cap of `end` belonging to the event named `event`.
    fn cap_with_event(&self, end: EndId, event: Name) -> Option<CapId> {
        self.end_caps(end)
            .into_iter()
            .find(|&cap| self.cap(cap).event == event)
    }

    fn other_block_end(&self, end: EndId) -> Option<EndId> {
        match self.end(end).kind {
            EndKind::Block { block, side } => Some(self.block(block).end(side.opposite())),
            EndKind::Stub(_) => None,
        }
    }

    fn is_tangle(&self, group: GroupId) -> bool {
        matches!(self.group_kind(group), GroupKind::Tangle)
    }
}
