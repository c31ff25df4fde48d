//! One traversal level (flower) of a reference build, seen through a changeset.
//!
//! [`LevelView`] answers graph queries as if every planned mutation had
//! already happened: ends copied in from the parent flower, bridge blocks,
//! new reference caps and their adjacencies, group assignments. Nothing
//! reaches the graph until [`Changeset::apply`], so a failure anywhere in
//! planning leaves the flower exactly as it was.

use crate::graph::{AlignmentGraph, Attachment, BlockSide, EndKind, GroupKind};
use crate::types::{
    BlockId, CapId, EndId, FlowerId, GroupId, HashMap, HashMapExt, Name, SegmentId,
};
use anyhow::{anyhow, bail, ensure, Result};
use std::collections::BTreeMap;

/// An end of the level, existing or planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndRef {
    Local(EndId),
    /// A parent-level end to be copied into this flower (index into the imports).
    Imported(usize),
    /// One end of a planned bridge block.
    Bridge(usize, BlockSide),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapRef {
    Existing(CapId),
    New(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Local(BlockId),
    Bridge(usize),
}

/// Shape of an end of the level, bridges included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedKind {
    Stub(Attachment),
    Block(BlockRef, BlockSide),
}

impl PlannedKind {
    pub fn is_attached_stub(self) -> bool {
        matches!(self, PlannedKind::Stub(Attachment::Attached))
    }

    pub fn is_stub(self) -> bool {
        matches!(self, PlannedKind::Stub(_))
    }

    pub fn is_attached_or_block(self) -> bool {
        match self {
            PlannedKind::Stub(Attachment::Attached) | PlannedKind::Block(..) => true,
            PlannedKind::Stub(Attachment::Free) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceEvent {
    Existing(Name),
    /// Not yet in this flower; will be created with the parent's name.
    Inherited(Name),
    /// Not anywhere yet; created fresh at the root.
    Fresh,
}

impl ReferenceEvent {
    fn known_name(self) -> Option<Name> {
        match self {
            ReferenceEvent::Existing(name) | ReferenceEvent::Inherited(name) => Some(name),
            ReferenceEvent::Fresh => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SegmentRef {
    Existing(SegmentId),
    BridgeRoot(usize),
}

#[derive(Debug, Clone, Copy)]
enum CapOrigin {
    Segment { segment: usize, side: BlockSide },
    Copy(CapId),
    Fresh,
}

#[derive(Debug, Clone)]
struct NewCap {
    end: EndRef,
    origin: CapOrigin,
    parent: Option<CapId>,
}

#[derive(Debug, Clone)]
struct NewSegment {
    block: BlockRef,
    parent: Option<SegmentRef>,
}

#[derive(Debug, Clone)]
struct Bridge {
    root_segment: bool,
}

/// Every mutation planned for one flower, applied in a single step.
#[derive(Debug, Clone)]
pub struct Changeset {
    flower: FlowerId,
    header: String,
    event: ReferenceEvent,
    imported: Vec<EndId>,
    bridges: Vec<Bridge>,
    segments: Vec<NewSegment>,
    caps: Vec<NewCap>,
    adjacencies: Vec<(CapRef, CapRef)>,
    groups: BTreeMap<EndRef, GroupId>,
    reference_caps: HashMap<EndRef, CapRef>,
    adjacency: HashMap<CapRef, CapRef>,
}

/// What [`Changeset::apply`] created.
#[derive(Debug, Clone, Default)]
pub struct AppliedChanges {
    pub reference_event: Name,
    pub imported_ends: Vec<EndId>,
    pub bridge_blocks: Vec<BlockId>,
    pub caps: Vec<CapId>,
    pub adjacencies: usize,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.imported.is_empty()
            && self.bridges.is_empty()
            && self.caps.is_empty()
            && self.adjacencies.is_empty()
            && self.groups.is_empty()
            && matches!(self.event, ReferenceEvent::Existing(_))
    }

    pub fn adjacency_count(&self) -> usize {
        self.adjacencies.len()
    }

    pub fn bridge_count(&self) -> usize {
        self.bridges.len()
    }

    /// Write the planned mutations into `graph`.
    pub fn apply<G: AlignmentGraph>(self, graph: &mut G) -> AppliedChanges {
        let flower = self.flower;
        let event = match self.event {
            ReferenceEvent::Existing(name) => name,
            ReferenceEvent::Inherited(name) => {
                graph.construct_event(flower, &self.header, Some(name))
            }
            ReferenceEvent::Fresh => graph.construct_event(flower, &self.header, None),
        };

        let imported_ends: Vec<EndId> = self
            .imported
            .iter()
            .map(|&parent_end| graph.copy_end(flower, parent_end))
            .collect();

        let mut bridge_blocks = Vec::with_capacity(self.bridges.len());
        let mut bridge_roots = Vec::with_capacity(self.bridges.len());
        for bridge in &self.bridges {
            let block = graph.construct_block(flower, 1);
            let root = if bridge.root_segment {
                let root_event = graph.root_event(flower);
                let segment = graph.construct_segment(block, root_event);
                graph.set_block_root_instance(block, segment);
                Some(segment)
            } else {
                None
            };
            bridge_blocks.push(block);
            bridge_roots.push(root);
        }

        let resolve_end = |graph: &G, end: EndRef| -> EndId {
            match end {
                EndRef::Local(end) => end,
                EndRef::Imported(i) => imported_ends[i],
                EndRef::Bridge(i, side) => graph.block(bridge_blocks[i]).end(side),
            }
        };

        for (&end, &group) in &self.groups {
            let end = resolve_end(graph, end);
            graph.set_group(end, group);
        }

        let mut created_segments: Vec<Option<SegmentId>> = vec![None; self.segments.len()];
        let mut caps = Vec::with_capacity(self.caps.len());
        for new_cap in &self.caps {
            let end = resolve_end(graph, new_cap.end);
            let cap = match new_cap.origin {
                CapOrigin::Segment { segment, side } => {
                    let id = match created_segments[segment] {
                        Some(id) => id,
                        None => {
                            let planned = &self.segments[segment];
                            let block = match planned.block {
                                BlockRef::Local(block) => block,
                                BlockRef::Bridge(i) => bridge_blocks[i],
                            };
                            let id = graph.construct_segment(block, event);
                            let parent = match planned.parent {
                                Some(SegmentRef::Existing(parent)) => Some(parent),
                                Some(SegmentRef::BridgeRoot(i)) => bridge_roots[i],
                                None => None,
                            };
                            if let Some(parent) = parent {
                                graph.set_segment_parent(parent, id);
                            }
                            created_segments[segment] = Some(id);
                            id
                        }
                    };
                    let (five, three) = graph.segment_caps(id);
                    match side {
                        BlockSide::Five => five,
                        BlockSide::Three => three,
                    }
                }
                CapOrigin::Copy(parent_cap) => graph.copy_cap(end, parent_cap),
                CapOrigin::Fresh => graph.construct_cap(end, event),
            };
            if let Some(parent) = new_cap.parent {
                graph.set_cap_parent(parent, cap);
            }
            caps.push(cap);
        }

        let resolve_cap = |cap: CapRef| match cap {
            CapRef::Existing(cap) => cap,
            CapRef::New(i) => caps[i],
        };
        for &(cap1, cap2) in &self.adjacencies {
            graph.make_adjacent(resolve_cap(cap1), resolve_cap(cap2));
        }

        AppliedChanges {
            reference_event: event,
            imported_ends,
            bridge_blocks,
            adjacencies: self.adjacencies.len(),
            caps,
        }
    }
}

pub struct LevelView<'g, G: AlignmentGraph> {
    graph: &'g G,
    flower: FlowerId,
    parent_group: Option<GroupId>,
    changes: Changeset,
}

impl<'g, G: AlignmentGraph> LevelView<'g, G> {
    /// Open `flower` and resolve its reference event: the flower's own event
    /// with `header`, else the parent flower's (same name), else a fresh one
    /// at the root.
    pub fn open(graph: &'g G, flower: FlowerId, header: &str) -> Result<Self> {
        let parent_group = graph.parent_group(flower);
        let event = match graph.event_by_header(flower, header) {
            Some(name) => ReferenceEvent::Existing(name),
            None => match parent_group {
                None => ReferenceEvent::Fresh,
                Some(group) => {
                    let parent_flower = graph.group_flower(group);
                    let name = graph.event_by_header(parent_flower, header).ok_or_else(|| {
                        anyhow!(
                            "reference event '{}' is missing from the parent of flower {:?}",
                            header,
                            flower
                        )
                    })?;
                    ReferenceEvent::Inherited(name)
                }
            },
        };
        Ok(Self {
            graph,
            flower,
            parent_group,
            changes: Changeset {
                flower,
                header: header.to_string(),
                event,
                imported: Vec::new(),
                bridges: Vec::new(),
                segments: Vec::new(),
                caps: Vec::new(),
                adjacencies: Vec::new(),
                groups: BTreeMap::new(),
                reference_caps: HashMap::new(),
                adjacency: HashMap::new(),
            },
        })
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    pub fn flower(&self) -> FlowerId {
        self.flower
    }

    pub fn parent_group(&self) -> Option<GroupId> {
        self.parent_group
    }

    pub fn has_parent(&self) -> bool {
        self.parent_group.is_some()
    }

    /// Name of the reference event, unless it is still to be created at the root.
    pub fn reference_event_name(&self) -> Option<Name> {
        self.changes.event.known_name()
    }

    pub fn into_changeset(self) -> Changeset {
        self.changes
    }

    /// Plan copies of the parent group's attached and block ends that this
    /// flower lacks; afterwards the flower must hold a positive, even number
    /// of attached stubs.
    pub fn import_parent_ends(&mut self) -> Result<usize> {
        if let Some(group) = self.parent_group {
            for parent_end in self.graph.group_ends(group) {
                let info = self.graph.end(parent_end);
                if info.kind.is_attached_or_block()
                    && self.graph.find_end(self.flower, info.name).is_none()
                {
                    self.changes.imported.push(parent_end);
                }
            }
        }
        let attached = self
            .graph
            .flower_ends(self.flower)
            .into_iter()
            .filter(|&end| self.graph.end(end).kind.is_attached_stub())
            .count()
            + self.changes.imported.len();
        ensure!(
            attached > 0,
            "flower {:?} has no attached stub ends",
            self.flower
        );
        ensure!(
            attached % 2 == 0,
            "flower {:?} has an odd number ({}) of attached stub ends",
            self.flower,
            attached
        );
        Ok(self.changes.imported.len())
    }

    /// Local ends in flower order followed by imported ends.
    pub fn ends(&self) -> Vec<EndRef> {
        self.graph
            .flower_ends(self.flower)
            .into_iter()
            .map(EndRef::Local)
            .chain((0..self.changes.imported.len()).map(EndRef::Imported))
            .collect()
    }

    pub fn imported_ends(&self) -> Vec<EndRef> {
        (0..self.changes.imported.len())
            .map(EndRef::Imported)
            .collect()
    }

    pub fn kind(&self, end: EndRef) -> PlannedKind {
        match end {
            EndRef::Local(end) => match self.graph.end(end).kind {
                EndKind::Stub(attachment) => PlannedKind::Stub(attachment),
                EndKind::Block { block, side } => PlannedKind::Block(BlockRef::Local(block), side),
            },
            EndRef::Imported(_) => PlannedKind::Stub(Attachment::Attached),
            EndRef::Bridge(i, side) => PlannedKind::Block(BlockRef::Bridge(i), side),
        }
    }

    pub fn name(&self, end: EndRef) -> Option<Name> {
        match end {
            EndRef::Local(end) => Some(self.graph.end(end).name),
            EndRef::Imported(i) => Some(self.graph.end(self.changes.imported[i]).name),
            EndRef::Bridge(..) => None,
        }
    }

    pub fn group(&self, end: EndRef) -> Option<GroupId> {
        if let Some(&group) = self.changes.groups.get(&end) {
            return Some(group);
        }
        match end {
            EndRef::Local(end) => self.graph.end(end).group,
            EndRef::Imported(_) | EndRef::Bridge(..) => None,
        }
    }

    pub fn is_tangle(&self, group: GroupId) -> bool {
        matches!(self.graph.group_kind(group), GroupKind::Tangle)
    }

    /// The lowest-id tangle group of the flower.
    pub fn first_tangle_group(&self) -> Option<GroupId> {
        self.graph
            .flower_groups(self.flower)
            .into_iter()
            .filter(|&group| self.is_tangle(group))
            .min()
    }

    pub fn find_end(&self, name: Name) -> Option<EndRef> {
        if let Some(end) = self.graph.find_end(self.flower, name) {
            return Some(EndRef::Local(end));
        }
        self.changes
            .imported
            .iter()
            .position(|&parent_end| self.graph.end(parent_end).name == name)
            .map(EndRef::Imported)
    }

    pub fn set_group(&mut self, end: EndRef, group: GroupId) {
        self.changes.groups.insert(end, group);
    }

    /// The cap of `end` belonging to the reference event, existing or planned.
    pub fn reference_cap(&self, end: EndRef) -> Option<CapRef> {
        if let Some(&cap) = self.changes.reference_caps.get(&end) {
            return Some(cap);
        }
        match (end, self.changes.event.known_name()) {
            (EndRef::Local(end), Some(event)) => {
                self.graph.cap_with_event(end, event).map(CapRef::Existing)
            }
            _ => None,
        }
    }

    pub fn cap_adjacency(&self, cap: CapRef) -> Option<CapRef> {
        if let Some(&adjacent) = self.changes.adjacency.get(&cap) {
            return Some(adjacent);
        }
        match cap {
            CapRef::Existing(cap) => self.graph.cap(cap).adjacency.map(CapRef::Existing),
            CapRef::New(_) => None,
        }
    }

    pub fn cap_end(&self, cap: CapRef) -> EndRef {
        match cap {
            CapRef::Existing(cap) => EndRef::Local(self.graph.cap(cap).end),
            CapRef::New(i) => self.changes.caps[i].end,
        }
    }

    /// Return the reference cap of `end`, planning one if there is none: a
    /// new reference segment for block ends, a copy of the parent level's
    /// reference cap (or a fresh cap at the root) for stubs.
    pub fn ensure_reference_cap(&mut self, end: EndRef) -> Result<CapRef> {
        if let Some(cap) = self.reference_cap(end) {
            return Ok(cap);
        }
        match self.kind(end) {
            PlannedKind::Block(block, side) => {
                let (five, three, parent) = match block {
                    BlockRef::Local(block) => {
                        let info = self.graph.block(block);
                        (
                            EndRef::Local(info.five_end),
                            EndRef::Local(info.three_end),
                            info.root_instance.map(SegmentRef::Existing),
                        )
                    }
                    BlockRef::Bridge(i) => (
                        EndRef::Bridge(i, BlockSide::Five),
                        EndRef::Bridge(i, BlockSide::Three),
                        self.changes.bridges[i]
                            .root_segment
                            .then_some(SegmentRef::BridgeRoot(i)),
                    ),
                };
                let segment = self.changes.segments.len();
                self.changes.segments.push(NewSegment { block, parent });
                let five_cap = self.push_cap(
                    five,
                    CapOrigin::Segment { segment, side: BlockSide::Five },
                    None,
                );
                let three_cap = self.push_cap(
                    three,
                    CapOrigin::Segment { segment, side: BlockSide::Three },
                    None,
                );
                Ok(match side {
                    BlockSide::Five => five_cap,
                    BlockSide::Three => three_cap,
                })
            }
            PlannedKind::Stub(Attachment::Free) => {
                bail!("free stub end {:?} cannot carry a reference cap", end)
            }
            PlannedKind::Stub(Attachment::Attached) => {
                let origin = match self.parent_group {
                    Some(group) => CapOrigin::Copy(self.parent_reference_cap(end, group)?),
                    None => CapOrigin::Fresh,
                };
                let parent = match end {
                    EndRef::Local(end) => self.graph.end_root_instance(end),
                    EndRef::Imported(_) | EndRef::Bridge(..) => None,
                };
                Ok(self.push_cap(end, origin, parent))
            }
        }
    }

    /// The reference cap of the parent-level end with the same name as `end`.
    pub fn parent_reference_cap(&self, end: EndRef, parent_group: GroupId) -> Result<CapId> {
        let name = self
            .name(end)
            .ok_or_else(|| anyhow!("end {:?} has no counterpart in the parent flower", end))?;
        let parent_end = self.graph.group_end(parent_group, name).ok_or_else(|| {
            anyhow!(
                "end {} of flower {:?} is missing from its parent group {:?}",
                name,
                self.flower,
                parent_group
            )
        })?;
        let event = self.reference_event_name().ok_or_else(|| {
            anyhow!("flower {:?} has a parent but no inherited reference event", self.flower)
        })?;
        self.graph.cap_with_event(parent_end, event).ok_or_else(|| {
            anyhow!(
                "parent end {} of flower {:?} has no reference cap",
                name,
                self.flower
            )
        })
    }

    /// Plan an adjacency between the reference caps of two ends.
    pub fn join(&mut self, end1: EndRef, end2: EndRef) -> Result<()> {
        ensure!(end1 != end2, "cannot join end {:?} to itself", end1);
        let cap1 = self.ensure_reference_cap(end1)?;
        let cap2 = self.ensure_reference_cap(end2)?;
        for (cap, end) in [(cap1, end1), (cap2, end2)] {
            if self.cap_adjacency(cap).is_some() {
                bail!(
                    "reference cap of end {:?} in flower {:?} is already adjacent",
                    end,
                    self.flower
                );
            }
        }
        self.changes.adjacency.insert(cap1, cap2);
        self.changes.adjacency.insert(cap2, cap1);
        self.changes.adjacencies.push((cap1, cap2));
        Ok(())
    }

    /// Plan a length-one block whose 5' end joins `five_group` and 3' end
    /// joins `three_group`.
    pub fn add_bridge(&mut self, five_group: GroupId, three_group: GroupId) -> usize {
        let index = self.changes.bridges.len();
        self.changes.bridges.push(Bridge {
            root_segment: self.graph.built_trees(self.flower),
        });
        self.set_group(EndRef::Bridge(index, BlockSide::Five), five_group);
        self.set_group(EndRef::Bridge(index, BlockSide::Three), three_group);
        index
    }

    fn push_cap(&mut self, end: EndRef, origin: CapOrigin, parent: Option<CapId>) -> CapRef {
        let cap = CapRef::New(self.changes.caps.len());
        self.changes.caps.push(NewCap { end, origin, parent });
        self.changes.reference_caps.insert(end, cap);
        cap
    }
}
