//! In-memory pinch graph: threads cut into segments, segments glued into
//! blocks.
//!
//! A block is a column-aligned set of equal-length segments. Each member
//! carries an orientation: forward members map block column `c` to thread
//! position `start + c`, reverse members to `start + length - 1 - c`.

use crate::graph::BlockSide;
use crate::pinch::Pinch;
use crate::thread_set::{LabelInterval, ThreadBounds, ThreadSet};
use crate::types::{HashMap, HashMapExt, ThreadName};
use anyhow::{anyhow, bail, ensure, Result};
use std::collections::BTreeMap;

type SegmentKey = usize;
type BlockKey = usize;

#[derive(Debug, Clone, Copy)]
struct Segment {
    thread: ThreadName,
    start: i64,
    length: i64,
    block: Option<(BlockKey, bool)>,
}

impl Segment {
    fn end(&self) -> i64 {
        self.start + self.length
    }

    fn column(&self, orientation: bool, position: i64) -> i64 {
        if orientation {
            position - self.start
        } else {
            self.start + self.length - 1 - position
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Block {
    length: i64,
    members: Vec<SegmentKey>,
}

#[derive(Debug, Clone)]
struct Thread {
    bounds: ThreadBounds,
    /// Segment start -> segment.
    segments: BTreeMap<i64, SegmentKey>,
}

/// One segment of a thread, with the index of its block in [`PinchThreadSet::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentView {
    pub start: i64,
    pub length: i64,
    pub block: Option<(usize, bool)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub length: i64,
    /// (thread, start, orientation) of each member, by thread then start.
    pub segments: Vec<(ThreadName, i64, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Block(BlockKey, BlockSide),
    /// A thread's left (`true`) or right end.
    ThreadEnd(ThreadName, bool),
}

#[derive(Default)]
struct UnionFind {
    parent: Vec<usize>,
    index: HashMap<Side, usize>,
}

impl UnionFind {
    fn id(&mut self, side: Side) -> usize {
        if let Some(&id) = self.index.get(&side) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.index.insert(side, id);
        id
    }

    fn find(&mut self, side: Side) -> usize {
        let mut x = self.id(side);
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: Side, b: Side) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

fn block_sides(orientation: bool) -> (BlockSide, BlockSide) {
    if orientation {
        (BlockSide::Five, BlockSide::Three)
    } else {
        (BlockSide::Three, BlockSide::Five)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PinchThreadSet {
    threads: BTreeMap<ThreadName, Thread>,
    segments: Vec<Segment>,
    blocks: Vec<Block>,
}

impl PinchThreadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thread(&mut self, name: ThreadName, start: i64, length: i64) -> Result<()> {
        ensure!(length > 0, "thread {} has non-positive length {}", name, length);
        ensure!(
            start.checked_add(length).is_some(),
            "thread {} [{}, +{}) overflows the coordinate range",
            name,
            start,
            length
        );
        ensure!(
            !self.threads.contains_key(&name),
            "thread {} is defined twice",
            name
        );
        let key = self.segments.len();
        self.segments.push(Segment {
            thread: name,
            start,
            length,
            block: None,
        });
        let mut segments = BTreeMap::new();
        segments.insert(start, key);
        self.threads.insert(
            name,
            Thread {
                bounds: ThreadBounds { start, length },
                segments,
            },
        );
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn segment_count(&self, name: ThreadName) -> usize {
        self.threads.get(&name).map_or(0, |t| t.segments.len())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.members.is_empty()).count()
    }

    /// Segments of one thread in order.
    pub fn segments(&self, name: ThreadName) -> Option<Vec<SegmentView>> {
        let numbering = self.block_numbering();
        let thread = self.threads.get(&name)?;
        Some(
            thread
                .segments
                .values()
                .map(|&key| {
                    let seg = &self.segments[key];
                    SegmentView {
                        start: seg.start,
                        length: seg.length,
                        block: seg.block.map(|(b, o)| (numbering[&b], o)),
                    }
                })
                .collect(),
        )
    }

    /// Live blocks, numbered by first appearance walking threads in order.
    pub fn blocks(&self) -> Vec<BlockView> {
        let numbering = self.block_numbering();
        let mut views = vec![
            BlockView {
                length: 0,
                segments: Vec::new()
            };
            numbering.len()
        ];
        for thread in self.threads.values() {
            for &key in thread.segments.values() {
                let seg = &self.segments[key];
                if let Some((block, orientation)) = seg.block {
                    let view = &mut views[numbering[&block]];
                    view.length = self.blocks[block].length;
                    view.segments.push((seg.thread, seg.start, orientation));
                }
            }
        }
        views
    }

    /// Whether two bases sit in the same block column.
    pub fn is_aligned(&self, name1: ThreadName, pos1: i64, name2: ThreadName, pos2: i64) -> bool {
        let (Some(k1), Some(k2)) = (self.segment_at(name1, pos1), self.segment_at(name2, pos2))
        else {
            return false;
        };
        if k1 == k2 && pos1 == pos2 {
            return true;
        }
        let (s1, s2) = (self.segments[k1], self.segments[k2]);
        match (s1.block, s2.block) {
            (Some((b1, o1)), Some((b2, o2))) if b1 == b2 => {
                s1.column(o1, pos1) == s2.column(o2, pos2)
            }
            _ => false,
        }
    }

    fn block_numbering(&self) -> HashMap<BlockKey, usize> {
        let mut numbering = HashMap::new();
        for thread in self.threads.values() {
            for &key in thread.segments.values() {
                if let Some((block, _)) = self.segments[key].block {
                    let next = numbering.len();
                    numbering.entry(block).or_insert(next);
                }
            }
        }
        numbering
    }

    fn segment_at(&self, name: ThreadName, position: i64) -> Option<SegmentKey> {
        let thread = self.threads.get(&name)?;
        let (_, &key) = thread.segments.range(..=position).next_back()?;
        (position < self.segments[key].end()).then_some(key)
    }

    fn next_segment(&self, key: SegmentKey) -> Option<SegmentKey> {
        let seg = &self.segments[key];
        let thread = self.threads.get(&seg.thread)?;
        thread.segments.get(&seg.end()).copied()
    }

    fn prev_segment(&self, key: SegmentKey) -> Option<SegmentKey> {
        let seg = &self.segments[key];
        let thread = self.threads.get(&seg.thread)?;
        thread
            .segments
            .range(..seg.start)
            .next_back()
            .map(|(_, &k)| k)
    }

    /// Cut a segment after its first `left` bases; returns the right piece,
    /// which keeps the original block membership.
    fn cut(&mut self, key: SegmentKey, left: i64) -> SegmentKey {
        let seg = &mut self.segments[key];
        let right = Segment {
            start: seg.start + left,
            length: seg.length - left,
            ..*seg
        };
        seg.length = left;
        let id = self.segments.len();
        self.segments.push(right);
        if let Some(thread) = self.threads.get_mut(&right.thread) {
            thread.segments.insert(right.start, id);
        }
        id
    }

    /// Split every member of `block` between columns `k - 1` and `k`.
    fn split_block(&mut self, block: BlockKey, k: i64) {
        let Block { length, members } = std::mem::take(&mut self.blocks[block]);
        let right_block = self.blocks.len();
        self.blocks.push(Block::default());
        let mut left_members = Vec::with_capacity(members.len());
        let mut right_members = Vec::with_capacity(members.len());
        for key in members {
            let orientation = self.segments[key].block.map_or(true, |(_, o)| o);
            let thread_left = if orientation { k } else { length - k };
            let other = self.cut(key, thread_left);
            let (low, high) = if orientation { (key, other) } else { (other, key) };
            self.segments[low].block = Some((block, orientation));
            self.segments[high].block = Some((right_block, orientation));
            left_members.push(low);
            right_members.push(high);
        }
        self.blocks[block] = Block {
            length: k,
            members: left_members,
        };
        self.blocks[right_block] = Block {
            length: length - k,
            members: right_members,
        };
    }

    fn ensure_block(&mut self, key: SegmentKey) -> (BlockKey, bool) {
        if let Some(block) = self.segments[key].block {
            return block;
        }
        let block = self.blocks.len();
        self.blocks.push(Block {
            length: self.segments[key].length,
            members: vec![key],
        });
        self.segments[key].block = Some((block, true));
        (block, true)
    }

    /// Glue two equal-length segments into one block. Returns false, leaving
    /// the graph as it was, when both already sit in one block with the
    /// opposite column order.
    fn merge(&mut self, k1: SegmentKey, k2: SegmentKey, strand: bool) -> bool {
        if k1 == k2 {
            return strand || self.segments[k1].length == 1;
        }
        let (b1, o1) = self.ensure_block(k1);
        let (b2, o2) = self.ensure_block(k2);
        let wanted = if strand { o1 } else { !o1 };
        let flip = o2 != wanted;
        if b1 == b2 {
            return !flip || self.blocks[b1].length == 1;
        }
        let absorbed = std::mem::take(&mut self.blocks[b2]);
        for key in absorbed.members {
            if let Some((_, orientation)) = self.segments[key].block {
                self.segments[key].block = Some((b1, orientation ^ flip));
            }
            self.blocks[b1].members.push(key);
        }
        true
    }

    /// Cut both stretches into single bases and glue them pair by pair.
    /// `p2` is the first base of the second stretch for a forward pinch and
    /// its last base otherwise.
    fn fold(
        &mut self,
        name1: ThreadName,
        p1: i64,
        name2: ThreadName,
        p2: i64,
        length: i64,
        strand: bool,
    ) -> Result<()> {
        let partner = |i: i64| if strand { p2 + i } else { p2 - i };
        for i in 0..length {
            self.split(name1, p1 + i)?;
            self.split(name2, partner(i))?;
        }
        for i in 0..length {
            let k1 = self
                .segment_at(name1, p1 + i)
                .ok_or_else(|| anyhow!("no segment at {}:{}", name1, p1 + i))?;
            let k2 = self
                .segment_at(name2, partner(i))
                .ok_or_else(|| anyhow!("no segment at {}:{}", name2, partner(i)))?;
            ensure!(
                self.merge(k1, k2, strand),
                "could not glue {}:{} to {}:{}",
                name1,
                p1 + i,
                name2,
                partner(i)
            );
        }
        Ok(())
    }

    /// Remove `right`, growing its left neighbour over it.
    fn absorb(&mut self, left: SegmentKey, right: SegmentKey) {
        let right_seg = self.segments[right];
        self.segments[left].length += right_seg.length;
        self.segments[right].length = 0;
        self.segments[right].block = None;
        if let Some(thread) = self.threads.get_mut(&right_seg.thread) {
            thread.segments.remove(&right_seg.start);
        }
    }

    fn try_join(&mut self, a: SegmentKey, b: SegmentKey) -> bool {
        match (self.segments[a].block, self.segments[b].block) {
            (None, None) => {
                self.absorb(a, b);
                true
            }
            (Some((ba, _)), Some((bb, _))) if ba != bb => {
                self.join_blocks(ba, bb) || self.join_blocks(bb, ba)
            }
            _ => false,
        }
    }

    /// Append `second` to `first` when every member of `first` continues
    /// straight into a member of `second`.
    fn join_blocks(&mut self, first: BlockKey, second: BlockKey) -> bool {
        if self.blocks[first].members.len() != self.blocks[second].members.len() {
            return false;
        }
        let mut pairs = Vec::with_capacity(self.blocks[first].members.len());
        for &x in &self.blocks[first].members {
            let Some((_, orientation)) = self.segments[x].block else {
                return false;
            };
            let next = if orientation {
                self.next_segment(x)
            } else {
                self.prev_segment(x)
            };
            match next {
                Some(n) if self.segments[n].block == Some((second, orientation)) => {
                    pairs.push((x, n, orientation))
                }
                _ => return false,
            }
        }
        let length = self.blocks[first].length + self.blocks[second].length;
        let mut members = Vec::with_capacity(pairs.len());
        for (x, n, orientation) in pairs {
            let (left, right) = if orientation { (x, n) } else { (n, x) };
            self.absorb(left, right);
            self.segments[left].block = Some((first, orientation));
            members.push(left);
        }
        self.blocks[first] = Block { length, members };
        self.blocks[second] = Block::default();
        true
    }

    fn thread_keys(&self, name: ThreadName) -> Vec<SegmentKey> {
        self.threads
            .get(&name)
            .map(|t| t.segments.values().copied().collect())
            .unwrap_or_default()
    }

    fn check_interval(&self, name: ThreadName, start: i64, length: i64) -> Result<()> {
        let bounds = self
            .thread_bounds(name)
            .ok_or_else(|| anyhow!("unknown thread {}", name))?;
        let end = start.checked_add(length).ok_or_else(|| {
            anyhow!("interval at {} of length {} overflows thread {}", start, length, name)
        })?;
        if start < bounds.start || end > bounds.end() {
            bail!(
                "interval [{}, {}) lies outside thread {} [{}, {})",
                start,
                end,
                name,
                bounds.start,
                bounds.end()
            );
        }
        Ok(())
    }

    /// Union block ends that meet across a run of unblocked bases, with the
    /// two ends of each thread standing in for missing blocks.
    fn adjacency_components(&self) -> UnionFind {
        let mut components = UnionFind::default();
        for (&name, thread) in &self.threads {
            let mut previous = Side::ThreadEnd(name, true);
            for &key in thread.segments.values() {
                if let Some((block, orientation)) = self.segments[key].block {
                    let (left, right) = block_sides(orientation);
                    components.union(previous, Side::Block(block, left));
                    previous = Side::Block(block, right);
                }
            }
            components.union(previous, Side::ThreadEnd(name, false));
        }
        components
    }
}

impl ThreadSet for PinchThreadSet {
    fn thread_names(&self) -> Vec<ThreadName> {
        self.threads.keys().copied().collect()
    }

    fn thread_bounds(&self, name: ThreadName) -> Option<ThreadBounds> {
        self.threads.get(&name).map(|t| t.bounds)
    }

    fn split(&mut self, name: ThreadName, position: i64) -> Result<()> {
        let bounds = self
            .thread_bounds(name)
            .ok_or_else(|| anyhow!("unknown thread {}", name))?;
        if position < bounds.start || position >= bounds.end() - 1 {
            return Ok(());
        }
        let Some(key) = self.segment_at(name, position) else {
            return Ok(());
        };
        let seg = self.segments[key];
        if position == seg.end() - 1 {
            return Ok(());
        }
        let left = position - seg.start + 1;
        match seg.block {
            None => {
                self.cut(key, left);
            }
            Some((block, orientation)) => {
                let k = if orientation { left } else { seg.length - left };
                self.split_block(block, k);
            }
        }
        Ok(())
    }

    fn pinch(&mut self, pinch: &Pinch) -> Result<()> {
        ensure!(pinch.length >= 0, "negative pinch length {}", pinch.length);
        self.check_interval(pinch.name1, pinch.start1, pinch.length)?;
        self.check_interval(pinch.name2, pinch.start2, pinch.length)?;
        if pinch.length == 0 {
            return Ok(());
        }
        let (name1, name2) = (pinch.name1, pinch.name2);
        self.split(name1, pinch.start1 - 1)?;
        self.split(name1, pinch.start1 + pinch.length - 1)?;
        self.split(name2, pinch.start2 - 1)?;
        self.split(name2, pinch.start2 + pinch.length - 1)?;

        let mut offset = 0;
        while offset < pinch.length {
            let p1 = pinch.start1 + offset;
            // First base on thread 2 for a forward pinch, last base otherwise.
            let p2 = if pinch.strand {
                pinch.start2 + offset
            } else {
                pinch.start2 + pinch.length - 1 - offset
            };
            loop {
                let k1 = self
                    .segment_at(name1, p1)
                    .ok_or_else(|| anyhow!("no segment at {}:{}", name1, p1))?;
                let k2 = self
                    .segment_at(name2, p2)
                    .ok_or_else(|| anyhow!("no segment at {}:{}", name2, p2))?;
                let r1 = self.segments[k1].end() - p1;
                let r2 = if pinch.strand {
                    self.segments[k2].end() - p2
                } else {
                    p2 - self.segments[k2].start + 1
                };
                let chunk = r1.min(r2).min(pinch.length - offset);
                if r1 == chunk && r2 == chunk {
                    if !self.merge(k1, k2, pinch.strand) {
                        // A block cannot hold both column orders at once.
                        self.fold(name1, p1, name2, p2, chunk, pinch.strand)?;
                    }
                    offset += chunk;
                    break;
                }
                if r1 > chunk {
                    self.split(name1, p1 + chunk - 1)?;
                }
                if r2 > chunk {
                    if pinch.strand {
                        self.split(name2, p2 + chunk - 1)?;
                    } else {
                        self.split(name2, p2 - chunk)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn join_trivial_boundaries(&mut self) {
        loop {
            let mut changed = false;
            for name in self.thread_names() {
                let mut keys = self.thread_keys(name);
                let mut i = 0;
                while i + 1 < keys.len() {
                    if self.try_join(keys[i], keys[i + 1]) {
                        changed = true;
                        keys = self.thread_keys(name);
                    } else {
                        i += 1;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn label_intervals(&self) -> Vec<LabelInterval> {
        let mut components = self.adjacency_components();
        let mut labels: HashMap<usize, u64> = HashMap::new();
        let mut label_of = |components: &mut UnionFind, side: Side| {
            let root = components.find(side);
            let next = labels.len() as u64;
            *labels.entry(root).or_insert(next)
        };

        let mut intervals: Vec<LabelInterval> = Vec::new();
        for (&name, thread) in &self.threads {
            let mut current = Side::ThreadEnd(name, true);
            for &key in thread.segments.values() {
                let seg = &self.segments[key];
                let label = match seg.block {
                    None => label_of(&mut components, current),
                    Some((block, orientation)) => {
                        current = Side::Block(block, block_sides(orientation).1);
                        label_of(&mut components, Side::Block(block, BlockSide::Five))
                    }
                };
                match intervals.last_mut() {
                    Some(last) if last.thread == name && last.label == label => {
                        last.length += seg.length;
                    }
                    _ => intervals.push(LabelInterval {
                        thread: name,
                        start: seg.start,
                        length: seg.length,
                        label,
                    }),
                }
            }
        }
        intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_threads() -> PinchThreadSet {
        let mut threads = PinchThreadSet::new();
        threads.add_thread(1, 0, 50).unwrap();
        threads.add_thread(2, 0, 200).unwrap();
        threads
    }

    #[test]
    fn split_is_idempotent_and_ignores_bounds() {
        let mut threads = two_threads();
        threads.split(1, 9).unwrap();
        threads.split(1, 9).unwrap();
        threads.split(1, -1).unwrap();
        threads.split(1, 49).unwrap();
        assert_eq!(threads.segment_count(1), 2);
        assert!(threads.split(7, 3).is_err());
    }

    #[test]
    fn forward_pinch_aligns_columns() {
        let mut threads = two_threads();
        threads.pinch(&Pinch::new(1, 10, 2, 20, 5, true)).unwrap();
        for i in 0..5 {
            assert!(threads.is_aligned(1, 10 + i, 2, 20 + i));
        }
        assert!(!threads.is_aligned(1, 9, 2, 19));
        assert_eq!(threads.block_count(), 1);
        assert_eq!(threads.segment_count(1), 3);
    }

    #[test]
    fn reverse_pinch_aligns_columns() {
        let mut threads = two_threads();
        threads.pinch(&Pinch::new(1, 10, 2, 100, 5, false)).unwrap();
        for i in 0..5 {
            assert!(threads.is_aligned(1, 10 + i, 2, 104 - i));
        }
        let blocks = threads.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].segments, vec![(1, 10, true), (2, 100, false)]);
    }

    #[test]
    fn overlapping_pinches_cascade_splits() {
        let mut threads = two_threads();
        threads.pinch(&Pinch::new(1, 10, 2, 20, 10, true)).unwrap();
        threads.pinch(&Pinch::new(1, 15, 2, 60, 10, false)).unwrap();
        for i in 0..10 {
            assert!(threads.is_aligned(1, 10 + i, 2, 20 + i));
            assert!(threads.is_aligned(1, 15 + i, 2, 69 - i));
        }
        // 1:15..20 now sits in one column set with 2:25..30 and 2:65..70.
        assert!(threads.is_aligned(2, 25, 2, 69));
    }

    #[test]
    fn opposite_pinch_of_a_block_folds_it_to_single_bases() {
        let mut threads = two_threads();
        threads.pinch(&Pinch::new(1, 10, 2, 20, 5, false)).unwrap();
        threads.pinch(&Pinch::new(1, 10, 2, 20, 5, true)).unwrap();
        for i in 0..5 {
            assert!(threads.is_aligned(1, 10 + i, 2, 20 + i));
            assert!(threads.is_aligned(1, 10 + i, 2, 24 - i));
        }
        assert!(threads.is_aligned(1, 10, 1, 14));
        assert!(!threads.is_aligned(1, 10, 1, 11));
        // Columns {10, 14}, {11, 13} and {12} of thread 1.
        assert_eq!(threads.block_count(), 3);
        assert!(threads.blocks().iter().all(|b| b.length == 1));
    }

    #[test]
    fn reverse_pinch_of_a_stretch_onto_itself() {
        let mut threads = two_threads();
        threads.pinch(&Pinch::new(1, 10, 1, 10, 4, false)).unwrap();
        assert!(threads.is_aligned(1, 10, 1, 13));
        assert!(threads.is_aligned(1, 11, 1, 12));
        assert!(!threads.is_aligned(1, 10, 1, 11));
        assert_eq!(threads.blocks().len(), 2);

        // A forward pinch onto itself is a no-op.
        let mut same = two_threads();
        same.pinch(&Pinch::new(1, 10, 1, 10, 4, true)).unwrap();
        assert!(same.blocks().is_empty());
    }

    #[test]
    fn oversized_coordinates_are_errors() {
        let mut threads = two_threads();
        assert!(threads.add_thread(3, i64::MAX - 1, 5).is_err());
        assert!(threads.pinch(&Pinch::new(1, 10, 2, 20, i64::MAX, true)).is_err());
    }

    #[test]
    fn pinch_outside_thread_is_rejected() {
        let mut threads = two_threads();
        assert!(threads.pinch(&Pinch::new(1, 48, 2, 0, 5, true)).is_err());
        assert!(threads.pinch(&Pinch::new(9, 0, 2, 0, 5, true)).is_err());
    }

    #[test]
    fn trivial_boundaries_join() {
        let mut threads = two_threads();
        threads.split(1, 9).unwrap();
        threads.split(1, 19).unwrap();
        threads.pinch(&Pinch::new(1, 10, 2, 10, 5, true)).unwrap();
        threads.pinch(&Pinch::new(1, 15, 2, 15, 5, true)).unwrap();
        assert_eq!(threads.block_count(), 2);
        threads.join_trivial_boundaries();
        assert_eq!(threads.block_count(), 1);
        assert_eq!(threads.segment_count(1), 3);
        assert_eq!(threads.segment_count(2), 3);
        assert!(threads.is_aligned(1, 19, 2, 19));
    }

    #[test]
    fn labels_follow_adjacency_components() {
        let mut threads = two_threads();
        // Unpinched threads are one component each.
        let labels = threads.label_intervals();
        assert_eq!(labels.len(), 2);
        assert_ne!(labels[0].label, labels[1].label);

        // Pinching 1:[10,15) to 2:[20,25) joins the left flanks into one
        // component (through the block's 5' end) and the right flanks into
        // another.
        threads.pinch(&Pinch::new(1, 10, 2, 20, 5, true)).unwrap();
        let labels = threads.label_intervals();
        let on = |thread, pos| {
            labels
                .iter()
                .find(|i| i.thread == thread && i.contains(pos))
                .map(|i| i.label)
                .unwrap()
        };
        assert_eq!(on(1, 0), on(2, 0));
        assert_eq!(on(1, 12), on(1, 0));
        assert_eq!(on(1, 40), on(2, 100));
        assert_ne!(on(1, 0), on(1, 40));
    }
}
