/// Annealing pinch streams into thread sets, unrestricted and restricted to
/// adjacency components.
use anyhow::{bail, Result};
use cactus_ref_rs::anneal::{check_pinch, ensure_ends_are_distinct};
use cactus_ref_rs::{
    anneal, anneal_same_components, LabelInterval, Pinch, PinchList, PinchThreadSet,
    ThreadBounds, ThreadName, ThreadSet,
};

// ── helpers ──────────────────────────────────────────────────────────────────

/// A thread set with fixed label intervals that records what it is asked to do.
#[derive(Default)]
struct RecordingThreads {
    bounds: Vec<(ThreadName, ThreadBounds)>,
    labels: Vec<LabelInterval>,
    pinches: Vec<Pinch>,
    splits: Vec<(ThreadName, i64)>,
}

impl RecordingThreads {
    fn new(labels: &[(ThreadName, i64, i64, u64)]) -> Self {
        let mut threads = Self::default();
        for &(thread, start, length, label) in labels {
            threads.labels.push(LabelInterval {
                thread,
                start,
                length,
                label,
            });
        }
        threads.bounds = vec![
            (1, ThreadBounds { start: 0, length: 50 }),
            (2, ThreadBounds { start: 0, length: 200 }),
        ];
        threads
    }
}

impl ThreadSet for RecordingThreads {
    fn thread_names(&self) -> Vec<ThreadName> {
        self.bounds.iter().map(|(name, _)| *name).collect()
    }

    fn thread_bounds(&self, name: ThreadName) -> Option<ThreadBounds> {
        self.bounds
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bounds)| *bounds)
    }

    fn split(&mut self, name: ThreadName, position: i64) -> Result<()> {
        self.splits.push((name, position));
        Ok(())
    }

    fn pinch(&mut self, pinch: &Pinch) -> Result<()> {
        if pinch.length <= 0 {
            bail!("empty pinch handed to the thread set");
        }
        self.pinches.push(*pinch);
        Ok(())
    }

    fn join_trivial_boundaries(&mut self) {}

    fn label_intervals(&self) -> Vec<LabelInterval> {
        self.labels.clone()
    }
}

fn two_threads() -> PinchThreadSet {
    let mut threads = PinchThreadSet::new();
    threads.add_thread(1, 0, 50).unwrap();
    threads.add_thread(2, 0, 200).unwrap();
    threads
}

// ── restricted annealing ─────────────────────────────────────────────────────

#[test]
fn same_component_pinch_passes_whole() {
    let mut threads = RecordingThreads::new(&[(1, 0, 50, 1), (2, 0, 200, 1)]);
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 2, 20, 5, true)]);
    let stats = anneal_same_components(&mut threads, &mut pinches).unwrap();

    assert_eq!(threads.pinches, vec![Pinch::new(1, 10, 2, 20, 5, true)]);
    assert_eq!(stats.pinches, 1);
    assert_eq!(stats.merges, 1);
    assert_eq!(stats.merged_bases, 5);
    assert_eq!(stats.skipped_bases, 0);
}

#[test]
fn reverse_pinch_is_cut_at_label_boundaries() {
    let mut threads = RecordingThreads::new(&[
        (1, 0, 13, 1),
        (1, 13, 37, 2),
        (2, 0, 102, 2),
        (2, 102, 98, 1),
    ]);
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 2, 100, 5, false)]);
    let stats = anneal_same_components(&mut threads, &mut pinches).unwrap();

    // 1:10..13 meets 2:102..105, 1:13..15 meets 2:100..102.
    assert_eq!(
        threads.pinches,
        vec![
            Pinch::new(1, 10, 2, 102, 3, false),
            Pinch::new(1, 13, 2, 100, 2, false),
        ]
    );
    assert_eq!(stats.merged_bases, 5);
}

#[test]
fn cross_component_stretches_are_skipped() {
    let mut threads = RecordingThreads::new(&[(1, 0, 50, 1), (2, 0, 102, 2), (2, 102, 98, 1)]);
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 2, 100, 5, true)]);
    let stats = anneal_same_components(&mut threads, &mut pinches).unwrap();

    assert_eq!(threads.pinches, vec![Pinch::new(1, 12, 2, 102, 3, true)]);
    assert_eq!(stats.merges, 1);
    assert_eq!(stats.merged_bases, 3);
    assert_eq!(stats.skipped_bases, 2);
}

#[test]
fn uncovered_position_is_an_error() {
    let mut threads = RecordingThreads::new(&[(1, 0, 50, 1), (2, 0, 10, 1)]);
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 2, 20, 5, true)]);
    let err = anneal_same_components(&mut threads, &mut pinches).unwrap_err();
    assert!(format!("{:#}", err).contains("no adjacency component interval"));
}

#[test]
fn restricted_anneal_on_pinch_graph() {
    let mut threads = two_threads();
    // Right flanks of both threads now share a component; left flanks another.
    threads.pinch(&Pinch::new(1, 10, 2, 20, 5, true)).unwrap();

    let mut pinches = PinchList::new(vec![
        Pinch::new(1, 30, 2, 60, 5, true),
        Pinch::new(1, 2, 2, 100, 3, true),
    ]);
    let stats = anneal_same_components(&mut threads, &mut pinches).unwrap();

    assert_eq!(stats.pinches, 2);
    assert_eq!(stats.merges, 1);
    assert_eq!(stats.merged_bases, 5);
    assert_eq!(stats.skipped_bases, 3);
    assert!(threads.is_aligned(1, 30, 2, 60));
    assert!(threads.is_aligned(1, 34, 2, 64));
    assert!(!threads.is_aligned(1, 2, 2, 100));
}

// ── unrestricted annealing ───────────────────────────────────────────────────

#[test]
fn anneal_applies_every_pinch() {
    let mut threads = two_threads();
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 2, 20, 5, true)]);
    let stats = anneal(&mut threads, &mut pinches).unwrap();

    assert_eq!(stats.pinches, 1);
    assert_eq!(stats.merged_bases, 5);
    for i in 0..5 {
        assert!(threads.is_aligned(1, 10 + i, 2, 20 + i));
    }
    // Flanks, the block, and the split-off first and last bases.
    assert_eq!(threads.segment_count(1), 5);
    assert_eq!(threads.segment_count(2), 5);
    let first = threads.segments(1).unwrap();
    assert_eq!((first[0].start, first[0].length), (0, 1));
    assert_eq!((first[4].start, first[4].length), (49, 1));
}

#[test]
fn repeating_a_pinch_changes_nothing() {
    let mut once = two_threads();
    anneal(
        &mut once,
        &mut PinchList::new(vec![Pinch::new(1, 10, 2, 100, 5, false)]),
    )
    .unwrap();

    let mut twice = two_threads();
    let stats = anneal(
        &mut twice,
        &mut PinchList::new(vec![
            Pinch::new(1, 10, 2, 100, 5, false),
            Pinch::new(1, 10, 2, 100, 5, false),
        ]),
    )
    .unwrap();

    assert_eq!(stats.pinches, 2);
    assert_eq!(once.blocks(), twice.blocks());
    assert_eq!(once.segments(1), twice.segments(1));
    assert_eq!(once.segments(2), twice.segments(2));
}

#[test]
fn adjacent_pinches_are_joined_into_one_block() {
    let mut threads = two_threads();
    let mut pinches = PinchList::new(vec![
        Pinch::new(1, 10, 2, 20, 5, true),
        Pinch::new(1, 15, 2, 25, 5, true),
    ]);
    anneal(&mut threads, &mut pinches).unwrap();
    let blocks = threads.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].length, 10);
    assert_eq!(blocks[0].segments, vec![(1, 10, true), (2, 20, true)]);
}

#[test]
fn self_reverse_pinch_folds_a_thread() {
    let mut threads = two_threads();
    let mut pinches = PinchList::new(vec![Pinch::new(1, 10, 1, 10, 4, false)]);
    anneal(&mut threads, &mut pinches).unwrap();

    // The two unit columns rejoin into one block: 1:10..12 against 1:12..14 reversed.
    let blocks = threads.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].length, 2);
    assert_eq!(blocks[0].segments, vec![(1, 10, true), (1, 12, false)]);
    assert!(threads.is_aligned(1, 10, 1, 13));
    assert!(threads.is_aligned(1, 11, 1, 12));
}

#[test]
fn forward_and_reverse_copies_of_one_pinch() {
    let mut threads = two_threads();
    let mut pinches = PinchList::new(vec![
        Pinch::new(1, 10, 2, 20, 5, false),
        Pinch::new(1, 10, 2, 20, 5, true),
    ]);
    let stats = anneal(&mut threads, &mut pinches).unwrap();
    assert_eq!(stats.pinches, 2);
    for i in 0..5 {
        assert!(threads.is_aligned(1, 10 + i, 2, 20 + i));
        assert!(threads.is_aligned(1, 10 + i, 2, 24 - i));
    }
}

// ── bounds ───────────────────────────────────────────────────────────────────

#[test]
fn pinches_must_stay_inside_threads() {
    let threads = two_threads();
    assert!(check_pinch(&threads, &Pinch::new(1, 1, 2, 1, 48, true)).is_ok());
    // First base.
    assert!(check_pinch(&threads, &Pinch::new(1, 0, 2, 20, 5, true)).is_err());
    // Reaches the last base.
    assert!(check_pinch(&threads, &Pinch::new(1, 45, 2, 20, 5, true)).is_err());
    assert!(check_pinch(&threads, &Pinch::new(1, 10, 2, 20, 0, true)).is_err());
    assert!(check_pinch(&threads, &Pinch::new(1, 10, 3, 20, 5, true)).is_err());
    let err = check_pinch(&threads, &Pinch::new(1, 10, 2, 20, i64::MAX, true)).unwrap_err();
    assert!(err.to_string().contains("overflows"));

    let mut threads = two_threads();
    let mut pinches = PinchList::new(vec![Pinch::new(2, 195, 1, 10, 5, false)]);
    assert!(anneal(&mut threads, &mut pinches).is_err());
}

#[test]
fn thread_ends_get_their_own_segments() {
    let mut threads = PinchThreadSet::new();
    threads.add_thread(7, 100, 2).unwrap();
    threads.add_thread(8, 0, 10).unwrap();
    ensure_ends_are_distinct(&mut threads).unwrap();
    assert_eq!(threads.segment_count(7), 2);
    assert_eq!(threads.segment_count(8), 3);

    let mut short = PinchThreadSet::new();
    short.add_thread(9, 0, 1).unwrap();
    let err = anneal(&mut short, &mut PinchList::default()).unwrap_err();
    assert!(err.to_string().contains("too short"));
}

#[test]
fn recorded_end_splits() {
    let mut threads = RecordingThreads::new(&[(1, 0, 50, 1), (2, 0, 200, 1)]);
    anneal(&mut threads, &mut PinchList::default()).unwrap();
    assert_eq!(threads.splits, vec![(1, 0), (1, 48), (2, 0), (2, 198)]);
}
