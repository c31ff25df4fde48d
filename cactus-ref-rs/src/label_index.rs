//! Position lookup over the label intervals of a thread set.

use crate::thread_set::LabelInterval;
use crate::types::{HashMap, HashMapExt, ThreadName};
use anyhow::{anyhow, Result};
use coitrees::{BasicCOITree, Interval, IntervalTree};

#[derive(Debug, Clone, Default)]
struct LabelData {
    start: i64,
    length: i64,
    label: u64,
}

/// Label intervals keyed by thread. Coordinates are stored as `i32` for
/// `coitrees`, so threads must lie within `i32` range to be indexed.
pub struct LabelIndex {
    trees: HashMap<ThreadName, BasicCOITree<LabelData, u32>>,
}

fn coordinate(thread: ThreadName, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        anyhow!(
            "thread {} coordinate {} is outside the i32 range of the label index",
            thread,
            value
        )
    })
}

impl LabelIndex {
    pub fn build(intervals: &[LabelInterval]) -> Result<Self> {
        let mut by_thread: HashMap<ThreadName, Vec<Interval<LabelData>>> = HashMap::new();
        for interval in intervals {
            if interval.length <= 0 {
                continue;
            }
            // COITree intervals are end-inclusive.
            let first = coordinate(interval.thread, interval.start)?;
            let last = coordinate(interval.thread, interval.end() - 1)?;
            let data = LabelData {
                start: interval.start,
                length: interval.length,
                label: interval.label,
            };
            by_thread
                .entry(interval.thread)
                .or_default()
                .push(Interval::new(first, last, data));
        }
        let trees = by_thread
            .into_iter()
            .map(|(thread, intervals)| (thread, BasicCOITree::new(&intervals)))
            .collect();
        Ok(Self { trees })
    }

    /// The label interval of `thread` covering `position`.
    pub fn interval_at(&self, thread: ThreadName, position: i64) -> Option<LabelInterval> {
        let tree = self.trees.get(&thread)?;
        let position = i32::try_from(position).ok()?;
        let mut found = None;
        tree.query(position, position, |node| {
            if found.is_some() {
                return;
            }
            let data = &node.metadata;
            found = Some(LabelInterval {
                thread,
                start: data.start,
                length: data.length,
                label: data.label,
            });
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_covering_interval() {
        let intervals = vec![
            LabelInterval { thread: 1, start: 0, length: 13, label: 1 },
            LabelInterval { thread: 1, start: 13, length: 37, label: 2 },
            LabelInterval { thread: 2, start: 5, length: 10, label: 1 },
        ];
        let index = LabelIndex::build(&intervals).unwrap();
        assert_eq!(index.interval_at(1, 12), Some(intervals[0]));
        assert_eq!(index.interval_at(1, 13), Some(intervals[1]));
        assert_eq!(index.interval_at(2, 4), None);
        assert_eq!(index.interval_at(3, 0), None);
    }

    #[test]
    fn coordinates_past_i32_are_rejected() {
        let intervals = vec![LabelInterval { thread: 4, start: 3_000_000_000, length: 10, label: 1 }];
        let err = LabelIndex::build(&intervals).err().unwrap();
        assert!(err.to_string().contains("i32 range"));
    }
}
