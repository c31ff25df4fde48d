use crate::pinch::Pinch;
use crate::types::ThreadName;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadBounds {
    pub start: i64,
    pub length: i64,
}

impl ThreadBounds {
    /// One past the last base.
    pub fn end(&self) -> i64 {
        self.start + self.length
    }

    pub fn contains(&self, position: i64) -> bool {
        position >= self.start && position < self.end()
    }
}

/// A maximal run of one thread whose bases share an adjacency-component label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelInterval {
    pub thread: ThreadName,
    pub start: i64,
    pub length: i64,
    pub label: u64,
}

impl LabelInterval {
    pub fn end(&self) -> i64 {
        self.start + self.length
    }

    pub fn contains(&self, position: i64) -> bool {
        position >= self.start && position < self.end()
    }
}

/// A set of threads that pinches glue together into blocks.
pub trait ThreadSet {
    fn thread_names(&self) -> Vec<ThreadName>;
    fn thread_bounds(&self, name: ThreadName) -> Option<ThreadBounds>;
    /// Make `position` the last base of its segment. Positions outside the
    /// thread, or already at a boundary, are left alone.
    fn split(&mut self, name: ThreadName, position: i64) -> Result<()>;
    /// Align the two intervals of `pinch` base for base.
    fn pinch(&mut self, pinch: &Pinch) -> Result<()>;
    /// Merge neighbouring segments whose boundary separates nothing.
    fn join_trivial_boundaries(&mut self);
    /// Label intervals of every thread, ordered by thread then position.
    fn label_intervals(&self) -> Vec<LabelInterval>;
}
