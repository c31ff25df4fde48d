/// Names are shared between a flower and its nested flowers: an end, cap or
/// event keeps its name when it is copied into a child level.
pub type Name = i64;
/// Threads in a pinch thread set are identified by the sequence name.
pub type ThreadName = Name;
/// Dense node id of the integer graph built for one flower.
pub type NodeId = u32;

macro_rules! arena_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                pub(crate) fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id!(FlowerId, GroupId, EndId, BlockId, ChainId, SegmentId, CapId);

// Fast hash maps / sets using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::{HashMap, HashSet}`.
// Also import `HashMapExt` / `HashSetExt` when you need `::new()` or `::with_capacity()`.
pub(crate) type HashMap<K, V> = ahash::HashMap<K, V>;
pub(crate) type HashSet<K> = ahash::HashSet<K>;
pub(crate) use ahash::HashMapExt;
pub(crate) use ahash::HashSetExt;
