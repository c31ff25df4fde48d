//! cactus-ref-rs: reference construction and pinch annealing over cactus
//! alignment graphs.
//!
//! Two engines:
//!
//! - [`build_reference`] chooses, for one flower, a set of adjacencies that
//!   threads every block and attached stub into linear reference paths, and
//!   writes the reference caps, bridge blocks and group assignments into an
//!   [`AlignmentGraph`]. Chains are layered in heaviest first; each round is
//!   a perfect matching computed by a [`MatchingSolver`].
//! - [`anneal`] / [`anneal_same_components`] apply a stream of pinches to a
//!   [`ThreadSet`], optionally only between positions in the same adjacency
//!   component.
//!
//! # Library usage
//!
//! ```no_run
//! use cactus_ref_rs::{
//!     anneal, build_reference, GreedyCycleMatcher, MemoryGraph, PinchList,
//!     PinchThreadSet, ReferenceConfig,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut graph = MemoryGraph::new();
//! let flower = graph.add_flower(None);
//! // ... add groups, stubs, blocks, chains and threads ...
//! let summary = build_reference(&mut graph, flower, &ReferenceConfig::default(), &GreedyCycleMatcher)?;
//! println!("{} adjacencies", summary.adjacencies);
//!
//! let mut threads = PinchThreadSet::new();
//! threads.add_thread(1, 0, 100)?;
//! let mut pinches = PinchList::new(Vec::new());
//! anneal(&mut threads, &mut pinches)?;
//! # Ok(())
//! # }
//! ```

// Internal modules: not part of the public API.
pub(crate) mod edges;
pub(crate) mod label_index;
pub(crate) mod layered;
pub(crate) mod level;
pub(crate) mod materialize;
pub(crate) mod node_map;
pub(crate) mod types;

// Public modules: stable API surface.
pub mod anneal;
pub mod graph;
pub mod io;
pub mod matching;
pub mod pinch;
pub mod pinch_graph;
pub mod reference;
pub mod store;
pub mod thread_set;

// Flat re-exports for the most commonly used public types.
pub use anneal::{anneal, anneal_same_components, anneal_with_mode, AnnealMode, AnnealStats};
pub use edges::{Edge, WeightedEdge};
pub use graph::AlignmentGraph;
pub use matching::{GreedyCycleMatcher, MatchingProblem, MatchingSolver};
pub use pinch::{Pinch, PinchList, PinchReader, PinchSource};
pub use pinch_graph::PinchThreadSet;
pub use reference::{build_reference, plan_reference, ReferenceConfig, ReferenceSummary};
pub use store::MemoryGraph;
pub use thread_set::{LabelInterval, ThreadBounds, ThreadSet};
pub use types::{BlockId, CapId, ChainId, EndId, FlowerId, GroupId, Name, NodeId, SegmentId, ThreadName};

// Re-exports needed by integration tests in tests/.
#[doc(hidden)]
pub use edges::{adjacency_edges, arbitrary_stub_edges, chain_edges, collapse_adjacencies, stub_edges_from_parent};
#[doc(hidden)]
pub use label_index::LabelIndex;
#[doc(hidden)]
pub use layered::{LayeredMatching, RoundReport, DEFAULT_MAX_CHAINS_PER_ROUND};
#[doc(hidden)]
pub use level::{Changeset, EndRef, LevelView};
#[doc(hidden)]
pub use materialize::{add_link_adjacencies, add_tangle_adjacencies, assign_groups};
#[doc(hidden)]
pub use node_map::NodeMap;
