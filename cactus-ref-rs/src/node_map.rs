use crate::graph::{AlignmentGraph, GroupKind};
use crate::level::{EndRef, LevelView};
use crate::types::{HashMap, HashMapExt, NodeId};
use anyhow::{bail, ensure, Result};

/// Bijection between the ends of a level that take part in the reference
/// problem and dense integer node ids.
#[derive(Debug, Clone)]
pub struct NodeMap {
    ends: Vec<EndRef>,
    nodes: HashMap<EndRef, NodeId>,
}

impl NodeMap {
    /// Map every end of the level that lies in a tangle group and is an
    /// attached stub or a block end, plus every ungrouped (imported) end.
    pub fn build<G: AlignmentGraph>(view: &LevelView<'_, G>) -> Result<Self> {
        let mut ends = Vec::new();
        for end in view.ends() {
            match view.group(end) {
                Some(group) => match view.graph().group_kind(group) {
                    GroupKind::Tangle => {
                        if view.kind(end).is_attached_or_block() {
                            ends.push(end);
                        }
                    }
                    GroupKind::Link { .. } => {}
                },
                None => {
                    if !view.kind(end).is_attached_stub() {
                        bail!(
                            "ungrouped end {:?} of flower {:?} is not an attached stub",
                            end,
                            view.flower()
                        );
                    }
                    ends.push(end);
                }
            }
        }
        Self::from_ends(ends)
    }

    pub fn from_ends(ends: Vec<EndRef>) -> Result<Self> {
        ensure!(!ends.is_empty(), "no ends to build a reference over");
        ensure!(
            ends.len() % 2 == 0,
            "odd number of reference nodes ({})",
            ends.len()
        );
        let mut nodes = HashMap::with_capacity(ends.len());
        for (i, &end) in ends.iter().enumerate() {
            if nodes.insert(end, i as NodeId).is_some() {
                bail!("end {:?} mapped twice", end);
            }
        }
        Ok(Self { ends, nodes })
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    pub fn node(&self, end: EndRef) -> Option<NodeId> {
        self.nodes.get(&end).copied()
    }

    pub fn end(&self, node: NodeId) -> Option<EndRef> {
        self.ends.get(node as usize).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.ends.len()).map(|i| i as NodeId)
    }

    /// (node, end) pairs in node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, EndRef)> + '_ {
        self.ends
            .iter()
            .enumerate()
            .map(|(i, &end)| (i as NodeId, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EndId;

    #[test]
    fn rejects_odd_and_empty_end_sets() {
        assert!(NodeMap::from_ends(Vec::new()).is_err());
        let odd = vec![EndRef::Local(EndId(0)), EndRef::Local(EndId(1)), EndRef::Imported(0)];
        assert!(NodeMap::from_ends(odd).is_err());
    }

    #[test]
    fn nodes_follow_end_order() {
        let ends = vec![EndRef::Local(EndId(4)), EndRef::Imported(0)];
        let map = NodeMap::from_ends(ends).unwrap();
        assert_eq!(map.node(EndRef::Imported(0)), Some(1));
        assert_eq!(map.end(0), Some(EndRef::Local(EndId(4))));
        assert_eq!(map.end(2), None);
    }
}
