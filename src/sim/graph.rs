//! Connection graph
//!
//! Undirected adjacency over body ids. Every edge is stored in both
//! directions; there is no per-edge removal, only a full clear at round end.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::body::BodyId;

#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    adjacency: BTreeMap<BodyId, BTreeSet<BodyId>>,
    edge_count: usize,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `b` is in `a`'s connection set (and therefore `a` in `b`'s)
    pub fn are_connected(&self, a: BodyId, b: BodyId) -> bool {
        self.adjacency.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Record a connection. Returns false (and changes nothing) if the pair
    /// is already connected or `a == b`.
    pub fn connect(&mut self, a: BodyId, b: BodyId) -> bool {
        if a == b || self.are_connected(a, b) {
            return false;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        self.edge_count += 1;
        true
    }

    /// Bodies directly connected to `id`
    pub fn neighbors(&self, id: BodyId) -> impl Iterator<Item = BodyId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    /// Every body reachable from `id` through connections, `id` included
    pub fn component(&self, id: BodyId) -> BTreeSet<BodyId> {
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Number of connected pairs
    pub fn len(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    pub fn clear(&mut self) {
        self.adjacency.clear();
        self.edge_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_connect_is_symmetric_and_idempotent() {
        let mut graph = ConnectionGraph::new();
        assert!(graph.connect(BodyId(1), BodyId(2)));
        assert!(graph.are_connected(BodyId(2), BodyId(1)));
        assert!(!graph.connect(BodyId(2), BodyId(1)));
        assert!(!graph.connect(BodyId(1), BodyId(2)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_self_connection_ignored() {
        let mut graph = ConnectionGraph::new();
        assert!(!graph.connect(BodyId(3), BodyId(3)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_component_walks_chain() {
        let mut graph = ConnectionGraph::new();
        graph.connect(BodyId(1), BodyId(2));
        graph.connect(BodyId(2), BodyId(3));
        graph.connect(BodyId(5), BodyId(6));
        let component = graph.component(BodyId(3));
        assert_eq!(component, BTreeSet::from([BodyId(1), BodyId(2), BodyId(3)]));
        assert_eq!(graph.component(BodyId(9)), BTreeSet::from([BodyId(9)]));
    }

    #[test]
    fn test_clear() {
        let mut graph = ConnectionGraph::new();
        graph.connect(BodyId(1), BodyId(2));
        graph.clear();
        assert!(!graph.are_connected(BodyId(1), BodyId(2)));
        assert_eq!(graph.len(), 0);
    }

    proptest! {
        #[test]
        fn prop_membership_symmetric(pairs in prop::collection::vec((0u32..12, 0u32..12), 0..40)) {
            let mut graph = ConnectionGraph::new();
            for (a, b) in &pairs {
                graph.connect(BodyId(*a), BodyId(*b));
            }
            for a in 0..12 {
                for b in 0..12 {
                    prop_assert_eq!(
                        graph.are_connected(BodyId(a), BodyId(b)),
                        graph.are_connected(BodyId(b), BodyId(a))
                    );
                }
            }
            let distinct: BTreeSet<(u32, u32)> = pairs
                .iter()
                .filter(|(a, b)| a != b)
                .map(|&(a, b)| (a.min(b), a.max(b)))
                .collect();
            prop_assert_eq!(graph.len(), distinct.len());
        }
    }
}
