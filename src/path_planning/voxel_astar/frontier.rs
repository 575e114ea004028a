//! Open list of the voxel A* search
//!
//! A binary min-heap with a key index, so that an entry can be evicted when a
//! cheaper node for the same key shows up (decrease-key by remove + insert).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;

use super::config::FrontierOrdering;
use super::node::Node;
use crate::common::{GridKey, WorldPoint};

/// Result of [`Frontier::conditional_remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Stored entry was worse than the candidate and has been removed
    Removed,
    /// Stored entry is at least as good as the candidate and was kept
    Kept,
    /// No entry for the key
    Absent,
}

#[derive(Debug)]
struct Entry {
    priority: OrderedFloat<f64>,
    seq: u64,
    node: Node,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, older entries first on ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct Frontier {
    heap: BinaryHeap<Entry>,
    /// key -> stored g cost
    index: HashMap<GridKey, f64>,
    ordering: FrontierOrdering,
    seq: u64,
}

impl Frontier {
    pub fn new(ordering: FrontierOrdering) -> Self {
        Frontier {
            heap: BinaryHeap::new(),
            index: HashMap::new(),
            ordering,
            seq: 0,
        }
    }

    fn priority_of(&self, node: &Node) -> f64 {
        match self.ordering {
            FrontierOrdering::AccumulatedCost => node.g_cost,
            FrontierOrdering::EstimatedTotal => node.f_cost,
        }
    }

    /// Insert a node. An existing entry with the same key is evicted first.
    pub fn push(&mut self, node: Node) {
        if self.index.contains_key(&node.key) {
            self.evict(&node.key);
        }
        let priority = OrderedFloat(self.priority_of(&node));
        self.index.insert(node.key, node.g_cost);
        self.heap.push(Entry {
            priority,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    /// Remove and return the node with the lowest priority
    pub fn pop(&mut self) -> Option<Node> {
        let entry = self.heap.pop()?;
        self.index.remove(&entry.node.key);
        Some(entry.node)
    }

    /// Remove the entry for `key` only if its stored cost is strictly worse than `cost`
    pub fn conditional_remove(&mut self, key: &GridKey, cost: f64) -> RemoveOutcome {
        match self.index.get(key) {
            Some(stored) if *stored > cost => {
                self.evict(key);
                RemoveOutcome::Removed
            }
            Some(_) => RemoveOutcome::Kept,
            None => RemoveOutcome::Absent,
        }
    }

    fn evict(&mut self, key: &GridKey) {
        self.heap.retain(|e| e.node.key != *key);
        self.index.remove(key);
    }

    pub fn contains(&self, key: &GridKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// World poses of every queued node, in no particular order
    pub fn poses(&self) -> Vec<WorldPoint> {
        self.heap.iter().map(|e| e.node.pose).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: i32, g: f64) -> Node {
        Node::new(GridKey::new(x, 0, 0), WorldPoint::new(x as f64, 0.0, 0.0)).with_costs(g, 0.0)
    }

    #[test]
    fn test_conditional_remove() {
        let mut frontier = Frontier::new(FrontierOrdering::AccumulatedCost);
        let key = GridKey::new(1, 0, 0);

        frontier.push(node(1, 10.0));
        assert_eq!(frontier.conditional_remove(&key, 5.0), RemoveOutcome::Removed);
        assert!(frontier.is_empty());

        frontier.push(node(1, 10.0));
        assert_eq!(frontier.conditional_remove(&key, 20.0), RemoveOutcome::Kept);
        assert_eq!(frontier.conditional_remove(&key, 10.0), RemoveOutcome::Kept);
        assert_eq!(frontier.len(), 1);

        let absent = GridKey::new(7, 7, 7);
        assert_eq!(frontier.conditional_remove(&absent, 1.0), RemoveOutcome::Absent);
    }

    #[test]
    fn test_pops_in_cost_order() {
        let mut frontier = Frontier::new(FrontierOrdering::AccumulatedCost);
        for (x, g) in [(0, 3.0), (1, 1.0), (2, 2.5), (3, 0.5), (4, 2.5)].iter() {
            frontier.push(node(*x, *g));
        }
        let mut last = f64::NEG_INFINITY;
        let mut popped = Vec::new();
        while let Some(n) = frontier.pop() {
            assert!(n.g_cost >= last);
            last = n.g_cost;
            popped.push(n.key.x);
        }
        // equal costs leave in insertion order
        assert_eq!(popped, vec![3, 1, 2, 4, 0]);
    }

    #[test]
    fn test_estimated_total_ordering() {
        let mut frontier = Frontier::new(FrontierOrdering::EstimatedTotal);
        let near = Node::new(GridKey::new(0, 0, 0), WorldPoint::origin()).with_costs(5.0, 1.0);
        let far = Node::new(GridKey::new(1, 0, 0), WorldPoint::origin()).with_costs(1.0, 9.0);
        frontier.push(far);
        frontier.push(near);
        assert_eq!(frontier.pop().map(|n| n.key), Some(GridKey::new(0, 0, 0)));
    }

    #[test]
    fn test_push_replaces_existing_key() {
        let mut frontier = Frontier::new(FrontierOrdering::AccumulatedCost);
        frontier.push(node(1, 4.0));
        frontier.push(node(1, 2.0));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.pop().map(|n| n.g_cost), Some(2.0));
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_snapshot_is_non_destructive() {
        let mut frontier = Frontier::new(FrontierOrdering::AccumulatedCost);
        frontier.push(node(1, 1.0));
        frontier.push(node(2, 2.0));
        let mut xs: Vec<f64> = frontier.poses().iter().map(|p| p.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![1.0, 2.0]);
        assert_eq!(frontier.len(), 2);
        assert!(frontier.contains(&GridKey::new(2, 0, 0)));
    }
}
