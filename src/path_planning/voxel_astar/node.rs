use std::hash::{Hash, Hasher};

use crate::common::{GridKey, WorldPoint};

/// Search-frontier record
///
/// Identity (equality and hashing) is the key only; cost fields are payload.
/// `parent_key` is a lookup key into the closed set, not an owning link.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub key: GridKey,
    /// Cached world position of `key`
    pub pose: WorldPoint,
    pub parent_key: Option<GridKey>,
    /// Accumulated path cost from the start
    pub g_cost: f64,
    /// Heuristic estimate to the goal
    pub h_cost: f64,
    /// `g_cost + h_cost`
    pub f_cost: f64,
    /// Obstacle-proximity penalty of this node
    pub obs_cost: f64,
    /// Number of predecessor hops from the start
    pub depth: usize,
}

impl Node {
    pub fn new(key: GridKey, pose: WorldPoint) -> Self {
        Node {
            key,
            pose,
            parent_key: None,
            g_cost: 0.0,
            h_cost: 0.0,
            f_cost: 0.0,
            obs_cost: 0.0,
            depth: 0,
        }
    }

    pub fn with_costs(mut self, g_cost: f64, h_cost: f64) -> Self {
        self.g_cost = g_cost;
        self.h_cost = h_cost;
        self.f_cost = g_cost + h_cost;
        self
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
