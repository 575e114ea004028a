//! Common types used throughout voxel_planner

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Continuous world coordinates [m]
pub type WorldPoint = Point3<f64>;

/// Discrete voxel coordinate in the occupancy map lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridKey {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn offset_by(&self, delta: [i32; 3]) -> Self {
        self.offset(delta[0], delta[1], delta[2])
    }

    /// Per-axis difference `other - self`
    pub fn delta(&self, other: &GridKey) -> [i32; 3] {
        [other.x - self.x, other.y - self.y, other.z - self.z]
    }

    pub fn manhattan(&self, other: &GridKey) -> i32 {
        self.delta(other).iter().map(|d| d.abs()).sum()
    }

    pub fn chebyshev(&self, other: &GridKey) -> i32 {
        self.delta(other).iter().map(|d| d.abs()).max().unwrap_or(0)
    }

    pub fn euclidean(&self, other: &GridKey) -> f64 {
        let d = self.delta(other);
        ((d[0] * d[0] + d[1] * d[1] + d[2] * d[2]) as f64).sqrt()
    }

    /// Number of axes on which the two keys differ
    pub fn differing_coords(&self, other: &GridKey) -> usize {
        self.delta(other).iter().filter(|d| **d != 0).count()
    }

    /// Whether `other` is a direct neighbour under the given connectivity
    pub fn is_adjacent(&self, other: &GridKey, connectivity: Connectivity) -> bool {
        match connectivity {
            Connectivity::Six => self.manhattan(other) == 1,
            Connectivity::TwentySix => self.chebyshev(other) == 1,
        }
    }
}

impl From<(i32, i32, i32)> for GridKey {
    fn from(t: (i32, i32, i32)) -> Self {
        Self::new(t.0, t.1, t.2)
    }
}

impl From<[i32; 3]> for GridKey {
    fn from(a: [i32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

/// Neighbour expansion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Face neighbours only
    Six,
    /// Face, edge and corner neighbours
    #[default]
    TwentySix,
}

/// Occupancy state reported by a map for a single voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupancy {
    Free,
    Occupied,
    Unknown,
    OutOfBounds,
}

/// Axis-aligned key region over which a search is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub min: GridKey,
    pub max: GridKey,
}

impl GridBounds {
    pub fn new(min: GridKey, max: GridKey) -> Self {
        Self {
            min: GridKey::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: GridKey::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }

    /// Smallest bounds containing every key
    pub fn enclosing<'a, I>(keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GridKey>,
    {
        let mut iter = keys.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, k| b.including(k)))
    }

    pub fn including(&self, key: &GridKey) -> Self {
        Self {
            min: GridKey::new(self.min.x.min(key.x), self.min.y.min(key.y), self.min.z.min(key.z)),
            max: GridKey::new(self.max.x.max(key.x), self.max.y.max(key.y), self.max.z.max(key.z)),
        }
    }

    pub fn grown(&self, margin: i32) -> Self {
        self.expanded(margin, margin)
    }

    /// Grown by `xy` voxels along x and y, `z` voxels along z
    pub fn expanded(&self, xy: i32, z: i32) -> Self {
        Self {
            min: self.min.offset(-xy, -xy, -z),
            max: self.max.offset(xy, xy, z),
        }
    }

    /// Overlap of two bounds, `None` when they are disjoint
    pub fn intersection(&self, other: &GridBounds) -> Option<Self> {
        let min = GridKey::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.min.z.max(other.min.z),
        );
        let max = GridKey::new(
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
            self.max.z.min(other.max.z),
        );
        if min.x > max.x || min.y > max.y || min.z > max.z {
            None
        } else {
            Some(Self { min, max })
        }
    }

    pub fn contains(&self, key: &GridKey) -> bool {
        key.x >= self.min.x
            && key.x <= self.max.x
            && key.y >= self.min.y
            && key.y <= self.max.y
            && key.z >= self.min.z
            && key.z <= self.max.z
    }

    /// Number of voxels along each axis
    pub fn counts(&self) -> [usize; 3] {
        [
            (self.max.x - self.min.x + 1) as usize,
            (self.max.y - self.min.y + 1) as usize,
            (self.max.z - self.min.z + 1) as usize,
        ]
    }

    pub fn clamp(&self, key: &GridKey) -> GridKey {
        GridKey::new(
            key.x.clamp(self.min.x, self.max.x),
            key.y.clamp(self.min.y, self.max.y),
            key.z.clamp(self.min.z, self.max.z),
        )
    }
}
