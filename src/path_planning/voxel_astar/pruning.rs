//! Precomputed move tables for the voxel search
//!
//! The 3x3x3 move cube is enumerated once. Every diagonal move carries the
//! list of orthogonal cells it would cut across; the move is only legal when
//! all of them are free, which keeps paths from slicing through obstacle
//! corners and edges.

use itertools::iproduct;

use crate::common::{Connectivity, GridKey};

/// A single entry of the move cube
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub offset: [i32; 3],
    /// Euclidean length in voxels (1, sqrt 2 or sqrt 3)
    pub cost: f64,
    /// Offsets (relative to the origin of the move) that must be free
    pub conditions: Vec<[i32; 3]>,
}

impl Move {
    /// Number of axes the move changes
    pub fn dimension(&self) -> usize {
        self.offset.iter().filter(|d| **d != 0).count()
    }
}

/// Read-only tables built once per connectivity mode
#[derive(Debug, Clone)]
pub struct PruningTables {
    connectivity: Connectivity,
    cube: Vec<Move>,
    /// Indices into `cube` of the moves expanded in the active mode
    active: Vec<usize>,
    idxs_1d: Vec<usize>,
    idxs_2d: Vec<usize>,
    idxs_3d: Vec<usize>,
}

impl PruningTables {
    pub fn new(connectivity: Connectivity) -> Self {
        let cube = Self::cube_for_moves();

        let by_dim = |dim: usize| -> Vec<usize> {
            cube.iter()
                .enumerate()
                .filter(|(_, m)| m.dimension() == dim)
                .map(|(i, _)| i)
                .collect()
        };
        let idxs_1d = by_dim(1);
        let idxs_2d = by_dim(2);
        let idxs_3d = by_dim(3);

        let active = match connectivity {
            Connectivity::Six => idxs_1d.clone(),
            Connectivity::TwentySix => (0..cube.len()).collect(),
        };

        PruningTables {
            connectivity,
            cube,
            active,
            idxs_1d,
            idxs_2d,
            idxs_3d,
        }
    }

    fn cube_for_moves() -> Vec<Move> {
        iproduct!(-1..=1, -1..=1, -1..=1)
            .filter(|&(dx, dy, dz)| (dx, dy, dz) != (0, 0, 0))
            .map(|(dx, dy, dz)| {
                let offset = [dx, dy, dz];
                let dims = offset.iter().filter(|d| **d != 0).count();
                Move {
                    offset,
                    cost: (dims as f64).sqrt(),
                    conditions: Self::obstacle_conditions(offset),
                }
            })
            .collect()
    }

    /// Every proper, non-empty axis projection of a diagonal offset
    fn obstacle_conditions(offset: [i32; 3]) -> Vec<[i32; 3]> {
        let axes: Vec<usize> = (0..3).filter(|&a| offset[a] != 0).collect();
        let full = (1usize << axes.len()) - 1;
        (1..full)
            .map(|mask| {
                let mut cell = [0; 3];
                for (bit, axis) in axes.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        cell[*axis] = offset[*axis];
                    }
                }
                cell
            })
            .collect()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Moves expanded in the active connectivity mode
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.active.iter().map(move |&i| &self.cube[i])
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn face_moves(&self) -> impl Iterator<Item = &Move> {
        self.idxs_1d.iter().map(move |&i| &self.cube[i])
    }

    pub fn edge_moves(&self) -> impl Iterator<Item = &Move> {
        self.idxs_2d.iter().map(move |&i| &self.cube[i])
    }

    pub fn corner_moves(&self) -> impl Iterator<Item = &Move> {
        self.idxs_3d.iter().map(move |&i| &self.cube[i])
    }

    /// Move of the cube with the given offset, regardless of the active mode
    pub fn lookup(&self, offset: [i32; 3]) -> Option<&Move> {
        if offset.iter().any(|d| d.abs() > 1) || offset == [0, 0, 0] {
            return None;
        }
        let index = ((offset[0] + 1) * 9 + (offset[1] + 1) * 3 + (offset[2] + 1)) as usize;
        // (0, 0, 0) is skipped by the enumeration
        let index = if index > 13 { index - 1 } else { index };
        self.cube.get(index)
    }

    /// Whether stepping from `from` by `offset` keeps clear of blocked cut-across cells
    pub fn is_move_legal<F>(&self, from: &GridKey, offset: [i32; 3], is_free: F) -> bool
    where
        F: Fn(&GridKey) -> bool,
    {
        match self.lookup(offset) {
            Some(m) => m.conditions.iter().all(|c| is_free(&from.offset_by(*c))),
            None => false,
        }
    }
}
