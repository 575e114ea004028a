//! Per-call view of the map used by the search and the path passes

use std::cell::RefCell;
use std::collections::HashMap;

use super::pruning::PruningTables;
use crate::common::{Connectivity, GridBounds, GridKey, Occupancy, OccupancyMap, WorldPoint};

/// Bounds of a planning call: the map extent united with `keys`, or the
/// bounding box of `keys` grown by `margin` when the map is unbounded
pub fn grid_bounds<M>(map: &M, keys: &[GridKey], margin: i32) -> Option<GridBounds>
where
    M: OccupancyMap + ?Sized,
{
    match map.key_extent() {
        Some((min, max)) => Some(
            keys.iter()
                .fold(GridBounds::new(min, max), |b, k| b.including(k)),
        ),
        None => GridBounds::enclosing(keys.iter()).map(|b| b.grown(margin)),
    }
}

/// Key window around `keys[start_index..=end_index]`
///
/// The bounding box of the segment grown by `xy_reserve` voxels horizontally
/// and `z_reserve` voxels vertically. `None` for an empty or inverted segment.
pub fn map_limits(
    keys: &[GridKey],
    start_index: usize,
    end_index: usize,
    xy_reserve: i32,
    z_reserve: i32,
) -> Option<GridBounds> {
    let end_index = end_index.min(keys.len().checked_sub(1)?);
    let segment = keys.get(start_index..=end_index)?;
    GridBounds::enclosing(segment.iter()).map(|b| b.expanded(xy_reserve, z_reserve))
}

/// Map, bounds and move tables bundled for one planning call
///
/// Clearance lookups are memoised for the lifetime of the view; the map must
/// not change while the view exists.
pub struct SearchSpace<'a, M: OccupancyMap + ?Sized> {
    map: &'a M,
    tables: &'a PruningTables,
    bounds: GridBounds,
    unknown_is_traversable: bool,
    clearance_cache: RefCell<HashMap<GridKey, f64>>,
}

impl<'a, M: OccupancyMap + ?Sized> SearchSpace<'a, M> {
    pub fn new(
        map: &'a M,
        tables: &'a PruningTables,
        bounds: GridBounds,
        unknown_is_traversable: bool,
    ) -> Self {
        SearchSpace {
            map,
            tables,
            bounds,
            unknown_is_traversable,
            clearance_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn map(&self) -> &M {
        self.map
    }

    pub fn tables(&self) -> &PruningTables {
        self.tables
    }

    pub fn bounds(&self) -> &GridBounds {
        &self.bounds
    }

    pub fn connectivity(&self) -> Connectivity {
        self.tables.connectivity()
    }

    pub fn world(&self, key: &GridKey) -> WorldPoint {
        self.map.key_to_world(key)
    }

    pub fn key(&self, point: &WorldPoint) -> GridKey {
        self.map.world_to_key(point)
    }

    pub fn occupancy(&self, key: &GridKey) -> Occupancy {
        if !self.bounds.contains(key) {
            return Occupancy::OutOfBounds;
        }
        self.map.occupancy(key)
    }

    pub fn is_traversable(&self, key: &GridKey) -> bool {
        match self.occupancy(key) {
            Occupancy::Free => true,
            Occupancy::Unknown => self.unknown_is_traversable,
            Occupancy::Occupied | Occupancy::OutOfBounds => false,
        }
    }

    /// Distance from the voxel centre to the nearest obstacle [m]
    pub fn clearance(&self, key: &GridKey) -> f64 {
        if let Some(d) = self.clearance_cache.borrow().get(key) {
            return *d;
        }
        let d = self.map.nearest_obstacle_distance(&self.world(key));
        self.clearance_cache.borrow_mut().insert(*key, d);
        d
    }

    pub fn is_adjacent(&self, a: &GridKey, b: &GridKey) -> bool {
        a.is_adjacent(b, self.connectivity())
    }

    /// Whether a single step `from -> to` is a legal move in the active mode
    pub fn is_step_legal(&self, from: &GridKey, to: &GridKey) -> bool {
        self.is_adjacent(from, to)
            && self.is_traversable(to)
            && self
                .tables
                .is_move_legal(from, from.delta(to), |k| self.is_traversable(k))
    }

    /// Validity of a whole key path: every key traversable, every step legal
    pub fn is_path_valid(&self, path: &[GridKey]) -> bool {
        path.iter().all(|k| self.is_traversable(k))
            && path.windows(2).all(|w| self.is_step_legal(&w[0], &w[1]))
    }

    /// Whether every consecutive pair is adjacent in the active mode
    pub fn is_connected(&self, path: &[GridKey]) -> bool {
        path.windows(2).all(|w| self.is_adjacent(&w[0], &w[1]))
    }

    /// Smallest clearance along a path
    pub fn min_clearance(&self, path: &[GridKey]) -> f64 {
        path.iter()
            .map(|k| self.clearance(k))
            .fold(f64::INFINITY, f64::min)
    }
}
