//! Dense-extent voxel map implementing [`OccupancyMap`]
//!
//! Occupied and unknown voxels are stored sparsely; everything else inside the
//! extent is free. Nearest-obstacle queries are answered by a linear scan over
//! the occupied voxel centres, which is adequate for test scenes and demos.

use std::collections::HashSet;

use crate::common::{GridKey, Occupancy, OccupancyMap, PlanningError, PlanningResult, WorldPoint};

#[derive(Debug, Clone)]
pub struct VoxelMap {
    origin: WorldPoint,
    resolution: f64,
    size: [i32; 3],
    occupied: HashSet<GridKey>,
    unknown: HashSet<GridKey>,
    obstacle_centers: Vec<WorldPoint>,
}

impl VoxelMap {
    /// Create an empty (all free) map of `size` voxels whose minimum corner is `origin`
    pub fn new(origin: WorldPoint, resolution: f64, size: [i32; 3]) -> PlanningResult<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(PlanningError::InvalidParameter(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        if size.iter().any(|n| *n <= 0) {
            return Err(PlanningError::InvalidParameter(format!(
                "map size must be positive on every axis, got {:?}",
                size
            )));
        }

        Ok(VoxelMap {
            origin,
            resolution,
            size,
            occupied: HashSet::new(),
            unknown: HashSet::new(),
            obstacle_centers: Vec::new(),
        })
    }

    /// Unit-resolution map with its origin at the world origin
    pub fn with_size(nx: i32, ny: i32, nz: i32) -> PlanningResult<Self> {
        Self::new(WorldPoint::origin(), 1.0, [nx, ny, nz])
    }

    pub fn size(&self) -> [i32; 3] {
        self.size
    }

    pub fn in_extent(&self, key: &GridKey) -> bool {
        key.x >= 0
            && key.y >= 0
            && key.z >= 0
            && key.x < self.size[0]
            && key.y < self.size[1]
            && key.z < self.size[2]
    }

    /// Mark a voxel occupied. Keys outside the extent are ignored.
    pub fn set_occupied(&mut self, key: GridKey) {
        if !self.in_extent(&key) {
            return;
        }
        self.unknown.remove(&key);
        if self.occupied.insert(key) {
            self.obstacle_centers.push(self.key_to_world(&key));
        }
    }

    pub fn set_unknown(&mut self, key: GridKey) {
        if !self.in_extent(&key) {
            return;
        }
        self.clear(&key);
        self.unknown.insert(key);
    }

    pub fn set_free(&mut self, key: GridKey) {
        self.clear(&key);
        self.unknown.remove(&key);
    }

    /// Fill the inclusive key box `[min, max]` with obstacles
    pub fn add_box(&mut self, min: GridKey, max: GridKey) {
        for x in min.x.min(max.x)..=min.x.max(max.x) {
            for y in min.y.min(max.y)..=min.y.max(max.y) {
                for z in min.z.min(max.z)..=min.z.max(max.z) {
                    self.set_occupied(GridKey::new(x, y, z));
                }
            }
        }
    }

    pub fn occupied_keys(&self) -> impl Iterator<Item = &GridKey> {
        self.occupied.iter()
    }

    pub fn obstacle_count(&self) -> usize {
        self.occupied.len()
    }

    fn clear(&mut self, key: &GridKey) {
        if self.occupied.remove(key) {
            let center = self.key_to_world(key);
            self.obstacle_centers.retain(|c| *c != center);
        }
    }
}

impl OccupancyMap for VoxelMap {
    fn world_to_key(&self, point: &WorldPoint) -> GridKey {
        let rel = (point.coords - self.origin.coords) / self.resolution;
        GridKey::new(
            rel.x.floor() as i32,
            rel.y.floor() as i32,
            rel.z.floor() as i32,
        )
    }

    fn key_to_world(&self, key: &GridKey) -> WorldPoint {
        WorldPoint::new(
            self.origin.x + (key.x as f64 + 0.5) * self.resolution,
            self.origin.y + (key.y as f64 + 0.5) * self.resolution,
            self.origin.z + (key.z as f64 + 0.5) * self.resolution,
        )
    }

    fn occupancy(&self, key: &GridKey) -> Occupancy {
        if !self.in_extent(key) {
            Occupancy::OutOfBounds
        } else if self.occupied.contains(key) {
            Occupancy::Occupied
        } else if self.unknown.contains(key) {
            Occupancy::Unknown
        } else {
            Occupancy::Free
        }
    }

    fn nearest_obstacle_distance(&self, point: &WorldPoint) -> f64 {
        self.obstacle_centers
            .iter()
            .map(|c| nalgebra::distance(c, point))
            .fold(f64::INFINITY, f64::min)
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn key_extent(&self) -> Option<(GridKey, GridKey)> {
        Some((
            GridKey::new(0, 0, 0),
            GridKey::new(self.size[0] - 1, self.size[1] - 1, self.size[2] - 1),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_key_world_conversion() {
        let map = VoxelMap::new(WorldPoint::new(-1.0, 0.0, 2.0), 0.5, [10, 10, 10]).unwrap();
        let key = map.world_to_key(&WorldPoint::new(-0.1, 1.2, 2.7));
        assert_eq!(key, GridKey::new(1, 2, 1));
        let center = map.key_to_world(&key);
        assert_relative_eq!(center.x, -0.25);
        assert_relative_eq!(center.y, 1.25);
        assert_relative_eq!(center.z, 2.75);
        assert_eq!(map.world_to_key(&center), key);
    }

    #[test]
    fn test_occupancy_states() {
        let mut map = VoxelMap::with_size(5, 5, 5).unwrap();
        map.set_occupied(GridKey::new(1, 1, 1));
        map.set_unknown(GridKey::new(2, 2, 2));
        assert_eq!(map.occupancy(&GridKey::new(1, 1, 1)), Occupancy::Occupied);
        assert_eq!(map.occupancy(&GridKey::new(2, 2, 2)), Occupancy::Unknown);
        assert_eq!(map.occupancy(&GridKey::new(3, 3, 3)), Occupancy::Free);
        assert_eq!(map.occupancy(&GridKey::new(5, 0, 0)), Occupancy::OutOfBounds);
        assert_eq!(map.occupancy(&GridKey::new(0, -1, 0)), Occupancy::OutOfBounds);

        map.set_free(GridKey::new(1, 1, 1));
        assert_eq!(map.occupancy(&GridKey::new(1, 1, 1)), Occupancy::Free);
        assert_eq!(map.obstacle_count(), 0);
    }

    #[test]
    fn test_nearest_obstacle_distance() {
        let mut map = VoxelMap::with_size(10, 10, 10).unwrap();
        let probe = map.key_to_world(&GridKey::new(0, 0, 0));
        assert!(map.nearest_obstacle_distance(&probe).is_infinite());

        map.set_occupied(GridKey::new(3, 0, 0));
        map.set_occupied(GridKey::new(0, 4, 0));
        assert_relative_eq!(map.nearest_obstacle_distance(&probe), 3.0);
    }

    #[test]
    fn test_add_box_and_invalid_resolution() {
        let mut map = VoxelMap::with_size(4, 4, 4).unwrap();
        map.add_box(GridKey::new(1, 1, 0), GridKey::new(2, 2, 3));
        assert_eq!(map.obstacle_count(), 16);
        assert!(VoxelMap::new(WorldPoint::origin(), 0.0, [1, 1, 1]).is_err());
        assert!(VoxelMap::new(WorldPoint::origin(), 1.0, [1, 0, 1]).is_err());
    }
}
