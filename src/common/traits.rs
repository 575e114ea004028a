//! Common traits defining the seams of the planner

use crate::common::error::PlanningResult;
use crate::common::types::*;

/// Trait for path planning algorithms
pub trait PathPlanner {
    /// Plan a path of world waypoints from start to goal
    fn plan(&mut self, start: WorldPoint, goal: WorldPoint) -> PlanningResult<Vec<WorldPoint>>;
}

/// Capability interface of a volumetric occupancy map
///
/// The planner only reads the map during a call; callers that update the map
/// concurrently must swap the handle between calls.
pub trait OccupancyMap {
    /// Key of the voxel containing `point`
    fn world_to_key(&self, point: &WorldPoint) -> GridKey;

    /// Centre of the voxel identified by `key`
    fn key_to_world(&self, key: &GridKey) -> WorldPoint;

    /// Occupancy state of a single voxel
    fn occupancy(&self, key: &GridKey) -> Occupancy;

    /// Distance from `point` to the nearest occupied voxel centre,
    /// `f64::INFINITY` when the map holds no obstacle
    fn nearest_obstacle_distance(&self, point: &WorldPoint) -> f64;

    /// Voxel edge length [m]
    fn resolution(&self) -> f64;

    /// Key bounding box of the mapped region, `None` when unbounded
    fn key_extent(&self) -> Option<(GridKey, GridKey)>;
}

impl<M: OccupancyMap + ?Sized> OccupancyMap for &M {
    fn world_to_key(&self, point: &WorldPoint) -> GridKey {
        (**self).world_to_key(point)
    }

    fn key_to_world(&self, key: &GridKey) -> WorldPoint {
        (**self).key_to_world(key)
    }

    fn occupancy(&self, key: &GridKey) -> Occupancy {
        (**self).occupancy(key)
    }

    fn nearest_obstacle_distance(&self, point: &WorldPoint) -> f64 {
        (**self).nearest_obstacle_distance(point)
    }

    fn resolution(&self) -> f64 {
        (**self).resolution()
    }

    fn key_extent(&self) -> Option<(GridKey, GridKey)> {
        (**self).key_extent()
    }
}

/// Penalty applied to a search node from its distance to the nearest obstacle
///
/// Implementations must be monotonically non-increasing in `distance` and
/// return 0 at or beyond `clearing_dist`.
pub trait ObstacleCostPolicy: Send + Sync {
    fn penalty(&self, distance: f64, safe_dist: f64, clearing_dist: f64) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl ObstacleCostPolicy for Flat {
        fn penalty(&self, distance: f64, _safe_dist: f64, clearing_dist: f64) -> f64 {
            if distance < clearing_dist {
                1.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_policy_trait_object() {
        let policy: Box<dyn ObstacleCostPolicy> = Box::new(Flat);
        assert_eq!(policy.penalty(0.2, 0.5, 1.0), 1.0);
        assert_eq!(policy.penalty(1.0, 0.5, 1.0), 0.0);
    }
}
