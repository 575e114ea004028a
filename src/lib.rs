//! voxel_planner - 3D grid A* path planning on volumetric occupancy maps
//!
//! The planner searches a 6- or 26-connected voxel grid, pushes the result
//! away from obstacles, simplifies it and can later tell whether the path
//! being executed needs to be replanned.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod path_planning;

// Re-export common types for convenience
pub use common::{Connectivity, GridBounds, GridKey, Occupancy, WorldPoint};
pub use common::{ObstacleCostPolicy, OccupancyMap, PathPlanner};
pub use common::{Endpoint, PlanningError, PlanningResult};
