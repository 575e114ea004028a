//! 3D voxel A* planning
//!
//! Grid search over a volumetric occupancy map followed by safety inflation,
//! path simplification and a replanning check for paths being executed.

pub mod config;
pub mod connection;
pub mod cost;
pub mod frontier;
pub mod node;
pub mod pruning;
pub mod replan;
pub mod safety;
pub mod search;
pub mod simplify;
pub mod space;

pub use config::{FrontierOrdering, PlannerConfig, ReplanConfig, SafePathConfig, SimplifierConfig};
pub use connection::{
    additional_waypoints, connection_node, line_connection, possible_diagonal_bridges,
    repair_connectivity,
};
pub use cost::{ExponentialFalloff, LinearFalloff};
pub use frontier::{Frontier, RemoveOutcome};
pub use node::Node;
pub use pruning::{Move, PruningTables};
pub use replan::{first_unfeasible_node_in_path, ReplanViolation, ViolationSeverity};
pub use safety::{safe_path, SafePath, SafetyStatus};
pub use search::{PlannedPath, SearchReport, Termination, VoxelAstarPlanner};
pub use simplify::PathSimplifier;
pub use space::{grid_bounds, map_limits, SearchSpace};
