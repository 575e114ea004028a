//! Configuration for the voxel A* planner and its post-processing passes

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Connectivity, PlanningError, PlanningResult};

/// Which node cost the frontier pops by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrontierOrdering {
    /// Accumulated path cost `g` only (path-cost-monotone expansion)
    #[default]
    AccumulatedCost,
    /// `g + h`, classic A*
    EstimatedTotal,
}

/// Configuration for the voxel A* search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Neighbour expansion mode
    pub connectivity: Connectivity,
    /// Replace an occupied/invalid goal by the nearest valid key and accept
    /// the closest reachable node when the frontier runs dry
    pub enable_planning_to_unreachable_goal: bool,
    /// Wall-clock budget of a single search [s]
    pub planning_timeout: f64,
    /// Distance below which the obstacle penalty is maximal [m]
    pub safe_dist: f64,
    /// Distance beyond which the obstacle penalty is zero [m]
    pub clearing_dist: f64,
    /// Return the best partial path instead of failing on timeout
    pub break_at_timeout: bool,
    /// Treat unknown voxels as traversable
    pub unknown_is_traversable: bool,
    /// Radius of the substitute-goal neighbourhood search [voxels]
    pub goal_search_radius: i32,
    /// Goal acceptance distance in unreachable-goal mode [m]
    pub goal_tolerance: f64,
    /// Bounds growth around start/goal when the map is unbounded [voxels]
    pub search_margin: i32,
    /// Horizontal growth of the key window used by the path passes [voxels]
    pub path_xy_reserve: i32,
    /// Vertical growth of the key window used by the path passes [voxels]
    pub path_z_reserve: i32,
    /// The map was coarsened for planning: an occupied start voxel is replaced
    /// by its clearest traversable neighbour instead of being rejected
    pub resolution_increased: bool,
    /// Frontier priority
    pub frontier_ordering: FrontierOrdering,
    /// Collect open/closed snapshots in the search report
    pub debug: bool,
    /// Emit per-search statistics at debug level
    pub verbose: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::TwentySix,
            enable_planning_to_unreachable_goal: false,
            planning_timeout: 0.5,
            safe_dist: 0.5,
            clearing_dist: 1.5,
            break_at_timeout: false,
            unknown_is_traversable: false,
            goal_search_radius: 5,
            goal_tolerance: 0.0,
            search_margin: 10,
            path_xy_reserve: 5,
            path_z_reserve: 3,
            resolution_increased: false,
            frontier_ordering: FrontierOrdering::AccumulatedCost,
            debug: false,
            verbose: false,
        }
    }
}

impl PlannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.planning_timeout.max(0.0))
    }

    /// Check parameter ranges
    pub fn validate(&self) -> PlanningResult<()> {
        let finite = [
            ("planning_timeout", self.planning_timeout),
            ("safe_dist", self.safe_dist),
            ("clearing_dist", self.clearing_dist),
            ("goal_tolerance", self.goal_tolerance),
        ];
        for (name, value) in finite.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(PlanningError::InvalidParameter(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.clearing_dist < self.safe_dist {
            return Err(PlanningError::InvalidParameter(format!(
                "clearing_dist ({}) must not be smaller than safe_dist ({})",
                self.clearing_dist, self.safe_dist
            )));
        }
        let counts = [
            ("goal_search_radius", self.goal_search_radius),
            ("search_margin", self.search_margin),
            ("path_xy_reserve", self.path_xy_reserve),
            ("path_z_reserve", self.path_z_reserve),
        ];
        for (name, value) in counts.iter() {
            if *value < 0 {
                return Err(PlanningError::InvalidParameter(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of the safety inflation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafePathConfig {
    /// Target distance to the nearest obstacle [m]
    pub safe_dist: f64,
    /// Maximum number of passes over the path
    pub max_iteration: usize,
    /// Maximum vertical drift of a relocated waypoint [m]
    pub z_diff_tolerance: f64,
    /// Never move the last waypoint
    pub fix_goal_point: bool,
}

impl Default for SafePathConfig {
    fn default() -> Self {
        Self {
            safe_dist: 1.0,
            max_iteration: 5,
            z_diff_tolerance: 0.5,
            fix_goal_point: true,
        }
    }
}

/// Parameters of the path simplification passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifierConfig {
    /// Sliding window size of the collinearity filter [waypoints]
    pub window_size: usize,
    /// Maximum distance of a dropped waypoint from the chord [m]
    pub filtering_dist: f64,
    /// Maximum zig-zag deviation from the chord [m]
    pub zigzag_tolerance: f64,
    /// Clearance a connector must keep unless the replaced run was already closer [m]
    pub safety_margin: f64,
    /// Fixed-point iteration ceiling of the smoothing pass
    pub max_smoothing_passes: usize,
    /// Farthest waypoint a straight connector may reach ahead [waypoints]
    pub max_connector_span: usize,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            filtering_dist: 0.5,
            zigzag_tolerance: 1.0,
            safety_margin: 0.5,
            max_smoothing_passes: 10,
            max_connector_span: 50,
        }
    }
}

/// Thresholds of the replanning trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplanConfig {
    /// Number of waypoints checked ahead of the robot
    pub n_points_forward: usize,
    /// Clearance below which replanning should happen soon [m]
    pub safe_dist_for_replanning: f64,
    /// Clearance below which replanning must happen now [m]
    pub critical_dist_for_replanning: f64,
}

impl Default for ReplanConfig {
    fn default() -> Self {
        Self {
            n_points_forward: 20,
            safe_dist_for_replanning: 0.8,
            critical_dist_for_replanning: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
        assert_eq!(PlannerConfig::default().timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PlannerConfig {
            safe_dist: 2.0,
            clearing_dist: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlanningError::InvalidParameter(_))
        ));

        let config = PlannerConfig {
            planning_timeout: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            goal_search_radius: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            path_z_reserve: -2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let text = r#"
            connectivity = "six"
            planning_timeout = 2.0
            safe_dist = 0.8
            break_at_timeout = true
            frontier_ordering = "estimated_total"
            resolution_increased = true
        "#;
        let config: PlannerConfig = toml::from_str(text).unwrap();
        assert_eq!(config.connectivity, Connectivity::Six);
        assert_eq!(config.frontier_ordering, FrontierOrdering::EstimatedTotal);
        assert!(config.break_at_timeout);
        assert!(config.resolution_increased);
        assert_eq!(config.path_xy_reserve, 5);
        assert_eq!(config.clearing_dist, PlannerConfig::default().clearing_dist);
        assert!(config.validate().is_ok());

        let safe: SafePathConfig = toml::from_str("max_iteration = 9").unwrap();
        assert_eq!(safe.max_iteration, 9);
        assert!(safe.fix_goal_point);
    }
}
