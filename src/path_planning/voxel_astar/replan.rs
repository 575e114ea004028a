//! Replanning trigger
//!
//! Checks the waypoints just ahead of the robot against the current map and
//! reports the first one that became too close to an obstacle.

use ordered_float::OrderedFloat;

use super::config::ReplanConfig;
use crate::common::{GridKey, OccupancyMap, WorldPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationSeverity {
    /// Clearance below `safe_dist_for_replanning`
    Soft,
    /// Clearance below `critical_dist_for_replanning`
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplanViolation {
    /// Index into the checked path
    pub index: usize,
    pub severity: ViolationSeverity,
}

/// Path index the robot has reached
///
/// Poses are followed oldest first. Each one moves the progress to the nearest
/// waypoint inside the `window` waypoints ahead of it, repeating while that
/// waypoint keeps getting closer, so progress never jumps to a later leg of
/// a path that folds back past the robot.
fn progress_index<M>(map: &M, path: &[GridKey], poses: &[WorldPoint], window: usize) -> usize
where
    M: OccupancyMap + ?Sized,
{
    let last = path.len().saturating_sub(1);
    let window = window.max(1);
    let mut progress = 0;
    for pose in poses {
        loop {
            let end = (progress + window).min(last);
            let nearest = (progress..=end)
                .min_by_key(|&i| OrderedFloat(nalgebra::distance(&map.key_to_world(&path[i]), pose)))
                .unwrap_or(progress);
            if nearest == progress {
                break;
            }
            progress = nearest;
        }
    }
    progress
}

/// First waypoint ahead of `current_pose` whose clearance dropped below the
/// replanning thresholds, `None` when the next `n_points_forward` waypoints are fine
pub fn first_unfeasible_node_in_path<M>(
    map: &M,
    path: &[GridKey],
    recent_poses: &[WorldPoint],
    current_pose: &WorldPoint,
    config: &ReplanConfig,
) -> Option<ReplanViolation>
where
    M: OccupancyMap + ?Sized,
{
    if path.is_empty() {
        return None;
    }

    let mut poses = recent_poses.to_vec();
    poses.push(*current_pose);
    let scan_start = progress_index(map, path, &poses, config.n_points_forward);

    path.iter()
        .enumerate()
        .skip(scan_start)
        .take(config.n_points_forward)
        .find_map(|(index, key)| {
            let clearance = map.nearest_obstacle_distance(&map.key_to_world(key));
            let severity = if clearance < config.critical_dist_for_replanning {
                ViolationSeverity::Hard
            } else if clearance < config.safe_dist_for_replanning {
                ViolationSeverity::Soft
            } else {
                return None;
            };
            Some(ReplanViolation { index, severity })
        })
}
