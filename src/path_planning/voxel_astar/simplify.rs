//! Path simplification passes
//!
//! Every pass maps a connected key path to a connected key path with the same
//! endpoints and never more waypoints. A run of waypoints is only replaced by
//! a straight connector when the connector is strictly shorter and keeps the
//! clearance the run already had (capped at `safety_margin`).

use std::collections::HashSet;

use nalgebra::Vector3;
use tracing::debug;

use super::config::SimplifierConfig;
use super::connection::{line_connection, repair_connectivity};
use super::space::SearchSpace;
use crate::common::{GridKey, OccupancyMap, WorldPoint};

/// Distance from `point` to the segment `a`-`b`
fn distance_to_segment(point: &WorldPoint, a: &WorldPoint, b: &WorldPoint) -> f64 {
    let ab: Vector3<f64> = b - a;
    let ap: Vector3<f64> = point - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return ap.norm();
    }
    let t = (ap.dot(&ab) / len_sq).clamp(0.0, 1.0);
    (ap - ab * t).norm()
}

pub struct PathSimplifier<'s, 'a, M: OccupancyMap + ?Sized> {
    space: &'s SearchSpace<'a, M>,
    config: SimplifierConfig,
}

impl<'s, 'a, M: OccupancyMap + ?Sized> PathSimplifier<'s, 'a, M> {
    pub fn new(space: &'s SearchSpace<'a, M>, config: SimplifierConfig) -> Self {
        PathSimplifier { space, config }
    }

    pub fn config(&self) -> &SimplifierConfig {
        &self.config
    }

    /// Interior keys of a straight connector replacing `path[i..=j]`, if acceptable
    fn connector(&self, path: &[GridKey], i: usize, j: usize) -> Option<Vec<GridKey>> {
        if j <= i + 1 {
            return None;
        }
        let required = self
            .config
            .safety_margin
            .min(self.space.min_clearance(&path[i..=j]));
        let keys = line_connection(self.space, &path[i], &path[j], required)?;
        let interior = keys[1..keys.len() - 1].to_vec();
        if interior.len() < j - i - 1 {
            Some(interior)
        } else {
            None
        }
    }

    fn chord_deviation(&self, path: &[GridKey], i: usize, j: usize) -> f64 {
        let a = self.space.world(&path[i]);
        let b = self.space.world(&path[j]);
        path[i + 1..j]
            .iter()
            .map(|k| distance_to_segment(&self.space.world(k), &a, &b))
            .fold(0.0, f64::max)
    }

    /// Greedy run replacement: from each anchor, replace the longest acceptable run
    /// ending at a `j` allowed by `admissible`
    fn replace_runs<F>(&self, path: &[GridKey], max_span: usize, admissible: F) -> Vec<GridKey>
    where
        F: Fn(&[GridKey], usize, usize) -> bool,
    {
        if path.len() < 3 {
            return path.to_vec();
        }
        let mut out = vec![path[0]];
        let mut i = 0;
        while i < path.len() - 1 {
            let far = (i + max_span).min(path.len() - 1);
            let mut next = i + 1;
            let mut bridge = Vec::new();
            for j in (i + 2..=far).rev() {
                if !admissible(path, i, j) {
                    continue;
                }
                if let Some(interior) = self.connector(path, i, j) {
                    next = j;
                    bridge = interior;
                    break;
                }
            }
            out.extend(bridge);
            out.push(path[next]);
            i = next;
        }
        out
    }

    /// Windowed collinearity filter
    ///
    /// Within a window of `window` waypoints, a run whose interior stays within
    /// `filtering_dist` of its chord is replaced by the chord.
    pub fn filtered_plan(&self, path: &[GridKey], window: usize, filtering_dist: f64) -> Vec<GridKey> {
        self.replace_runs(path, window.max(2), |p, i, j| {
            self.chord_deviation(p, i, j) <= filtering_dist
        })
    }

    /// Drop `k_i` when `k_{i-1}` and `k_{i+1}` are themselves a legal step
    pub fn filtered_neighborhood_plan(&self, path: &[GridKey]) -> Vec<GridKey> {
        if path.len() < 3 {
            return path.to_vec();
        }
        let mut out = vec![path[0]];
        for i in 1..path.len() - 1 {
            let prev = out[out.len() - 1];
            if !self.space.is_step_legal(&prev, &path[i + 1]) {
                out.push(path[i]);
            }
        }
        out.push(path[path.len() - 1]);
        out
    }

    /// Collapse zig-zags
    ///
    /// A run built from at most two distinct step directions whose interior
    /// stays within `tolerance` of its chord is replaced by the chord.
    pub fn zz_filtered_plan(&self, path: &[GridKey], tolerance: f64) -> Vec<GridKey> {
        self.replace_runs(path, self.config.max_connector_span, |p, i, j| {
            let steps: HashSet<[i32; 3]> = p[i..=j].windows(2).map(|w| w[0].delta(&w[1])).collect();
            steps.len() <= 2 && self.chord_deviation(p, i, j) <= tolerance
        })
    }

    /// Replace each run by the farthest straight line of sight
    ///
    /// Lines are searched at most `max_connector_span` waypoints ahead.
    pub fn straighten_key_path(&self, path: &[GridKey]) -> Vec<GridKey> {
        self.replace_runs(path, self.config.max_connector_span, |_, _, _| true)
    }

    /// Repeat the filters and straightening until nothing changes or
    /// `max_smoothing_passes` is hit
    pub fn smooth_path(&self, path: &[GridKey]) -> Vec<GridKey> {
        let mut current = path.to_vec();
        for pass in 0..self.config.max_smoothing_passes {
            let next = self.filtered_plan(&current, self.config.window_size, self.config.filtering_dist);
            let next = self.filtered_neighborhood_plan(&next);
            let next = self.zz_filtered_plan(&next, self.config.zigzag_tolerance);
            let next = self.straighten_key_path(&next);
            if next == current {
                debug!("smoothing converged after {} passes", pass);
                break;
            }
            current = next;
        }
        current
    }

    /// filter, straighten, repair and smooth
    pub fn simplify(&self, path: &[GridKey]) -> Vec<GridKey> {
        let filtered = self.filtered_plan(path, self.config.window_size, self.config.filtering_dist);
        let straight = self.straighten_key_path(&filtered);
        let repaired = repair_connectivity(self.space, &straight);
        let smoothed = self.smooth_path(&repaired);
        debug!(
            "simplified path from {} to {} waypoints",
            path.len(),
            smoothed.len()
        );
        smoothed
    }
}
