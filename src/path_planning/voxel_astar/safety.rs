//! Safety inflation of a key path
//!
//! Waypoints closer than `safe_dist` to an obstacle are nudged to the
//! neighbouring voxel with the largest clearance, without leaving the
//! waypoint's original altitude band. Only the waypoints of the input path are
//! moved; the keys joining them are rebuilt after the last pass so the output
//! stays a sequence of legal steps that never visits a key twice.

use tracing::debug;

use super::config::SafePathConfig;
use super::connection::additional_waypoints;
use super::space::SearchSpace;
use crate::common::{GridKey, OccupancyMap};

/// Largest Chebyshev distance a moved waypoint may keep to its neighbours
const MAX_LINK_SPAN: i32 = 2;

/// Whether every waypoint of a path reached the requested clearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyStatus {
    Safe,
    /// Indices of waypoints still closer than `safe_dist`
    Degraded { unresolved: Vec<usize> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafePath {
    pub keys: Vec<GridKey>,
    pub unresolved: Vec<usize>,
}

impl SafePath {
    pub fn status(&self) -> SafetyStatus {
        if self.unresolved.is_empty() {
            SafetyStatus::Safe
        } else {
            SafetyStatus::Degraded {
                unresolved: self.unresolved.clone(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Waypoint {
    key: GridKey,
    /// Altitude the waypoint had when it entered the pass [m]
    anchor_z: f64,
}

/// Append `key`, cutting the path back to an earlier visit of the same key
fn push_without_loop(out: &mut Vec<GridKey>, key: GridKey) {
    match out.iter().position(|k| *k == key) {
        Some(pos) => out.truncate(pos + 1),
        None => out.push(key),
    }
}

fn links<M>(space: &SearchSpace<'_, M>, a: &GridKey, b: &GridKey) -> bool
where
    M: OccupancyMap + ?Sized,
{
    a.chebyshev(b) <= MAX_LINK_SPAN && additional_waypoints(space, a, b).is_some()
}

/// Traversable 26-neighbour of `waypoint` with the best clearance inside the
/// altitude band that stays linkable to `prev` and `next`
fn best_relocation<M>(
    space: &SearchSpace<'_, M>,
    waypoint: &Waypoint,
    prev: &GridKey,
    next: Option<&GridKey>,
    config: &SafePathConfig,
) -> Option<GridKey>
where
    M: OccupancyMap + ?Sized,
{
    let current = space.clearance(&waypoint.key);
    let mut best: Option<(f64, f64, GridKey)> = None;

    let tables = space.tables();
    for m in tables
        .face_moves()
        .chain(tables.edge_moves())
        .chain(tables.corner_moves())
    {
        let candidate = waypoint.key.offset_by(m.offset);
        if !space.is_traversable(&candidate) {
            continue;
        }
        let drift = (space.world(&candidate).z - waypoint.anchor_z).abs();
        if drift > config.z_diff_tolerance {
            continue;
        }
        let clearance = space.clearance(&candidate);
        if clearance <= current {
            continue;
        }
        let better = match best {
            None => true,
            Some((c, d, _)) => clearance > c || (clearance == c && drift < d),
        };
        if !better {
            continue;
        }
        if !links(space, prev, &candidate) || !next.map_or(true, |n| links(space, &candidate, n)) {
            continue;
        }
        best = Some((clearance, drift, candidate));
    }
    best.map(|(_, _, key)| key)
}

/// Dense path through `waypoints`, bridging every step that is not legal
fn connect<M>(space: &SearchSpace<'_, M>, waypoints: &[Waypoint]) -> Vec<GridKey>
where
    M: OccupancyMap + ?Sized,
{
    let mut out: Vec<GridKey> = Vec::with_capacity(waypoints.len());
    for waypoint in waypoints {
        if let Some(prev) = out.last().copied() {
            match additional_waypoints(space, &prev, &waypoint.key) {
                Some(bridge) => {
                    for key in bridge {
                        push_without_loop(&mut out, key);
                    }
                }
                None => debug!("cannot connect {:?} -> {:?}", prev, waypoint.key),
            }
        }
        push_without_loop(&mut out, waypoint.key);
    }
    out
}

/// Push waypoints of `path` away from obstacles
///
/// The first waypoint is never moved, the last one only when
/// `fix_goal_point` is off. Waypoints that cannot reach `safe_dist` are
/// reported in [`SafePath::unresolved`].
pub fn safe_path<M>(space: &SearchSpace<'_, M>, path: &[GridKey], config: &SafePathConfig) -> SafePath
where
    M: OccupancyMap + ?Sized,
{
    let mut waypoints: Vec<Waypoint> = path
        .iter()
        .map(|k| Waypoint {
            key: *k,
            anchor_z: space.world(k).z,
        })
        .collect();

    for pass in 0..config.max_iteration {
        if waypoints.len() < 2 {
            break;
        }
        let mut moved = 0;
        for i in 1..waypoints.len() {
            if i + 1 == waypoints.len() && config.fix_goal_point {
                continue;
            }
            if space.clearance(&waypoints[i].key) >= config.safe_dist {
                continue;
            }
            let prev = waypoints[i - 1].key;
            let next = waypoints.get(i + 1).map(|w| w.key);
            if let Some(key) = best_relocation(space, &waypoints[i], &prev, next.as_ref(), config) {
                waypoints[i].key = key;
                moved += 1;
            }
        }
        if moved == 0 {
            debug!("safe path converged after {} passes", pass);
            break;
        }
    }

    let keys = connect(space, &waypoints);
    let unresolved = keys
        .iter()
        .enumerate()
        .filter(|(_, k)| space.clearance(k) < config.safe_dist)
        .map(|(i, _)| i)
        .collect();
    SafePath { keys, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Connectivity;
    use crate::mapping::VoxelMap;
    use crate::path_planning::voxel_astar::pruning::PruningTables;
    use crate::path_planning::voxel_astar::space::grid_bounds;

    fn straight_path(y: i32) -> Vec<GridKey> {
        (0..=10).map(|x| GridKey::new(x, y, 0)).collect()
    }

    #[test]
    fn test_moves_waypoints_away_from_wall() {
        let mut map = VoxelMap::with_size(11, 7, 1).unwrap();
        map.add_box(GridKey::new(3, 0, 0), GridKey::new(7, 0, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = SearchSpace::new(&map, &tables, grid_bounds(&map, &[], 0).unwrap(), false);

        let path = straight_path(1);
        let config = SafePathConfig {
            safe_dist: 1.5,
            max_iteration: 10,
            ..Default::default()
        };
        let safe = safe_path(&space, &path, &config);

        assert_eq!(safe.keys.first(), path.first());
        assert_eq!(safe.keys.last(), path.last());
        assert!(space.is_path_valid(&safe.keys));
        assert!(!safe.keys.iter().any(|k| k.y <= 1 && (3..=7).contains(&k.x)));
        assert_eq!(safe.status(), SafetyStatus::Safe);
    }

    #[test]
    fn test_idempotent_once_converged() {
        let mut map = VoxelMap::with_size(11, 7, 1).unwrap();
        map.add_box(GridKey::new(3, 0, 0), GridKey::new(7, 0, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = SearchSpace::new(&map, &tables, grid_bounds(&map, &[], 0).unwrap(), false);

        let config = SafePathConfig {
            safe_dist: 1.5,
            max_iteration: 20,
            ..Default::default()
        };
        let once = safe_path(&space, &straight_path(1), &config);
        let twice = safe_path(&space, &once.keys, &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_degraded_in_narrow_corridor() {
        let mut map = VoxelMap::with_size(11, 3, 1).unwrap();
        map.add_box(GridKey::new(0, 0, 0), GridKey::new(10, 0, 0));
        map.add_box(GridKey::new(0, 2, 0), GridKey::new(10, 2, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = SearchSpace::new(&map, &tables, grid_bounds(&map, &[], 0).unwrap(), false);

        let path = straight_path(1);
        let config = SafePathConfig {
            safe_dist: 1.5,
            ..Default::default()
        };
        let safe = safe_path(&space, &path, &config);
        assert_eq!(safe.keys, path);
        match safe.status() {
            SafetyStatus::Degraded { unresolved } => assert_eq!(unresolved.len(), path.len()),
            SafetyStatus::Safe => panic!("corridor cannot be safe"),
        }
    }

    #[test]
    fn test_goal_and_altitude_are_respected() {
        let mut map = VoxelMap::with_size(6, 6, 6).unwrap();
        // ceiling right above the path
        map.add_box(GridKey::new(0, 0, 3), GridKey::new(5, 5, 3));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = SearchSpace::new(&map, &tables, grid_bounds(&map, &[], 0).unwrap(), false);

        let path: Vec<GridKey> = (0..6).map(|x| GridKey::new(x, 2, 2)).collect();
        let config = SafePathConfig {
            safe_dist: 3.0,
            z_diff_tolerance: 0.0,
            fix_goal_point: true,
            ..Default::default()
        };
        let safe = safe_path(&space, &path, &config);
        assert!(safe.keys.iter().all(|k| k.z == 2));
        assert_eq!(safe.keys.last(), Some(&GridKey::new(5, 2, 2)));
        assert!(!safe.unresolved.is_empty());
    }

    #[test]
    fn test_searched_paths_do_not_oscillate() {
        use std::sync::Arc;

        use itertools::Itertools;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        use crate::common::{PlanningError, WorldPoint};
        use crate::path_planning::voxel_astar::{PlannerConfig, VoxelAstarPlanner};

        let point = |k: GridKey| WorldPoint::new(k.x as f64 + 0.5, k.y as f64 + 0.5, k.z as f64 + 0.5);
        let (start, goal) = (GridKey::new(0, 0, 2), GridKey::new(19, 19, 1));
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            let mut map = VoxelMap::with_size(20, 20, 4).unwrap();
            for _ in 0..120 {
                map.set_occupied(GridKey::new(
                    rng.gen_range(0..20),
                    rng.gen_range(0..20),
                    rng.gen_range(0..4),
                ));
            }
            map.set_free(start);
            map.set_free(goal);
            let config = PlannerConfig {
                planning_timeout: 10.0,
                ..Default::default()
            };
            let mut planner = VoxelAstarPlanner::new(Arc::new(map), config).unwrap();

            let raw = match planner.plan_node_path(point(start), point(goal)) {
                Ok(nodes) => VoxelAstarPlanner::<VoxelMap>::key_path(&nodes),
                Err(e) => {
                    assert!(matches!(e, PlanningError::Unreachable { .. }));
                    continue;
                }
            };

            for max_iteration in [5, 50] {
                let config = SafePathConfig {
                    safe_dist: 1.5,
                    max_iteration,
                    ..Default::default()
                };
                let safe = planner.safe_path(&raw, &config).unwrap();
                assert!(safe.keys.iter().all_unique(), "repeated key in {:?}", safe.keys);
                assert!(safe.keys.len() <= 6 * raw.len());
                assert_eq!(safe.keys.first(), raw.first());
                assert_eq!(safe.keys.last(), raw.last());
                let space = planner.space_for(&safe.keys).unwrap();
                assert!(space.is_path_valid(&safe.keys));
            }
        }
    }

    #[test]
    fn test_loop_is_cut_at_repeated_key() {
        let mut out = vec![GridKey::new(0, 0, 0), GridKey::new(1, 0, 0), GridKey::new(2, 0, 0)];
        push_without_loop(&mut out, GridKey::new(1, 0, 0));
        assert_eq!(out, vec![GridKey::new(0, 0, 0), GridKey::new(1, 0, 0)]);
        push_without_loop(&mut out, GridKey::new(1, 1, 0));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_empty_and_single() {
        let map = VoxelMap::with_size(3, 3, 3).unwrap();
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = SearchSpace::new(&map, &tables, grid_bounds(&map, &[], 0).unwrap(), false);
        let config = SafePathConfig::default();

        assert_eq!(safe_path(&space, &[], &config), SafePath::default());
        let single = safe_path(&space, &[GridKey::new(1, 1, 1)], &config);
        assert_eq!(single.keys, vec![GridKey::new(1, 1, 1)]);
        assert_eq!(single.status(), SafetyStatus::Safe);
    }
}
