//! Connecting non-adjacent waypoints
//!
//! Line connections walk the rounded 3D line between two keys. Whenever a step
//! of that walk is illegal in the active connectivity mode (a corner cut in
//! 26-mode, any diagonal in 6-mode) it is replaced by the safest
//! one-axis-at-a-time bridge.

use std::cmp::Reverse;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::debug;

use super::space::SearchSpace;
use crate::common::{GridKey, OccupancyMap};

fn axis(key: &GridKey, axis: usize) -> i32 {
    match axis {
        0 => key.x,
        1 => key.y,
        _ => key.z,
    }
}

fn with_axis(key: &GridKey, axis: usize, value: i32) -> GridKey {
    let mut key = *key;
    match axis {
        0 => key.x = value,
        1 => key.y = value,
        _ => key.z = value,
    }
    key
}

/// Intermediate keys of every axis ordering between two diagonal neighbours
///
/// Keys differing by one in 2 coordinates give 2 bridges of one key, in 3
/// coordinates 6 bridges of two keys. Any other pair gives no bridge.
pub fn possible_diagonal_bridges(k1: &GridKey, k2: &GridKey) -> Vec<Vec<GridKey>> {
    if k1.chebyshev(k2) != 1 {
        return Vec::new();
    }
    let axes: Vec<usize> = (0..3).filter(|&a| axis(k1, a) != axis(k2, a)).collect();
    if axes.len() < 2 {
        return Vec::new();
    }

    axes.iter()
        .copied()
        .permutations(axes.len())
        .map(|order| {
            let mut current = *k1;
            order[..order.len() - 1]
                .iter()
                .map(|&a| {
                    current = with_axis(&current, a, axis(k2, a));
                    current
                })
                .collect()
        })
        .collect()
}

/// Bridge between diagonal neighbours with the largest minimum clearance
pub fn safest_bridge<M>(
    space: &SearchSpace<'_, M>,
    k1: &GridKey,
    k2: &GridKey,
    min_clearance: f64,
) -> Option<Vec<GridKey>>
where
    M: OccupancyMap + ?Sized,
{
    possible_diagonal_bridges(k1, k2)
        .into_iter()
        .filter(|bridge| {
            bridge
                .iter()
                .all(|k| space.is_traversable(k) && space.clearance(k) >= min_clearance)
        })
        .filter(|bridge| {
            let mut prev = *k1;
            bridge.iter().chain(std::iter::once(k2)).all(|k| {
                let legal = space.is_step_legal(&prev, k);
                prev = *k;
                legal
            })
        })
        .map(|bridge| (space.min_clearance(&bridge), bridge))
        .min_by_key(|(clearance, _)| Reverse(OrderedFloat(*clearance)))
        .map(|(_, bridge)| bridge)
}

/// Safest single intermediate key between keys differing in exactly 2 coordinates
pub fn connection_node<M>(space: &SearchSpace<'_, M>, k1: &GridKey, k2: &GridKey) -> Option<GridKey>
where
    M: OccupancyMap + ?Sized,
{
    if k1.chebyshev(k2) != 1 || k1.differing_coords(k2) != 2 {
        return None;
    }
    safest_bridge(space, k1, k2, 0.0).and_then(|bridge| bridge.first().copied())
}

/// Keys from `a` to `b` inclusive along the rounded 3D line
///
/// Returns `None` if a key is not traversable, an intermediate key has less
/// than `min_clearance`, or an illegal step cannot be bridged.
pub fn line_connection<M>(
    space: &SearchSpace<'_, M>,
    a: &GridKey,
    b: &GridKey,
    min_clearance: f64,
) -> Option<Vec<GridKey>>
where
    M: OccupancyMap + ?Sized,
{
    let delta = a.delta(b);
    let steps = a.chebyshev(b);
    let mut keys = vec![*a];
    if steps == 0 {
        return Some(keys);
    }

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let next = a.offset(
            (delta[0] as f64 * t).round() as i32,
            (delta[1] as f64 * t).round() as i32,
            (delta[2] as f64 * t).round() as i32,
        );
        if !space.is_traversable(&next) {
            return None;
        }
        if next != *b && space.clearance(&next) < min_clearance {
            return None;
        }

        let prev = keys[keys.len() - 1];
        if !space.is_step_legal(&prev, &next) {
            keys.extend(safest_bridge(space, &prev, &next, min_clearance)?);
        }
        keys.push(next);
    }
    Some(keys)
}

/// Keys to insert between `k1` and `k2` so that every step is legal
///
/// Empty when the step is already legal, `None` when no bridge exists.
pub fn additional_waypoints<M>(
    space: &SearchSpace<'_, M>,
    k1: &GridKey,
    k2: &GridKey,
) -> Option<Vec<GridKey>>
where
    M: OccupancyMap + ?Sized,
{
    if k1 == k2 || space.is_step_legal(k1, k2) {
        return Some(Vec::new());
    }
    if k1.chebyshev(k2) == 1 {
        return safest_bridge(space, k1, k2, 0.0);
    }
    line_connection(space, k1, k2, 0.0).map(|keys| keys[1..keys.len() - 1].to_vec())
}

/// Insert additional waypoints between every pair of keys that is not a legal step
///
/// Pairs that cannot be bridged are kept as they are.
pub fn repair_connectivity<M>(space: &SearchSpace<'_, M>, path: &[GridKey]) -> Vec<GridKey>
where
    M: OccupancyMap + ?Sized,
{
    let mut repaired = Vec::with_capacity(path.len());
    for (i, key) in path.iter().enumerate() {
        if let Some(prev) = repaired.last().copied() {
            if prev == *key {
                continue;
            }
            match additional_waypoints(space, &prev, key) {
                Some(bridge) => repaired.extend(bridge),
                None => debug!("cannot connect waypoints {} and {}: {:?} -> {:?}", i - 1, i, prev, key),
            }
        }
        repaired.push(*key);
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Connectivity;
    use crate::mapping::VoxelMap;
    use crate::path_planning::voxel_astar::pruning::PruningTables;
    use crate::path_planning::voxel_astar::space::grid_bounds;

    fn space<'a>(map: &'a VoxelMap, tables: &'a PruningTables) -> SearchSpace<'a, VoxelMap> {
        SearchSpace::new(map, tables, grid_bounds(map, &[], 0).unwrap(), false)
    }

    #[test]
    fn test_bridge_counts() {
        let origin = GridKey::new(0, 0, 0);
        let edge = possible_diagonal_bridges(&origin, &GridKey::new(1, 1, 0));
        assert_eq!(edge.len(), 2);
        assert!(edge.iter().all(|b| b.len() == 1));
        assert!(edge.contains(&vec![GridKey::new(1, 0, 0)]));
        assert!(edge.contains(&vec![GridKey::new(0, 1, 0)]));

        let corner = possible_diagonal_bridges(&origin, &GridKey::new(1, -1, 1));
        assert_eq!(corner.len(), 6);
        assert!(corner.iter().all(|b| b.len() == 2));
        assert!(corner.iter().all_unique());

        assert!(possible_diagonal_bridges(&origin, &GridKey::new(1, 0, 0)).is_empty());
        assert!(possible_diagonal_bridges(&origin, &GridKey::new(2, 1, 0)).is_empty());
    }

    #[test]
    fn test_connection_node_prefers_clearance() {
        let mut map = VoxelMap::with_size(6, 6, 1).unwrap();
        map.set_occupied(GridKey::new(3, 0, 0));
        let tables = PruningTables::new(Connectivity::Six);
        let space = space(&map, &tables);

        // (2, 1) and (1, 2) are both free, (1, 2) is further from the obstacle
        let node = connection_node(&space, &GridKey::new(1, 1, 0), &GridKey::new(2, 2, 0));
        assert_eq!(node, Some(GridKey::new(1, 2, 0)));
        assert_eq!(
            connection_node(&space, &GridKey::new(1, 1, 0), &GridKey::new(2, 2, 1)),
            None
        );
    }

    #[test]
    fn test_line_connection_straight() {
        let map = VoxelMap::with_size(10, 10, 10).unwrap();
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = space(&map, &tables);

        let keys = line_connection(&space, &GridKey::new(0, 0, 0), &GridKey::new(6, 3, 0), 0.0).unwrap();
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], GridKey::new(0, 0, 0));
        assert_eq!(keys[6], GridKey::new(6, 3, 0));
        assert!(space.is_path_valid(&keys));
    }

    #[test]
    fn test_line_connection_expands_diagonals_in_six_mode() {
        let map = VoxelMap::with_size(10, 10, 10).unwrap();
        let tables = PruningTables::new(Connectivity::Six);
        let space = space(&map, &tables);

        let keys = line_connection(&space, &GridKey::new(0, 0, 0), &GridKey::new(3, 3, 3), 0.0).unwrap();
        assert_eq!(keys.len(), 10);
        assert!(space.is_path_valid(&keys));
    }

    #[test]
    fn test_line_connection_bridges_corner_cut() {
        let mut map = VoxelMap::with_size(5, 5, 1).unwrap();
        map.set_occupied(GridKey::new(1, 0, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = space(&map, &tables);

        let keys = line_connection(&space, &GridKey::new(0, 0, 0), &GridKey::new(1, 1, 0), 0.0).unwrap();
        assert_eq!(
            keys,
            vec![GridKey::new(0, 0, 0), GridKey::new(0, 1, 0), GridKey::new(1, 1, 0)]
        );
    }

    #[test]
    fn test_line_connection_blocked() {
        let mut map = VoxelMap::with_size(10, 3, 1).unwrap();
        map.set_occupied(GridKey::new(4, 1, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = space(&map, &tables);

        let a = GridKey::new(0, 1, 0);
        let b = GridKey::new(8, 1, 0);
        assert!(line_connection(&space, &a, &b, 0.0).is_none());
        assert!(line_connection(&space, &GridKey::new(0, 0, 0), &GridKey::new(8, 0, 0), 0.0).is_some());
        // too close to the obstacle
        assert!(line_connection(&space, &GridKey::new(0, 0, 0), &GridKey::new(8, 0, 0), 1.5).is_none());
    }

    #[test]
    fn test_repair_connectivity() {
        let map = VoxelMap::with_size(10, 10, 10).unwrap();
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = space(&map, &tables);

        let sparse = vec![GridKey::new(0, 0, 0), GridKey::new(4, 2, 0), GridKey::new(4, 2, 5)];
        let repaired = repair_connectivity(&space, &sparse);
        assert!(space.is_path_valid(&repaired));
        assert_eq!(repaired.first(), sparse.first());
        assert_eq!(repaired.last(), sparse.last());
        assert!(repaired.contains(&GridKey::new(4, 2, 0)));

        assert_eq!(
            additional_waypoints(&space, &GridKey::new(0, 0, 0), &GridKey::new(1, 1, 1)),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_repair_keeps_unbridgeable_pair() {
        let mut map = VoxelMap::with_size(10, 3, 1).unwrap();
        map.add_box(GridKey::new(4, 0, 0), GridKey::new(4, 2, 0));
        let tables = PruningTables::new(Connectivity::TwentySix);
        let space = space(&map, &tables);

        let path = vec![GridKey::new(0, 1, 0), GridKey::new(8, 1, 0)];
        assert_eq!(repair_connectivity(&space, &path), path);
    }
}
