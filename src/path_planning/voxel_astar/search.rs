//! Best-first search over voxel keys
//!
//! The frontier pops by accumulated path cost unless
//! `FrontierOrdering::EstimatedTotal` is configured. Each successor pays its
//! Euclidean step length scaled by `1 + obstacle penalty`, so costs grow
//! strictly along a path. Diagonal moves are pruned when they would cut across
//! a blocked orthogonal cell.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ordered_float::OrderedFloat;
use tracing::{debug, info, warn};

use super::config::{PlannerConfig, ReplanConfig, SafePathConfig, SimplifierConfig};
use super::cost::LinearFalloff;
use super::frontier::{Frontier, RemoveOutcome};
use super::node::Node;
use super::pruning::PruningTables;
use super::replan::{self, ReplanViolation};
use super::safety::{self, SafePath, SafetyStatus};
use super::simplify::PathSimplifier;
use super::space::{grid_bounds, map_limits, SearchSpace};
use crate::common::{
    Connectivity, Endpoint, GridKey, ObstacleCostPolicy, Occupancy, OccupancyMap, PathPlanner,
    PlanningError, PlanningResult, WorldPoint,
};

/// How a successful search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The (possibly substituted) goal key was popped
    GoalReached,
    /// A node within the goal tolerance was popped
    WithinTolerance,
    /// Frontier exhausted; path leads to the closest reachable node
    ClosestReachable,
    /// Timeout with `break_at_timeout`; path leads to the best node so far
    TimedOut,
}

/// Outcome of one search leg
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub path: Vec<Node>,
    pub termination: Termination,
    /// Key the search started from
    pub start_key: GridKey,
    /// Set when an occupied start was replaced by a neighbour (`resolution_increased`)
    pub substituted_start: bool,
    /// Goal key the search aimed for
    pub goal_key: GridKey,
    /// Set when the literal goal was replaced by a nearby valid key
    pub substituted_goal: bool,
    pub expansions: usize,
    pub elapsed: Duration,
    /// Open-list poses at termination, filled in debug mode
    pub open_snapshot: Vec<WorldPoint>,
    /// Closed-list poses at termination, filled in debug mode
    pub closed_snapshot: Vec<WorldPoint>,
}

impl SearchReport {
    pub fn end(&self) -> Option<&Node> {
        self.path.last()
    }
}

/// Full pipeline output
#[derive(Debug, Clone)]
pub struct PlannedPath {
    pub waypoints: Vec<WorldPoint>,
    pub keys: Vec<GridKey>,
    pub safety: SafetyStatus,
    pub termination: Termination,
}

/// 3D voxel A* planner with safety inflation and path simplification
pub struct VoxelAstarPlanner<M: OccupancyMap + ?Sized> {
    map: Arc<M>,
    config: PlannerConfig,
    tables: PruningTables,
    cost_policy: Box<dyn ObstacleCostPolicy>,
    safe_path_config: SafePathConfig,
    simplifier_config: SimplifierConfig,
    start: Option<WorldPoint>,
    goal: Option<WorldPoint>,
    last_found_goal: Option<WorldPoint>,
}

impl<M: OccupancyMap + ?Sized> VoxelAstarPlanner<M> {
    /// Create a planner over `map`
    pub fn new(map: Arc<M>, config: PlannerConfig) -> PlanningResult<Self> {
        config.validate()?;
        let tables = PruningTables::new(config.connectivity);
        Ok(VoxelAstarPlanner {
            map,
            config,
            tables,
            cost_policy: Box::new(LinearFalloff::default()),
            safe_path_config: SafePathConfig::default(),
            simplifier_config: SimplifierConfig::default(),
            start: None,
            goal: None,
            last_found_goal: None,
        })
    }

    /// Replace the obstacle-penalty curve
    pub fn with_cost_policy(mut self, policy: Box<dyn ObstacleCostPolicy>) -> Self {
        self.cost_policy = policy;
        self
    }

    /// Parameters used by [`PathPlanner::plan`] for the post-search passes
    pub fn with_post_processing(mut self, safe: SafePathConfig, simplifier: SimplifierConfig) -> Self {
        self.safe_path_config = safe;
        self.simplifier_config = simplifier;
        self
    }

    /// Apply a new configuration and rebuild the move tables
    pub fn initialize(&mut self, config: PlannerConfig) -> PlanningResult<()> {
        config.validate()?;
        self.tables = PruningTables::new(config.connectivity);
        self.config = config;
        self.last_found_goal = None;
        Ok(())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn tables(&self) -> &PruningTables {
        &self.tables
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Swap the map handle between calls
    pub fn set_map(&mut self, map: Arc<M>) {
        self.map = map;
    }

    pub fn set_start_and_goal(&mut self, start: WorldPoint, goal: WorldPoint) {
        self.start = Some(start);
        self.goal = Some(goal);
    }

    pub fn set_safe_dist(&mut self, safe_dist: f64) -> PlanningResult<()> {
        let config = PlannerConfig {
            safe_dist,
            clearing_dist: self.config.clearing_dist.max(safe_dist),
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    /// Mark the map as coarsened for planning, see `PlannerConfig::resolution_increased`
    pub fn set_resolution_increased(&mut self, resolution_increased: bool) {
        self.config.resolution_increased = resolution_increased;
    }

    /// World point where the last successful search actually ended
    pub fn last_found_goal(&self) -> Option<WorldPoint> {
        self.last_found_goal
    }

    /// View of the map covering `keys`, for the path passes
    pub fn space_for(&self, keys: &[GridKey]) -> PlanningResult<SearchSpace<'_, M>> {
        let bounds = grid_bounds(&*self.map, keys, self.config.search_margin).ok_or_else(|| {
            PlanningError::InvalidParameter("cannot derive grid bounds from an empty key set".to_string())
        })?;
        Ok(SearchSpace::new(
            &*self.map,
            &self.tables,
            bounds,
            self.config.unknown_is_traversable,
        ))
    }

    /// View of the map restricted to the window around `keys[start_index..=end_index]`
    ///
    /// The window is grown by `path_xy_reserve` and `path_z_reserve` and never
    /// reaches past the bounds a search over `keys` would use.
    pub fn space_for_segment(
        &self,
        keys: &[GridKey],
        start_index: usize,
        end_index: usize,
    ) -> PlanningResult<SearchSpace<'_, M>> {
        let window = map_limits(
            keys,
            start_index,
            end_index,
            self.config.path_xy_reserve,
            self.config.path_z_reserve,
        );
        let bounds = window
            .zip(grid_bounds(&*self.map, keys, self.config.search_margin))
            .and_then(|(window, bounds)| window.intersection(&bounds))
            .ok_or_else(|| {
                PlanningError::InvalidParameter(format!(
                    "no map window around keys {}..={} of {}",
                    start_index,
                    end_index,
                    keys.len()
                ))
            })?;
        Ok(SearchSpace::new(
            &*self.map,
            &self.tables,
            bounds,
            self.config.unknown_is_traversable,
        ))
    }

    /// Plan between the points given to [`set_start_and_goal`](Self::set_start_and_goal)
    pub fn node_path(&mut self) -> PlanningResult<Vec<Node>> {
        match (self.start, self.goal) {
            (Some(start), Some(goal)) => self.plan_node_path(start, goal),
            _ => Err(PlanningError::InvalidParameter(
                "start and goal have not been set".to_string(),
            )),
        }
    }

    /// Plan a node path from `start` to `goal`
    pub fn plan_node_path(&mut self, start: WorldPoint, goal: WorldPoint) -> PlanningResult<Vec<Node>> {
        let report = self.search(&start, &goal)?;
        self.last_found_goal = report.end().map(|n| n.pose);
        Ok(report.path)
    }

    /// Plan through consecutive via points and concatenate the legs
    pub fn node_path_via(&mut self, points: &[WorldPoint]) -> PlanningResult<Vec<Node>> {
        if points.len() < 2 {
            return Err(PlanningError::InvalidParameter(format!(
                "at least two points are required, got {}",
                points.len()
            )));
        }

        let last_leg = points.len() - 2;
        let mut path: Vec<Node> = Vec::new();
        let mut leg_start = points[0];

        for (i, leg_goal) in points.iter().skip(1).enumerate() {
            let report = self.search(&leg_start, leg_goal).map_err(|e| match e {
                PlanningError::InvalidEndpoint { endpoint: Endpoint::Start, reason } if i > 0 => {
                    PlanningError::invalid_endpoint(Endpoint::ViaPoint(i), reason)
                }
                PlanningError::InvalidEndpoint { endpoint: Endpoint::Goal, reason } if i < last_leg => {
                    PlanningError::invalid_endpoint(Endpoint::ViaPoint(i + 1), reason)
                }
                other => other,
            })?;

            let (g_offset, depth_offset) = path
                .last()
                .map(|n| (n.g_cost, n.depth))
                .unwrap_or((0.0, 0));
            let skip = if path.is_empty() { 0 } else { 1 };
            path.extend(report.path.iter().skip(skip).map(|n| {
                let mut n = *n;
                n.g_cost += g_offset;
                n.f_cost = n.g_cost + n.h_cost;
                n.depth += depth_offset;
                n
            }));

            match path.last() {
                Some(end) => leg_start = end.pose,
                None => break,
            }
        }

        self.last_found_goal = path.last().map(|n| n.pose);
        Ok(path)
    }

    /// Run one search from `start` to `goal`
    pub fn search(&self, start: &WorldPoint, goal: &WorldPoint) -> PlanningResult<SearchReport> {
        let started = Instant::now();
        let literal_start = self.map.world_to_key(start);
        let literal_goal = self.map.world_to_key(goal);
        let space = self.space_for(&[literal_start, literal_goal])?;

        let start_key = self.resolve_start(&space, literal_start)?;
        let substituted_start = start_key != literal_start;
        if substituted_start {
            warn!(
                "start {:?} is occupied on the coarse map, starting from {:?}",
                literal_start, start_key
            );
        }

        let goal_key = self.resolve_goal(&space, literal_goal)?;
        let substituted_goal = goal_key != literal_goal;
        if substituted_goal {
            warn!(
                "goal {:?} is not traversable, planning to substitute {:?}",
                literal_goal, goal_key
            );
        }

        let mut report = self.run(&space, start_key, goal_key, goal, started)?;
        report.substituted_start = substituted_start;
        report.substituted_goal = substituted_goal;

        if self.config.verbose {
            debug!(
                "search finished: {:?}, {} nodes, {} expansions in {:?}",
                report.termination,
                report.path.len(),
                report.expansions,
                report.elapsed
            );
        }
        Ok(report)
    }

    fn resolve_start(&self, space: &SearchSpace<'_, M>, start: GridKey) -> PlanningResult<GridKey> {
        match space.occupancy(&start) {
            Occupancy::Free | Occupancy::Unknown => Ok(start),
            Occupancy::OutOfBounds => Err(PlanningError::invalid_endpoint(
                Endpoint::Start,
                "start is outside the map",
            )),
            Occupancy::Occupied if self.config.resolution_increased => self
                .tables
                .moves()
                .map(|m| start.offset_by(m.offset))
                .filter(|k| space.is_traversable(k))
                .min_by_key(|k| Reverse(OrderedFloat(space.clearance(k))))
                .ok_or_else(|| {
                    PlanningError::invalid_endpoint(
                        Endpoint::Start,
                        "start voxel and all of its neighbours are blocked",
                    )
                }),
            Occupancy::Occupied => Err(PlanningError::invalid_endpoint(
                Endpoint::Start,
                "start voxel is occupied",
            )),
        }
    }

    fn resolve_goal(&self, space: &SearchSpace<'_, M>, goal: GridKey) -> PlanningResult<GridKey> {
        if space.is_traversable(&goal) {
            return Ok(goal);
        }
        let reason = match space.occupancy(&goal) {
            Occupancy::Occupied => "goal voxel is occupied",
            Occupancy::Unknown => "goal voxel is unknown",
            _ => "goal is outside the map",
        };
        if !self.config.enable_planning_to_unreachable_goal {
            return Err(PlanningError::invalid_endpoint(Endpoint::Goal, reason));
        }
        self.valid_key_in_neighborhood(space, &goal).ok_or_else(|| {
            PlanningError::invalid_endpoint(
                Endpoint::Goal,
                format!(
                    "{} and no valid key within {} voxels",
                    reason, self.config.goal_search_radius
                ),
            )
        })
    }

    /// Nearest traversable key around `goal`, ties broken by larger clearance
    fn valid_key_in_neighborhood(&self, space: &SearchSpace<'_, M>, goal: &GridKey) -> Option<GridKey> {
        let mut best: Option<(f64, f64, GridKey)> = None;
        for r in 1..=self.config.goal_search_radius {
            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != r {
                            continue;
                        }
                        let key = goal.offset(dx, dy, dz);
                        if !space.is_traversable(&key) {
                            continue;
                        }
                        let dist = goal.euclidean(&key);
                        let clearance = space.clearance(&key);
                        let better = match best {
                            None => true,
                            Some((d, c, _)) => dist < d || (dist == d && clearance > c),
                        };
                        if better {
                            best = Some((dist, clearance, key));
                        }
                    }
                }
            }
            // keys of later shells are at least r + 1 away
            if let Some((d, _, _)) = best {
                if d <= (r + 1) as f64 {
                    break;
                }
            }
        }
        best.map(|(_, _, key)| key)
    }

    fn heuristic(&self, key: &GridKey, goal: &GridKey) -> f64 {
        match self.config.connectivity {
            Connectivity::Six => key.manhattan(goal) as f64,
            Connectivity::TwentySix => key.euclidean(goal),
        }
    }

    fn obstacle_cost(&self, clearance: f64) -> f64 {
        self.cost_policy
            .penalty(clearance, self.config.safe_dist, self.config.clearing_dist)
    }

    fn run(
        &self,
        space: &SearchSpace<'_, M>,
        start_key: GridKey,
        goal_key: GridKey,
        goal_point: &WorldPoint,
        started: Instant,
    ) -> PlanningResult<SearchReport> {
        let timeout = self.config.timeout();
        let tolerance_mode = self.config.enable_planning_to_unreachable_goal;

        let mut open = Frontier::new(self.config.frontier_ordering);
        let mut closed: HashMap<GridKey, Node> = HashMap::new();

        let mut start_node = Node::new(start_key, space.world(&start_key))
            .with_costs(0.0, self.heuristic(&start_key, &goal_key));
        start_node.obs_cost = self.obstacle_cost(space.clearance(&start_key));
        open.push(start_node);

        let mut best = start_node;
        let mut expansions = 0usize;

        loop {
            if started.elapsed() >= timeout {
                let elapsed = started.elapsed();
                if self.config.break_at_timeout {
                    warn!(
                        "planning timed out after {:?}, returning best partial path",
                        elapsed
                    );
                    return Ok(self.report(
                        &open,
                        &closed,
                        &best,
                        Termination::TimedOut,
                        start_key,
                        goal_key,
                        expansions,
                        started,
                    ));
                }
                warn!("planning timed out after {:?}", elapsed);
                return Err(PlanningError::Timeout { elapsed, expansions });
            }

            let current = match open.pop() {
                Some(node) => node,
                None => break,
            };

            if let Some(done) = closed.get(&current.key) {
                if done.g_cost <= current.g_cost {
                    continue;
                }
            }
            closed.insert(current.key, current);
            expansions += 1;

            if current.h_cost < best.h_cost
                || (current.h_cost == best.h_cost && current.g_cost < best.g_cost)
            {
                best = current;
            }

            if self.config.verbose && expansions % 1000 == 0 {
                debug!(
                    "expansions: {}, open: {}, closed: {}",
                    expansions,
                    open.len(),
                    closed.len()
                );
            }

            let termination = if current.key == goal_key {
                Some(Termination::GoalReached)
            } else if tolerance_mode
                && nalgebra::distance(&current.pose, goal_point) <= self.config.goal_tolerance
            {
                Some(Termination::WithinTolerance)
            } else {
                None
            };
            if let Some(termination) = termination {
                return Ok(self.report(
                    &open, &closed, &current, termination, start_key, goal_key, expansions, started,
                ));
            }

            for m in self.tables.moves() {
                let key = current.key.offset_by(m.offset);
                if !space.is_traversable(&key) {
                    continue;
                }
                if !self
                    .tables
                    .is_move_legal(&current.key, m.offset, |k| space.is_traversable(k))
                {
                    continue;
                }

                let obs_cost = self.obstacle_cost(space.clearance(&key));
                let g_cost = current.g_cost + m.cost * (1.0 + obs_cost);

                if let Some(done) = closed.get(&key) {
                    if done.g_cost <= g_cost {
                        continue;
                    }
                    closed.remove(&key);
                }
                if open.conditional_remove(&key, g_cost) == RemoveOutcome::Kept {
                    continue;
                }

                let mut node = Node::new(key, space.world(&key))
                    .with_costs(g_cost, self.heuristic(&key, &goal_key));
                node.parent_key = Some(current.key);
                node.obs_cost = obs_cost;
                node.depth = current.depth + 1;
                open.push(node);
            }
        }

        if tolerance_mode && best.key != start_key {
            warn!(
                "goal {:?} unreachable, returning path to closest node {:?}",
                goal_key, best.key
            );
            return Ok(self.report(
                &open,
                &closed,
                &best,
                Termination::ClosestReachable,
                start_key,
                goal_key,
                expansions,
                started,
            ));
        }

        Err(PlanningError::Unreachable { expansions })
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        open: &Frontier,
        closed: &HashMap<GridKey, Node>,
        end: &Node,
        termination: Termination,
        start_key: GridKey,
        goal_key: GridKey,
        expansions: usize,
        started: Instant,
    ) -> SearchReport {
        let (open_snapshot, closed_snapshot) = if self.config.debug {
            (open.poses(), closed.values().map(|n| n.pose).collect())
        } else {
            (Vec::new(), Vec::new())
        };
        SearchReport {
            path: reconstruct_path(closed, end),
            termination,
            start_key,
            substituted_start: false,
            goal_key,
            substituted_goal: false,
            expansions,
            elapsed: started.elapsed(),
            open_snapshot,
            closed_snapshot,
        }
    }

    /// Keys of a node path
    pub fn key_path(nodes: &[Node]) -> Vec<GridKey> {
        nodes.iter().map(|n| n.key).collect()
    }

    /// World points (voxel centres) of a key path
    pub fn waypoint_path(&self, keys: &[GridKey]) -> Vec<WorldPoint> {
        keys.iter().map(|k| self.map.key_to_world(k)).collect()
    }

    /// Cached poses of a node path
    pub fn node_waypoints(nodes: &[Node]) -> Vec<WorldPoint> {
        nodes.iter().map(|n| n.pose).collect()
    }

    /// Node poses relative to the first node, i.e. in the frame of the start
    pub fn local_path(nodes: &[Node]) -> Vec<WorldPoint> {
        let origin = match nodes.first() {
            Some(node) => node.pose,
            None => return Vec::new(),
        };
        nodes
            .iter()
            .map(|n| WorldPoint::origin() + (n.pose - origin))
            .collect()
    }

    /// Push waypoints away from obstacles, see [`safety::safe_path`]
    pub fn safe_path(&self, keys: &[GridKey], config: &SafePathConfig) -> PlanningResult<SafePath> {
        if keys.is_empty() {
            return Ok(SafePath::default());
        }
        let space = self.space_for_segment(keys, 0, keys.len() - 1)?;
        Ok(safety::safe_path(&space, keys, config))
    }

    /// Run the full simplification pipeline, see [`PathSimplifier::simplify`]
    pub fn simplify(&self, keys: &[GridKey], config: &SimplifierConfig) -> PlanningResult<Vec<GridKey>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let space = self.space_for_segment(keys, 0, keys.len() - 1)?;
        Ok(PathSimplifier::new(&space, config.clone()).simplify(keys))
    }

    /// First waypoint ahead of the robot that has become unsafe, see
    /// [`replan::first_unfeasible_node_in_path`]
    pub fn first_unfeasible_node_in_path(
        &self,
        keys: &[GridKey],
        recent_poses: &[WorldPoint],
        current_pose: &WorldPoint,
        config: &ReplanConfig,
    ) -> Option<ReplanViolation> {
        replan::first_unfeasible_node_in_path(&*self.map, keys, recent_poses, current_pose, config)
    }

    /// Search, inflate and simplify in one call
    pub fn plan_path(&mut self, start: WorldPoint, goal: WorldPoint) -> PlanningResult<PlannedPath> {
        let report = self.search(&start, &goal)?;
        self.last_found_goal = report.end().map(|n| n.pose);

        let raw = Self::key_path(&report.path);
        let safe = self.safe_path(&raw, &self.safe_path_config)?;
        let safety = safe.status();
        if let SafetyStatus::Degraded { unresolved } = &safety {
            warn!(
                "{} waypoint(s) remain closer than {} m to obstacles",
                unresolved.len(),
                self.safe_path_config.safe_dist
            );
        }
        let keys = self.simplify(&safe.keys, &self.simplifier_config)?;

        info!(
            "planned {} waypoints ({} raw nodes, {} expansions, {:?})",
            keys.len(),
            raw.len(),
            report.expansions,
            report.termination
        );

        Ok(PlannedPath {
            waypoints: self.waypoint_path(&keys),
            keys,
            safety,
            termination: report.termination,
        })
    }
}

impl<M: OccupancyMap + ?Sized> PathPlanner for VoxelAstarPlanner<M> {
    fn plan(&mut self, start: WorldPoint, goal: WorldPoint) -> PlanningResult<Vec<WorldPoint>> {
        self.plan_path(start, goal).map(|p| p.waypoints)
    }
}

/// Follow parent keys through the closed set from `end` back to the start
fn reconstruct_path(closed: &HashMap<GridKey, Node>, end: &Node) -> Vec<Node> {
    let mut path = vec![*end];
    let mut parent = end.parent_key;
    while let Some(key) = parent {
        match closed.get(&key) {
            Some(node) if path.len() <= closed.len() => {
                path.push(*node);
                parent = node.parent_key;
            }
            _ => break,
        }
    }
    path.reverse();
    path
}
