// Voxel A* planning demo
//
// Plans through a walled volume with random pillars, inflates and simplifies
// the path, then saves top and side projections.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use voxel_planner::mapping::VoxelMap;
use voxel_planner::path_planning::{PlannerConfig, SafePathConfig, SimplifierConfig, VoxelAstarPlanner};
use voxel_planner::utils::{colors, PathStyle, Projection, VoxelPlot};
use voxel_planner::{GridKey, OccupancyMap, PlanningResult, WorldPoint};

const SIZE: [i32; 3] = [40, 30, 10];

fn build_map(seed: u64) -> PlanningResult<VoxelMap> {
    let mut map = VoxelMap::new(WorldPoint::origin(), 0.5, SIZE)?;

    // wall with a window
    map.add_box(GridKey::new(20, 0, 0), GridKey::new(21, 29, 9));
    for y in 12..18 {
        for z in 3..7 {
            map.set_free(GridKey::new(20, y, z));
            map.set_free(GridKey::new(21, y, z));
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..25 {
        let x = rng.gen_range(2..SIZE[0] - 2);
        let y = rng.gen_range(2..SIZE[1] - 2);
        if (18..24).contains(&x) {
            continue;
        }
        let height = rng.gen_range(3..SIZE[2]);
        map.add_box(GridKey::new(x, y, 0), GridKey::new(x, y, height - 1));
    }
    Ok(map)
}

fn run() -> PlanningResult<()> {
    let start = WorldPoint::new(2.0, 2.0, 1.0);
    let goal = WorldPoint::new(18.0, 13.0, 2.5);
    let mut map = build_map(7)?;
    let (start_key, goal_key) = (map.world_to_key(&start), map.world_to_key(&goal));
    map.set_free(start_key);
    map.set_free(goal_key);
    let map = Arc::new(map);

    let config = PlannerConfig {
        planning_timeout: 2.0,
        safe_dist: 0.5,
        clearing_dist: 1.5,
        enable_planning_to_unreachable_goal: true,
        debug: true,
        verbose: true,
        ..Default::default()
    };
    let mut planner = VoxelAstarPlanner::new(map.clone(), config)?.with_post_processing(
        SafePathConfig {
            safe_dist: 1.0,
            ..Default::default()
        },
        SimplifierConfig::default(),
    );

    let report = planner.search(&start, &goal)?;
    let raw = VoxelAstarPlanner::<VoxelMap>::node_waypoints(&report.path);
    let planned = planner.plan_path(start, goal)?;
    info!(
        "raw path: {} nodes, final path: {} waypoints, safety: {:?}",
        raw.len(),
        planned.waypoints.len(),
        planned.safety
    );

    let obstacles: Vec<WorldPoint> = map.occupied_keys().map(|k| map.key_to_world(k)).collect();
    for (projection, file) in [(Projection::Xy, "voxel_astar_xy.png"), (Projection::Xz, "voxel_astar_xz.png")] {
        let mut plot = VoxelPlot::new(projection);
        plot.set_title("Voxel A*")
            .plot_obstacles(&obstacles)
            .plot_search(&report)
            .plot_path(&raw, &PathStyle::new(colors::RAW_PATH, "Raw").with_line_width(1.0))
            .plot_path(&planned.waypoints, &PathStyle::default())
            .plot_start(start)
            .plot_goal(goal);
        if let Err(e) = plot.save_png(file, 800, 600) {
            error!("failed to save {}: {}", file, e);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        error!("planning failed: {}", e);
        std::process::exit(1);
    }
}
