//! Utility modules for voxel_planner

pub mod visualization;

pub use visualization::{colors, PathStyle, PointStyle, Projection, VoxelPlot};
