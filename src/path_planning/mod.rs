// Path Planning algorithms module

pub mod voxel_astar;

pub use voxel_astar::*;
