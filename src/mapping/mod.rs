// Map adapters

pub mod voxel_map;

pub use voxel_map::*;
