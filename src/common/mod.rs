//! Common types, traits, and error definitions for voxel_planner
//!
//! This module provides the foundational building blocks shared by the
//! map adapter and the planner.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
