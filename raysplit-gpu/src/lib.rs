//! Common structs, algorithms etc. used by the split kernels and the host.
//!
//! Everything here operates on a single invocation of a kernel: the data of
//! one ray slot, one entry of a queue, one lane of a workgroup. Nothing in
//! this crate spawns threads; the execution substrate is provided through
//! the [`Workgroup`] trait.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod bsdf_eval;
mod direct_lighting;
mod light;
mod passes;
mod path_state;
mod queue;
mod ray;
mod ray_state;
mod rng;
mod shader_data;
mod split_state;
mod utils;
mod workgroup;

pub use self::bsdf_eval::*;
pub use self::direct_lighting::*;
pub use self::light::*;
pub use self::passes::*;
pub use self::path_state::*;
pub use self::queue::*;
pub use self::ray::*;
pub use self::ray_state::*;
pub use self::rng::*;
pub use self::shader_data::*;
pub use self::split_state::*;
pub use self::utils::*;
pub use self::workgroup::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;

    pub use crate::*;
}

/// Largest workgroup the local compaction primitive supports.
pub const MAX_WORKGROUP_SIZE: u32 = 1024;

/// Offset used to move a ray origin away from its surface so that the shadow
/// ray doesn't intersect the surface it starts at.
pub const RAY_OFFSET: f32 = 0.0001;
