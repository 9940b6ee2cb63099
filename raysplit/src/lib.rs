//! Host side of the split ray scheduler: ray slots, queues, the CPU device
//! that runs kernels workgroup-by-workgroup and the pipeline that drives the
//! passes round after round.

#![allow(clippy::len_without_is_empty)]

mod buffers;
mod config;
mod device;
mod light;
mod lights;
mod passes;
mod pipeline;
mod queues;
mod slots;
mod utils;

pub(crate) use self::buffers::*;
pub use self::config::*;
pub use self::device::*;
pub use self::light::*;
pub use self::lights::*;
pub use self::passes::*;
pub use self::pipeline::*;
pub use self::queues::*;
pub use self::slots::*;
pub use raysplit_gpu as gpu;
