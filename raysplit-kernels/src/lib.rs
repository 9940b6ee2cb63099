//! Entry points of the split kernels.
//!
//! Each module exposes a `main()` that is executed once per lane of a
//! dispatch; see `raysplit::Device` for the execution substrate.

pub mod direct_lighting;
pub mod queue_enqueue;
