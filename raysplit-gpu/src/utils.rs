mod sampling;
mod sync_cell;

pub use self::sampling::*;
pub use self::sync_cell::*;
