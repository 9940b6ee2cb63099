mod atomic_buffer;
mod storage_buffer;

pub use self::atomic_buffer::*;
pub use self::storage_buffer::*;
