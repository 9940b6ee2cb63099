use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

/// Fixed-size array of atomics, shared with kernels as a plain slice.
#[derive(Debug)]
pub struct AtomicBuffer {
    items: Box<[AtomicU32]>,
}

impl AtomicBuffer {
    pub fn new(label: impl AsRef<str>, len: usize, value: u32) -> Self {
        debug!("Allocating atomic buffer `{}`; len={len}", label.as_ref());

        let items = (0..len).map(|_| AtomicU32::new(value)).collect();

        Self { items }
    }

    pub fn get(&self, idx: usize) -> u32 {
        self.items[idx].load(Ordering::Relaxed)
    }

    pub fn set(&mut self, idx: usize, value: u32) {
        *self.items[idx].get_mut() = value;
    }

    pub fn fill(&mut self, range: std::ops::Range<usize>, value: u32) {
        for item in &mut self.items[range] {
            *item.get_mut() = value;
        }
    }

    pub fn as_slice(&self) -> &[AtomicU32] {
        &self.items
    }
}
