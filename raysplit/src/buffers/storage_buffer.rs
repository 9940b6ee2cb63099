use std::any;

use log::debug;
use raysplit_gpu::{StorageView, SyncCell};

/// Fixed-size array of per-slot data, shared with kernels through
/// [`StorageView`].
pub struct StorageBuffer<T> {
    items: Box<[SyncCell<T>]>,
}

impl<T> StorageBuffer<T>
where
    T: Copy + Default + Send,
{
    pub fn new(label: impl AsRef<str>, len: usize) -> Self {
        let label = label.as_ref();

        debug!(
            "Allocating storage buffer `{label}`; ty={}, len={len}",
            any::type_name::<T>(),
        );

        let items = (0..len).map(|_| SyncCell::new(T::default())).collect();

        Self { items }
    }

    pub fn get(&self, idx: usize) -> T {
        // Safety: kernels can only access this buffer through a view that
        // borrows the owner mutably, so nothing else is writing right now
        unsafe { self.items[idx].read() }
    }

    pub fn set(&mut self, idx: usize, value: T) {
        *self.items[idx].get_mut() = value;
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().map(|item| item.get_mut())
    }

    /// Returns a view for kernels.
    ///
    /// Callers must hold the buffer's owner mutably for as long as the view
    /// lives; see [`Self::get()`].
    pub fn view(&self) -> StorageView<'_, T> {
        StorageView::new(&self.items)
    }
}
