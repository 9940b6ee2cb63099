use core::cell::UnsafeCell;

/// A cell that can be shared between the lanes of a dispatch.
///
/// Kernels access slot data without locks: the pipeline guarantees that at
/// most one invocation touches a given slot during a dispatch. That guarantee
/// can't be expressed in the type system, hence reads and writes are
/// `unsafe`.
#[repr(transparent)]
#[derive(Default)]
pub struct SyncCell<T>(UnsafeCell<T>);

// Safety: all shared access goes through the `unsafe` methods below, whose
// callers promise not to race
unsafe impl<T> Sync for SyncCell<T> where T: Send {}

impl<T> SyncCell<T> {
    pub fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.0.into_inner()
    }
}

impl<T> SyncCell<T>
where
    T: Copy,
{
    /// # Safety
    ///
    /// No other thread may be writing this cell at the same time.
    pub unsafe fn read(&self) -> T {
        *self.0.get()
    }

    /// # Safety
    ///
    /// No other thread may be reading or writing this cell at the same time.
    pub unsafe fn write(&self, value: T) {
        *self.0.get() = value;
    }
}
