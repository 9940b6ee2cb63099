use crate::{
    BsdfEval, PathState, QueuesView, Ray, RayStatesView, RngState, ShaderData,
    SyncCell,
};

/// Kernel-side view of one per-slot array.
#[derive(Clone, Copy)]
pub struct StorageView<'a, T> {
    items: &'a [SyncCell<T>],
}

impl<'a, T> StorageView<'a, T>
where
    T: Copy,
{
    pub fn new(items: &'a [SyncCell<T>]) -> Self {
        Self { items }
    }

    pub fn len(&self) -> u32 {
        self.items.len() as u32
    }

    /// # Safety
    ///
    /// The calling invocation must be the only one accessing `ray_index` in
    /// this dispatch.
    pub unsafe fn read(&self, ray_index: u32) -> T {
        self.items[ray_index as usize].read()
    }

    /// # Safety
    ///
    /// See: [`Self::read()`].
    pub unsafe fn write(&self, ray_index: u32, value: T) {
        self.items[ray_index as usize].write(value);
    }
}

/// Everything a split kernel can touch: the ray slot store (as parallel
/// arrays indexed by slot) and the queues.
#[derive(Clone, Copy)]
pub struct SplitState<'a> {
    pub ray_state: RayStatesView<'a>,
    pub rng: StorageView<'a, RngState>,
    pub path_state: StorageView<'a, PathState>,
    pub sd: StorageView<'a, ShaderData>,

    /// Valid while the slot has `RayFlags::SHADOW_RAY_CAST_DL` set.
    pub light_ray: StorageView<'a, Ray>,

    /// Valid while the slot has `RayFlags::SHADOW_RAY_CAST_DL` set.
    pub bsdf_eval: StorageView<'a, BsdfEval>,

    /// Valid while the slot has `RayFlags::SHADOW_RAY_CAST_DL` set.
    pub is_lamp: StorageView<'a, bool>,

    pub queues: QueuesView<'a>,
}
