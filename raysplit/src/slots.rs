use derivative::Derivative;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raysplit_gpu::{
    BsdfEval, PathState, Ray, RayFlags, RayState, RayStatesView, RayStatus,
    RngState, ShaderData, SplitState,
};

use crate::{AtomicBuffer, Queues, StorageBuffer};

/// The ray slot store: per-slot state of every path in flight, laid out as
/// parallel arrays indexed by slot.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RaySlots {
    capacity: u32,

    #[derivative(Debug = "ignore")]
    ray_state: AtomicBuffer,

    #[derivative(Debug = "ignore")]
    rng: StorageBuffer<RngState>,

    #[derivative(Debug = "ignore")]
    path_state: StorageBuffer<PathState>,

    #[derivative(Debug = "ignore")]
    sd: StorageBuffer<ShaderData>,

    #[derivative(Debug = "ignore")]
    light_ray: StorageBuffer<Ray>,

    #[derivative(Debug = "ignore")]
    bsdf_eval: StorageBuffer<BsdfEval>,

    #[derivative(Debug = "ignore")]
    is_lamp: StorageBuffer<bool>,
}

impl RaySlots {
    pub fn new(capacity: u32) -> Self {
        debug!("Allocating ray slots; capacity={capacity}");

        let len = capacity as usize;

        Self {
            capacity,
            ray_state: AtomicBuffer::new(
                "raysplit_ray_state",
                len,
                RayState::default().bits(),
            ),
            rng: StorageBuffer::new("raysplit_rng", len),
            path_state: StorageBuffer::new("raysplit_path_state", len),
            sd: StorageBuffer::new("raysplit_sd", len),
            light_ray: StorageBuffer::new("raysplit_light_ray", len),
            bsdf_eval: StorageBuffer::new("raysplit_bsdf_eval", len),
            is_lamp: StorageBuffer::new("raysplit_is_lamp", len),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns a snapshot of given slot.
    pub fn get(&self, idx: u32) -> Slot {
        let i = self.idx(idx);

        Slot {
            state: self.state(idx),
            rng: self.rng.get(i),
            path_state: self.path_state.get(i),
            sd: self.sd.get(i),
            light_ray: self.light_ray.get(i),
            bsdf_eval: self.bsdf_eval.get(i),
            is_lamp: self.is_lamp.get(i),
        }
    }

    pub fn state(&self, idx: u32) -> RayState {
        RayState::from_bits(self.ray_state.get(self.idx(idx)))
    }

    /// Moves the slot into `status`, dropping all of its flags.
    ///
    /// In debug builds this panics on transitions that the ray lifecycle
    /// doesn't allow (see [`RayStatus::can_become()`]).
    pub fn set_state(&mut self, idx: u32, status: RayStatus) {
        let curr = self.state(idx).status();

        debug_assert!(
            curr == status || curr.can_become(status),
            "slot {idx} can't become {status:?} (it's {curr:?})"
        );

        self.ray_state.set(self.idx(idx), RayState::new(status).bits());
    }

    pub fn add_state_flag(&mut self, idx: u32, flags: RayFlags) {
        let state = self.state(idx).with_flags(flags);

        self.ray_state.set(self.idx(idx), state.bits());
    }

    pub fn remove_state_flag(&mut self, idx: u32, flags: RayFlags) {
        let state = self.state(idx).without_flags(flags);

        self.ray_state.set(self.idx(idx), state.bits());
    }

    pub fn is_state(&self, idx: u32, status: RayStatus) -> bool {
        self.state(idx).is(status)
    }

    pub fn has_flag(&self, idx: u32, flags: RayFlags) -> bool {
        self.state(idx).has(flags)
    }

    /// Puts a fresh path into a slot that's either unused or waiting to be
    /// regenerated.
    pub fn regenerate(
        &mut self,
        idx: u32,
        path_state: PathState,
        sd: ShaderData,
    ) {
        let i = self.idx(idx);

        self.path_state.set(i, path_state);
        self.sd.set(i, sd);
        self.set_state(idx, RayStatus::Regenerated);
    }

    pub fn set_rng(&mut self, idx: u32, rng: RngState) {
        let i = self.idx(idx);

        self.rng.set(i, rng);
    }

    pub fn set_path_state(&mut self, idx: u32, path_state: PathState) {
        let i = self.idx(idx);

        self.path_state.set(i, path_state);
    }

    pub fn set_shader_data(&mut self, idx: u32, sd: ShaderData) {
        let i = self.idx(idx);

        self.sd.set(i, sd);
    }

    /// Returns how many slots are in given status.
    pub fn count(&self, status: RayStatus) -> u32 {
        (0..self.capacity)
            .filter(|&idx| self.is_state(idx, status))
            .count() as u32
    }

    /// Returns how many slots still have a path being traced.
    pub fn in_flight(&self) -> u32 {
        (0..self.capacity)
            .filter(|&idx| self.state(idx).status().is_in_flight())
            .count() as u32
    }

    /// Gives every slot its own random number generator state, derived
    /// deterministically from `seed`.
    pub fn seed_rng(&mut self, seed: u64) {
        debug!("Seeding ray slots; seed={seed}");

        let mut rng = StdRng::seed_from_u64(seed);

        for item in self.rng.iter_mut() {
            *item = RngState::new(rng.gen());
        }
    }

    /// Returns everything kernels need to access the slots and the queues.
    ///
    /// The slots stay mutably borrowed for as long as the view lives, which
    /// keeps the host from observing half-written slots.
    pub fn view<'a>(&'a mut self, queues: &'a mut Queues) -> SplitState<'a> {
        let this: &'a Self = self;
        let queues: &'a Queues = queues;

        SplitState {
            ray_state: RayStatesView::new(this.ray_state.as_slice()),
            rng: this.rng.view(),
            path_state: this.path_state.view(),
            sd: this.sd.view(),
            light_ray: this.light_ray.view(),
            bsdf_eval: this.bsdf_eval.view(),
            is_lamp: this.is_lamp.view(),
            queues: queues.view(),
        }
    }

    fn idx(&self, idx: u32) -> usize {
        assert!(
            idx < self.capacity,
            "slot {idx} is out of range (capacity={})",
            self.capacity
        );

        idx as usize
    }
}

/// Snapshot of a single ray slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub state: RayState,
    pub rng: RngState,
    pub path_state: PathState,
    pub sd: ShaderData,

    /// Valid only while `state` has `RayFlags::SHADOW_RAY_CAST_DL`.
    pub light_ray: Ray,

    /// Valid only while `state` has `RayFlags::SHADOW_RAY_CAST_DL`.
    pub bsdf_eval: BsdfEval,

    /// Valid only while `state` has `RayFlags::SHADOW_RAY_CAST_DL`.
    pub is_lamp: bool,
}
