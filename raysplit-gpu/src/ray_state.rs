use core::ops;
use core::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

/// Primary lifecycle status of a ray slot.
///
/// Transitions (see [`Self::can_become()`]):
///
/// ```text
/// Inactive ------> Regenerated ------> Active ---+---> HitBackground
///    ^                 ^                 |  ^    |          |
///    |                 |                 +--+    +---> UpdateBuffer
///    |                 |                                    |
///    +-----------------+------- ToRegenerate <--------------+
/// ```
///
/// A slot stays `Active` for as many rounds as its path keeps bouncing;
/// casting deferred shadow rays is expressed through [`RayFlags`], not
/// through a status change.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RayStatus {
    Active = 0,
    Inactive = 1,
    UpdateBuffer = 2,
    HitBackground = 3,
    ToRegenerate = 4,
    Regenerated = 5,
}

impl RayStatus {
    pub const ALL: [Self; 6] = [
        Self::Active,
        Self::Inactive,
        Self::UpdateBuffer,
        Self::HitBackground,
        Self::ToRegenerate,
        Self::Regenerated,
    ];

    pub fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Active,
            1 => Self::Inactive,
            2 => Self::UpdateBuffer,
            3 => Self::HitBackground,
            4 => Self::ToRegenerate,
            5 => Self::Regenerated,
            _ => panic!("invalid ray status: {bits}"),
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Returns whether a slot in this status may be moved into `next`.
    pub fn can_become(self, next: Self) -> bool {
        use RayStatus::*;

        matches!(
            (self, next),
            (Inactive, Regenerated)
                | (Regenerated, Active)
                | (Regenerated, Inactive)
                | (Active, Active)
                | (Active, HitBackground)
                | (Active, UpdateBuffer)
                | (Active, Inactive)
                | (HitBackground, UpdateBuffer)
                | (UpdateBuffer, ToRegenerate)
                | (UpdateBuffer, Inactive)
                | (ToRegenerate, Regenerated)
        )
    }

    /// Returns whether the slot's path is still being traced.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Active | Self::Regenerated)
    }
}

/// Additive flags stored next to [`RayStatus`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct RayFlags(u32);

impl RayFlags {
    pub const NONE: Self = Self(0);

    /// The ray must run the deferred ambient-occlusion shadow test.
    pub const SHADOW_RAY_CAST_AO: Self = Self(1 << 4);

    /// The ray must run the deferred direct-lighting shadow test; the slot's
    /// `light_ray`, `bsdf_eval` and `is_lamp` are valid while this is set.
    pub const SHADOW_RAY_CAST_DL: Self = Self(1 << 5);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ops::BitOr for RayFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for RayFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Packed state of a ray slot: status in the low nibble, flags above it.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct RayState(u32);

impl RayState {
    const STATUS_MASK: u32 = 0x0f;

    pub fn new(status: RayStatus) -> Self {
        Self(status.bits())
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn status(self) -> RayStatus {
        RayStatus::from_bits(self.0 & Self::STATUS_MASK)
    }

    pub fn flags(self) -> RayFlags {
        RayFlags(self.0 & !Self::STATUS_MASK)
    }

    pub fn is(self, status: RayStatus) -> bool {
        self.0 & Self::STATUS_MASK == status.bits()
    }

    pub fn has(self, flags: RayFlags) -> bool {
        self.flags().contains(flags)
    }

    pub fn with_flags(self, flags: RayFlags) -> Self {
        Self(self.0 | flags.bits())
    }

    pub fn without_flags(self, flags: RayFlags) -> Self {
        Self(self.0 & !flags.bits())
    }
}

impl Default for RayState {
    fn default() -> Self {
        Self::new(RayStatus::Inactive)
    }
}

impl core::fmt::Debug for RayState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RayState")
            .field("status", &self.status())
            .field("flags", &self.flags())
            .finish()
    }
}

/// Kernel-side view of the per-slot ray states.
///
/// Every operation is a single atomic access, so flags added by one kernel
/// never clobber flags added by another one.
#[derive(Clone, Copy)]
pub struct RayStatesView<'a> {
    items: &'a [AtomicU32],
}

impl<'a> RayStatesView<'a> {
    pub fn new(items: &'a [AtomicU32]) -> Self {
        Self { items }
    }

    pub fn len(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn get(&self, ray_index: u32) -> RayState {
        RayState(self.items[ray_index as usize].load(Ordering::Relaxed))
    }

    /// Overwrites the state, dropping all flags.
    pub fn set_status(&self, ray_index: u32, status: RayStatus) {
        self.items[ray_index as usize].store(status.bits(), Ordering::Relaxed);
    }

    pub fn add_flag(&self, ray_index: u32, flags: RayFlags) {
        self.items[ray_index as usize]
            .fetch_or(flags.bits(), Ordering::Relaxed);
    }

    pub fn remove_flag(&self, ray_index: u32, flags: RayFlags) {
        self.items[ray_index as usize]
            .fetch_and(!flags.bits(), Ordering::Relaxed);
    }

    pub fn is_state(&self, ray_index: u32, status: RayStatus) -> bool {
        self.get(ray_index).is(status)
    }

    pub fn has_flag(&self, ray_index: u32, flags: RayFlags) -> bool {
        self.get(ray_index).has(flags)
    }
}
