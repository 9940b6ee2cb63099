use bytemuck::{Pod, Zeroable};

use crate::{PRNG_BASE_NUM, PRNG_BOUNCE_NUM};

/// Per-path bookkeeping: bounce counters, sampling offsets and PDFs.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PathState {
    /// Combination of `FLAG_*` describing the last scattering event.
    pub flag: u32,

    pub bounce: u32,
    pub diffuse_bounce: u32,
    pub glossy_bounce: u32,
    pub transmission_bounce: u32,
    pub transparent_bounce: u32,

    /// First RNG dimension of the current bounce.
    pub rng_offset: u32,
    pub sample: u32,
    pub num_samples: u32,

    pub ray_pdf: f32,
    pub min_ray_pdf: f32,
    pub ray_t: f32,
}

impl PathState {
    pub const FLAG_CAMERA: u32 = 1 << 0;
    pub const FLAG_REFLECT: u32 = 1 << 1;
    pub const FLAG_TRANSMIT: u32 = 1 << 2;
    pub const FLAG_DIFFUSE: u32 = 1 << 3;
    pub const FLAG_GLOSSY: u32 = 1 << 4;
    pub const FLAG_SINGULAR: u32 = 1 << 5;
    pub const FLAG_TRANSPARENT: u32 = 1 << 6;

    pub fn new(sample: u32, num_samples: u32) -> Self {
        Self {
            flag: Self::FLAG_CAMERA,
            rng_offset: PRNG_BASE_NUM,
            sample,
            num_samples,
            min_ray_pdf: f32::MAX,
            ..Default::default()
        }
    }

    /// Advances the path past a scattering event described by `label`.
    pub fn next(&mut self, label: u32) {
        if label & Self::FLAG_TRANSPARENT != 0 {
            self.flag |= Self::FLAG_TRANSPARENT;
            self.transparent_bounce += 1;
        } else {
            self.flag = label;
            self.bounce += 1;

            if label & Self::FLAG_DIFFUSE != 0 {
                self.diffuse_bounce += 1;
            } else if label & Self::FLAG_GLOSSY != 0 {
                self.glossy_bounce += 1;
            }

            if label & Self::FLAG_TRANSMIT != 0 {
                self.transmission_bounce += 1;
            }
        }

        self.rng_offset += PRNG_BOUNCE_NUM;
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flag & flag != 0
    }
}
