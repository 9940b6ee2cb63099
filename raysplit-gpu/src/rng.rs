use bytemuck::{Pod, Zeroable};

use crate::PathState;

// Dimensions consumed once per path, before the first bounce
pub const PRNG_BASE_U: u32 = 0;
pub const PRNG_BASE_V: u32 = 1;
pub const PRNG_FILTER_U: u32 = 2;
pub const PRNG_FILTER_V: u32 = 3;
pub const PRNG_LENS_U: u32 = 4;
pub const PRNG_LENS_V: u32 = 5;
pub const PRNG_TIME: u32 = 6;
pub const PRNG_UNUSED: u32 = 7;
pub const PRNG_BASE_NUM: u32 = 8;

// Dimensions consumed per bounce, relative to `PathState::rng_offset`
pub const PRNG_BSDF_U: u32 = 0;
pub const PRNG_BSDF_V: u32 = 1;
pub const PRNG_BSDF: u32 = 2;
pub const PRNG_LIGHT: u32 = 3;
pub const PRNG_LIGHT_U: u32 = 4;
pub const PRNG_LIGHT_V: u32 = 5;
pub const PRNG_LIGHT_TERMINATE: u32 = 6;
pub const PRNG_TERMINATE: u32 = 7;
pub const PRNG_BOUNCE_NUM: u32 = 8;

/// Per-slot random number generator state.
///
/// Samples are a pure function of (state, sample number, dimension), so
/// drawing numbers never mutates the state and two different dimensions of
/// the same path never correlate.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RngState(u32);

impl RngState {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns a uniform sample in range `<0.0, 1.0)` for given sample
    /// number and absolute dimension.
    pub fn sample_1d(self, sample: u32, dimension: u32) -> f32 {
        let stream = Self::hash(self.0 ^ Self::hash(dimension));
        let hash = Self::hash(stream ^ sample);

        // Keep 24 bits so that the result is exactly representable and never
        // rounds up to 1.0
        (hash >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }

    fn hash(value: u32) -> u32 {
        let state = value.wrapping_mul(747796405).wrapping_add(2891336453);

        let word = ((state >> ((state >> 28) + 4)) ^ state)
            .wrapping_mul(277803737);

        (word >> 22) ^ word
    }
}

/// Draws a sample for given per-bounce dimension of the path.
pub fn path_state_rng_1d(
    rng: RngState,
    state: &PathState,
    dimension: u32,
) -> f32 {
    rng.sample_1d(state.sample, state.rng_offset + dimension)
}

/// Draws a pair of samples from `dimension` and `dimension + 1`.
pub fn path_state_rng_2d(
    rng: RngState,
    state: &PathState,
    dimension: u32,
) -> (f32, f32) {
    (
        path_state_rng_1d(rng, state, dimension),
        path_state_rng_1d(rng, state, dimension + 1),
    )
}

/// Draws the russian-roulette threshold for light samples; returns zero if
/// light russian roulette is disabled (`light_inv_rr_threshold == 0.0`).
pub fn path_state_rng_light_termination(
    rng: RngState,
    state: &PathState,
    light_inv_rr_threshold: f32,
) -> f32 {
    if light_inv_rr_threshold > 0.0 {
        path_state_rng_1d(rng, state, PRNG_LIGHT_TERMINATE)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range() {
        for seed in 0..64 {
            for dimension in 0..64 {
                let sample = RngState::new(seed * 7919).sample_1d(3, dimension);

                assert!((0.0..1.0).contains(&sample), "{sample}");
            }
        }
    }

    #[test]
    fn determinism() {
        let state = PathState::new(5, 16);
        let rng = RngState::new(0xcafebabe);

        assert_eq!(
            path_state_rng_1d(rng, &state, PRNG_LIGHT).to_bits(),
            path_state_rng_1d(rng, &state, PRNG_LIGHT).to_bits(),
        );

        assert_eq!(
            path_state_rng_2d(rng, &state, PRNG_LIGHT_U),
            path_state_rng_2d(rng, &state, PRNG_LIGHT_U),
        );
    }

    #[test]
    fn dimensions_differ() {
        let state = PathState::new(0, 1);
        let rng = RngState::new(1234);

        let light = path_state_rng_1d(rng, &state, PRNG_LIGHT);
        let (light_u, light_v) = path_state_rng_2d(rng, &state, PRNG_LIGHT_U);
        let terminate = path_state_rng_1d(rng, &state, PRNG_LIGHT_TERMINATE);

        assert_ne!(light, light_u);
        assert_ne!(light_u, light_v);
        assert_ne!(light_v, terminate);

        // The next bounce uses different numbers
        let mut next = state;
        next.next(PathState::FLAG_REFLECT | PathState::FLAG_DIFFUSE);

        assert_ne!(light, path_state_rng_1d(rng, &next, PRNG_LIGHT));
    }

    #[test]
    fn light_termination() {
        let state = PathState::new(0, 1);
        let rng = RngState::new(77);

        assert_eq!(0.0, path_state_rng_light_termination(rng, &state, 0.0));

        assert_eq!(
            path_state_rng_1d(rng, &state, PRNG_LIGHT_TERMINATE),
            path_state_rng_light_termination(rng, &state, 20.0),
        );
    }
}
