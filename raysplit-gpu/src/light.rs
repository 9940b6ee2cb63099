use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::{BsdfEval, PathState, Ray, ShaderData};

/// A point sampled on a light source, as seen from a shading point.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightSample {
    /// Sampled point on the light.
    pub position: Vec3,

    /// Normal of the light at the sampled point.
    pub normal: Vec3,

    /// Direction from the shading point towards the light.
    pub direction: Vec3,

    /// Distance from the shading point to the light; `f32::MAX` for lights
    /// at infinity.
    pub t: f32,

    pub u: f32,
    pub v: f32,

    /// Probability density of this sample, including the probability of
    /// picking this particular light.
    pub pdf: f32,

    /// Extra factor applied to the light's emission.
    pub eval_fac: f32,

    pub light_id: u32,

    /// One of `TYPE_*`.
    pub ty: u32,
}

impl LightSample {
    pub const TYPE_POINT: u32 = 0;
    pub const TYPE_DISTANT: u32 = 1;
    pub const TYPE_BACKGROUND: u32 = 2;
    pub const TYPE_AREA: u32 = 3;
    pub const TYPE_TRIANGLE: u32 = 4;

    /// Returns whether this sample comes from an explicit lamp, as opposed to
    /// emissive geometry or the background.
    pub fn is_lamp(&self) -> bool {
        self.ty != Self::TYPE_BACKGROUND && self.ty != Self::TYPE_TRIANGLE
    }
}

/// Outcome of evaluating a light sample against a shading point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectEmission {
    /// Shadow ray that has to be tested for occlusion before `eval` can be
    /// accumulated.
    pub ray: Ray,
    pub eval: BsdfEval,
    pub is_lamp: bool,
}

/// Light sampling and evaluation, provided by the shading subsystem.
pub trait Illumination {
    /// Picks a light (using `randt`) and a point on it (using `randu` and
    /// `randv`) as seen from `position`.
    ///
    /// Returns `None` if no light can contribute at this point.
    #[allow(clippy::too_many_arguments)]
    fn light_sample(
        &self,
        randt: f32,
        randu: f32,
        randv: f32,
        time: f32,
        position: Vec3,
        bounce: u32,
    ) -> Option<LightSample>;

    /// Evaluates the light's emission and the surface's BSDF for given
    /// sample and prepares the shadow ray.
    ///
    /// `emission_sd` is scratch space for shading the light itself.
    /// `terminate` is the russian-roulette threshold drawn for this sample.
    ///
    /// Returns `None` if the sample doesn't contribute or got terminated.
    fn direct_emission(
        &self,
        sd: &ShaderData,
        emission_sd: &mut ShaderData,
        ls: &LightSample,
        state: &PathState,
        terminate: f32,
    ) -> Option<DirectEmission>;

    /// Inverse of the light russian-roulette threshold; zero disables light
    /// russian roulette.
    fn light_inv_rr_threshold(&self) -> f32 {
        0.0
    }
}
