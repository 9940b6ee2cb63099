use glam::Vec3;
use raysplit_gpu::LightSample;

/// A light source, as seen by [`crate::Lights`].
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub(crate) ty: u32,

    /// Center of point lights; unused for other kinds.
    pub(crate) position: Vec3,

    /// Direction the light travels in, for distant lights.
    pub(crate) direction: Vec3,

    pub(crate) radius: f32,
    pub(crate) color: Vec3,

    /// Distance past which the light doesn't contribute; zero for unlimited.
    pub(crate) range: f32,

    /// Deepest bounce at which the light still gets sampled.
    pub(crate) max_bounces: u32,
}

impl Light {
    /// Spherical light of given radius (zero for a proper point light), with
    /// `color` being its total emitted power.
    pub fn point(position: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            ty: LightSample::TYPE_POINT,
            position,
            direction: Vec3::ZERO,
            radius: radius.max(0.0),
            color,
            range: 0.0,
            max_bounces: u32::MAX,
        }
    }

    /// Light at infinity shining along `direction` (e.g. the sun).
    pub fn distant(direction: Vec3, color: Vec3) -> Self {
        Self {
            ty: LightSample::TYPE_DISTANT,
            position: Vec3::ZERO,
            direction: direction.normalize_or_zero(),
            radius: 0.0,
            color,
            range: 0.0,
            max_bounces: u32::MAX,
        }
    }

    /// Uniform environment light.
    pub fn background(color: Vec3) -> Self {
        Self {
            ty: LightSample::TYPE_BACKGROUND,
            position: Vec3::ZERO,
            direction: Vec3::ZERO,
            radius: 0.0,
            color,
            range: 0.0,
            max_bounces: u32::MAX,
        }
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range.max(0.0);
        self
    }

    pub fn with_max_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    pub fn ty(&self) -> u32 {
        self.ty
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub(crate) fn is_in_range(&self, distance: f32) -> bool {
        self.range == 0.0 || distance <= self.range
    }
}
