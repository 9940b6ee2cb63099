use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::RAY_OFFSET;

/// Result of shading a surface intersection.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderData {
    pub position: Vec3,

    /// Shading normal, facing the incoming ray.
    pub normal: Vec3,

    /// Geometric normal, facing the incoming ray.
    pub geometric_normal: Vec3,

    /// Direction towards where the ray came from.
    pub incoming: Vec3,

    /// Weight of the diffuse closure.
    pub albedo: Vec3,

    pub time: f32,

    /// Combination of `FLAG_*`.
    pub flag: u32,
}

impl ShaderData {
    pub const FLAG_BACKFACING: u32 = 1 << 0;
    pub const FLAG_EMISSION: u32 = 1 << 1;
    pub const FLAG_BSDF: u32 = 1 << 2;

    /// Surface has a BSDF that can be evaluated for an arbitrary direction,
    /// i.e. it's not purely singular (perfect mirror, perfect glass etc.).
    pub const FLAG_BSDF_HAS_EVAL: u32 = 1 << 3;

    pub const FLAG_TRANSPARENT: u32 = 1 << 4;

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flag & flag != 0
    }

    /// Returns whether direct light sampling can contribute at this surface.
    pub fn has_bsdf_eval(&self) -> bool {
        self.has_flag(Self::FLAG_BSDF_HAS_EVAL)
    }

    /// Returns the surface position nudged away from the surface, on the side
    /// `dir` points at.
    pub fn offset_position(&self, dir: Vec3) -> Vec3 {
        if self.geometric_normal.dot(dir) >= 0.0 {
            self.position + self.geometric_normal * RAY_OFFSET
        } else {
            self.position - self.geometric_normal * RAY_OFFSET
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn offset_position() {
        let target = ShaderData {
            position: vec3(1.0, 2.0, 3.0),
            geometric_normal: Vec3::Y,
            ..Default::default()
        };

        assert!(target.offset_position(Vec3::Y).y > 2.0);
        assert!(target.offset_position(vec3(1.0, -1.0, 0.0)).y < 2.0);
    }
}
