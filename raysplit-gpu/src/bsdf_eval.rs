use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// BSDF evaluation split by closure kind, already weighted by the light's
/// contribution.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BsdfEval {
    pub diffuse: Vec3,
    pub glossy: Vec3,
    pub transmission: Vec3,
}

impl BsdfEval {
    pub fn diffuse(value: Vec3) -> Self {
        Self {
            diffuse: value,
            ..Default::default()
        }
    }

    pub fn sum(&self) -> Vec3 {
        self.diffuse + self.glossy + self.transmission
    }

    pub fn is_zero(&self) -> bool {
        self.diffuse == Vec3::ZERO
            && self.glossy == Vec3::ZERO
            && self.transmission == Vec3::ZERO
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            diffuse: self.diffuse * factor,
            glossy: self.glossy * factor,
            transmission: self.transmission * factor,
        }
    }

    pub fn tinted(self, color: Vec3) -> Self {
        Self {
            diffuse: self.diffuse * color,
            glossy: self.glossy * color,
            transmission: self.transmission * color,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn arithmetic() {
        let target = BsdfEval {
            diffuse: vec3(1.0, 0.0, 0.0),
            glossy: vec3(0.0, 2.0, 0.0),
            transmission: vec3(0.0, 0.0, 3.0),
        };

        assert!(!target.is_zero());
        assert!(BsdfEval::default().is_zero());
        assert_eq!(vec3(1.0, 2.0, 3.0), target.sum());

        let target = target.scaled(0.5).tinted(vec3(2.0, 1.0, 1.0));

        assert_relative_eq!(1.0, target.diffuse.x);
        assert_relative_eq!(1.0, target.glossy.y);
        assert_relative_eq!(1.5, target.transmission.z);
    }
}
