use core::f32::consts::PI;

use glam::{vec3, Vec3};

/// Maps a pair of uniform samples onto a uniformly distributed direction.
pub fn uniform_sphere(u: f32, v: f32) -> Vec3 {
    let z = 1.0 - 2.0 * u;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * v;

    vec3(r * phi.cos(), r * phi.sin(), z)
}

/// Probability density of [`uniform_sphere()`].
pub const UNIFORM_SPHERE_PDF: f32 = 1.0 / (4.0 * PI);

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn uniform_sphere_is_normalized() {
        for u in [0.0, 0.1, 0.5, 0.9, 0.999] {
            for v in [0.0, 0.3, 0.7, 0.999] {
                assert_relative_eq!(
                    1.0,
                    uniform_sphere(u, v).length(),
                    epsilon = 0.0001
                );
            }
        }

        assert_relative_eq!(1.0, uniform_sphere(0.0, 0.0).z);
        assert_relative_eq!(-1.0, uniform_sphere(1.0, 0.0).z);
    }
}
