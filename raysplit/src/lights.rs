use std::f32::consts::PI;

use glam::Vec3;
use log::debug;
use raysplit_gpu::{
    uniform_sphere, BsdfEval, DirectEmission, Illumination, LightSample,
    PathState, Ray, ShaderData, RAY_OFFSET, UNIFORM_SPHERE_PDF,
};

use crate::Light;

/// Reference light sampler: picks one light uniformly and evaluates a
/// Lambertian surface against it.
#[derive(Clone, Debug, Default)]
pub struct Lights {
    items: Vec<Light>,
    inv_rr_threshold: f32,
}

impl Lights {
    pub fn new(items: impl IntoIterator<Item = Light>) -> Self {
        let mut this = Self::default();

        for light in items {
            this.add(light);
        }

        this
    }

    /// Enables russian roulette for light samples whose contribution falls
    /// below `threshold`; zero disables it.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.inv_rr_threshold = if threshold > 0.0 {
            1.0 / threshold
        } else {
            0.0
        };

        self
    }

    pub fn add(&mut self, light: Light) -> u32 {
        let light_id = self.items.len() as u32;

        debug!("Adding light; light_id={light_id}, ty={}", light.ty);

        self.items.push(light);
        light_id
    }

    pub fn get(&self, light_id: u32) -> Option<&Light> {
        self.items.get(light_id as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sample_point(
        light: &Light,
        randu: f32,
        randv: f32,
        position: Vec3,
    ) -> Option<LightSample> {
        let (point, normal) = if light.radius > 0.0 {
            let normal = uniform_sphere(randu, randv);

            (light.position + normal * light.radius, normal)
        } else {
            (light.position, (position - light.position).normalize_or_zero())
        };

        let to_light = point - position;
        let t = to_light.length();

        if t <= 0.0 || !light.is_in_range(t) {
            return None;
        }

        let direction = to_light / t;

        let (pdf, eval_fac) = if light.radius > 0.0 {
            // Points on the back side of the sphere can't be seen
            let cos = normal.dot(-direction);

            if cos <= 0.0 {
                return None;
            }

            let area = 4.0 * PI * light.radius * light.radius;

            (t * t / (cos * area), 1.0 / area)
        } else {
            (t * t, UNIFORM_SPHERE_PDF)
        };

        Some(LightSample {
            position: point,
            normal,
            direction,
            t,
            u: randu,
            v: randv,
            pdf,
            eval_fac,
            ty: light.ty,
            ..Default::default()
        })
    }
}

impl Illumination for Lights {
    fn light_sample(
        &self,
        randt: f32,
        randu: f32,
        randv: f32,
        _: f32,
        position: Vec3,
        bounce: u32,
    ) -> Option<LightSample> {
        if self.items.is_empty() {
            return None;
        }

        let n = self.items.len();
        let light_id = ((randt * n as f32) as usize).min(n - 1);
        let light = &self.items[light_id];

        if bounce > light.max_bounces {
            return None;
        }

        let mut sample = match light.ty {
            LightSample::TYPE_POINT => {
                Self::sample_point(light, randu, randv, position)?
            }

            LightSample::TYPE_DISTANT => LightSample {
                position: position - light.direction,
                normal: light.direction,
                direction: -light.direction,
                t: f32::MAX,
                pdf: 1.0,
                eval_fac: 1.0,
                ty: light.ty,
                ..Default::default()
            },

            _ => {
                let direction = uniform_sphere(randu, randv);

                LightSample {
                    position: position + direction,
                    normal: -direction,
                    direction,
                    t: f32::MAX,
                    u: randu,
                    v: randv,
                    pdf: UNIFORM_SPHERE_PDF,
                    eval_fac: 1.0,
                    ty: light.ty,
                    ..Default::default()
                }
            }
        };

        sample.light_id = light_id as u32;
        sample.pdf /= n as f32;

        Some(sample)
    }

    fn direct_emission(
        &self,
        sd: &ShaderData,
        emission_sd: &mut ShaderData,
        ls: &LightSample,
        _: &PathState,
        terminate: f32,
    ) -> Option<DirectEmission> {
        let light = self.get(ls.light_id)?;

        if ls.pdf <= 0.0 {
            return None;
        }

        *emission_sd = ShaderData {
            position: ls.position,
            normal: ls.normal,
            geometric_normal: ls.normal,
            incoming: -ls.direction,
            time: sd.time,
            flag: ShaderData::FLAG_EMISSION,
            ..Default::default()
        };

        let cos = sd.normal.dot(ls.direction);

        if cos <= 0.0 {
            return None;
        }

        let light_eval = light.color * ls.eval_fac / ls.pdf;
        let mut eval = BsdfEval::diffuse(sd.albedo * (cos / PI) * light_eval);

        if eval.is_zero() {
            return None;
        }

        if self.inv_rr_threshold > 0.0 {
            let probability = eval.sum().max_element() * self.inv_rr_threshold;

            if probability < 1.0 {
                if terminate >= probability {
                    return None;
                }

                eval = eval.scaled(1.0 / probability);
            }
        }

        let origin = sd.offset_position(ls.direction);

        let length = if ls.t == f32::MAX {
            f32::MAX
        } else {
            ((ls.position - origin).length() - RAY_OFFSET).max(0.0)
        };

        Some(DirectEmission {
            ray: Ray::new(origin, ls.direction).with_length(length),
            eval,
            is_lamp: ls.is_lamp(),
        })
    }

    fn light_inv_rr_threshold(&self) -> f32 {
        self.inv_rr_threshold
    }
}
