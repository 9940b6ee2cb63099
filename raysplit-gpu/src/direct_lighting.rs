use crate::{
    path_state_rng_1d, path_state_rng_2d, path_state_rng_light_termination,
    DirectEmission, DirectLightingPassParams, Illumination, PathState,
    RngState, ShaderData, PRNG_LIGHT, PRNG_LIGHT_U,
};

/// Samples one light for the surface a ray currently rests at.
///
/// Returns the shadow ray to test and its would-be contribution, or `None` if
/// direct lighting has nothing to offer for this slot in this round (direct
/// lighting disabled, singular BSDF, no light found, sample rejected).
///
/// This function doesn't touch any shared state; writing the result back
/// into the slot and enqueueing it is up to the kernel.
pub fn sample_direct_lighting(
    illumination: &impl Illumination,
    params: &DirectLightingPassParams,
    sd: &ShaderData,
    state: &PathState,
    rng: RngState,
) -> Option<DirectEmission> {
    if !params.use_direct_light() || !sd.has_bsdf_eval() {
        return None;
    }

    let light_t = path_state_rng_1d(rng, state, PRNG_LIGHT);
    let (light_u, light_v) = path_state_rng_2d(rng, state, PRNG_LIGHT_U);

    let terminate = path_state_rng_light_termination(
        rng,
        state,
        illumination.light_inv_rr_threshold(),
    );

    let ls = illumination.light_sample(
        light_t,
        light_u,
        light_v,
        sd.time,
        sd.position,
        state.bounce,
    )?;

    let mut emission_sd = ShaderData::default();

    let mut emission = illumination.direct_emission(
        sd,
        &mut emission_sd,
        &ls,
        state,
        terminate,
    )?;

    emission.ray = emission.ray.with_time(sd.time);

    Some(emission)
}
