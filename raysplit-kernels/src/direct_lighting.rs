use raysplit_gpu::prelude::*;

/// For every ray in the input queue that's still `Active`, samples one light
/// and, if the sample contributes, records the deferred shadow ray into the
/// slot and appends the slot to the output queue.
///
/// Every lane must run this, including lanes past the end of the input
/// queue; they take part in the workgroup's compaction without enqueueing
/// anything.
pub fn main(
    wg: &impl Workgroup,
    local: &LocalQueues,
    params: &DirectLightingPassParams,
    illumination: &impl Illumination,
    state: SplitState,
) {
    local.reset(wg);

    let ray_index = state.queues.get_ray_index(
        params.pass.input_queue(),
        wg.global_idx(),
        false,
    );

    let mut target = None;

    if let Some(ray_index) = ray_index {
        if state.ray_state.is_state(ray_index, RayStatus::Active) {
            // Safety: every slot appears in the input queue at most once, so
            // this lane is the only one touching `ray_index`
            let (sd, path_state, rng) = unsafe {
                (
                    state.sd.read(ray_index),
                    state.path_state.read(ray_index),
                    state.rng.read(ray_index),
                )
            };

            let emission = sample_direct_lighting(
                illumination,
                params,
                &sd,
                &path_state,
                rng,
            );

            if let Some(emission) = emission {
                unsafe {
                    state.light_ray.write(ray_index, emission.ray);
                    state.bsdf_eval.write(ray_index, emission.eval);
                    state.is_lamp.write(ray_index, emission.is_lamp);
                }

                state
                    .ray_state
                    .add_flag(ray_index, RayFlags::SHADOW_RAY_CAST_DL);

                target = Some(params.pass.output_queue());
            }
        }
    }

    // ---

    enqueue_ray_index(
        wg,
        local,
        state.queues,
        params.pass.compaction(),
        target,
        ray_index.unwrap_or(QUEUE_EMPTY_SLOT),
    );
}
