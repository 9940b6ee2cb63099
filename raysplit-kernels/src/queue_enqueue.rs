use raysplit_gpu::prelude::*;

/// Rebuilds the lifecycle queues from scratch: `Active` and `Regenerated`
/// slots go into [`QueueId::ActiveAndRegenerated`], slots whose path has
/// ended go into [`QueueId::HitBgBuffUpdateToRegen`] and `Inactive` slots
/// go nowhere.
///
/// Runs one lane per slot; lanes past the last slot still take part in the
/// compaction.
pub fn main(
    wg: &impl Workgroup,
    local: &LocalQueues,
    params: &PassParams,
    state: SplitState,
) {
    local.reset(wg);

    let ray_index = wg.global_idx();

    let target = if ray_index < state.ray_state.len() {
        target_queue(state.ray_state.get(ray_index).status())
    } else {
        None
    };

    enqueue_ray_index(
        wg,
        local,
        state.queues,
        params.compaction(),
        target,
        ray_index,
    );
}

pub fn target_queue(status: RayStatus) -> Option<QueueId> {
    match status {
        RayStatus::Active | RayStatus::Regenerated => {
            Some(QueueId::ActiveAndRegenerated)
        }

        RayStatus::HitBackground
        | RayStatus::UpdateBuffer
        | RayStatus::ToRegenerate => Some(QueueId::HitBgBuffUpdateToRegen),

        RayStatus::Inactive => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing() {
        assert_eq!(
            Some(QueueId::ActiveAndRegenerated),
            super::target_queue(RayStatus::Active)
        );

        assert_eq!(
            Some(QueueId::ActiveAndRegenerated),
            super::target_queue(RayStatus::Regenerated)
        );

        for status in [
            RayStatus::HitBackground,
            RayStatus::UpdateBuffer,
            RayStatus::ToRegenerate,
        ] {
            assert_eq!(
                Some(QueueId::HitBgBuffUpdateToRegen),
                super::target_queue(status)
            );
        }

        assert_eq!(None, super::target_queue(RayStatus::Inactive));
    }
}
