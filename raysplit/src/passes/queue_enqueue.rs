use log::debug;
use raysplit_gpu::{LocalQueues, PassParams, QueueId};
use raysplit_kernels::queue_enqueue;

use crate::{Device, Queues, RaySlots, SplitConfig, Stage, StageContext};

const OUTPUTS: [QueueId; 2] =
    [QueueId::ActiveAndRegenerated, QueueId::HitBgBuffUpdateToRegen];

/// Rebuilds the lifecycle queues from the slots' states.
#[derive(Debug)]
pub struct QueueEnqueuePass {
    params: PassParams,
}

impl QueueEnqueuePass {
    pub fn new(config: &SplitConfig) -> Self {
        debug!("Initializing pass: queue_enqueue");

        Self {
            params: PassParams::new(
                QueueId::ActiveAndRegenerated,
                QueueId::HitBgBuffUpdateToRegen,
                config.queue_size,
                config.compaction,
            ),
        }
    }

    pub fn run(
        &self,
        device: &Device,
        slots: &mut RaySlots,
        queues: &mut Queues,
    ) {
        for queue in OUTPUTS {
            queues.reset(queue);
        }

        let invocations = slots.capacity();
        let state = slots.view(queues);

        device.dispatch(
            "queue_enqueue",
            invocations,
            LocalQueues::new,
            |lane, local| {
                queue_enqueue::main(lane, local, &self.params, state);
            },
        );
    }
}

impl Stage for QueueEnqueuePass {
    fn label(&self) -> &str {
        "queue_enqueue"
    }

    fn outputs(&self) -> &[QueueId] {
        &OUTPUTS
    }

    fn run(&self, ctx: StageContext<'_>) {
        QueueEnqueuePass::run(self, ctx.device, ctx.slots, ctx.queues);
    }
}
