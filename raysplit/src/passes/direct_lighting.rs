use derivative::Derivative;
use log::debug;
use raysplit_gpu::{
    DirectLightingPassParams, Illumination, LocalQueues, PassParams, QueueId,
};
use raysplit_kernels::direct_lighting;

use crate::{Device, Queues, RaySlots, SplitConfig, Stage, StageContext};

/// Samples lights for active rays and queues up the shadow rays that have
/// to be tested before their contribution can be accumulated.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DirectLightingPass<I> {
    #[derivative(Debug = "ignore")]
    illumination: I,
    params: DirectLightingPassParams,
    outputs: [QueueId; 1],
}

impl<I> DirectLightingPass<I>
where
    I: Illumination + Sync,
{
    pub fn new(config: &SplitConfig, illumination: I) -> Self {
        debug!("Initializing pass: direct_lighting");

        Self {
            illumination,
            params: DirectLightingPassParams {
                pass: PassParams::new(
                    QueueId::ActiveAndRegenerated,
                    QueueId::ShadowRayCastDl,
                    config.queue_size,
                    config.compaction,
                ),
                use_direct_light: config.use_direct_light as u32,
            },
            outputs: [QueueId::ShadowRayCastDl],
        }
    }

    /// Overrides the queues this pass reads from and writes into.
    ///
    /// The queues must differ: the output queue is emptied before the pass
    /// runs, while the input queue has to stay intact until it finishes.
    pub fn with_queues(mut self, input: QueueId, output: QueueId) -> Self {
        assert_ne!(
            input, output,
            "direct lighting can't read from and write into the same queue"
        );

        self.params.pass.input_queue = input.get();
        self.params.pass.output_queue = output.get();
        self.outputs = [output];
        self
    }

    pub fn illumination(&self) -> &I {
        &self.illumination
    }

    pub fn params(&self) -> &DirectLightingPassParams {
        &self.params
    }

    /// Dispatches one invocation per entry of the input queue, appending
    /// into the output queue.
    pub fn run(
        &self,
        device: &Device,
        slots: &mut RaySlots,
        queues: &mut Queues,
    ) {
        let input = self.params.pass.input_queue();

        assert_eq!(
            self.params.pass.queue_size,
            queues.capacity(),
            "pass was built for a different queue size"
        );

        // Kernels write into slots without synchronization, so each index
        // must refer to an existing slot and appear only once
        if let Err(err) = queues.validate(input, slots.capacity()) {
            panic!("direct_lighting got an invalid input queue: {err}");
        }

        let invocations = queues.len(input);
        let state = slots.view(queues);

        device.dispatch(
            "direct_lighting",
            invocations,
            LocalQueues::new,
            |lane, local| {
                direct_lighting::main(
                    lane,
                    local,
                    &self.params,
                    &self.illumination,
                    state,
                );
            },
        );
    }
}

impl<I> Stage for DirectLightingPass<I>
where
    I: Illumination + Sync,
{
    fn label(&self) -> &str {
        "direct_lighting"
    }

    fn outputs(&self) -> &[QueueId] {
        &self.outputs
    }

    fn run(&self, ctx: StageContext<'_>) {
        DirectLightingPass::run(self, ctx.device, ctx.slots, ctx.queues);
    }
}
