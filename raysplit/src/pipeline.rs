use derivative::Derivative;
use log::{debug, info, trace, warn};
use raysplit_gpu::{Illumination, QueueId};

use crate::{
    utils, ConfigError, Device, DirectLightingPass, QueueEnqueuePass, Queues,
    RaySlots, SplitConfig, Stage, StageContext,
};

/// Drives the stages round after round over a shared set of ray slots and
/// queues.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Pipeline {
    config: SplitConfig,
    device: Device,
    slots: RaySlots,
    queues: Queues,

    #[derivative(Debug = "ignore")]
    stages: Vec<Box<dyn Stage>>,

    rounds: u32,
    overflows: u32,
}

impl Pipeline {
    pub fn new(config: SplitConfig) -> Result<Self, ConfigError> {
        info!("Creating pipeline: {}", config.describe());

        let device = Device::new(&config)?;
        let mut slots = RaySlots::new(config.capacity);
        let queues = Queues::new(config.queue_size);

        slots.seed_rng(config.seed);

        debug!("Pipeline created");

        Ok(Self {
            config,
            device,
            slots,
            queues,
            stages: Default::default(),
            rounds: 0,
            overflows: 0,
        })
    }

    /// Creates a pipeline that rebuilds the lifecycle queues and then
    /// samples direct lighting, once per round.
    pub fn direct_lighting<I>(
        config: SplitConfig,
        illumination: I,
    ) -> Result<Self, ConfigError>
    where
        I: Illumination + Sync + 'static,
    {
        let queue_enqueue = QueueEnqueuePass::new(&config);
        let direct_lighting = DirectLightingPass::new(&config, illumination);

        Ok(Self::new(config)?
            .with_stage(queue_enqueue)
            .with_stage(direct_lighting))
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn add_stage(&mut self, stage: impl Stage + 'static) {
        debug!("Adding stage: {}", stage.label());

        self.stages.push(Box::new(stage));
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn slots(&self) -> &RaySlots {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut RaySlots {
        &mut self.slots
    }

    pub fn queues(&self) -> &Queues {
        &self.queues
    }

    pub fn queues_mut(&mut self) -> &mut Queues {
        &mut self.queues
    }

    /// Number of rounds executed so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Runs every stage once, in the order they were added.
    ///
    /// Each stage's output queues get emptied right before the stage runs.
    pub fn run_round(&mut self) {
        trace!("Running round {}", self.rounds);

        for stage in &self.stages {
            for &queue in stage.outputs() {
                self.queues.reset(queue);
            }

            utils::measure(stage.label(), || {
                stage.run(StageContext {
                    device: &self.device,
                    slots: &mut self.slots,
                    queues: &mut self.queues,
                });
            });

            for &queue in stage.outputs() {
                let label = stage.label();

                if !check_output(&self.queues, &self.slots, label, queue) {
                    self.overflows += 1;
                }
            }
        }

        self.rounds += 1;
    }

    /// Runs rounds until no slot has a path being traced, or until
    /// [`SplitConfig::max_rounds`] rounds have been executed.
    pub fn run_until_idle(&mut self) -> RunSummary {
        let rounds = self.rounds;
        let overflows = self.overflows;

        loop {
            let in_flight = self.slots.in_flight();

            if in_flight == 0 {
                break;
            }

            if self.rounds - rounds >= self.config.max_rounds {
                warn!(
                    "Giving up after {} rounds; {in_flight} rays are still in flight",
                    self.config.max_rounds
                );

                break;
            }

            self.run_round();
        }

        let summary = RunSummary {
            rounds: self.rounds - rounds,
            overflows: self.overflows - overflows,
            in_flight: self.slots.in_flight(),
        };

        info!(
            "Pipeline finished; rounds={}, overflows={}, in_flight={}",
            summary.rounds, summary.overflows, summary.in_flight,
        );

        summary
    }
}

/// Returns `false` if the stage has overflowed given queue.
fn check_output(
    queues: &Queues,
    slots: &RaySlots,
    label: &str,
    queue: QueueId,
) -> bool {
    if queues.is_overflowed(queue) {
        warn!(
            "Stage `{label}` overflowed queue `{}`: {} entries reserved, \
             capacity is {}; queues must be at least as large as the number \
             of ray slots",
            queue.name(),
            queues.reserved(queue),
            queues.capacity(),
        );

        return false;
    }

    if cfg!(debug_assertions) {
        if let Err(err) = queues.validate(queue, slots.capacity()) {
            panic!("stage `{label}` produced an invalid queue: {err}");
        }
    }

    true
}

/// Outcome of [`Pipeline::run_until_idle()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u32,

    /// Number of times a stage overflowed one of its output queues.
    pub overflows: u32,

    /// Number of slots still in flight; non-zero only when the round limit
    /// got hit.
    pub in_flight: u32,
}

impl RunSummary {
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use glam::{vec3, Vec3};
    use raysplit_gpu::{PathState, RayFlags, RayStatus, ShaderData};

    use super::*;
    use crate::{Light, Lights};

    /// Plays the role of the tracing stages: moves regenerated rays into
    /// `Active`, bounces active rays a few times and then lets them escape.
    struct Advance {
        bounces: u32,
        shadow_rays: Arc<Mutex<Vec<u32>>>,
    }

    impl Stage for Advance {
        fn label(&self) -> &str {
            "advance"
        }

        fn outputs(&self) -> &[QueueId] {
            &[]
        }

        fn run(&self, ctx: StageContext<'_>) {
            self.shadow_rays
                .lock()
                .unwrap()
                .push(ctx.queues.len(QueueId::ShadowRayCastDl));

            for idx in ctx.queues.indices(QueueId::ActiveAndRegenerated) {
                let slot = ctx.slots.get(idx);

                if slot.state.is(RayStatus::Regenerated) {
                    ctx.slots.set_state(idx, RayStatus::Active);
                } else if slot.path_state.bounce >= self.bounces {
                    ctx.slots.set_state(idx, RayStatus::HitBackground);
                } else {
                    let mut path_state = slot.path_state;

                    path_state.next(
                        PathState::FLAG_REFLECT | PathState::FLAG_DIFFUSE,
                    );

                    ctx.slots.set_path_state(idx, path_state);

                    ctx.slots
                        .remove_state_flag(idx, RayFlags::SHADOW_RAY_CAST_DL);
                }
            }
        }
    }

    /// Plays the role of the accumulation stage.
    struct Retire;

    impl Stage for Retire {
        fn label(&self) -> &str {
            "retire"
        }

        fn outputs(&self) -> &[QueueId] {
            &[]
        }

        fn run(&self, ctx: StageContext<'_>) {
            for idx in 0..ctx.slots.capacity() {
                if ctx.slots.is_state(idx, RayStatus::HitBackground) {
                    ctx.slots.set_state(idx, RayStatus::UpdateBuffer);
                    ctx.slots.set_state(idx, RayStatus::Inactive);
                }
            }
        }
    }

    /// Appends one entry more than the queue can hold.
    struct Flood;

    impl Stage for Flood {
        fn label(&self) -> &str {
            "flood"
        }

        fn outputs(&self) -> &[QueueId] {
            &[QueueId::ShadowRayCastAo]
        }

        fn run(&self, ctx: StageContext<'_>) {
            for idx in 0..=ctx.queues.capacity() {
                ctx.queues.push(QueueId::ShadowRayCastAo, idx);
            }
        }
    }

    fn regenerate_all(pipeline: &mut Pipeline) {
        let slots = pipeline.slots_mut();

        for idx in 0..slots.capacity() {
            slots.regenerate(
                idx,
                PathState::new(idx, 1),
                ShaderData {
                    position: vec3(idx as f32, -2.0, 0.0),
                    normal: Vec3::Y,
                    geometric_normal: Vec3::Y,
                    albedo: Vec3::ONE,
                    flag: ShaderData::FLAG_BSDF
                        | ShaderData::FLAG_BSDF_HAS_EVAL,
                    ..Default::default()
                },
            );
        }
    }

    #[test]
    fn run_until_idle() {
        let shadow_rays = Arc::new(Mutex::new(Vec::new()));

        let lights = Lights::new([Light::distant(
            vec3(0.0, -1.0, 0.0),
            Vec3::ONE,
        )]);

        let mut target = Pipeline::direct_lighting(
            SplitConfig::new(16).with_workgroup_size(4),
            lights,
        )
        .unwrap()
        .with_stage(Advance {
            bounces: 2,
            shadow_rays: shadow_rays.clone(),
        })
        .with_stage(Retire);

        regenerate_all(&mut target);

        let summary = target.run_until_idle();

        assert_eq!(
            RunSummary {
                rounds: 4,
                overflows: 0,
                in_flight: 0,
            },
            summary
        );

        assert!(summary.is_idle());
        assert_eq!(16, target.slots().count(RayStatus::Inactive));

        // Regenerated rays aren't lit; active ones are, once per round
        assert_eq!(vec![0, 16, 16, 16], *shadow_rays.lock().unwrap());

        // Nothing left to do
        assert_eq!(0, target.run_until_idle().rounds);
        assert_eq!(4, target.rounds());
    }

    #[test]
    fn round_limit() {
        let mut target =
            Pipeline::new(SplitConfig::new(4).with_max_rounds(3)).unwrap();

        regenerate_all(&mut target);

        let summary = target.run_until_idle();

        assert_eq!(3, summary.rounds);
        assert_eq!(4, summary.in_flight);
        assert!(!summary.is_idle());
    }

    #[test]
    fn overflow() {
        let mut target = Pipeline::new(SplitConfig::new(4).with_max_rounds(2))
            .unwrap()
            .with_stage(Flood);

        regenerate_all(&mut target);

        let summary = target.run_until_idle();

        assert_eq!(2, summary.overflows);
        assert!(target.queues().is_overflowed(QueueId::ShadowRayCastAo));
        assert_eq!(4, target.queues().len(QueueId::ShadowRayCastAo));
    }

    #[test]
    fn outputs_are_reset() {
        let mut target = Pipeline::new(SplitConfig::new(4))
            .unwrap()
            .with_stage(QueueEnqueuePass::new(&SplitConfig::new(4)));

        regenerate_all(&mut target);
        target.run_round();

        assert_eq!(4, target.queues().len(QueueId::ActiveAndRegenerated));

        target.slots_mut().set_state(2, RayStatus::Inactive);
        target.run_round();

        let mut actual =
            target.queues().indices(QueueId::ActiveAndRegenerated);

        actual.sort();

        assert_eq!(vec![0, 1, 3], actual);
    }

    #[test]
    fn invalid_config() {
        assert!(matches!(
            Pipeline::new(SplitConfig::new(0)),
            Err(ConfigError::ZeroCapacity)
        ));
    }
}
