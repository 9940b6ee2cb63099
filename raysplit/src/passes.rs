use raysplit_gpu::QueueId;

use crate::{Device, Queues, RaySlots};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*
    };
}

passes!([
    direct_lighting => DirectLightingPass,
    queue_enqueue => QueueEnqueuePass,
]);

/// A unit of work executed once per round by [`crate::Pipeline`].
pub trait Stage {
    fn label(&self) -> &str;

    /// Queues this stage populates; the pipeline empties them right before
    /// the stage runs and checks them right after.
    fn outputs(&self) -> &[QueueId];

    fn run(&self, ctx: StageContext<'_>);
}

/// Everything a stage can access while it runs.
pub struct StageContext<'a> {
    pub device: &'a Device,
    pub slots: &'a mut RaySlots,
    pub queues: &'a mut Queues,
}
