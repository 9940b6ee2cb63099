use bytemuck::{Pod, Zeroable};

use crate::{CompactionMode, QueueId};

/// Parameters shared by every split pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct PassParams {
    pub input_queue: u32,
    pub output_queue: u32,
    pub queue_size: u32,

    /// See: [`CompactionMode`].
    pub compaction: u32,
}

impl PassParams {
    pub fn new(
        input_queue: QueueId,
        output_queue: QueueId,
        queue_size: u32,
        compaction: CompactionMode,
    ) -> Self {
        Self {
            input_queue: input_queue.get(),
            output_queue: output_queue.get(),
            queue_size,
            compaction: compaction as u32,
        }
    }

    pub fn input_queue(&self) -> QueueId {
        QueueId::from_u32(self.input_queue)
    }

    pub fn output_queue(&self) -> QueueId {
        QueueId::from_u32(self.output_queue)
    }

    pub fn compaction(&self) -> CompactionMode {
        CompactionMode::from_u32(self.compaction)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct DirectLightingPassParams {
    pub pass: PassParams,

    /// Non-zero if the integrator samples lights directly.
    pub use_direct_light: u32,
}

impl DirectLightingPassParams {
    pub fn use_direct_light(&self) -> bool {
        self.use_direct_light != 0
    }
}
