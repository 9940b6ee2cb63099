use core::sync::atomic::{AtomicU32, Ordering};

use crate::{QueueId, QueuesView, QUEUE_EMPTY_SLOT};

/// A single lane (invocation) of a workgroup, as seen by a kernel.
pub trait Workgroup {
    /// Index of this invocation across the entire dispatch.
    fn global_idx(&self) -> u32;

    /// Index of this invocation within its workgroup.
    fn local_idx(&self) -> u32;

    /// Number of lanes in the workgroup.
    fn local_size(&self) -> u32;

    /// Blocks until every lane of the workgroup reaches this barrier;
    /// memory written before the barrier is visible to all lanes after it.
    ///
    /// Every lane must call this the same number of times, including the
    /// lanes that have no work.
    fn barrier(&self);
}

/// How kernels append slot indices into queues.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompactionMode {
    /// Stage indices in workgroup memory, then reserve the whole batch with
    /// a single global atomic per workgroup and queue.
    #[default]
    Workgroup = 0,

    /// Append each index with its own global atomic.
    Global = 1,
}

impl CompactionMode {
    pub fn from_u32(mode: u32) -> Self {
        match mode {
            0 => Self::Workgroup,
            1 => Self::Global,
            _ => panic!("invalid compaction mode: {mode}"),
        }
    }
}

/// Workgroup-shared memory used by [`enqueue_ray_index_local()`].
///
/// Holds, per queue, a counter of claimed staging entries, the global offset
/// reserved for the batch and a staging buffer as large as the workgroup.
pub struct LocalQueues {
    counters: [AtomicU32; QueueId::COUNT],
    offsets: [AtomicU32; QueueId::COUNT],
    staging: Box<[AtomicU32]>,
    local_size: u32,
}

impl LocalQueues {
    pub fn new(local_size: u32) -> Self {
        let staging = (0..QueueId::COUNT * local_size as usize)
            .map(|_| AtomicU32::new(QUEUE_EMPTY_SLOT))
            .collect();

        Self {
            counters: Default::default(),
            offsets: Default::default(),
            staging,
            local_size,
        }
    }

    /// Zeroes the counters; must be called by every lane on kernel entry,
    /// before any lane enqueues anything.
    pub fn reset(&self, wg: &impl Workgroup) {
        if wg.local_idx() == 0 {
            for counter in &self.counters {
                counter.store(0, Ordering::Relaxed);
            }
        }

        wg.barrier();
    }

    /// Number of entries staged for given queue so far.
    pub fn len(&self, queue: QueueId) -> u32 {
        self.counters[queue.idx()].load(Ordering::Relaxed)
    }

    fn staging(&self, queue: QueueId, position: u32) -> &AtomicU32 {
        let offset = queue.idx() * self.local_size as usize;

        &self.staging[offset + position as usize]
    }
}

/// Appends `ray_index` into the `target` queue using the two-level scheme:
/// lanes claim workgroup-local positions, then lane 0 reserves one contiguous
/// region per queue with a single global atomic and all lanes copy the
/// staged indices into it.
///
/// This is a collective operation: every lane of the workgroup must call it,
/// including lanes with nothing to enqueue (`target: None`).
pub fn enqueue_ray_index_local(
    wg: &impl Workgroup,
    local: &LocalQueues,
    queues: QueuesView,
    target: Option<QueueId>,
    ray_index: u32,
) {
    debug_assert_eq!(wg.local_size(), local.local_size);

    if let Some(queue) = target {
        let position =
            local.counters[queue.idx()].fetch_add(1, Ordering::Relaxed);

        local
            .staging(queue, position)
            .store(ray_index, Ordering::Relaxed);
    }

    wg.barrier();

    if wg.local_idx() == 0 {
        for queue in QueueId::ALL {
            let count = local.len(queue);

            if count > 0 {
                local.offsets[queue.idx()]
                    .store(queues.reserve(queue, count), Ordering::Relaxed);
            }
        }
    }

    wg.barrier();

    for queue in QueueId::ALL {
        let count = local.len(queue);
        let offset = local.offsets[queue.idx()].load(Ordering::Relaxed);
        let mut position = wg.local_idx();

        while position < count {
            let ray_index =
                local.staging(queue, position).load(Ordering::Relaxed);

            queues.write(queue, offset + position, ray_index);
            position += wg.local_size();
        }
    }
}

/// Appends `ray_index` into the `target` queue according to `mode`.
///
/// Like [`enqueue_ray_index_local()`], this must be called by every lane of
/// the workgroup; `mode` must be the same for all of them.
pub fn enqueue_ray_index(
    wg: &impl Workgroup,
    local: &LocalQueues,
    queues: QueuesView,
    mode: CompactionMode,
    target: Option<QueueId>,
    ray_index: u32,
) {
    match mode {
        CompactionMode::Workgroup => {
            enqueue_ray_index_local(wg, local, queues, target, ray_index);
        }

        CompactionMode::Global => {
            if let Some(queue) = target {
                queues.enqueue(queue, ray_index);
            }
        }
    }
}
