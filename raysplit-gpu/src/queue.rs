use core::sync::atomic::{AtomicU32, Ordering};

/// Marks a queue entry that doesn't hold any slot index.
pub const QUEUE_EMPTY_SLOT: u32 = u32::MAX;

/// Identifies one of the queues that partition the ray population.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueId {
    /// Rays that are being traced (`Active` or `Regenerated`).
    ActiveAndRegenerated = 0,

    /// Rays whose path has ended and which await accumulation and reuse.
    HitBgBuffUpdateToRegen = 1,

    /// Rays that must run the ambient-occlusion shadow test.
    ShadowRayCastAo = 2,

    /// Rays that must run the direct-lighting shadow test.
    ShadowRayCastDl = 3,
}

impl QueueId {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::ActiveAndRegenerated,
        Self::HitBgBuffUpdateToRegen,
        Self::ShadowRayCastAo,
        Self::ShadowRayCastDl,
    ];

    pub fn from_u32(id: u32) -> Self {
        match id {
            0 => Self::ActiveAndRegenerated,
            1 => Self::HitBgBuffUpdateToRegen,
            2 => Self::ShadowRayCastAo,
            3 => Self::ShadowRayCastDl,
            _ => panic!("invalid queue id: {id}"),
        }
    }

    pub fn get(self) -> u32 {
        self as u32
    }

    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ActiveAndRegenerated => "active_and_regenerated_rays",
            Self::HitBgBuffUpdateToRegen => "hitbg_buff_update_toregen_rays",
            Self::ShadowRayCastAo => "shadow_ray_cast_ao_rays",
            Self::ShadowRayCastDl => "shadow_ray_cast_dl_rays",
        }
    }
}

/// Kernel-side view of all queues.
///
/// Queue `q` occupies `data[q * capacity..(q + 1) * capacity]`; its length
/// lives in `counters[q]`. Counters are only ever advanced through
/// [`Self::enqueue()`] and [`Self::reserve()`], which makes every reserved
/// region exclusively owned by whoever reserved it.
#[derive(Clone, Copy)]
pub struct QueuesView<'a> {
    data: &'a [AtomicU32],
    counters: &'a [AtomicU32],
    capacity: u32,
}

impl<'a> QueuesView<'a> {
    pub fn new(
        data: &'a [AtomicU32],
        counters: &'a [AtomicU32],
        capacity: u32,
    ) -> Self {
        assert_eq!(data.len(), QueueId::COUNT * capacity as usize);
        assert_eq!(counters.len(), QueueId::COUNT);

        Self {
            data,
            counters,
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the slot index stored at `thread_index` of given queue or
    /// `None` if there's nothing there.
    ///
    /// When `drain` is set, the entry gets replaced with
    /// [`QUEUE_EMPTY_SLOT`] so that the queue is empty again once every
    /// thread has fetched its index.
    pub fn get_ray_index(
        &self,
        queue: QueueId,
        thread_index: u32,
        drain: bool,
    ) -> Option<u32> {
        if thread_index >= self.capacity {
            return None;
        }

        let entry = &self.data[self.offset(queue, thread_index)];

        let ray_index = if drain {
            entry.swap(QUEUE_EMPTY_SLOT, Ordering::Relaxed)
        } else {
            entry.load(Ordering::Relaxed)
        };

        if ray_index == QUEUE_EMPTY_SLOT {
            None
        } else {
            Some(ray_index)
        }
    }

    /// Appends a single slot index, paying one global atomic for it.
    ///
    /// Returns `false` if the queue is full, in which case the index is
    /// dropped.
    pub fn enqueue(&self, queue: QueueId, ray_index: u32) -> bool {
        let position = self.reserve(queue, 1);

        self.write(queue, position, ray_index)
    }

    /// Reserves `count` consecutive entries and returns the first one.
    ///
    /// The returned position might lay past the queue's capacity, in which
    /// case the queue has overflowed.
    pub fn reserve(&self, queue: QueueId, count: u32) -> u32 {
        self.counters[queue.idx()].fetch_add(count, Ordering::Relaxed)
    }

    /// Stores a slot index into a previously reserved entry.
    ///
    /// Writes past the queue's capacity are dropped and reported through
    /// the return value.
    pub fn write(&self, queue: QueueId, position: u32, ray_index: u32) -> bool {
        if position >= self.capacity {
            return false;
        }

        self.data[self.offset(queue, position)]
            .store(ray_index, Ordering::Relaxed);

        true
    }

    /// Returns how many entries have been reserved so far (this can exceed
    /// the capacity).
    pub fn reserved(&self, queue: QueueId) -> u32 {
        self.counters[queue.idx()].load(Ordering::Relaxed)
    }

    fn offset(&self, queue: QueueId, position: u32) -> usize {
        (queue.get() * self.capacity + position) as usize
    }
}
