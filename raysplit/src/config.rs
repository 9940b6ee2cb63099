use raysplit_gpu::{CompactionMode, QueueId, MAX_WORKGROUP_SIZE};

/// Sizing and behavior of a [`crate::Pipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct SplitConfig {
    /// Number of ray slots.
    pub capacity: u32,

    /// Capacity of each queue; must be at least `capacity`, so that a round
    /// can never overflow a queue.
    pub queue_size: u32,

    /// Number of lanes per workgroup.
    pub workgroup_size: u32,

    /// Number of workgroups executed concurrently; zero picks the number of
    /// logical cores.
    pub max_concurrent_workgroups: usize,

    pub compaction: CompactionMode,
    pub use_direct_light: bool,

    /// Seed of the per-slot random number generators.
    pub seed: u64,

    /// Upper bound on rounds executed by
    /// [`crate::Pipeline::run_until_idle()`].
    pub max_rounds: u32,
}

impl SplitConfig {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            queue_size: capacity,
            ..Default::default()
        }
    }

    pub fn with_queue_size(mut self, queue_size: u32) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn with_workgroup_size(mut self, workgroup_size: u32) -> Self {
        self.workgroup_size = workgroup_size;
        self
    }

    pub fn with_max_concurrent_workgroups(mut self, n: usize) -> Self {
        self.max_concurrent_workgroups = n;
        self
    }

    pub fn with_compaction(mut self, compaction: CompactionMode) -> Self {
        self.compaction = compaction;
        self
    }

    pub fn with_direct_light(mut self, use_direct_light: bool) -> Self {
        self.use_direct_light = use_direct_light;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        if self.queue_size < self.capacity {
            return Err(ConfigError::QueueTooSmall {
                queue_size: self.queue_size,
                capacity: self.capacity,
            });
        }

        // Queues share a single array, addressed with `u32`; the last index
        // is reserved for the empty-entry sentinel
        if self.queue_size >= u32::MAX / QueueId::COUNT as u32 {
            return Err(ConfigError::QueueTooLarge {
                queue_size: self.queue_size,
            });
        }

        if self.workgroup_size == 0 || self.workgroup_size > MAX_WORKGROUP_SIZE
        {
            return Err(ConfigError::InvalidWorkgroupSize {
                size: self.workgroup_size,
                max: MAX_WORKGROUP_SIZE,
            });
        }

        Ok(())
    }

    pub fn describe(&self) -> String {
        format!(
            "capacity={}, queue_size={}, workgroup_size={}, compaction={:?}",
            self.capacity,
            self.queue_size,
            self.workgroup_size,
            self.compaction,
        )
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            queue_size: 4096,
            workgroup_size: 64,
            max_concurrent_workgroups: 0,
            compaction: CompactionMode::Workgroup,
            use_direct_light: true,
            seed: 0,
            max_rounds: 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    #[error(
        "queue size ({queue_size}) must be at least the number of ray slots \
         ({capacity})"
    )]
    QueueTooSmall { queue_size: u32, capacity: u32 },

    #[error("queue size ({queue_size}) is too large")]
    QueueTooLarge { queue_size: u32 },

    #[error("workgroup size must be in range 1..={max}, got {size}")]
    InvalidWorkgroupSize { size: u32, max: u32 },

    #[error("couldn't build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
