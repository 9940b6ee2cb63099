use derivative::Derivative;
use fxhash::FxHashSet;
use log::debug;
use raysplit_gpu::{QueueId, QueuesView, QUEUE_EMPTY_SLOT};

use crate::AtomicBuffer;

/// The queue registry: all queues, each a compacted list of slot indices.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Queues {
    #[derivative(Debug = "ignore")]
    data: AtomicBuffer,
    counters: AtomicBuffer,
    capacity: u32,
}

impl Queues {
    pub fn new(capacity: u32) -> Self {
        debug!("Allocating queues; capacity={capacity}");

        Self {
            data: AtomicBuffer::new(
                "raysplit_queue_data",
                QueueId::COUNT * capacity as usize,
                QUEUE_EMPTY_SLOT,
            ),
            counters: AtomicBuffer::new(
                "raysplit_queue_counters",
                QueueId::COUNT,
                0,
            ),
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Empties given queue, so that it can be populated in the next round.
    pub fn reset(&mut self, queue: QueueId) {
        let offset = queue.idx() * self.capacity as usize;

        self.data
            .fill(offset..offset + self.capacity as usize, QUEUE_EMPTY_SLOT);

        self.counters.set(queue.idx(), 0);
    }

    pub fn reset_all(&mut self) {
        for queue in QueueId::ALL {
            self.reset(queue);
        }
    }

    /// Returns the number of entries stored in given queue.
    pub fn len(&self, queue: QueueId) -> u32 {
        self.reserved(queue).min(self.capacity)
    }

    pub fn is_empty(&self, queue: QueueId) -> bool {
        self.reserved(queue) == 0
    }

    /// Returns the number of entries reserved in given queue since its last
    /// reset; this exceeds [`Self::capacity()`] if the queue has overflowed.
    pub fn reserved(&self, queue: QueueId) -> u32 {
        self.counters.get(queue.idx())
    }

    pub fn is_overflowed(&self, queue: QueueId) -> bool {
        self.reserved(queue) > self.capacity
    }

    /// Returns the slot indices stored in given queue, in queue order.
    pub fn indices(&self, queue: QueueId) -> Vec<u32> {
        let view = self.view();

        (0..self.len(queue))
            .filter_map(|position| view.get_ray_index(queue, position, false))
            .collect()
    }

    /// Appends a slot index from the host; returns `false` if the queue is
    /// full.
    pub fn push(&mut self, queue: QueueId, ray_index: u32) -> bool {
        self.view().enqueue(queue, ray_index)
    }

    /// Checks that given queue is a proper compacted list of slot indices:
    /// every entry up to its length is filled, refers to an existing slot
    /// and appears only once.
    pub fn validate(
        &self,
        queue: QueueId,
        slots: u32,
    ) -> Result<(), QueueError> {
        let view = self.view();
        let mut seen = FxHashSet::default();

        for position in 0..self.len(queue) {
            let Some(ray_index) = view.get_ray_index(queue, position, false)
            else {
                return Err(QueueError::Hole { queue, position });
            };

            if ray_index >= slots {
                return Err(QueueError::OutOfRange { queue, ray_index });
            }

            if !seen.insert(ray_index) {
                return Err(QueueError::Duplicate { queue, ray_index });
            }
        }

        Ok(())
    }

    pub(crate) fn view(&self) -> QueuesView<'_> {
        QueuesView::new(
            self.data.as_slice(),
            self.counters.as_slice(),
            self.capacity,
        )
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue `{}` has no entry at position {position}", queue.name())]
    Hole { queue: QueueId, position: u32 },

    #[error("queue `{}` refers to missing slot {ray_index}", queue.name())]
    OutOfRange { queue: QueueId, ray_index: u32 },

    #[error("queue `{}` contains slot {ray_index} twice", queue.name())]
    Duplicate { queue: QueueId, ray_index: u32 },
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use raysplit_gpu::{
        enqueue_ray_index, CompactionMode, LocalQueues, Workgroup,
    };

    use super::*;
    use crate::{Device, SplitConfig};

    /// Dispatches `targets.len()` lanes, each appending its global index
    /// into its target queue (if any).
    fn compact(
        workgroup_size: u32,
        compaction: CompactionMode,
        targets: &[Option<QueueId>],
    ) -> Queues {
        let capacity = targets.len().max(1) as u32;

        let config = SplitConfig::new(capacity)
            .with_workgroup_size(workgroup_size)
            .with_max_concurrent_workgroups(4);

        let device = Device::new(&config).unwrap();
        let queues = Queues::new(capacity);
        let view = queues.view();

        device.dispatch(
            "compact",
            targets.len() as u32,
            LocalQueues::new,
            |lane, local| {
                local.reset(lane);

                let target = targets
                    .get(lane.global_idx() as usize)
                    .copied()
                    .flatten();

                enqueue_ray_index(
                    lane,
                    local,
                    view,
                    compaction,
                    target,
                    lane.global_idx(),
                );
            },
        );

        queues
    }

    fn sorted(mut items: Vec<u32>) -> Vec<u32> {
        items.sort();
        items
    }

    #[test]
    fn compaction() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = QueueId::ShadowRayCastDl;

        for compaction in [CompactionMode::Workgroup, CompactionMode::Global] {
            for workgroup_size in 1..=64 {
                let len = rng.gen_range(0..200);
                let density = rng.gen_range(0.0..=1.0);

                let targets: Vec<_> = (0..len)
                    .map(|_| rng.gen_bool(density).then_some(q))
                    .collect();

                let expected: Vec<_> = (0..len)
                    .filter(|&idx| targets[idx as usize].is_some())
                    .collect();

                let actual = compact(workgroup_size, compaction, &targets);

                assert_eq!(
                    expected,
                    sorted(actual.indices(q)),
                    "{compaction:?} / {workgroup_size}"
                );

                assert_eq!(expected.len() as u32, actual.reserved(q));
                assert_eq!(Ok(()), actual.validate(q, len.max(1)));
            }
        }
    }

    #[test]
    fn compaction_max_workgroup_size() {
        let q = QueueId::ActiveAndRegenerated;

        let targets: Vec<_> =
            (0..2500).map(|idx| (idx % 3 != 0).then_some(q)).collect();

        let actual = compact(
            raysplit_gpu::MAX_WORKGROUP_SIZE,
            CompactionMode::Workgroup,
            &targets,
        );

        let expected: Vec<_> = (0..2500).filter(|idx| idx % 3 != 0).collect();

        assert_eq!(expected, sorted(actual.indices(q)));
    }

    #[test]
    fn compaction_regions_dont_overlap() {
        let workgroup_size = 8;
        let q = QueueId::HitBgBuffUpdateToRegen;

        // Workgroup `n` enqueues `n % 9` items
        let targets: Vec<_> = (0..(64 * workgroup_size))
            .map(|idx| {
                let workgroup = idx / workgroup_size;
                let lane = idx % workgroup_size;

                (lane < workgroup % 9).then_some(q)
            })
            .collect();

        let actual =
            compact(workgroup_size, CompactionMode::Workgroup, &targets)
                .indices(q);

        // Each workgroup's items have to form one contiguous block; blocks
        // of different workgroups can come in any order
        let mut blocks: Vec<Vec<u32>> = Vec::new();

        for ray_index in actual {
            let workgroup = ray_index / workgroup_size;

            let continues_block = blocks
                .last()
                .map_or(false, |block| block[0] / workgroup_size == workgroup);

            if continues_block {
                blocks.last_mut().unwrap().push(ray_index);
            } else {
                blocks.push(vec![ray_index]);
            }
        }

        for block in &blocks {
            let first = block[0] / workgroup_size * workgroup_size;

            assert_eq!(
                (first..first + block.len() as u32).collect::<Vec<_>>(),
                sorted(block.clone())
            );
        }

        let blocks = blocks
            .iter()
            .map(|block| block[0] / workgroup_size)
            .collect();

        let expected_blocks: Vec<_> =
            (0..64).filter(|workgroup| workgroup % 9 != 0).collect();

        // ... and every workgroup must have got exactly one block
        assert_eq!(expected_blocks, sorted(blocks));
    }

    #[test]
    fn compaction_many_queues() {
        let targets: Vec<_> = (0..300)
            .map(|idx| match idx % 5 {
                4 => None,
                n => Some(QueueId::ALL[n]),
            })
            .collect();

        for workgroup_size in [1, 16, 50] {
            let actual =
                compact(workgroup_size, CompactionMode::Workgroup, &targets);

            for (n, queue) in QueueId::ALL.into_iter().enumerate() {
                let expected: Vec<_> =
                    (0..300).filter(|idx| idx % 5 == n as u32).collect();

                assert_eq!(expected, sorted(actual.indices(queue)));
            }
        }
    }

    #[test]
    fn compaction_empty() {
        let actual = compact(32, CompactionMode::Workgroup, &[]);

        for queue in QueueId::ALL {
            assert!(actual.is_empty(queue));
        }
    }

    #[test]
    fn push() {
        let mut target = Queues::new(3);
        let q = QueueId::ShadowRayCastDl;

        assert!(target.is_empty(q));
        assert!(target.push(q, 5));
        assert!(target.push(q, 1));

        assert_eq!(2, target.len(q));
        assert_eq!(vec![5, 1], target.indices(q));
        assert_eq!(Ok(()), target.validate(q, 8));

        // Other queues stay empty
        assert!(target.indices(QueueId::ActiveAndRegenerated).is_empty());
    }

    #[test]
    fn reset() {
        let mut target = Queues::new(2);

        for queue in QueueId::ALL {
            target.push(queue, queue.get());
        }

        target.reset(QueueId::ShadowRayCastAo);

        assert!(target.is_empty(QueueId::ShadowRayCastAo));
        assert_eq!(vec![3], target.indices(QueueId::ShadowRayCastDl));

        target.reset_all();

        for queue in QueueId::ALL {
            assert!(target.is_empty(queue));

            // Entries are back to the sentinel, so kernels reading past the
            // length see nothing
            assert_eq!(None, target.view().get_ray_index(queue, 0, false));
        }
    }

    #[test]
    fn overflow() {
        let mut target = Queues::new(2);
        let q = QueueId::HitBgBuffUpdateToRegen;

        assert!(target.push(q, 0));
        assert!(target.push(q, 1));
        assert!(!target.is_overflowed(q));
        assert!(!target.push(q, 2));
        assert!(target.is_overflowed(q));

        assert_eq!(2, target.len(q));
        assert_eq!(3, target.reserved(q));
        assert_eq!(vec![0, 1], target.indices(q));
    }

    #[test]
    fn validate() {
        let mut target = Queues::new(4);
        let q = QueueId::ActiveAndRegenerated;

        target.push(q, 1);
        target.push(q, 2);
        target.push(q, 1);

        assert_eq!(
            Err(QueueError::Duplicate {
                queue: q,
                ray_index: 1
            }),
            target.validate(q, 4)
        );

        target.reset(q);
        target.push(q, 7);

        assert_eq!(
            Err(QueueError::OutOfRange {
                queue: q,
                ray_index: 7
            }),
            target.validate(q, 4)
        );

        // A reservation that never got written leaves a hole behind
        target.reset(q);
        target.push(q, 0);
        target.view().reserve(q, 1);

        assert_eq!(
            Err(QueueError::Hole {
                queue: q,
                position: 1
            }),
            target.validate(q, 4)
        );

        assert_eq!(
            "queue `active_and_regenerated_rays` has no entry at position 1",
            target.validate(q, 4).unwrap_err().to_string()
        );
    }
}
