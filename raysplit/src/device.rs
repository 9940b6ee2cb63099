use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{debug, error, trace};
use rayon::prelude::*;
use raysplit_gpu::Workgroup;

use crate::{ConfigError, SplitConfig};

/// Executes kernels on the CPU the way a GPU would: invocations are grouped
/// into workgroups, workgroups run concurrently on a thread pool and lanes
/// within a workgroup run concurrently, so that they can meet at barriers.
#[derive(Debug)]
pub struct Device {
    pool: rayon::ThreadPool,
    workgroup_size: u32,
}

impl Device {
    pub fn new(config: &SplitConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        debug!(
            "Initializing device; workgroup_size={}, max_concurrent_workgroups={}",
            config.workgroup_size, config.max_concurrent_workgroups,
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrent_workgroups)
            .thread_name(|idx| format!("raysplit-workgroup-{idx}"))
            .build()?;

        Ok(Self {
            pool,
            workgroup_size: config.workgroup_size,
        })
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Returns how many workgroups are needed to cover `invocations`.
    pub fn workgroups(&self, invocations: u32) -> u32 {
        (invocations + self.workgroup_size - 1) / self.workgroup_size
    }

    /// Runs `kernel` for `invocations` lanes and returns once all of them
    /// have finished.
    ///
    /// The last workgroup is padded with lanes whose global index is past
    /// `invocations`; they run the kernel as well, because a workgroup's
    /// barriers need all of its lanes. `shared` creates the workgroup-shared
    /// memory, once per workgroup.
    ///
    /// If any lane panics, the rest of its workgroup is released from the
    /// barriers and the panic is re-raised from here.
    pub fn dispatch<S>(
        &self,
        label: &str,
        invocations: u32,
        shared: impl Fn(u32) -> S + Sync,
        kernel: impl Fn(&Lane, &S) + Sync,
    ) where
        S: Sync,
    {
        let workgroups = self.workgroups(invocations);

        trace!(
            "Dispatching `{label}`; invocations={invocations}, workgroups={workgroups}"
        );

        if workgroups == 0 {
            return;
        }

        let size = self.workgroup_size;

        self.pool.install(|| {
            (0..workgroups).into_par_iter().for_each(|workgroup_idx| {
                let shared = shared(size);

                if size == 1 {
                    let lane = Lane {
                        global_idx: workgroup_idx,
                        local_idx: 0,
                        local_size: 1,
                        barrier: None,
                    };

                    kernel(&lane, &shared);
                    return;
                }

                let barrier = LaneBarrier::new(size);
                let failure = Mutex::new(None);

                thread::scope(|s| {
                    for local_idx in 0..size {
                        let shared = &shared;
                        let kernel = &kernel;
                        let barrier = &barrier;
                        let failure = &failure;

                        let spawned = thread::Builder::new().spawn_scoped(
                            s,
                            move || {
                                let lane = Lane {
                                    global_idx: workgroup_idx * size
                                        + local_idx,
                                    local_idx,
                                    local_size: size,
                                    barrier: Some(barrier),
                                };

                                let result =
                                    panic::catch_unwind(AssertUnwindSafe(
                                        || kernel(&lane, shared),
                                    ));

                                if let Err(payload) = result {
                                    if !payload.is::<LaneAborted>() {
                                        record(failure, payload);
                                    }

                                    barrier.poison();
                                }
                            },
                        );

                        if let Err(err) = spawned {
                            error!(
                                "Couldn't spawn lane {local_idx} of `{label}`: {err}"
                            );

                            record(
                                failure,
                                Box::new(format!(
                                    "couldn't spawn lane {local_idx} of \
                                     `{label}`: {err}"
                                )),
                            );

                            barrier.poison();
                            break;
                        }
                    }
                });

                let failure = failure
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner);

                if let Some(payload) = failure {
                    panic::resume_unwind(payload);
                }
            });
        });
    }
}

/// Keeps the first failure of a workgroup; later ones are mostly lanes
/// reacting to it.
fn record(
    failure: &Mutex<Option<Box<dyn Any + Send>>>,
    payload: Box<dyn Any + Send>,
) {
    failure
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert(payload);
}

/// Unwinding payload of lanes released from a poisoned barrier.
struct LaneAborted;

/// A barrier that can be poisoned: once a lane of the workgroup fails,
/// every lane waiting at (or later arriving at) the barrier unwinds instead
/// of waiting for the failed lane forever.
struct LaneBarrier {
    state: Mutex<LaneBarrierState>,
    cvar: Condvar,
    size: u32,
}

#[derive(Default)]
struct LaneBarrierState {
    arrived: u32,
    generation: u64,
    poisoned: bool,
}

impl LaneBarrier {
    fn new(size: u32) -> Self {
        Self {
            state: Default::default(),
            cvar: Condvar::new(),
            size,
        }
    }

    fn wait(&self) {
        let mut state = self.lock();

        if state.poisoned {
            drop(state);
            panic::resume_unwind(Box::new(LaneAborted));
        }

        let generation = state.generation;

        state.arrived += 1;

        if state.arrived == self.size {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return;
        }

        while state.generation == generation && !state.poisoned {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.generation == generation {
            drop(state);
            panic::resume_unwind(Box::new(LaneAborted));
        }
    }

    fn poison(&self) {
        self.lock().poisoned = true;
        self.cvar.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, LaneBarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A single invocation of a dispatch.
pub struct Lane<'a> {
    global_idx: u32,
    local_idx: u32,
    local_size: u32,
    barrier: Option<&'a LaneBarrier>,
}

impl Workgroup for Lane<'_> {
    fn global_idx(&self) -> u32 {
        self.global_idx
    }

    fn local_idx(&self) -> u32 {
        self.local_idx
    }

    fn local_size(&self) -> u32 {
        self.local_size
    }

    fn barrier(&self) {
        if let Some(barrier) = self.barrier {
            barrier.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn device(workgroup_size: u32) -> Device {
        Device::new(
            &SplitConfig::new(64)
                .with_workgroup_size(workgroup_size)
                .with_max_concurrent_workgroups(4),
        )
        .unwrap()
    }

    #[test]
    fn workgroups() {
        let target = device(8);

        assert_eq!(0, target.workgroups(0));
        assert_eq!(1, target.workgroups(1));
        assert_eq!(1, target.workgroups(8));
        assert_eq!(2, target.workgroups(9));
    }

    #[test]
    fn every_lane_runs_once() {
        for workgroup_size in [1, 3, 8, 32] {
            let target = device(workgroup_size);
            let hits: Vec<_> = (0..100).map(|_| AtomicU32::new(0)).collect();

            target.dispatch(
                "test",
                100,
                |_| (),
                |lane, _| {
                    assert!(lane.local_idx() < lane.local_size());

                    assert_eq!(
                        lane.global_idx() % workgroup_size,
                        lane.local_idx()
                    );

                    if let Some(hit) = hits.get(lane.global_idx() as usize) {
                        hit.fetch_add(1, Ordering::Relaxed);
                    }
                },
            );

            for hit in &hits {
                assert_eq!(1, hit.load(Ordering::Relaxed));
            }
        }
    }

    #[test]
    fn barrier() {
        let target = device(16);

        target.dispatch(
            "test",
            64,
            |size| (AtomicU32::new(0), size),
            |lane, (arrived, size)| {
                arrived.fetch_add(1, Ordering::Relaxed);
                lane.barrier();

                // Nobody gets past the barrier before everyone reached it
                assert_eq!(*size, arrived.load(Ordering::Relaxed));
            },
        );
    }

    #[test]
    fn barrier_phases() {
        let target = device(8);

        target.dispatch(
            "test",
            32,
            |_| AtomicU32::new(0),
            |lane, arrived| {
                for phase in 1..=3 {
                    arrived.fetch_add(1, Ordering::Relaxed);
                    lane.barrier();

                    assert!(phase * 8 <= arrived.load(Ordering::Relaxed));

                    lane.barrier();
                }
            },
        );
    }

    #[test]
    fn lane_panic_is_propagated() {
        let target = device(4);

        // Lane 5 dies before the barrier its workgroup-mates are waiting at
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            target.dispatch(
                "test",
                16,
                |_| (),
                |lane, _| {
                    if lane.global_idx() == 5 {
                        panic!("lane 5 failed");
                    }

                    lane.barrier();
                    lane.barrier();
                },
            );
        }));

        let payload = result.unwrap_err();

        assert_eq!(Some(&"lane 5 failed"), payload.downcast_ref::<&str>());

        // ... and the device stays usable afterwards
        let hits = AtomicU32::new(0);

        target.dispatch(
            "test",
            16,
            |_| (),
            |lane, _| {
                lane.barrier();
                hits.fetch_add(1, Ordering::Relaxed);
            },
        );

        assert_eq!(16, hits.load(Ordering::Relaxed));
    }

    #[test]
    fn empty_dispatch() {
        let target = device(8);

        target.dispatch("test", 0, |_| (), |_, _| panic!("lane spawned"));
    }
}
