//! Fixed pool of OS threads running [`worker_loop`].
//!
//! Threads are spawned once, when the engine is built, and live until
//! [`WorkerPool::join`]. There is no per-search thread creation: between
//! searches every worker parks inside the dispatcher.

use super::{Coordinator, worker::worker_loop};
use crate::{DivisorCounter, EngineConfig, Error, Result};
use crossbeam_utils::CachePadded;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
};

pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    // One counter per worker, padded so neighbouring workers do not share a
    // cache line.
    evaluations: Arc<[CachePadded<AtomicU64>]>,
}

impl WorkerPool {
    /// Spawns `config.num_workers` threads against `coordinator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`] if a thread cannot be created. Threads
    /// that were already running are shut down and joined first.
    pub(crate) fn spawn<D>(
        config: &EngineConfig,
        coordinator: &Arc<Coordinator>,
        counter: Arc<D>,
    ) -> Result<Self>
    where
        D: DivisorCounter,
    {
        let evaluations: Arc<[CachePadded<AtomicU64>]> = (0..config.num_workers)
            .map(|_| CachePadded::new(AtomicU64::new(0)))
            .collect();
        let mut pool = Self {
            handles: Vec::with_capacity(config.num_workers),
            evaluations,
        };

        for worker_id in 0..config.num_workers {
            let worker_coordinator = Arc::clone(coordinator);
            let counter = Arc::clone(&counter);
            let evaluations = Arc::clone(&pool.evaluations);
            let spawned = thread::Builder::new()
                .name(format!("{}-{worker_id}", config.thread_name))
                .spawn(move || {
                    worker_loop(
                        worker_id,
                        &worker_coordinator,
                        counter.as_ref(),
                        &evaluations[worker_id],
                    );
                });

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    coordinator.shutdown();
                    pool.join();
                    return Err(Error::WorkerSpawn {
                        context: format!("worker {worker_id}: {e}"),
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawned {} workers", config.num_workers);
        Ok(pool)
    }

    /// Candidates evaluated so far by each worker.
    pub(crate) fn evaluations(&self) -> Vec<u64> {
        self.evaluations
            .iter()
            .map(|count| count.load(Ordering::Relaxed))
            .collect()
    }

    /// Joins every worker. The coordinator must already be shut down, or this
    /// blocks forever. Idempotent.
    pub(crate) fn join(&mut self) {
        for (_worker_id, handle) in self.handles.drain(..).enumerate() {
            if let Err(_panic) = handle.join() {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {_worker_id} panicked");
            }
        }
    }
}
