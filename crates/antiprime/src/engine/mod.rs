//! The concurrent search engine.
//!
//! A fixed pool of workers pulls candidates from the dispatcher, counts their
//! divisors in parallel, and pushes results to the sequencer, which commits
//! them strictly in ascending candidate order. The first committed candidate
//! that beats the record is the next antiprime: ascending commits make that
//! answer minimal no matter how workers are scheduled or how many there are.
//!
//! ```text
//!  extend_sequence() ──► Coordinator ◄── next_candidate() ── worker 0..N
//!                         │  (one lock,         │
//!                         │   one condvar)      ▼
//!                         │                count_divisors()
//!                         │                     │
//!                         ▼                     ▼
//!                    SequenceStore ◄──── submit_result()
//! ```

mod coordinator;
mod dispatcher;
mod pool;
mod sequencer;
mod state;
mod stats;
mod worker;

pub use coordinator::*;
pub use sequencer::*;
pub use state::{Candidate, SearchOutcome};
pub use stats::*;

use crate::{
    DivisorCounter, EngineConfig, Observer, Result, ScoredNumber, SequenceStore, SubscriptionId,
    TrialDivision,
};
use pool::WorkerPool;
use std::sync::Arc;

/// Searches the antiprime sequence with a fixed pool of worker threads.
///
/// The engine owns a [`Coordinator`] and the worker threads, and extends a
/// possibly shared [`SequenceStore`]. Dropping the engine shuts the pool down
/// and joins every worker; call [`Engine::stop`] to do so explicitly.
///
/// # Example
///
/// ```
/// use antiprime::{Engine, EngineConfig, ScoredNumber};
///
/// let engine = Engine::new(EngineConfig::default())?;
/// assert_eq!(engine.extend_and_wait()?, ScoredNumber::new(2, 2));
/// assert_eq!(engine.extend_and_wait()?, ScoredNumber::new(4, 3));
///
/// let values: Vec<u64> = engine.last_k(10).iter().map(|n| n.value()).collect();
/// assert_eq!(values, vec![1, 2, 4]);
/// engine.stop();
/// # Ok::<(), antiprime::Error>(())
/// ```
pub struct Engine {
    coordinator: Arc<Coordinator>,
    pool: WorkerPool,
    num_workers: usize,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("coordinator", &self.coordinator)
            .field("num_workers", &self.num_workers)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Starts an engine over a fresh sequence, counting divisors with
    /// [`TrialDivision`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] or [`crate::Error::WorkerSpawn`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_counter(config, TrialDivision)
    }

    /// Starts an engine over a fresh sequence with a custom counter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] or [`crate::Error::WorkerSpawn`].
    pub fn with_counter<D>(config: EngineConfig, counter: D) -> Result<Self>
    where
        D: DivisorCounter,
    {
        Self::with_store(config, Arc::new(SequenceStore::new()), counter)
    }

    /// Starts an engine that extends an existing, possibly shared, store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] or [`crate::Error::WorkerSpawn`].
    pub fn with_store<D>(
        config: EngineConfig,
        store: Arc<SequenceStore>,
        counter: D,
    ) -> Result<Self>
    where
        D: DivisorCounter,
    {
        config.validate()?;
        let coordinator = Arc::new(Coordinator::new(store));
        let pool = WorkerPool::spawn(&config, &coordinator, Arc::new(counter))?;

        #[cfg(feature = "tracing")]
        tracing::info!("Engine ready with {} workers", config.num_workers);

        Ok(Self {
            coordinator,
            pool,
            num_workers: config.num_workers,
        })
    }

    /// The shared coordinator, for driving the protocol directly.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The sequence this engine extends.
    pub fn store(&self) -> &Arc<SequenceStore> {
        self.coordinator.store()
    }

    /// Size of the worker pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Starts searching for the successor of the last term and returns
    /// without waiting for it. The answer is appended to the store, which
    /// notifies observers.
    ///
    /// A call made while the same successor is already being searched for is
    /// absorbed into that search.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Shutdown`] after [`Self::stop`], or
    /// [`crate::Error::CandidateOverflow`] if no successor is representable.
    pub fn extend_sequence(&self) -> Result<SearchHandle> {
        self.coordinator.extend()
    }

    /// Extends the sequence by one term and waits for it.
    ///
    /// # Errors
    ///
    /// See [`Self::extend_sequence`] and [`SearchHandle::wait`].
    pub fn extend_and_wait(&self) -> Result<ScoredNumber> {
        self.extend_sequence()?.wait()
    }

    /// Cancels any running search and clears the sequence back to `(1, 1)`.
    pub fn reset_sequence(&self) {
        self.coordinator.reset();
    }

    /// Cancels the running search, if any.
    pub fn cancel(&self) -> bool {
        self.coordinator.cancel()
    }

    /// Returns `true` while a search is running.
    pub fn is_searching(&self) -> bool {
        self.coordinator.is_searching()
    }

    /// The most recent term.
    pub fn last(&self) -> ScoredNumber {
        self.store().last()
    }

    /// The `k` most recent terms, oldest first.
    pub fn last_k(&self, k: usize) -> Vec<ScoredNumber> {
        self.store().last_k(k)
    }

    /// The whole history.
    pub fn snapshot(&self) -> Vec<ScoredNumber> {
        self.store().snapshot()
    }

    /// Registers an observer on the underlying store.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> SubscriptionId {
        self.store().subscribe(observer)
    }

    /// Removes an observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store().unsubscribe(id)
    }

    /// Search counters plus per-worker evaluation counts.
    pub fn stats(&self) -> EngineStats {
        let mut stats = self.coordinator.stats();
        stats.evaluations_per_worker = self.pool.evaluations();
        stats
    }

    /// Shuts the pool down and joins every worker.
    ///
    /// A worker in the middle of counting divisors finishes that candidate
    /// before it notices the shutdown, so this returns once the slowest
    /// in-flight evaluation completes.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.coordinator.shutdown();
        self.pool.join();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
