//! The coordinator owns all search state behind one lock and one condition
//! variable.
//!
//! Callers (the [`Engine`] or anything driving the protocol by hand) activate
//! searches here; workers go through [`Coordinator::next_candidate`] and
//! [`Coordinator::submit_result`]. Every state change broadcasts on the same
//! condition variable and every waiter re-checks its own condition, so no
//! waiter relies on being the only one a wakeup was meant for.
//!
//! Lock order is coordinator, then sequence store. Observers run while both
//! are held and must not call back into either.
//!
//! [`Engine`]: crate::Engine

use super::state::{Activation, SearchOutcome, SearchState};
use crate::{EngineStats, Error, Result, ScoredNumber, SequenceStore};
use core::time::Duration;
use parking_lot::{Condvar, Mutex};
use std::{sync::Arc, time::Instant};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Shared coordination point between callers and the worker pool.
#[derive(Debug)]
pub struct Coordinator {
    pub(super) state: Mutex<SearchState>,
    pub(super) wake: Condvar,
    pub(super) store: Arc<SequenceStore>,
}

impl Coordinator {
    /// Creates an idle coordinator that appends answers to `store`.
    pub fn new(store: Arc<SequenceStore>) -> Self {
        Self {
            state: Mutex::new(SearchState::new()),
            wake: Condvar::new(),
            store,
        }
    }

    /// The sequence this coordinator extends.
    pub fn store(&self) -> &Arc<SequenceStore> {
        &self.store
    }

    /// Requests the successor of the sequence's current last term.
    ///
    /// The last term is read under the coordinator lock, so two concurrent
    /// calls against the same history always resolve to one search: the
    /// second is absorbed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the coordinator is shut down, or
    /// [`Error::CandidateOverflow`] if no successor is representable.
    pub fn extend(self: &Arc<Self>) -> Result<SearchHandle> {
        self.activate_with(|store| store.last())
    }

    /// Requests the successor of `record`.
    ///
    /// Returns immediately with a handle if the coordinator was idle or
    /// already searching from the same value. If a search from a different
    /// value is running, blocks until it retires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the coordinator is shut down, or
    /// [`Error::CandidateOverflow`] if no successor is representable.
    pub fn request_successor(self: &Arc<Self>, record: ScoredNumber) -> Result<SearchHandle> {
        self.activate_with(|_| record)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    fn activate_with(
        self: &Arc<Self>,
        read_record: impl Fn(&SequenceStore) -> ScoredNumber,
    ) -> Result<SearchHandle> {
        let mut state = self.state.lock();
        loop {
            let record = read_record(&self.store);
            let (generation, absorbed) = match state.activate(record)? {
                Activation::Started(generation) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(generation, "Searching for the successor of {record}");
                    self.wake.notify_all();
                    (generation, false)
                }
                Activation::Absorbed(generation) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(generation, "Already searching after {}", record.value());
                    (generation, true)
                }
                Activation::Busy => {
                    self.wake.wait(&mut state);
                    continue;
                }
            };
            state.watch(generation);
            return Ok(SearchHandle {
                coordinator: Arc::clone(self),
                generation,
                start: record,
                absorbed,
            });
        }
    }

    /// Retires the running search without appending anything.
    ///
    /// Returns `false` if nothing was running. Workers holding results for the
    /// retired search discard them.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        let retired = state.retire(SearchOutcome::Cancelled);
        if retired.is_some() {
            #[cfg(feature = "tracing")]
            tracing::info!(generation = retired, "Search cancelled");
            self.wake.notify_all();
        }
        retired.is_some()
    }

    /// Cancels any running search and clears the sequence back to its seed,
    /// as one step with respect to the search protocol.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let _retired = state.retire(SearchOutcome::Cancelled);
        #[cfg(feature = "tracing")]
        {
            if let Some(generation) = _retired {
                tracing::info!(generation, "Search cancelled by reset");
            }
        }
        self.store.reset();
        self.wake.notify_all();
    }

    /// Moves the coordinator to its terminal state. Every blocked caller and
    /// worker wakes up and observes [`Error::Shutdown`]; a running search is
    /// retired as [`SearchOutcome::Cancelled`].
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.is_shutdown() {
            state.shut_down();
            let _retired = state.retire(SearchOutcome::Cancelled);
            #[cfg(feature = "tracing")]
            tracing::debug!(retired = _retired, "Coordinator shut down");
        }
        self.wake.notify_all();
    }

    /// Returns `true` once [`Self::shutdown`] was called.
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().is_shutdown()
    }

    /// Returns `true` while a search is running.
    pub fn is_searching(&self) -> bool {
        self.state.lock().request().is_some()
    }

    /// The term the running search is trying to beat, if any.
    pub fn active_record(&self) -> Option<ScoredNumber> {
        self.state.lock().request().map(|request| request.record)
    }

    /// A consistent snapshot of the search counters. Per-worker counts are
    /// left empty; the [`Engine`](crate::Engine) fills them in.
    pub fn stats(&self) -> EngineStats {
        self.state.lock().stats()
    }
}

/// A pending search, returned by [`Coordinator::extend`] and
/// [`Coordinator::request_successor`].
///
/// The search keeps running whether or not the handle is kept; dropping the
/// handle only gives up interest in its outcome.
#[derive(Debug)]
pub struct SearchHandle {
    coordinator: Arc<Coordinator>,
    generation: u64,
    start: ScoredNumber,
    absorbed: bool,
}

impl SearchHandle {
    /// The generation of the search this handle follows.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The term whose successor is being searched for.
    pub fn start(&self) -> ScoredNumber {
        self.start
    }

    /// Returns `true` if the request joined a search that was already running.
    pub fn is_absorbed(&self) -> bool {
        self.absorbed
    }

    /// The outcome, if the search has retired.
    pub fn outcome(&self) -> Option<SearchOutcome> {
        self.coordinator.state.lock().outcome(self.generation)
    }

    /// Blocks until the search retires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the coordinator shuts down first.
    pub fn wait_outcome(&self) -> Result<SearchOutcome> {
        let mut state = self.coordinator.state.lock();
        loop {
            if let Some(outcome) = state.outcome(self.generation) {
                return Ok(outcome);
            }
            if state.is_shutdown() {
                return Err(Error::Shutdown);
            }
            self.coordinator.wake.wait(&mut state);
        }
    }

    /// Like [`Self::wait_outcome`], giving up after `timeout` with `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the coordinator shuts down first.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<SearchOutcome>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait_outcome().map(Some);
        };
        let mut state = self.coordinator.state.lock();
        loop {
            if let Some(outcome) = state.outcome(self.generation) {
                return Ok(Some(outcome));
            }
            if state.is_shutdown() {
                return Err(Error::Shutdown);
            }
            if self
                .coordinator
                .wake
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Ok(state.outcome(self.generation));
            }
        }
    }

    /// Blocks until the search retires and returns the appended term.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the coordinator shuts down first, or the
    /// error matching a non-`Found` [`SearchOutcome`].
    pub fn wait(self) -> Result<ScoredNumber> {
        self.wait_outcome()?.into_result()
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.coordinator.state.lock().unwatch(self.generation);
    }
}
