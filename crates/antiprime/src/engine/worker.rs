use super::{Coordinator, Submission};
use crate::{DivisorCounter, Error};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicU64, Ordering},
};

/// Body of one pool thread.
///
/// Each worker repeatedly asks the [`Coordinator`] for a candidate, counts its
/// divisors, and submits the result. Workers are interchangeable: the commit
/// order is enforced by the coordinator, never by which worker produced a
/// result.
///
/// A panicking counter does not take the worker down: the candidate's search
/// is retired as failed and the worker goes back to the dispatcher.
///
/// The loop ends when either suspension point reports [`Error::Shutdown`].
///
/// # Arguments
///
/// - `worker_id`: Index of this worker in the pool (used for logs and stats).
/// - `coordinator`: Shared dispatcher and sequencer.
/// - `counter`: The divisor-counting function, shared by every worker.
/// - `evaluated`: This worker's evaluation counter.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
pub(crate) fn worker_loop<D>(
    worker_id: usize,
    coordinator: &Coordinator,
    counter: &D,
    evaluated: &AtomicU64,
) where
    D: DivisorCounter + ?Sized,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let candidate = match coordinator.next_candidate() {
            Ok(candidate) => candidate,
            Err(Error::Shutdown) => break,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {worker_id} failed to obtain a candidate: {_e}");
                continue;
            }
        };

        let value = candidate.value();
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {worker_id} evaluating {value}");
        let counted = panic::catch_unwind(AssertUnwindSafe(|| counter.count_divisors(value)));
        let divisors = match counted {
            Ok(divisors) => divisors,
            Err(_) => {
                let _abandoned = coordinator.abandon_candidate(candidate);
                #[cfg(feature = "tracing")]
                tracing::error!(
                    retired = _abandoned,
                    "Worker {worker_id} counter panicked on {value}"
                );
                continue;
            }
        };
        evaluated.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {worker_id} found that {value} has {divisors} divisors");

        match coordinator.submit_result(candidate, divisors) {
            Ok(Submission::Committed) => {}
            Ok(Submission::Obsolete) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} dropped stale result for {value}");
            }
            Ok(Submission::Retired(_outcome)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} retired the search: {_outcome:?}");
            }
            Err(Error::Shutdown) => break,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {worker_id} failed to submit {value}: {_e}");
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
