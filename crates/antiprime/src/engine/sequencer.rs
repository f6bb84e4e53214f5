use super::{
    Coordinator, SearchOutcome,
    state::{Candidate, Verdict},
};
use crate::{Error, Result, ScoredNumber};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// What happened to a result passed to [`Coordinator::submit_result`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The result was committed and did not beat the record.
    Committed,
    /// The result's search had already retired, so it was dropped.
    Obsolete,
    /// Committing the result retired the search.
    Retired(SearchOutcome),
}

impl Coordinator {
    /// Accepts an evaluated candidate and commits it in ascending order.
    ///
    /// If `candidate` is not the value right after the commit frontier, the
    /// calling worker waits until it is, or until its search retires. The
    /// first committed value whose divisor count beats the record is appended
    /// to the sequence and retires the search; results still in flight for
    /// that search become obsolete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the coordinator shuts down while the
    /// result is pending.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn submit_result(&self, candidate: Candidate, divisors: u64) -> Result<Submission> {
        let mut state = self.state.lock();
        let mut waited = false;
        loop {
            if state.is_shutdown() {
                return Err(Error::Shutdown);
            }
            match state.commit(candidate, divisors) {
                Verdict::OutOfOrder => {
                    if !waited {
                        state.note_out_of_order();
                        waited = true;
                    }
                    self.wake.wait(&mut state);
                }
                Verdict::Obsolete => return Ok(Submission::Obsolete),
                Verdict::Advanced => {
                    self.wake.notify_all();
                    return Ok(Submission::Committed);
                }
                Verdict::Exhausted { after } => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        generation = candidate.generation(),
                        "No successor of {after} below {}",
                        candidate.value()
                    );
                    self.wake.notify_all();
                    return Ok(Submission::Retired(SearchOutcome::Exhausted { after }));
                }
                Verdict::Qualified { record, answer } => {
                    let outcome = self.append_answer(record, answer);
                    state.retire(outcome);
                    self.wake.notify_all();
                    return Ok(Submission::Retired(outcome));
                }
            }
        }
    }

    /// Retires the search `candidate` belongs to because its divisors could
    /// not be counted. Returns `false` if that search had already retired.
    pub(crate) fn abandon_candidate(&self, candidate: Candidate) -> bool {
        let mut state = self.state.lock();
        if state.fail(candidate) {
            self.wake.notify_all();
            return true;
        }
        false
    }

    /// Appends `answer` if the sequence still ends with `record`. Called with
    /// the coordinator lock held.
    fn append_answer(&self, record: ScoredNumber, answer: ScoredNumber) -> SearchOutcome {
        match self.store.append_after(record, answer) {
            Ok(true) => {
                #[cfg(feature = "tracing")]
                tracing::info!("Found {} with {} divisors", answer.value(), answer.divisors());
                SearchOutcome::Found(answer)
            }
            Ok(false) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Dropping {answer}: the sequence no longer ends with {record}");
                SearchOutcome::Superseded(answer)
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Store rejected {answer}: {_e}");
                SearchOutcome::Superseded(answer)
            }
        }
    }
}
