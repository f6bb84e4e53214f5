//! Coordination state shared by the dispatcher and the sequencer.
//!
//! Everything here is plain data mutated under the coordinator lock. The
//! request, both cursors, and the generation counter take part in one
//! invariant (results commit in ascending candidate order, per request), so
//! they live in a single struct rather than behind separate locks.

use crate::{EngineStats, Error, Result, ScoredNumber};
use std::collections::HashMap;

/// Exclusive upper bound of the candidate space. `u64::MAX` is never
/// evaluated, which keeps every cursor increment overflow-free.
pub(crate) const CANDIDATE_LIMIT: u64 = u64::MAX;

/// A candidate handed out by the dispatcher, tagged with the generation of the
/// search it belongs to.
///
/// The generation is what lets the sequencer tell a late result from a retired
/// search apart from a result for the same value in a newer search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Candidate {
    generation: u64,
    value: u64,
}

impl Candidate {
    pub(crate) const fn new(generation: u64, value: u64) -> Self {
        Self { generation, value }
    }

    /// The integer to evaluate.
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The search this candidate was dispatched for.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// How a search was retired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The successor was committed and appended to the sequence.
    Found(ScoredNumber),
    /// The successor was found, but the sequence no longer ended with the
    /// search's starting term, so nothing was appended.
    Superseded(ScoredNumber),
    /// The search was cancelled or the sequence was reset.
    Cancelled,
    /// Every representable candidate after `after` was ruled out.
    Exhausted {
        /// The starting value of the search.
        after: u64,
    },
    /// The divisor counter panicked on `value`.
    Failed {
        /// The candidate that could not be evaluated.
        value: u64,
    },
}

impl SearchOutcome {
    /// Converts the outcome into the appended term or the matching error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceChanged`], [`Error::SearchCancelled`],
    /// [`Error::CandidateOverflow`] or [`Error::CounterPanicked`] for the
    /// corresponding non-`Found` outcomes.
    pub fn into_result(self) -> Result<ScoredNumber> {
        match self {
            Self::Found(term) => Ok(term),
            Self::Superseded(_) => Err(Error::SequenceChanged),
            Self::Cancelled => Err(Error::SearchCancelled),
            Self::Exhausted { after } => Err(Error::CandidateOverflow { after }),
            Self::Failed { value } => Err(Error::CounterPanicked { value }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SearchRequest {
    pub(crate) generation: u64,
    pub(crate) record: ScoredNumber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Activation {
    /// A new search was activated with this generation.
    Started(u64),
    /// A search with the same starting value is already running.
    Absorbed(u64),
    /// A search with a different starting value is running.
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The result belongs to a retired search, or was already committed.
    Obsolete,
    /// The result is not the next value after the commit frontier.
    OutOfOrder,
    /// The result was committed and did not qualify.
    Advanced,
    /// The result was committed, did not qualify, and was the last
    /// representable candidate. The search has been retired.
    Exhausted { after: u64 },
    /// The result was committed and beats the record. The caller appends it
    /// and then retires the search.
    Qualified {
        record: ScoredNumber,
        answer: ScoredNumber,
    },
}

#[derive(Debug, Default)]
struct Watch {
    handles: usize,
    outcome: Option<SearchOutcome>,
}

#[derive(Debug, Default)]
pub(crate) struct SearchState {
    request: Option<SearchRequest>,
    /// Next value to hand out. Meaningless while idle.
    next_to_dispatch: u64,
    /// Highest value accounted for in ascending order. Meaningless while idle.
    last_committed: u64,
    /// Generation of the most recently activated search.
    generation: u64,
    shutdown: bool,
    watches: HashMap<u64, Watch>,
    stats: EngineStats,
}

impl SearchState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub(crate) fn shut_down(&mut self) {
        self.shutdown = true;
    }

    pub(crate) fn request(&self) -> Option<SearchRequest> {
        self.request
    }

    pub(crate) fn stats(&self) -> EngineStats {
        self.stats.clone()
    }

    pub(crate) fn note_out_of_order(&mut self) {
        self.stats.out_of_order_waits += 1;
    }

    /// Idle -> Searching, or absorb a duplicate request.
    pub(crate) fn activate(&mut self, record: ScoredNumber) -> Result<Activation> {
        if self.shutdown {
            return Err(Error::Shutdown);
        }
        if let Some(active) = self.request {
            if active.record.value() == record.value() {
                self.stats.searches_absorbed += 1;
                return Ok(Activation::Absorbed(active.generation));
            }
            return Ok(Activation::Busy);
        }
        // At least one candidate must lie strictly between the record and
        // the limit.
        if record.value() >= CANDIDATE_LIMIT - 1 {
            return Err(Error::CandidateOverflow {
                after: record.value(),
            });
        }

        self.generation += 1;
        self.request = Some(SearchRequest {
            generation: self.generation,
            record,
        });
        self.last_committed = record.value();
        self.next_to_dispatch = record.value() + 1;
        self.stats.searches_started += 1;
        Ok(Activation::Started(self.generation))
    }

    /// Hands out the next candidate, or `None` while there is nothing to
    /// dispatch (idle, or the candidate space is used up).
    pub(crate) fn dispatch(&mut self) -> Option<Candidate> {
        let request = self.request?;
        if self.next_to_dispatch >= CANDIDATE_LIMIT {
            return None;
        }
        let candidate = Candidate::new(request.generation, self.next_to_dispatch);
        self.next_to_dispatch += 1;
        self.stats.candidates_dispatched += 1;
        Some(candidate)
    }

    /// Accounts for one evaluated candidate, enforcing ascending order.
    ///
    /// `OutOfOrder` leaves the state untouched; the caller waits for the
    /// frontier to move and tries again.
    pub(crate) fn commit(&mut self, candidate: Candidate, divisors: u64) -> Verdict {
        let request = match self.request {
            Some(request) if request.generation == candidate.generation => request,
            _ => {
                self.stats.results_discarded += 1;
                return Verdict::Obsolete;
            }
        };
        if candidate.value <= self.last_committed {
            // Already accounted for; only a duplicate submission gets here.
            self.stats.results_discarded += 1;
            return Verdict::Obsolete;
        }
        if candidate.value != self.last_committed + 1 {
            return Verdict::OutOfOrder;
        }

        self.last_committed = candidate.value;
        self.stats.results_committed += 1;

        let scored = ScoredNumber::new(candidate.value, divisors);
        if scored.beats(&request.record) {
            return Verdict::Qualified {
                record: request.record,
                answer: scored,
            };
        }
        if self.last_committed == CANDIDATE_LIMIT - 1 {
            let after = request.record.value();
            self.retire(SearchOutcome::Exhausted { after });
            return Verdict::Exhausted { after };
        }
        Verdict::Advanced
    }

    /// Retires the search `candidate` belongs to as [`SearchOutcome::Failed`].
    /// Returns `false` if that search is no longer active.
    pub(crate) fn fail(&mut self, candidate: Candidate) -> bool {
        match self.request {
            Some(request) if request.generation == candidate.generation => {
                self.retire(SearchOutcome::Failed {
                    value: candidate.value,
                });
                true
            }
            _ => false,
        }
    }

    /// Searching -> Idle. Returns the retired generation, or `None` if no
    /// search was active.
    pub(crate) fn retire(&mut self, outcome: SearchOutcome) -> Option<u64> {
        let request = self.request.take()?;
        match outcome {
            SearchOutcome::Found(_) => self.stats.searches_completed += 1,
            _ => self.stats.searches_abandoned += 1,
        }
        if let Some(watch) = self.watches.get_mut(&request.generation) {
            watch.outcome = Some(outcome);
        }
        Some(request.generation)
    }

    /// Registers interest in the outcome of `generation`, which must be the
    /// active search.
    pub(crate) fn watch(&mut self, generation: u64) {
        debug_assert_eq!(self.request.map(|r| r.generation), Some(generation));
        self.watches.entry(generation).or_default().handles += 1;
    }

    pub(crate) fn unwatch(&mut self, generation: u64) {
        if let Some(watch) = self.watches.get_mut(&generation) {
            watch.handles -= 1;
            if watch.handles == 0 {
                self.watches.remove(&generation);
            }
        }
    }

    pub(crate) fn outcome(&self, generation: u64) -> Option<SearchOutcome> {
        self.watches.get(&generation).and_then(|watch| watch.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64, divisors: u64) -> ScoredNumber {
        ScoredNumber::new(value, divisors)
    }

    fn started(state: &mut SearchState, record: ScoredNumber) -> u64 {
        match state.activate(record).unwrap() {
            Activation::Started(generation) => generation,
            other => panic!("expected a new search, got {other:?}"),
        }
    }

    #[test]
    fn idle_state_dispatches_nothing() {
        let mut state = SearchState::new();
        assert_eq!(state.dispatch(), None);
        assert_eq!(state.stats().candidates_dispatched, 0);
    }

    #[test]
    fn dispatch_starts_after_the_record_and_never_repeats() {
        let mut state = SearchState::new();
        let generation = started(&mut state, n(4, 3));
        let values: Vec<_> = (0..5).map(|_| state.dispatch().unwrap().value()).collect();
        assert_eq!(values, vec![5, 6, 7, 8, 9]);
        assert!(
            (0..5).all(|_| state.dispatch().unwrap().generation() == generation),
            "every candidate carries the active generation"
        );
    }

    #[test]
    fn duplicate_requests_are_absorbed_and_others_are_busy() {
        let mut state = SearchState::new();
        let generation = started(&mut state, n(2, 2));
        assert_eq!(state.activate(n(2, 2)), Ok(Activation::Absorbed(generation)));
        assert_eq!(state.activate(n(4, 3)), Ok(Activation::Busy));
        assert_eq!(state.stats().searches_started, 1);
        assert_eq!(state.stats().searches_absorbed, 1);
    }

    #[test]
    fn out_of_order_results_wait_for_the_frontier() {
        let mut state = SearchState::new();
        started(&mut state, n(2, 2));
        let three = state.dispatch().unwrap();
        let four = state.dispatch().unwrap();

        assert_eq!(state.commit(four, 3), Verdict::OutOfOrder);
        assert_eq!(state.commit(three, 2), Verdict::Advanced);
        assert_eq!(
            state.commit(four, 3),
            Verdict::Qualified {
                record: n(2, 2),
                answer: n(4, 3)
            }
        );
    }

    #[test]
    fn later_qualifier_cannot_win_over_an_earlier_one() {
        let mut state = SearchState::new();
        started(&mut state, n(4, 3));
        let five = state.dispatch().unwrap();
        let six = state.dispatch().unwrap();
        let seven = state.dispatch().unwrap();
        let eight = state.dispatch().unwrap();

        // 8 finishes first and beats the record, but 5..7 are still open.
        assert_eq!(state.commit(eight, 4), Verdict::OutOfOrder);
        assert_eq!(state.commit(seven, 2), Verdict::OutOfOrder);
        assert_eq!(state.commit(five, 2), Verdict::Advanced);
        assert!(matches!(
            state.commit(six, 4),
            Verdict::Qualified { answer, .. } if answer == n(6, 4)
        ));
        state.retire(SearchOutcome::Found(n(6, 4)));

        assert_eq!(state.commit(seven, 2), Verdict::Obsolete);
        assert_eq!(state.commit(eight, 4), Verdict::Obsolete);
        assert_eq!(state.stats().results_discarded, 2);
    }

    #[test]
    fn stale_generation_is_obsolete_even_when_values_line_up() {
        let mut state = SearchState::new();
        started(&mut state, n(4, 3));
        let five = state.dispatch().unwrap();
        let six = state.dispatch().unwrap();
        let stale_seven = state.dispatch().unwrap();
        assert_eq!(state.commit(five, 2), Verdict::Advanced);
        assert!(matches!(state.commit(six, 4), Verdict::Qualified { .. }));
        state.retire(SearchOutcome::Found(n(6, 4)));

        // The next search starts at 6, so its frontier expects 7.
        started(&mut state, n(6, 4));
        assert_eq!(state.commit(stale_seven, 2), Verdict::Obsolete);
        let fresh_seven = state.dispatch().unwrap();
        assert_eq!(fresh_seven.value(), 7);
        assert_eq!(state.commit(fresh_seven, 2), Verdict::Advanced);
    }

    #[test]
    fn duplicate_submission_is_discarded() {
        let mut state = SearchState::new();
        started(&mut state, n(4, 3));
        let five = state.dispatch().unwrap();
        assert_eq!(state.commit(five, 2), Verdict::Advanced);
        assert_eq!(state.commit(five, 2), Verdict::Obsolete);
        assert_eq!(state.stats().results_committed, 1);
        assert_eq!(state.stats().results_discarded, 1);
    }

    #[test]
    fn retire_records_outcome_for_watchers() {
        let mut state = SearchState::new();
        let generation = started(&mut state, ScoredNumber::SEED);
        state.watch(generation);
        assert_eq!(state.outcome(generation), None);

        assert_eq!(state.retire(SearchOutcome::Cancelled), Some(generation));
        assert_eq!(state.outcome(generation), Some(SearchOutcome::Cancelled));
        assert_eq!(state.retire(SearchOutcome::Cancelled), None);

        state.unwatch(generation);
        assert_eq!(state.outcome(generation), None);
        assert_eq!(state.stats().searches_abandoned, 1);
    }

    #[test]
    fn requests_at_the_top_of_the_range_are_rejected() {
        let mut state = SearchState::new();
        for value in [u64::MAX - 1, u64::MAX] {
            assert_eq!(
                state.activate(n(value, 2)),
                Err(Error::CandidateOverflow { after: value })
            );
        }
        assert_eq!(state.request(), None);
    }

    #[test]
    fn last_representable_candidate_exhausts_the_search() {
        let mut state = SearchState::new();
        let start = u64::MAX - 3;
        started(&mut state, n(start, 1_000));
        let candidates: Vec<_> = std::iter::from_fn(|| state.dispatch()).collect();
        assert_eq!(
            candidates.iter().map(Candidate::value).collect::<Vec<_>>(),
            vec![u64::MAX - 2, u64::MAX - 1]
        );
        assert_eq!(state.commit(candidates[0], 2), Verdict::Advanced);
        assert_eq!(
            state.commit(candidates[1], 2),
            Verdict::Exhausted { after: start }
        );
        assert_eq!(state.request(), None);
    }

    #[test]
    fn failed_candidate_retires_only_its_own_search() {
        let mut state = SearchState::new();
        let generation = started(&mut state, n(2, 2));
        state.watch(generation);
        let three = state.dispatch().unwrap();
        assert!(state.fail(three));
        assert_eq!(
            state.outcome(generation),
            Some(SearchOutcome::Failed { value: 3 })
        );
        assert_eq!(state.request(), None);

        started(&mut state, n(2, 2));
        assert!(!state.fail(three));
        assert!(state.request().is_some());
        assert_eq!(state.stats().searches_abandoned, 1);
    }

    #[test]
    fn shutdown_rejects_new_requests() {
        let mut state = SearchState::new();
        state.shut_down();
        assert!(state.is_shutdown());
        assert_eq!(state.activate(ScoredNumber::SEED), Err(Error::Shutdown));
    }

    #[test]
    fn outcomes_map_to_results() {
        assert_eq!(SearchOutcome::Found(n(2, 2)).into_result(), Ok(n(2, 2)));
        assert_eq!(
            SearchOutcome::Superseded(n(2, 2)).into_result(),
            Err(Error::SequenceChanged)
        );
        assert_eq!(
            SearchOutcome::Cancelled.into_result(),
            Err(Error::SearchCancelled)
        );
        assert_eq!(
            SearchOutcome::Exhausted { after: 7 }.into_result(),
            Err(Error::CandidateOverflow { after: 7 })
        );
        assert_eq!(
            SearchOutcome::Failed { value: 3 }.into_result(),
            Err(Error::CounterPanicked { value: 3 })
        );
    }
}
