/// Counters describing the work an [`Engine`] has done since it started.
///
/// Search and commit counters are read under the coordinator lock, so they
/// are mutually consistent. Per-worker evaluation counts are sampled
/// separately and may run slightly ahead of `results_committed`.
///
/// [`Engine`]: crate::Engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Searches moved from idle to searching.
    pub searches_started: u64,
    /// Requests absorbed as duplicates of the running search.
    pub searches_absorbed: u64,
    /// Searches that appended a new term.
    pub searches_completed: u64,
    /// Searches retired without appending (cancel, reset, overflow, or a
    /// sequence that moved on).
    pub searches_abandoned: u64,
    /// Candidates handed to workers.
    pub candidates_dispatched: u64,
    /// Results accounted for in ascending order.
    pub results_committed: u64,
    /// Results dropped because their search had already retired.
    pub results_discarded: u64,
    /// Submissions that had to wait for the commit frontier.
    pub out_of_order_waits: u64,
    /// Candidates evaluated by each worker, indexed by worker id.
    pub evaluations_per_worker: Vec<u64>,
}

impl EngineStats {
    /// Total candidates evaluated across the pool.
    pub fn candidates_evaluated(&self) -> u64 {
        self.evaluations_per_worker.iter().sum()
    }
}
