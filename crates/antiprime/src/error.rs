//! Error types for the antiprime search engine.
//!
//! The search protocol itself has no invalid-input path: duplicate requests
//! are absorbed and stale results are discarded. What remains are lifecycle
//! conditions (shutdown, cancellation, a store that changed under a running
//! search), the candidate overflow guard, and configuration mistakes.

use crate::ScoredNumber;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `antiprime` can emit.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The engine was stopped. Every suspension point returns this once the
    /// worker pool has been told to shut down.
    #[error("Search engine is shutting down")]
    Shutdown,

    /// The search was retired without an answer by an explicit cancel or a
    /// reset of the sequence.
    #[error("Search was cancelled before an answer was committed")]
    SearchCancelled,

    /// An answer was found but the sequence no longer ended with the term the
    /// search started from, so the answer was dropped.
    #[error("Sequence changed while the search was running")]
    SequenceChanged,

    /// No successor of `after` is representable as a `u64` candidate.
    #[error("Candidate space exhausted searching after {after}")]
    CandidateOverflow { after: u64 },

    /// A term was offered to the store that does not extend it.
    #[error("Term {next} does not extend the sequence ending at {last}")]
    NotIncreasing { last: ScoredNumber, next: ScoredNumber },

    /// The divisor counter panicked while evaluating `value`, so the search
    /// could not commit past it.
    #[error("Divisor counter panicked on {value}")]
    CounterPanicked { value: u64 },

    /// The engine configuration was rejected.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A worker thread could not be started.
    #[error("Failed to spawn worker: {context}")]
    WorkerSpawn { context: String },
}
