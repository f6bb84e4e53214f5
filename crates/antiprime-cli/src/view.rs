use antiprime::{Engine, EngineStats, History, ScoredNumber, SequenceChange, SubscriptionId};
use core::fmt::Write as _;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// What the terminal shows after a change to the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewUpdate {
    pub change: SequenceChange,
    pub recent: Vec<ScoredNumber>,
    pub total: usize,
}

impl ViewUpdate {
    fn capture(change: SequenceChange, history: &History<'_>, show_last: usize) -> Self {
        Self {
            change,
            recent: history.last_k(show_last).to_vec(),
            total: history.len(),
        }
    }
}

/// Subscribes to the engine's sequence and forwards a snapshot of the last
/// `show_last` terms on every change.
///
/// The observer runs on the worker thread that committed the answer and must
/// not block, so it only pushes onto an unbounded channel.
pub fn attach(
    engine: &Engine,
    show_last: usize,
) -> (SubscriptionId, UnboundedReceiver<ViewUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = engine.subscribe(move |change: &SequenceChange, history: &History<'_>| {
        // The receiver is gone once the session is over.
        let _ = tx.send(ViewUpdate::capture(*change, history, show_last));
    });
    (id, rx)
}

pub fn render_update(update: &ViewUpdate) -> String {
    let mut out = match update.change {
        SequenceChange::Appended(term) => format!("found {term}\n"),
        SequenceChange::Reset => String::from("sequence reset\n"),
    };
    out.push_str(&render_terms(&update.recent, update.total));
    out
}

pub fn render_terms(recent: &[ScoredNumber], total: usize) -> String {
    let mut out = format!("last {} of {} terms:", recent.len(), total);
    for term in recent {
        let _ = write!(out, "\n  {term}");
    }
    out
}

pub fn render_stats(stats: &EngineStats) -> String {
    let mut out = String::new();
    let rows = [
        ("searches started", stats.searches_started),
        ("searches absorbed", stats.searches_absorbed),
        ("searches completed", stats.searches_completed),
        ("searches abandoned", stats.searches_abandoned),
        ("candidates dispatched", stats.candidates_dispatched),
        ("candidates evaluated", stats.candidates_evaluated()),
        ("results committed", stats.results_committed),
        ("results discarded", stats.results_discarded),
        ("out-of-order waits", stats.out_of_order_waits),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<22} {value}");
    }
    for (worker, evaluated) in stats.evaluations_per_worker.iter().enumerate() {
        let _ = writeln!(out, "{:<22} {evaluated}", format!("worker {worker}"));
    }
    out.pop();
    out
}
