//! The ordered history of confirmed antiprimes.
//!
//! [`SequenceStore`] is the only owner of the history. Every mutation takes
//! the write lock, applies the change, and notifies every registered
//! [`Observer`] before releasing it, so a reader never sees a partially
//! updated history and observers see changes in the same total order as the
//! store applied them.
//!
//! Observers run on the mutating thread (a search worker for appends, the
//! caller for resets) and receive a read-only [`History`] of the locked terms.
//! They must not call back into the store or the engine: no reentrancy is
//! provided, and doing so deadlocks.

use crate::{Error, Result, ScoredNumber};
use core::fmt;
use parking_lot::RwLock;
use std::sync::Arc;

/// What changed in a [`SequenceStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceChange {
    /// A new term was appended.
    Appended(ScoredNumber),
    /// The history was cleared back to [`ScoredNumber::SEED`].
    Reset,
}

/// A read-only view of the history, handed to observers while the store is
/// locked.
#[derive(Clone, Copy, Debug)]
pub struct History<'a> {
    terms: &'a [ScoredNumber],
}

impl<'a> History<'a> {
    /// The most recent term. The history always holds at least the seed.
    pub fn last(&self) -> ScoredNumber {
        self.terms.last().copied().unwrap_or(ScoredNumber::SEED)
    }

    /// The `k` most recent terms, oldest first. `k` is clamped to the
    /// history length.
    pub fn last_k(&self, k: usize) -> &'a [ScoredNumber] {
        let start = self.terms.len().saturating_sub(k);
        &self.terms[start..]
    }

    /// Number of terms, including the seed.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// All terms, oldest first.
    pub fn as_slice(&self) -> &'a [ScoredNumber] {
        self.terms
    }

    /// Iterates over all terms, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &'a ScoredNumber> + 'a {
        self.terms.iter()
    }
}

/// Receives a synchronous callback on every append or reset.
///
/// Any `Fn(&SequenceChange, &History) + Send + Sync` closure is an observer.
pub trait Observer: Send + Sync {
    /// Called after the change has been applied, with the store still locked.
    fn update(&self, change: &SequenceChange, history: &History<'_>);
}

impl<F> Observer for F
where
    F: Fn(&SequenceChange, &History<'_>) + Send + Sync,
{
    fn update(&self, change: &SequenceChange, history: &History<'_>) {
        self(change, history);
    }
}

/// Handle returned by [`SequenceStore::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner {
    terms: Vec<ScoredNumber>,
    observers: Vec<(SubscriptionId, Arc<dyn Observer>)>,
    next_subscription: u64,
}

impl Inner {
    fn last(&self) -> ScoredNumber {
        self.terms.last().copied().unwrap_or(ScoredNumber::SEED)
    }

    fn push(&mut self, next: ScoredNumber) {
        self.terms.push(next);
        self.notify(&SequenceChange::Appended(next));
    }

    fn notify(&self, change: &SequenceChange) {
        let history = History { terms: &self.terms };
        for (_, observer) in &self.observers {
            observer.update(change, &history);
        }
    }
}

/// Append-only history of antiprimes, starting at `(1, 1)`.
pub struct SequenceStore {
    inner: RwLock<Inner>,
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SequenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SequenceStore")
            .field("terms", &inner.terms)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl SequenceStore {
    /// Creates a store holding only the seed.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                terms: vec![ScoredNumber::SEED],
                observers: Vec::new(),
                next_subscription: 0,
            }),
        }
    }

    /// Appends `next` and notifies observers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotIncreasing`] if `next` does not have both a larger
    /// value and more divisors than the current last term.
    pub fn append(&self, next: ScoredNumber) -> Result<()> {
        let mut inner = self.inner.write();
        let last = inner.last();
        if !last.precedes(&next) {
            return Err(Error::NotIncreasing { last, next });
        }
        inner.push(next);
        Ok(())
    }

    /// Appends `next` only if the history still ends with `expected_last`.
    ///
    /// Returns `Ok(false)` without notifying anyone when the history moved on
    /// (for example after a reset).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotIncreasing`] if the history ends with
    /// `expected_last` but `next` does not extend it.
    pub fn append_after(&self, expected_last: ScoredNumber, next: ScoredNumber) -> Result<bool> {
        let mut inner = self.inner.write();
        let last = inner.last();
        if last != expected_last {
            return Ok(false);
        }
        if !last.precedes(&next) {
            return Err(Error::NotIncreasing { last, next });
        }
        inner.push(next);
        Ok(true)
    }

    /// Clears the history back to the seed and notifies observers.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.terms.clear();
        inner.terms.push(ScoredNumber::SEED);
        inner.notify(&SequenceChange::Reset);
    }

    /// The most recent term.
    pub fn last(&self) -> ScoredNumber {
        self.inner.read().last()
    }

    /// The `k` most recent terms, oldest first, with `k` clamped to the
    /// history length.
    pub fn last_k(&self, k: usize) -> Vec<ScoredNumber> {
        History {
            terms: &self.inner.read().terms,
        }
        .last_k(k)
        .to_vec()
    }

    /// Number of terms, including the seed.
    pub fn len(&self) -> usize {
        self.inner.read().terms.len()
    }

    /// Always `false`: the seed is never removed.
    pub fn is_empty(&self) -> bool {
        self.inner.read().terms.is_empty()
    }

    /// A copy of the whole history.
    pub fn snapshot(&self) -> Vec<ScoredNumber> {
        self.inner.read().terms.clone()
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> SubscriptionId {
        self.subscribe_arc(Arc::new(observer))
    }

    /// Registers a shared observer.
    pub fn subscribe_arc(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let mut inner = self.inner.write();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.observers.len();
        inner.observers.retain(|(sub, _)| *sub != id);
        inner.observers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn n(value: u64, divisors: u64) -> ScoredNumber {
        ScoredNumber::new(value, divisors)
    }

    fn store_with(terms: &[ScoredNumber]) -> SequenceStore {
        let store = SequenceStore::new();
        for &term in terms {
            store.append(term).unwrap();
        }
        store
    }

    #[test]
    fn starts_with_seed() {
        let store = SequenceStore::new();
        assert_eq!(store.snapshot(), vec![ScoredNumber::SEED]);
        assert_eq!(store.last(), ScoredNumber::SEED);
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn last_k_is_oldest_first_and_clamped() {
        let store = store_with(&[n(2, 2), n(4, 3), n(6, 4)]);
        assert_eq!(store.last_k(2), vec![n(4, 3), n(6, 4)]);
        assert_eq!(store.last_k(0), vec![]);
        assert_eq!(store.last_k(100), store.snapshot());
        assert_eq!(store.last_k(100).len(), 4);
    }

    #[test]
    fn append_rejects_terms_that_do_not_extend() {
        let store = store_with(&[n(2, 2)]);
        assert_eq!(
            store.append(n(3, 2)),
            Err(Error::NotIncreasing {
                last: n(2, 2),
                next: n(3, 2)
            })
        );
        assert!(store.append(n(1, 5)).is_err());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn append_after_ignores_stale_expectations() {
        let store = store_with(&[n(2, 2)]);
        assert_eq!(store.append_after(ScoredNumber::SEED, n(2, 2)), Ok(false));
        assert_eq!(store.append_after(n(2, 2), n(4, 3)), Ok(true));
        assert_eq!(store.last(), n(4, 3));
    }

    #[test]
    fn reset_always_leaves_only_the_seed() {
        let store = store_with(&[n(2, 2), n(4, 3)]);
        store.reset();
        assert_eq!(store.snapshot(), vec![ScoredNumber::SEED]);
        store.reset();
        assert_eq!(store.snapshot(), vec![ScoredNumber::SEED]);
    }

    #[test]
    fn observers_see_changes_in_order_with_the_new_history() {
        let store = SequenceStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        store.subscribe(move |change: &SequenceChange, history: &History<'_>| {
            log.lock().push((*change, history.len(), history.last()));
        });

        store.append(n(2, 2)).unwrap();
        store.append(n(4, 3)).unwrap();
        store.reset();

        assert_eq!(
            *seen.lock(),
            vec![
                (SequenceChange::Appended(n(2, 2)), 2, n(2, 2)),
                (SequenceChange::Appended(n(4, 3)), 3, n(4, 3)),
                (SequenceChange::Reset, 1, ScoredNumber::SEED),
            ]
        );
    }

    #[test]
    fn observers_are_notified_in_registration_order() {
        let store = SequenceStore::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let order = Arc::clone(&order);
            store.subscribe(move |_: &SequenceChange, _: &History<'_>| order.lock().push(tag));
        }
        store.reset();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribed_observers_stop_receiving() {
        let store = SequenceStore::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let id = store.subscribe(move |_: &SequenceChange, _: &History<'_>| *counter.lock() += 1);

        store.reset();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.reset();
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn rejected_appends_do_not_notify() {
        let store = store_with(&[n(2, 2)]);
        let notified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&notified);
        store.subscribe(move |_: &SequenceChange, _: &History<'_>| {
            flag.store(true, Ordering::SeqCst);
        });
        let _ = store.append(n(3, 2));
        let _ = store.append_after(ScoredNumber::SEED, n(4, 3));
        assert!(!notified.load(Ordering::SeqCst));
    }

    #[test]
    fn readers_never_observe_a_partial_history() {
        const TERMS: u64 = 2_000;
        let store = SequenceStore::new();
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 2..=TERMS {
                    store.append(n(i, i)).unwrap();
                }
                done.store(true, Ordering::Release);
            });

            for _ in 0..4 {
                s.spawn(|| {
                    while !done.load(Ordering::Acquire) {
                        let snapshot = store.snapshot();
                        assert_eq!(snapshot[0], ScoredNumber::SEED);
                        assert!(snapshot.windows(2).all(|w| w[0].precedes(&w[1])));
                        let tail = store.last_k(3);
                        assert!(!tail.is_empty() && tail.len() <= 3);
                    }
                });
            }
        });

        assert_eq!(store.len() as u64, TERMS);
    }
}
