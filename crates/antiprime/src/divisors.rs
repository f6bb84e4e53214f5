/// A source of divisor counts.
///
/// This abstraction is the seam where the counting algorithm is plugged into
/// the engine. Implementations must be pure: the same input always yields the
/// same count, and any number of workers may call them concurrently.
///
/// A panic inside [`count_divisors`](Self::count_divisors) retires the running
/// search with [`SearchOutcome::Failed`](crate::SearchOutcome::Failed); the
/// worker survives and serves later searches.
///
/// # Example
///
/// ```
/// use antiprime::DivisorCounter;
///
/// struct PowersOfTwoOnly;
/// impl DivisorCounter for PowersOfTwoOnly {
///     fn count_divisors(&self, n: u64) -> u64 {
///         if n.is_power_of_two() { u64::from(n.trailing_zeros()) + 1 } else { 1 }
///     }
/// }
///
/// assert_eq!(PowersOfTwoOnly.count_divisors(8), 4);
/// ```
pub trait DivisorCounter: Send + Sync + 'static {
    /// Returns how many positive integers divide `n`. `n == 0` yields `0`.
    fn count_divisors(&self, n: u64) -> u64;
}

/// Trial division bounded by `sqrt(n)`, counting each divisor pair
/// `(i, n / i)` once per side.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrialDivision;

impl DivisorCounter for TrialDivision {
    fn count_divisors(&self, n: u64) -> u64 {
        let mut count = 0;
        let mut i = 1;
        // `i <= n / i` is `i * i <= n` without the overflow.
        while i <= n / i {
            if n % i == 0 {
                count += if i == n / i { 1 } else { 2 };
            }
            i += 1;
        }
        count
    }
}

/// Trial division by every integer up to `n`.
///
/// Quadratically slower than [`TrialDivision`] over a search; useful as an
/// obviously-correct oracle and as a heavier per-candidate workload.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveTrialDivision;

impl DivisorCounter for NaiveTrialDivision {
    fn count_divisors(&self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        1 + (2..=n).filter(|i| n % i == 0).count() as u64
    }
}
