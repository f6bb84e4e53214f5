use core::fmt;

/// An integer whose divisors have been counted.
///
/// Instances are created once, either as the [`ScoredNumber::SEED`] or by a
/// worker after evaluating a candidate, and never change afterwards.
///
/// # Example
///
/// ```
/// use antiprime::ScoredNumber;
///
/// let four = ScoredNumber::new(4, 3);
/// assert!(four.beats(&ScoredNumber::new(2, 2)));
/// assert_eq!(four.to_string(), "4 (3)");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredNumber {
    value: u64,
    divisors: u64,
}

impl ScoredNumber {
    /// The first antiprime: `1`, with a single divisor.
    pub const SEED: Self = Self::new(1, 1);

    /// Pairs `value` with its divisor count.
    pub const fn new(value: u64, divisors: u64) -> Self {
        Self { value, divisors }
    }

    /// The number itself.
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// How many positive integers divide [`Self::value`].
    pub const fn divisors(&self) -> u64 {
        self.divisors
    }

    /// Returns `true` if this number has strictly more divisors than
    /// `record`. Ties never qualify.
    pub const fn beats(&self, record: &Self) -> bool {
        self.divisors > record.divisors
    }

    /// Returns `true` if `next` may follow `self` in the sequence.
    pub const fn precedes(&self, next: &Self) -> bool {
        next.value > self.value && next.beats(self)
    }
}

impl Default for ScoredNumber {
    fn default() -> Self {
        Self::SEED
    }
}

impl fmt::Display for ScoredNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.divisors)
    }
}
