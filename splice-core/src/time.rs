//! Timeline Time
//!
//! Exact rational timestamps and the half-open ranges used to describe which
//! part of a node's cached output is stale.
//!
//! Video timebases (1001/30000 and friends) do not survive floating point,
//! so times are kept as reduced fractions and compared by cross
//! multiplication in 128-bit integers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An exact point on the timeline, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "(i64, i64)", from = "(i64, i64)")]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Time zero.
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// Earliest representable time; the start of an unbounded range.
    pub const MIN: Rational = Rational { num: i64::MIN + 1, den: 1 };

    /// Latest representable time; the end of an unbounded range.
    pub const MAX: Rational = Rational { num: i64::MAX, den: 1 };

    /// Create a reduced fraction.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero or the reduced fraction does not fit in
    /// `i64` (only possible with an `i64::MIN` operand). Use
    /// [`Rational::checked_new`] for untrusted input.
    pub fn new(num: i64, den: i64) -> Self {
        match Self::checked_new(num, den) {
            Some(r) => r,
            None => panic!("rational {num}/{den} is not representable"),
        }
    }

    /// Create a reduced fraction, or `None` if `den` is zero or the reduced
    /// fraction does not fit in `i64`.
    pub fn checked_new(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }

        // Sign flips and reduction happen in 128 bits so i64::MIN cannot
        // overflow.
        let (mut num, mut den) = (i128::from(num), i128::from(den));
        if den < 0 {
            num = -num;
            den = -den;
        }
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i128;

        Some(Self {
            num: i64::try_from(num / divisor).ok()?,
            den: i64::try_from(den / divisor).ok()?,
        })
    }

    /// A whole number of seconds.
    pub const fn from_integer(seconds: i64) -> Self {
        Self { num: seconds, den: 1 }
    }

    /// Numerator of the reduced fraction.
    pub fn numerator(&self) -> i64 {
        self.num
    }

    /// Denominator of the reduced fraction (always positive).
    pub fn denominator(&self) -> i64 {
        self.den
    }

    /// Approximate value in seconds, for display only.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((num, den): (i64, i64)) -> Self {
        // Deserialized data must not be able to panic the loader.
        Self::checked_new(num, den).unwrap_or(Self::ZERO)
    }
}

impl From<Rational> for (i64, i64) {
    fn from(r: Rational) -> Self {
        (r.num, r.den)
    }
}

impl From<i64> for Rational {
    fn from(seconds: i64) -> Self {
        Self::from_integer(seconds)
    }
}

impl From<i32> for Rational {
    fn from(seconds: i32) -> Self {
        Self::from_integer(seconds as i64)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Error returned when parsing a [`Rational`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRationalError;

impl fmt::Display for ParseRationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected 'n' or 'n/d' with a non-zero denominator, representable in 64 bits")
    }
}

impl std::error::Error for ParseRationalError {}

impl FromStr for Rational {
    type Err = ParseRationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => {
                let num: i64 = num.trim().parse().map_err(|_| ParseRationalError)?;
                let den: i64 = den.trim().parse().map_err(|_| ParseRationalError)?;
                Self::checked_new(num, den).ok_or(ParseRationalError)
            }
            None => s
                .parse()
                .map(Self::from_integer)
                .map_err(|_| ParseRationalError),
        }
    }
}

/// A half-open span of time `[in, out)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: Rational,
    end: Rational,
}

impl std::hash::Hash for Rational {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Always reduced, so the raw fields identify the value.
        self.num.hash(state);
        self.den.hash(state);
    }
}

impl TimeRange {
    /// Create a range. The bounds are swapped if given in reverse.
    pub fn new(start: impl Into<Rational>, end: impl Into<Rational>) -> Self {
        let (start, end) = (start.into(), end.into());
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// The whole timeline. Used when a change is not time-varying.
    pub const fn all() -> Self {
        Self {
            start: Rational::MIN,
            end: Rational::MAX,
        }
    }

    /// Inclusive start.
    pub fn start(&self) -> Rational {
        self.start
    }

    /// Exclusive end.
    pub fn end(&self) -> Rational {
        self.end
    }

    /// True if the range covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `time` falls inside the range.
    pub fn contains(&self, time: Rational) -> bool {
        self.start <= time && time < self.end
    }

    /// True if the two ranges share any time.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if the ranges overlap or are directly adjacent.
    fn touches(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A normalized set of time ranges: sorted, non-overlapping, non-adjacent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeList {
    ranges: Vec<TimeRange>,
}

impl TimeRangeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range, merging it with anything it overlaps or touches.
    pub fn insert(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }

        let mut merged = range;
        self.ranges.retain(|existing| {
            if existing.touches(&merged) {
                merged.start = merged.start.min(existing.start);
                merged.end = merged.end.max(existing.end);
                false
            } else {
                true
            }
        });

        let at = self
            .ranges
            .partition_point(|existing| existing.start < merged.start);
        self.ranges.insert(at, merged);
    }

    /// Subtract a range, splitting any range it lands inside of.
    pub fn remove(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }

        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for existing in self.ranges.drain(..) {
            if !existing.overlaps(&range) {
                kept.push(existing);
                continue;
            }
            if existing.start < range.start {
                kept.push(TimeRange::new(existing.start, range.start));
            }
            if range.end < existing.end {
                kept.push(TimeRange::new(range.end, existing.end));
            }
        }
        self.ranges = kept;
    }

    /// True if any part of `range` is in the list.
    pub fn intersects(&self, range: &TimeRange) -> bool {
        self.ranges.iter().any(|r| r.overlaps(range))
    }

    /// True if `time` is covered.
    pub fn contains(&self, time: Rational) -> bool {
        self.ranges.iter().any(|r| r.contains(time))
    }

    /// True if nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Drop every range.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Iterate over the disjoint ranges in time order.
    pub fn iter(&self) -> impl Iterator<Item = &TimeRange> {
        self.ranges.iter()
    }
}
