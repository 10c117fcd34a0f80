//! Closed numeric interval narrowed by one-sided exclusions

use serde::{Deserialize, Serialize};

/// Interval `[lo, hi]` that starts fully open and only ever shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub lo: f64,
    pub hi: f64,
}

impl Range {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// The unbounded interval `(-inf, +inf)`.
    pub fn open() -> Self {
        Self {
            lo: f64::NEG_INFINITY,
            hi: f64::INFINITY,
        }
    }

    /// Raise the lower bound to `x` if `x` is above it.
    #[inline]
    pub fn exclude_less_than(&mut self, x: f64) {
        self.lo = self.lo.max(x);
    }

    /// Lower the upper bound to `x` if `x` is below it.
    #[inline]
    pub fn exclude_greater_than(&mut self, x: f64) {
        self.hi = self.hi.min(x);
    }

    /// Length of the interval, zero when the bounds have crossed.
    pub fn size(&self) -> f64 {
        (self.hi - self.lo).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.hi < self.lo
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::open()
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}, {:.3}]", self.lo, self.hi)
    }
}
