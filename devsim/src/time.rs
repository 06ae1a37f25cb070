//! Simulation time.
//!
//! Simulation time is a double-precision scalar with a distinguished
//! [`Time::INFINITY`] sentinel. The same type is used for absolute dates and
//! for durations such as the value returned by a model's time advance
//! function.
//!
//! `Time` is totally ordered: [`Time::INFINITY`] compares greater than any
//! finite value and is absorbing under addition. A `NaN` value can be
//! constructed but is rejected by every scheduling entry point of the kernel.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A simulation date or duration.
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Time(f64);

impl Time {
    /// The origin of simulation time, also the null duration.
    pub const ZERO: Time = Time(0.0);

    /// The "never" sentinel: a passive model has an infinite time advance.
    pub const INFINITY: Time = Time(f64::INFINITY);

    /// Creates a time from a raw value.
    ///
    /// Negative zero is normalized to zero so that equal dates always
    /// compare equal.
    #[inline]
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self::ZERO
        } else {
            Self(value)
        }
    }

    /// Returns the raw value.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns `true` for the [`Time::INFINITY`] sentinel.
    #[inline]
    pub fn is_infinite(self) -> bool {
        self.0 == f64::INFINITY
    }

    /// Returns `true` if the value is neither infinite nor `NaN`.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Returns `true` if the value is `NaN`.
    #[inline]
    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }

    /// Returns `true` if the value may be used as a time advance, i.e. it is
    /// a non-negative number or infinity.
    #[inline]
    pub fn is_valid_duration(self) -> bool {
        !self.0.is_nan() && self.0 >= 0.0
    }

    /// Returns the duration elapsed since `earlier`, or infinity if `self`
    /// is infinite.
    #[inline]
    pub fn duration_since(self, earlier: Time) -> Time {
        if self.is_infinite() {
            Self::INFINITY
        } else {
            Self::new(self.0 - earlier.0)
        }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Time> for f64 {
    fn from(time: Time) -> Self {
        time.0
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, other: Time) -> Time {
        Time::new(self.0 + other.0)
    }
}

impl Add<f64> for Time {
    type Output = Time;

    fn add(self, other: f64) -> Time {
        Time::new(self.0 + other)
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, other: Time) {
        *self = *self + other;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, other: Time) -> Time {
        Time::new(self.0 - other.0)
    }
}

impl PartialEq<f64> for Time {
    fn eq(&self, other: &f64) -> bool {
        *self == Time::new(*other)
    }
}

impl PartialOrd<f64> for Time {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        Some(self.cmp(&Time::new(*other)))
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("+inf")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}
