//! Nanosecond-precision time values.
//!
//! A [`TimeValue`] is a signed duration split into whole seconds and a
//! nanosecond remainder. Values are kept normalized (`0 <= nanos < 1e9`),
//! so a negative duration has a negative `seconds` part: -1.25s is stored
//! as `(-2, 750_000_000)`.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

const NANOS_PER_SEC: i128 = 1_000_000_000;
const MIN_NANOS: i128 = i64::MIN as i128 * NANOS_PER_SEC;
const MAX_NANOS: i128 = i64::MAX as i128 * NANOS_PER_SEC + (NANOS_PER_SEC - 1);

/// Time units, expressed as units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Centisecond,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    pub fn per_second(self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Centisecond => 100,
            TimeUnit::Millisecond => 1_000,
            TimeUnit::Microsecond => 1_000_000,
            TimeUnit::Nanosecond => 1_000_000_000,
        }
    }

    fn nanos(self) -> i128 {
        NANOS_PER_SEC / i128::from(self.per_second())
    }
}

/// Signed duration with nanosecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeValue {
    seconds: i64,
    nanos: i64,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue { seconds: 0, nanos: 0 };

    /// Build from parts; out-of-range nanos carry into seconds.
    pub fn new(seconds: i64, nanos: i64) -> Self {
        Self::from_nanos(i128::from(seconds) * NANOS_PER_SEC + i128::from(nanos))
    }

    /// Saturates at the range of `i64` seconds.
    pub fn from_nanos(total: i128) -> Self {
        let total = total.clamp(MIN_NANOS, MAX_NANOS);
        Self {
            seconds: saturate(total.div_euclid(NANOS_PER_SEC)),
            nanos: saturate(total.rem_euclid(NANOS_PER_SEC)),
        }
    }

    /// `value` expressed in `unit`.
    pub fn from(value: i64, unit: TimeUnit) -> Self {
        Self::from_nanos(i128::from(value) * unit.nanos())
    }

    /// Time elapsed since the first call in this process. Monotonic.
    pub fn now() -> Self {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        ORIGIN.get_or_init(Instant::now).elapsed().into()
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn subsec_nanos(&self) -> i64 {
        self.nanos
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.nanos == 0
    }

    pub fn to_nanos(&self) -> i128 {
        i128::from(self.seconds) * NANOS_PER_SEC + i128::from(self.nanos)
    }

    /// Whole units, truncated toward zero. Saturates at `i64` bounds.
    pub fn to_number(&self, unit: TimeUnit) -> i64 {
        saturate(self.to_nanos() / unit.nanos())
    }

    pub fn plus(&self, other: TimeValue) -> Self {
        Self::from_nanos(self.to_nanos() + other.to_nanos())
    }

    pub fn minus(&self, other: TimeValue) -> Self {
        Self::from_nanos(self.to_nanos() - other.to_nanos())
    }

    pub fn add(&self, value: i64, unit: TimeUnit) -> Self {
        self.plus(Self::from(value, unit))
    }

    pub fn subtract(&self, value: i64, unit: TimeUnit) -> Self {
        self.minus(Self::from(value, unit))
    }

    /// `None` for negative values.
    pub fn to_duration(&self) -> Option<Duration> {
        u64::try_from(self.seconds)
            .ok()
            .map(|secs| Duration::new(secs, self.nanos as u32))
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl From<Duration> for TimeValue {
    fn from(d: Duration) -> Self {
        Self::from_nanos(d.as_nanos() as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let t = TimeValue::new(1, 1_500_000_000);
        assert_eq!((t.seconds(), t.subsec_nanos()), (2, 500_000_000));

        let neg = TimeValue::from(-1250, TimeUnit::Millisecond);
        assert_eq!((neg.seconds(), neg.subsec_nanos()), (-2, 750_000_000));
        assert_eq!(neg.to_number(TimeUnit::Millisecond), -1250);
    }

    #[test]
    fn test_arithmetic_across_second_boundary() {
        let a = TimeValue::new(10, 900_000_000);
        let b = TimeValue::new(3, 200_000_000);

        let sum = a.plus(b);
        assert_eq!(sum, TimeValue::new(14, 100_000_000));

        let diff = a.minus(b);
        assert_eq!(diff, TimeValue::new(7, 700_000_000));

        let back = b.minus(a);
        assert_eq!(back.to_nanos(), -diff.to_nanos());
        assert_eq!(a.plus(back), b);
        assert!(diff > back);
    }

    #[test]
    fn test_out_of_range_saturates() {
        let max = TimeValue::from_nanos(i128::MAX);
        assert_eq!((max.seconds(), max.subsec_nanos()), (i64::MAX, 999_999_999));
        let min = TimeValue::from_nanos(i128::MIN);
        assert_eq!((min.seconds(), min.subsec_nanos()), (i64::MIN, 0));

        assert_eq!(max.plus(TimeValue::new(1, 0)), max);
        assert_eq!(min.minus(TimeValue::new(1, 0)), min);

        let big = TimeValue::new(i64::MAX / 2, 0);
        assert_eq!(big.to_number(TimeUnit::Nanosecond), i64::MAX);
        assert_eq!(TimeValue::ZERO.minus(big).to_number(TimeUnit::Millisecond), i64::MIN);
        assert_eq!(big.to_number(TimeUnit::Second), i64::MAX / 2);
    }

    #[test]
    fn test_units() {
        let t = TimeValue::from(1_234_567, TimeUnit::Microsecond);
        assert_eq!(t.to_number(TimeUnit::Second), 1);
        assert_eq!(t.to_number(TimeUnit::Centisecond), 123);
        assert_eq!(t.to_number(TimeUnit::Millisecond), 1234);
        assert_eq!(t.to_nanos(), 1_234_567_000);
        assert_eq!(t.add(433, TimeUnit::Microsecond).to_number(TimeUnit::Millisecond), 1235);
        assert_eq!(t.subtract(1, TimeUnit::Second).to_number(TimeUnit::Microsecond), 234_567);
    }

    #[test]
    fn test_zero_and_ordering() {
        assert!(TimeValue::ZERO.is_zero());
        assert!(TimeValue::default().is_zero());
        assert!(TimeValue::new(0, 1) > TimeValue::ZERO);
        assert!(TimeValue::new(-1, 999_999_999) < TimeValue::ZERO);
    }

    #[test]
    fn test_duration_conversion() {
        let t: TimeValue = Duration::from_millis(1500).into();
        assert_eq!(t, TimeValue::new(1, 500_000_000));
        assert_eq!(t.to_duration(), Some(Duration::from_millis(1500)));
        assert_eq!(TimeValue::from(-1, TimeUnit::Nanosecond).to_duration(), None);
    }

    #[test]
    fn test_now_is_monotonic() {
        let a = TimeValue::now();
        let b = TimeValue::now();
        assert!(b >= a);
    }
}
