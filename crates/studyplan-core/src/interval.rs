//! Half-open time intervals.
//!
//! Every time range the engine handles is a [`TimeInterval`] `[start, end)`
//! over local wall-clock instants. Two intervals that only touch
//! (`a.end == b.start`) do not overlap.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open `[start, end)` range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

#[derive(Deserialize)]
struct RawInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted ranges.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create an interval of `minutes` starting at `start`.
    pub fn from_duration(start: NaiveDateTime, minutes: i64) -> Result<Self, ValidationError> {
        Self::new(start, start + Duration::minutes(minutes))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// True iff the two ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff `instant` lies in `[start, end)`.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// The same interval moved by `offset`.
    pub fn shifted(&self, offset: Duration) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Free-function form of [`TimeInterval::overlaps`].
pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.overlaps(b)
}

/// Free-function form of [`TimeInterval::contains`].
pub fn contains(a: &TimeInterval, instant: NaiveDateTime) -> bool {
    a.contains(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn span(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeInterval {
        TimeInterval::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    #[test]
    fn touching_is_not_overlapping() {
        let a = span(10, 0, 11, 0);
        let b = span(11, 0, 12, 0);
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn nested_and_partial_overlap() {
        let outer = span(9, 0, 12, 0);
        assert!(outer.overlaps(&span(10, 0, 10, 30)));
        assert!(outer.overlaps(&span(11, 30, 13, 0)));
        assert!(!outer.overlaps(&span(12, 0, 13, 0)));
    }

    #[test]
    fn contains_is_half_open() {
        let a = span(10, 0, 11, 0);
        assert!(a.contains(at(10, 0)));
        assert!(a.contains(at(10, 59)));
        assert!(!a.contains(at(11, 0)));
        assert!(!a.contains(at(9, 59)));
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeInterval::new(at(10, 0), at(10, 0)).is_err());
        assert!(matches!(
            TimeInterval::new(at(11, 0), at(10, 0)),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        assert!(TimeInterval::from_duration(at(10, 0), 0).is_err());
    }

    #[test]
    fn deserialization_enforces_ordering() {
        let ok: TimeInterval =
            serde_json::from_str(r#"{"start":"2026-10-19T10:00:00","end":"2026-10-19T10:45:00"}"#)
                .unwrap();
        assert_eq!(ok.duration_minutes(), 45);

        let bad = serde_json::from_str::<TimeInterval>(
            r#"{"start":"2026-10-19T11:00:00","end":"2026-10-19T10:00:00"}"#,
        );
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            s1 in 0i64..10_000, l1 in 1i64..500,
            s2 in 0i64..10_000, l2 in 1i64..500,
        ) {
            let a = TimeInterval::from_duration(at(0, 0) + Duration::minutes(s1), l1).unwrap();
            let b = TimeInterval::from_duration(at(0, 0) + Duration::minutes(s2), l2).unwrap();
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }
    }
}
