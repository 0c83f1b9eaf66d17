//! Forward search for the next free slot.
//!
//! The finder walks a cursor forward in fixed steps inside the working day
//! and returns the first candidate that passes [`is_free`]. Exhaustion of
//! the search window is reported as [`SlotNotFound`], which callers treat
//! as non-fatal.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::availability::is_free;
use crate::interval::TimeInterval;
use crate::schedule::{BlockedTimePreference, CalendarEvent, TimeOfDay};

/// Working day opening hour.
pub const WORKDAY_START_HOUR: u32 = 8;
/// Working day closing hour; a slot must end by then.
pub const WORKDAY_END_HOUR: u32 = 21;
/// Cursor step.
pub const STEP_MINUTES: i64 = 30;
/// Default forward search horizon.
pub const DEFAULT_SEARCH_DAYS: i64 = 5;
/// Longest configurable search horizon.
pub const MAX_SEARCH_DAYS: i64 = 366;

/// No free interval of the requested length inside the search window.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("no free {duration_minutes}-minute slot between {from} and {until}")]
pub struct SlotNotFound {
    pub duration_minutes: u32,
    pub from: NaiveDateTime,
    pub until: NaiveDateTime,
}

/// Slot finder configuration
#[derive(Debug, Clone)]
pub struct SlotFinderConfig {
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
    pub step: Duration,
    pub search_window: Duration,
}

impl Default for SlotFinderConfig {
    fn default() -> Self {
        Self {
            workday_start: NaiveTime::from_hms_opt(WORKDAY_START_HOUR, 0, 0).unwrap_or_default(),
            workday_end: NaiveTime::from_hms_opt(WORKDAY_END_HOUR, 0, 0).unwrap_or_default(),
            step: Duration::minutes(STEP_MINUTES),
            search_window: Duration::days(DEFAULT_SEARCH_DAYS),
        }
    }
}

impl SlotFinderConfig {
    pub fn with_search_window(mut self, search_window: Duration) -> Self {
        self.search_window = search_window;
        self
    }
}

/// Finds the next free interval of a given length.
#[derive(Debug, Clone, Default)]
pub struct SlotFinder {
    config: SlotFinderConfig,
}

impl SlotFinder {
    /// Create a finder with default working hours and a 5-day window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: SlotFinderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SlotFinderConfig {
        &self.config
    }

    /// Find the first free `[cursor, cursor + duration)` at or after `start`.
    ///
    /// With a preferred time of day the cursor starts at that hour on the
    /// start day, or the following day when that hour has already passed.
    /// Candidates never start before the working day opens or end after it
    /// closes, and must start before `start + search_window`.
    pub fn find_next(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
        existing_events: &[CalendarEvent],
        blocked_times: &[BlockedTimePreference],
        preferred: Option<TimeOfDay>,
    ) -> Result<TimeInterval, SlotNotFound> {
        // A window reaching past the calendar's end is searched to the end.
        let limit = start
            .checked_add_signed(self.config.search_window)
            .unwrap_or(NaiveDateTime::MAX);
        let not_found = SlotNotFound {
            duration_minutes,
            from: start,
            until: limit,
        };
        let duration = Duration::minutes(i64::from(duration_minutes));
        if duration_minutes == 0 || duration > self.config.workday_end - self.config.workday_start {
            return Err(not_found);
        }

        let mut cursor = preferred
            .map(|tod| normalize_to_hour(start, tod.start_hour()))
            .unwrap_or(start);

        while cursor < limit {
            let date = cursor.date();
            let open = date.and_time(self.config.workday_start);
            let close = date.and_time(self.config.workday_end);

            if cursor < open {
                cursor = open;
                continue;
            }
            let Some(end) = cursor.checked_add_signed(duration) else {
                break;
            };
            if end > close {
                match open.checked_add_signed(Duration::days(1)) {
                    Some(next_open) => cursor = next_open,
                    None => break,
                }
                continue;
            }

            let candidate = TimeInterval::new(cursor, end).map_err(|_| not_found.clone())?;
            if is_free(&candidate, existing_events, blocked_times) {
                debug!(start = %candidate.start(), minutes = duration_minutes, "found free slot");
                return Ok(candidate);
            }
            trace!(cursor = %cursor, "slot candidate busy");
            match cursor.checked_add_signed(self.config.step) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        debug!(from = %start, until = %limit, minutes = duration_minutes, "slot search exhausted");
        Err(not_found)
    }
}

/// `start`'s day at `hour:00`, or the next day when that is already past.
fn normalize_to_hour(start: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let Some(at_hour) = start.date().and_hms_opt(hour, 0, 0) else {
        return start;
    };
    if at_hour < start {
        at_hour.checked_add_signed(Duration::days(1)).unwrap_or(start)
    } else {
        at_hour
    }
}

/// Search with default working hours and an explicit window.
pub fn find_next(
    start: NaiveDateTime,
    duration_minutes: u32,
    existing_events: &[CalendarEvent],
    blocked_times: &[BlockedTimePreference],
    preferred: Option<TimeOfDay>,
    search_window: Duration,
) -> Result<TimeInterval, SlotNotFound> {
    SlotFinder::with_config(SlotFinderConfig::default().with_search_window(search_window)).find_next(
        start,
        duration_minutes,
        existing_events,
        blocked_times,
        preferred,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{EventKind, Priority};
    use chrono::{NaiveDate, Timelike};

    fn monday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booked(start: NaiveDateTime, end: NaiveDateTime) -> CalendarEvent {
        CalendarEvent::new("Booked", TimeInterval::new(start, end).unwrap(), EventKind::Other)
    }

    #[test]
    fn returns_start_when_free() {
        let slot = find_next(monday(10, 0), 45, &[], &[], None, Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(10, 0));
        assert_eq!(slot.end(), monday(10, 45));
    }

    #[test]
    fn skips_blocked_window_and_booked_event() {
        let events = vec![booked(monday(16, 0), monday(17, 0))];
        let blocks =
            vec![BlockedTimePreference::new("Practice", 1, hm(15, 0), hm(16, 30), Priority::Low).unwrap()];

        let slot = find_next(monday(15, 0), 45, &events, &blocks, None, Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(17, 0));
    }

    #[test]
    fn exhausted_window_reports_not_found() {
        // Whole Monday working day booked, window of one day
        let events = vec![booked(monday(8, 0), monday(21, 0))];
        let err = find_next(monday(8, 0), 45, &events, &[], None, Duration::days(1)).unwrap_err();
        assert_eq!(err.duration_minutes, 45);
        assert_eq!(err.until, monday(8, 0) + Duration::days(1));
    }

    #[test]
    fn preferred_hour_normalizes_cursor() {
        let slot = find_next(monday(6, 0), 60, &[], &[], Some(TimeOfDay::Evening), Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(17, 0));

        // Morning already passed: next day at 09:00
        let slot = find_next(monday(12, 0), 60, &[], &[], Some(TimeOfDay::Morning), Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(9, 0) + Duration::days(1));
    }

    #[test]
    fn early_cursor_jumps_to_opening() {
        let slot = find_next(monday(5, 10), 30, &[], &[], None, Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(8, 0));
    }

    #[test]
    fn rolls_to_next_day_when_slot_would_end_after_close() {
        let slot = find_next(monday(20, 30), 45, &[], &[], None, Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(8, 0) + Duration::days(1));

        let slot = find_next(monday(20, 0), 60, &[], &[], Some(TimeOfDay::Night), Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(20, 0));
    }

    #[test]
    fn steps_in_half_hours() {
        let events = vec![booked(monday(9, 0), monday(9, 50))];
        let slot = find_next(monday(9, 0), 30, &events, &[], None, Duration::days(5)).unwrap();
        assert_eq!(slot.start(), monday(10, 0));
        assert_eq!(slot.start().minute() % 30, 0);
    }

    #[test]
    fn huge_search_window_does_not_overflow() {
        let slot = find_next(monday(10, 0), 45, &[], &[], None, Duration::days(4_000_000_000)).unwrap();
        assert_eq!(slot.start(), monday(10, 0));

        let finder = SlotFinder::with_config(
            SlotFinderConfig::default().with_search_window(Duration::days(4_000_000_000)),
        );
        let events = vec![booked(monday(8, 0), monday(21, 0))];
        let slot = finder.find_next(monday(8, 0), 45, &events, &[], None).unwrap();
        assert_eq!(slot.start(), monday(8, 0) + Duration::days(1));
    }

    #[test]
    fn search_near_calendar_end_is_not_found() {
        let start = NaiveDateTime::MAX - Duration::hours(2);
        let err = find_next(start, 45, &[], &[], None, Duration::days(5)).unwrap_err();
        assert_eq!(err.until, NaiveDateTime::MAX);
    }

    #[test]
    fn oversized_or_empty_duration_is_not_found() {
        assert!(find_next(monday(8, 0), 14 * 60, &[], &[], None, Duration::days(5)).is_err());
        assert!(find_next(monday(8, 0), 0, &[], &[], None, Duration::days(5)).is_err());
    }
}
