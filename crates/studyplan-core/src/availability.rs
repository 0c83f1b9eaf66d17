//! Availability resolution against booked events and blocked windows.

use chrono::Duration;
use serde::Serialize;

use crate::interval::TimeInterval;
use crate::schedule::{BlockedTimePreference, CalendarEvent};

/// Why a candidate interval is not free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conflict {
    /// Overlaps a booked calendar event.
    Event { id: String, title: String },
    /// Falls inside a weekly blocked window.
    Blocked { id: String, title: String },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::Event { title, .. } => write!(f, "overlaps event '{title}'"),
            Conflict::Blocked { title, .. } => write!(f, "inside blocked time '{title}'"),
        }
    }
}

/// Check a blocked window against every calendar day the candidate touches.
///
/// A candidate crossing midnight is tested against the window on both days.
pub fn blocked_overlaps(candidate: &TimeInterval, blocked: &BlockedTimePreference) -> bool {
    let first = candidate.start().date();
    let last = (candidate.end() - Duration::nanoseconds(1)).date();
    first
        .iter_days()
        .take_while(|date| *date <= last)
        .filter_map(|date| blocked.on_date(date))
        .any(|window| window.overlaps(candidate))
}

/// Every constraint the candidate violates, events first.
pub fn conflicts(
    candidate: &TimeInterval,
    existing_events: &[CalendarEvent],
    blocked_times: &[BlockedTimePreference],
) -> Vec<Conflict> {
    let events = existing_events
        .iter()
        .filter(|event| event.overlaps(candidate))
        .map(|event| Conflict::Event {
            id: event.id.clone(),
            title: event.title.clone(),
        });
    let blocks = blocked_times
        .iter()
        .filter(|blocked| blocked_overlaps(candidate, blocked))
        .map(|blocked| Conflict::Blocked {
            id: blocked.id.clone(),
            title: blocked.title.clone(),
        });
    events.chain(blocks).collect()
}

/// True only if the candidate overlaps no event and no blocked window.
///
/// Blocked-window priority never relaxes the check.
pub fn is_free(
    candidate: &TimeInterval,
    existing_events: &[CalendarEvent],
    blocked_times: &[BlockedTimePreference],
) -> bool {
    !existing_events.iter().any(|event| event.overlaps(candidate))
        && !blocked_times
            .iter()
            .any(|blocked| blocked_overlaps(candidate, blocked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{EventKind, Priority};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn monday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(h1: u32, h2: u32) -> CalendarEvent {
        CalendarEvent::new(
            "Club",
            TimeInterval::new(monday(h1, 0), monday(h2, 0)).unwrap(),
            EventKind::Other,
        )
    }

    fn blocked(day: u8, start: NaiveTime, end: NaiveTime, priority: Priority) -> BlockedTimePreference {
        BlockedTimePreference::new("Practice", day, start, end, priority).unwrap()
    }

    fn candidate(h: u32, m: u32, minutes: i64) -> TimeInterval {
        TimeInterval::from_duration(monday(h, m), minutes).unwrap()
    }

    #[test]
    fn free_when_nothing_booked() {
        assert!(is_free(&candidate(10, 0, 45), &[], &[]));
    }

    #[test]
    fn rejects_overlapping_event() {
        let events = vec![event(16, 17)];
        assert!(!is_free(&candidate(16, 30, 45), &events, &[]));
        assert!(is_free(&candidate(17, 0, 45), &events, &[]));
        assert!(is_free(&candidate(15, 15, 45), &events, &[]));
    }

    #[test]
    fn rejects_blocked_window_on_matching_day_only() {
        let blocks = vec![blocked(1, hm(15, 0), hm(16, 30), Priority::Low)];
        assert!(!is_free(&candidate(16, 0, 45), &[], &blocks));
        assert!(is_free(&candidate(16, 30, 45), &[], &blocks));

        let tuesday = candidate(16, 0, 45).shifted(Duration::days(1));
        assert!(is_free(&tuesday, &[], &blocks));
    }

    #[test]
    fn low_priority_still_blocks() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            let blocks = vec![blocked(1, hm(9, 0), hm(10, 0), priority)];
            assert!(!is_free(&candidate(9, 30, 30), &[], &blocks));
        }
    }

    #[test]
    fn candidate_crossing_midnight_checks_next_day() {
        // Tuesday 00:00-01:00 blocked, candidate Monday 23:30 for 60 minutes
        let blocks = vec![blocked(2, hm(0, 0), hm(1, 0), Priority::High)];
        assert!(!is_free(&candidate(23, 30, 60), &[], &blocks));
        assert!(is_free(&candidate(23, 0, 60), &[], &blocks));
    }

    #[test]
    fn conflicts_reports_each_constraint() {
        let events = vec![event(16, 17)];
        let blocks = vec![blocked(1, hm(15, 0), hm(16, 30), Priority::Medium)];
        let found = conflicts(&candidate(16, 0, 45), &events, &blocks);
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], Conflict::Event { .. }));
        assert!(matches!(found[1], Conflict::Blocked { .. }));
        assert!(conflicts(&candidate(17, 0, 45), &events, &blocks).is_empty());
    }
}
