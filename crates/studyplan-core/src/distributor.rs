//! Session distribution over weekly slot templates.
//!
//! Each subject receives a weekly quota from its confidence level. Quotas
//! are served round-robin from the slot pool; every time the pool wraps,
//! the week offset advances so a reused slot lands in the following week.
//! The output is always sorted by start time.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::availability::is_free;
use crate::interval::TimeInterval;
use crate::schedule::{
    day_name, day_of_week, BlockedTimePreference, CalendarEvent, EventKind, StudySlotTemplate,
    SubjectPreference,
};
use crate::slot_finder::SlotFinder;

/// Longest planning horizon accepted from configuration or requests.
pub const MAX_WEEKS_AHEAD: u32 = 520;

/// A drafted study session, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSession {
    pub subject: String,
    pub topic: Option<String>,
    /// Explicit title; the assembler derives one when absent.
    #[serde(default)]
    pub title: Option<String>,
    pub interval: TimeInterval,
    pub day_label: String,
    pub formatted_start: String,
    pub formatted_end: String,
}

impl GeneratedSession {
    pub fn new(subject: impl Into<String>, topic: Option<String>, interval: TimeInterval) -> Self {
        Self {
            subject: subject.into(),
            topic,
            title: None,
            day_label: day_name(day_of_week(interval.start().date())).to_string(),
            formatted_start: interval.start().format("%H:%M").to_string(),
            formatted_end: interval.end().format("%H:%M").to_string(),
            interval,
        }
    }

    /// Same session moved to another interval, labels refreshed.
    fn relocated(&self, interval: TimeInterval) -> Self {
        let mut moved = Self::new(self.subject.clone(), self.topic.clone(), interval);
        moved.title = self.title.clone();
        moved
    }
}

/// Result of a distribution pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Distribution {
    /// Sessions sorted ascending by start.
    pub sessions: Vec<GeneratedSession>,
    /// Sum of the subjects' weekly quotas.
    pub expected: usize,
}

impl Distribution {
    /// How many quota sessions were not produced.
    pub fn shortfall(&self) -> usize {
        self.expected.saturating_sub(self.sessions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Concrete occurrence of `slot`, `week_offset` weeks after its next date.
///
/// The next date is the slot's weekday on or after `now`'s date; when that
/// instant has already passed, the following week is used.
pub fn next_occurrence(
    slot: &StudySlotTemplate,
    week_offset: u32,
    now: NaiveDateTime,
) -> Option<TimeInterval> {
    let today = now.date();
    let days_ahead = (i64::from(slot.day_of_week) - i64::from(day_of_week(today))).rem_euclid(7);
    let mut start = today
        .checked_add_signed(Duration::days(days_ahead))?
        .and_hms_opt(slot.preferred_start_hour, 0, 0)?;
    if start < now {
        start = start.checked_add_signed(Duration::days(7))?;
    }
    start = start.checked_add_signed(Duration::days(7 * i64::from(week_offset)))?;
    TimeInterval::from_duration(start, i64::from(slot.duration_minutes)).ok()
}

#[derive(Debug, Clone)]
struct Constraints {
    events: Vec<CalendarEvent>,
    blocked: Vec<BlockedTimePreference>,
    finder: SlotFinder,
}

/// Distributes subject quotas over slot templates.
#[derive(Debug, Clone)]
pub struct SessionDistributor {
    weeks_ahead: u32,
    constraints: Option<Constraints>,
}

impl SessionDistributor {
    pub fn new(weeks_ahead: u32) -> Self {
        Self {
            weeks_ahead,
            constraints: None,
        }
    }

    /// Check every drafted session against booked events and blocked
    /// windows; busy drafts are moved with `finder` or dropped.
    pub fn with_constraints(
        mut self,
        events: Vec<CalendarEvent>,
        blocked: Vec<BlockedTimePreference>,
        finder: SlotFinder,
    ) -> Self {
        self.constraints = Some(Constraints {
            events,
            blocked,
            finder,
        });
        self
    }

    pub fn distribute(
        &self,
        subjects: &[SubjectPreference],
        slots: &[StudySlotTemplate],
        now: NaiveDateTime,
    ) -> Distribution {
        let expected: usize = subjects.iter().map(|s| s.sessions_per_week() as usize).sum();
        if slots.is_empty() || subjects.is_empty() {
            warn!(
                subjects = subjects.len(),
                slots = slots.len(),
                "nothing to distribute"
            );
            return Distribution {
                sessions: Vec::new(),
                expected,
            };
        }

        let mut sessions = Vec::with_capacity(expected);
        let mut counter = 0usize;
        for pref in subjects {
            for rep in 0..pref.sessions_per_week() as usize {
                let slot = &slots[counter % slots.len()];
                let week_offset = (counter / slots.len()) as u32;
                counter += 1;

                if week_offset >= self.weeks_ahead {
                    debug!(subject = %pref.subject, week_offset, "beyond planning horizon");
                    continue;
                }
                match next_occurrence(slot, week_offset, now) {
                    Some(interval) => sessions.push(GeneratedSession::new(
                        pref.subject.clone(),
                        pref.topic_for(rep),
                        interval,
                    )),
                    None => debug!(subject = %pref.subject, "slot has no valid occurrence"),
                }
            }
        }
        sessions.sort_by_key(|s| s.interval.start());

        if let Some(constraints) = &self.constraints {
            let horizon_end = now
                .checked_add_signed(Duration::weeks(i64::from(self.weeks_ahead)))
                .unwrap_or(NaiveDateTime::MAX);
            sessions = resolve_conflicts(sessions, constraints, horizon_end);
        }

        let distribution = Distribution { sessions, expected };
        if distribution.shortfall() > 0 {
            warn!(
                expected = distribution.expected,
                produced = distribution.sessions.len(),
                "fewer sessions than the weekly quotas imply"
            );
        }
        info!(sessions = distribution.sessions.len(), "distributed study sessions");
        distribution
    }
}

/// Keep free drafts, relocate busy ones, and never double-book.
///
/// A draft that can only be moved to `horizon_end` or later is dropped.
fn resolve_conflicts(
    drafts: Vec<GeneratedSession>,
    constraints: &Constraints,
    horizon_end: NaiveDateTime,
) -> Vec<GeneratedSession> {
    let mut busy = constraints.events.clone();
    let mut placed = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let session = if is_free(&draft.interval, &busy, &constraints.blocked) {
            draft
        } else {
            match constraints.finder.find_next(
                draft.interval.start(),
                draft.interval.duration_minutes() as u32,
                &busy,
                &constraints.blocked,
                None,
            ) {
                Ok(interval) if interval.start() >= horizon_end => {
                    warn!(subject = %draft.subject, to = %interval.start(), "dropping session moved past the horizon");
                    continue;
                }
                Ok(interval) => {
                    debug!(subject = %draft.subject, from = %draft.interval.start(), to = %interval.start(), "relocated session");
                    draft.relocated(interval)
                }
                Err(err) => {
                    warn!(subject = %draft.subject, %err, "dropping session");
                    continue;
                }
            }
        };
        busy.push(
            CalendarEvent::new(session.subject.clone(), session.interval, EventKind::StudySession),
        );
        placed.push(session);
    }

    placed.sort_by_key(|s| s.interval.start());
    placed
}

/// Distribute without availability constraints.
pub fn distribute(
    subjects: &[SubjectPreference],
    slots: &[StudySlotTemplate],
    weeks_ahead: u32,
    now: NaiveDateTime,
) -> Distribution {
    SessionDistributor::new(weeks_ahead).distribute(subjects, slots, now)
}
