//! Plan assembly and replacement.
//!
//! Turns distributed sessions into calendar-event drafts, optionally split
//! into pomodoro work/break blocks, and identifies the events of a previous
//! plan that must be removed before a new one is stored.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::distributor::GeneratedSession;
use crate::error::ValidationError;
use crate::interval::TimeInterval;
use crate::schedule::{CalendarEvent, EventKind};

/// Work/break lengths used to split a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
}

impl PomodoroSettings {
    pub fn new(work_minutes: u32, break_minutes: u32) -> Result<Self, ValidationError> {
        if work_minutes == 0 {
            return Err(ValidationError::invalid(
                "work_minutes",
                "pomodoro work length must be positive",
            ));
        }
        Ok(Self {
            work_minutes,
            break_minutes,
        })
    }
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PomodoroBlockKind {
    Work,
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroBlock {
    pub kind: PomodoroBlockKind,
    pub interval: TimeInterval,
}

/// Work/break split of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroBreakdown {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub blocks: Vec<PomodoroBlock>,
}

impl PomodoroBreakdown {
    /// Alternate work and break blocks inside `session`.
    ///
    /// The last work block is truncated at the session end and no break
    /// trails it; a remainder no longer than one break stays unassigned.
    pub fn split(session: &TimeInterval, settings: PomodoroSettings) -> Self {
        let work = Duration::minutes(i64::from(settings.work_minutes.max(1)));
        let rest = Duration::minutes(i64::from(settings.break_minutes));
        let mut blocks = Vec::new();
        let mut cursor = session.start();

        while cursor < session.end() {
            let work_end = (cursor + work).min(session.end());
            if let Ok(interval) = TimeInterval::new(cursor, work_end) {
                blocks.push(PomodoroBlock {
                    kind: PomodoroBlockKind::Work,
                    interval,
                });
            }
            cursor = work_end;

            let break_end = (cursor + rest).min(session.end());
            if break_end >= session.end() {
                break;
            }
            if let Ok(interval) = TimeInterval::new(cursor, break_end) {
                blocks.push(PomodoroBlock {
                    kind: PomodoroBlockKind::Break,
                    interval,
                });
            }
            cursor = break_end;
        }

        Self {
            work_minutes: settings.work_minutes,
            break_minutes: settings.break_minutes,
            blocks,
        }
    }

    pub fn focus_minutes(&self) -> i64 {
        self.blocks
            .iter()
            .filter(|b| b.kind == PomodoroBlockKind::Work)
            .map(|b| b.interval.duration_minutes())
            .sum()
    }
}

/// A calendar event ready to hand to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventDraft {
    pub title: String,
    pub subject: String,
    pub topic: Option<String>,
    pub interval: TimeInterval,
    pub kind: EventKind,
    pub plan_id: Option<String>,
    pub pomodoro: Option<PomodoroBreakdown>,
}

impl CalendarEventDraft {
    /// Materialize as a calendar event with a fresh id.
    pub fn into_event(self) -> CalendarEvent {
        CalendarEvent {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            subject: Some(self.subject),
            topic: self.topic,
            interval: self.interval,
            kind: self.kind,
            recurrence: None,
            source_session_id: None,
            plan_id: self.plan_id,
            pomodoro: self.pomodoro,
        }
    }
}

/// Default title for a session without an explicit one.
pub fn default_title(subject: &str) -> String {
    format!("{subject} Study Session")
}

/// Map sessions to drafts, preserving order.
pub fn assemble(
    sessions: &[GeneratedSession],
    pomodoro: Option<PomodoroSettings>,
    plan_id: Option<&str>,
) -> Vec<CalendarEventDraft> {
    sessions
        .iter()
        .map(|session| CalendarEventDraft {
            title: session
                .title
                .clone()
                .unwrap_or_else(|| default_title(&session.subject)),
            subject: session.subject.clone(),
            topic: session.topic.clone(),
            interval: session.interval,
            kind: EventKind::StudySession,
            plan_id: plan_id.map(str::to_string),
            pomodoro: pomodoro.map(|settings| PomodoroBreakdown::split(&session.interval, settings)),
        })
        .collect()
}

/// Ids of `events` that belong to `plan_id`.
///
/// Running it against a store that no longer holds the plan yields an
/// empty list, so replacement can be retried safely.
pub fn cleanup_previous(plan_id: &str, events: &[CalendarEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.plan_id.as_deref() == Some(plan_id))
        .map(|event| event.id.clone())
        .collect()
}
