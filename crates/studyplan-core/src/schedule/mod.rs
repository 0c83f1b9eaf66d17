//! Schedule types: calendar events, blocked times, slot templates and
//! subject preferences.
//!
//! Weekdays are numbered 0..=6 with Sunday = 0 throughout.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::interval::TimeInterval;
use crate::plan::PomodoroBreakdown;
use crate::recurrence::RecurrenceRule;

/// Day of week index (0=Sun ... 6=Sat).
pub type DayOfWeek = u8;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Sunday-based weekday index of a date.
pub fn day_of_week(date: NaiveDate) -> DayOfWeek {
    date.weekday().num_days_from_sunday() as DayOfWeek
}

/// English name for a weekday index ("Sunday" for 0).
pub fn day_name(day: DayOfWeek) -> &'static str {
    DAY_NAMES[(day % 7) as usize]
}

pub(crate) fn check_day(field: &str, day: DayOfWeek) -> Result<(), ValidationError> {
    if day > 6 {
        return Err(ValidationError::invalid(
            field,
            format!("day of week must be 0..=6 (Sunday=0), got {day}"),
        ));
    }
    Ok(())
}

/// Kind of calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    StudySession,
    ReviewSession,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StudySession => "study_session",
            EventKind::ReviewSession => "review_session",
            EventKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "study_session" => EventKind::StudySession,
            "review_session" => EventKind::ReviewSession,
            _ => EventKind::Other,
        }
    }
}

/// An entry in the user's calendar.
///
/// Booked events are negative constraints for the availability resolver.
/// Events created from a generated plan carry its `plan_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    pub interval: TimeInterval,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub source_session_id: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub pomodoro: Option<PomodoroBreakdown>,
}

impl CalendarEvent {
    /// Create a plain one-off event with a fresh id.
    pub fn new(title: impl Into<String>, interval: TimeInterval, kind: EventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            subject: None,
            topic: None,
            interval,
            kind,
            recurrence: None,
            source_session_id: None,
            plan_id: None,
            pomodoro: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Check if this event overlaps with a time range
    pub fn overlaps(&self, interval: &TimeInterval) -> bool {
        self.interval.overlaps(interval)
    }
}

/// Importance of a blocked window. Informational only: every window blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A recurring weekly window the user has declared unavailable.
///
/// Same-day windows only: `start_time < end_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBlockedTime")]
pub struct BlockedTimePreference {
    pub id: String,
    pub title: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub priority: Priority,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct RawBlockedTime {
    #[serde(default)]
    id: Option<String>,
    title: String,
    day_of_week: DayOfWeek,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    reason: Option<String>,
}

impl TryFrom<RawBlockedTime> for BlockedTimePreference {
    type Error = ValidationError;

    fn try_from(raw: RawBlockedTime) -> Result<Self, Self::Error> {
        let mut blocked = BlockedTimePreference::new(
            raw.title,
            raw.day_of_week,
            raw.start_time,
            raw.end_time,
            raw.priority,
        )?;
        if let Some(id) = raw.id {
            blocked.id = id;
        }
        blocked.reason = raw.reason;
        Ok(blocked)
    }
}

impl BlockedTimePreference {
    /// Create a blocked window with a fresh id.
    ///
    /// # Errors
    /// Rejects `day_of_week > 6` and windows where `start_time >= end_time`.
    pub fn new(
        title: impl Into<String>,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
        priority: Priority,
    ) -> Result<Self, ValidationError> {
        check_day("day_of_week", day_of_week)?;
        if start_time >= end_time {
            return Err(ValidationError::invalid(
                "end_time",
                format!("blocked window must end after it starts ({start_time} >= {end_time})"),
            ));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            day_of_week,
            start_time,
            end_time,
            priority,
            reason: None,
        })
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The window projected onto `date`, if it applies to that weekday.
    pub fn on_date(&self, date: NaiveDate) -> Option<TimeInterval> {
        if day_of_week(date) != self.day_of_week {
            return None;
        }
        TimeInterval::new(date.and_time(self.start_time), date.and_time(self.end_time)).ok()
    }
}

/// A recurring weekly window eligible to host a study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSlotTemplate")]
pub struct StudySlotTemplate {
    pub day_of_week: DayOfWeek,
    pub preferred_start_hour: u32,
    pub duration_minutes: u32,
    pub subject: Option<String>,
}

#[derive(Deserialize)]
struct RawSlotTemplate {
    day_of_week: DayOfWeek,
    preferred_start_hour: u32,
    duration_minutes: u32,
    #[serde(default)]
    subject: Option<String>,
}

impl TryFrom<RawSlotTemplate> for StudySlotTemplate {
    type Error = ValidationError;

    fn try_from(raw: RawSlotTemplate) -> Result<Self, Self::Error> {
        let mut slot =
            StudySlotTemplate::new(raw.day_of_week, raw.preferred_start_hour, raw.duration_minutes)?;
        slot.subject = raw.subject;
        Ok(slot)
    }
}

impl StudySlotTemplate {
    pub fn new(
        day_of_week: DayOfWeek,
        preferred_start_hour: u32,
        duration_minutes: u32,
    ) -> Result<Self, ValidationError> {
        check_day("day_of_week", day_of_week)?;
        if preferred_start_hour > 23 {
            return Err(ValidationError::invalid(
                "preferred_start_hour",
                format!("hour must be 0..=23, got {preferred_start_hour}"),
            ));
        }
        if duration_minutes == 0 {
            return Err(ValidationError::invalid(
                "duration_minutes",
                "slot duration must be positive",
            ));
        }
        Ok(Self {
            day_of_week,
            preferred_start_hour,
            duration_minutes,
            subject: None,
        })
    }
}

/// Self-reported mastery of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Sessions per week for this confidence level.
    pub fn sessions_per_week(&self) -> u32 {
        match self {
            Confidence::Low => 5,
            Confidence::Medium => 3,
            Confidence::High => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Confidence::Low),
            "medium" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }
}

/// A subject to plan for, with its confidence level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPreference {
    pub subject: String,
    #[serde(alias = "confidence_label")]
    pub confidence: Confidence,
    /// Topics cycled through the subject's sessions, if any.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl SubjectPreference {
    pub fn new(subject: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            subject: subject.into(),
            confidence,
            topics: Vec::new(),
        }
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn sessions_per_week(&self) -> u32 {
        self.confidence.sessions_per_week()
    }

    /// Topic for the `n`-th session of this subject.
    pub fn topic_for(&self, n: usize) -> Option<String> {
        if self.topics.is_empty() {
            None
        } else {
            Some(self.topics[n % self.topics.len()].clone())
        }
    }
}

/// Preferred part of the day for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Wall-clock hour the search starts at.
    pub fn start_hour(&self) -> u32 {
        match self {
            TimeOfDay::Morning => 9,
            TimeOfDay::Afternoon => 13,
            TimeOfDay::Evening => 17,
            TimeOfDay::Night => 20,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "morning" => Some(TimeOfDay::Morning),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "evening" => Some(TimeOfDay::Evening),
            "night" => Some(TimeOfDay::Night),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn confidence_table() {
        assert_eq!(Confidence::Low.sessions_per_week(), 5);
        assert_eq!(Confidence::Medium.sessions_per_week(), 3);
        assert_eq!(Confidence::High.sessions_per_week(), 1);
    }

    #[test]
    fn time_of_day_hours() {
        assert_eq!(TimeOfDay::Morning.start_hour(), 9);
        assert_eq!(TimeOfDay::Afternoon.start_hour(), 13);
        assert_eq!(TimeOfDay::Evening.start_hour(), 17);
        assert_eq!(TimeOfDay::Night.start_hour(), 20);
        assert_eq!(TimeOfDay::parse("Evening"), Some(TimeOfDay::Evening));
        assert_eq!(TimeOfDay::parse("dusk"), None);
    }

    #[test]
    fn blocked_time_rejects_inverted_window() {
        assert!(BlockedTimePreference::new("x", 1, hm(16, 0), hm(15, 0), Priority::Low).is_err());
        assert!(BlockedTimePreference::new("x", 1, hm(15, 0), hm(15, 0), Priority::Low).is_err());
        assert!(BlockedTimePreference::new("x", 7, hm(15, 0), hm(16, 0), Priority::Low).is_err());
    }

    #[test]
    fn blocked_time_deserialization_fails_fast() {
        let bad = r#"{"title":"Gym","day_of_week":1,"start_time":"18:00:00","end_time":"17:00:00"}"#;
        assert!(serde_json::from_str::<BlockedTimePreference>(bad).is_err());

        let good = r#"{"title":"Gym","day_of_week":1,"start_time":"17:00:00","end_time":"18:00:00","priority":"high"}"#;
        let blocked: BlockedTimePreference = serde_json::from_str(good).unwrap();
        assert_eq!(blocked.priority, Priority::High);
        assert!(!blocked.id.is_empty());
    }

    #[test]
    fn blocked_time_projects_only_on_its_weekday() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let blocked =
            BlockedTimePreference::new("Practice", 1, hm(15, 0), hm(16, 30), Priority::Medium)
                .unwrap();
        let window = blocked.on_date(monday).unwrap();
        assert_eq!(window.duration_minutes(), 90);
        assert!(blocked.on_date(monday.succ_opt().unwrap()).is_none());
    }

    #[test]
    fn slot_template_validation() {
        assert!(StudySlotTemplate::new(1, 16, 45).is_ok());
        assert!(StudySlotTemplate::new(1, 24, 45).is_err());
        assert!(StudySlotTemplate::new(1, 16, 0).is_err());
        assert!(serde_json::from_str::<StudySlotTemplate>(
            r#"{"day_of_week":9,"preferred_start_hour":16,"duration_minutes":45}"#
        )
        .is_err());
    }

    #[test]
    fn day_helpers() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(day_of_week(sunday), 0);
        assert_eq!(day_name(1), "Monday");
    }

    #[test]
    fn topics_cycle() {
        let pref = SubjectPreference::new("Mathematics", Confidence::Low)
            .with_topics(["Algebra", "Geometry"]);
        assert_eq!(pref.topic_for(0).as_deref(), Some("Algebra"));
        assert_eq!(pref.topic_for(3).as_deref(), Some("Geometry"));
        assert_eq!(SubjectPreference::new("Art", Confidence::High).topic_for(0), None);
    }
}
