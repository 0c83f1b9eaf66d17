//! Plan orchestration around the scheduling engine.
//!
//! [`PlanService`] reads the user's calendar from a [`CalendarStore`], runs
//! the distributor and assembler, and replaces the previous plan in
//! cleanup-then-insert order. A failed replacement can be retried as a
//! whole: cleanup of a plan that is already gone is a no-op.
//!
//! Review-session placement is modeled as the caller-owned
//! [`ReviewSearch`] state machine.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::distributor::{Distribution, GeneratedSession, SessionDistributor, MAX_WEEKS_AHEAD};
use crate::error::{PlanError, Result, ValidationError};
use crate::interval::TimeInterval;
use crate::plan::{assemble, cleanup_previous, PomodoroSettings};
use crate::recurrence::Recurrence;
use crate::schedule::{
    BlockedTimePreference, CalendarEvent, EventKind, StudySlotTemplate, SubjectPreference, TimeOfDay,
};
use crate::slot_finder::{SlotFinder, SlotFinderConfig, SlotNotFound};
use crate::storage::{CalendarStore, Config};

/// Cap on occurrences expanded per recurring event.
const MAX_OCCURRENCES: usize = 1000;

/// Input of one plan generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub subjects: Vec<SubjectPreference>,
    pub slots: Vec<StudySlotTemplate>,
    /// Overrides the configured horizon.
    #[serde(default)]
    pub weeks_ahead: Option<u32>,
}

/// Knobs taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub weeks_ahead: u32,
    pub pomodoro: Option<PomodoroSettings>,
    pub respect_existing_events: bool,
    pub finder: SlotFinderConfig,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PlanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            weeks_ahead: config.planner.weeks_ahead,
            pomodoro: config.pomodoro_settings(),
            respect_existing_events: config.planner.respect_existing_events,
            finder: config.slot_finder_config(),
        }
    }
}

/// What a regeneration did.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub plan_id: String,
    pub previous_plan_id: Option<String>,
    pub removed: usize,
    pub inserted: Vec<String>,
    pub sessions: Vec<GeneratedSession>,
    pub expected: usize,
}

impl PlanOutcome {
    /// Sessions the weekly quotas implied but the plan does not contain.
    pub fn shortfall(&self) -> usize {
        self.expected.saturating_sub(self.sessions.len())
    }
}

/// Caller-owned state of a review-slot search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewSearch {
    #[default]
    Idle,
    Searching {
        subject: String,
        duration_minutes: u32,
        from: NaiveDateTime,
        preferred: Option<TimeOfDay>,
    },
    Found {
        subject: String,
        interval: TimeInterval,
    },
    Exhausted {
        subject: String,
        reason: SlotNotFound,
    },
}

impl ReviewSearch {
    /// Begin (or restart) a search.
    pub fn start(
        subject: impl Into<String>,
        duration_minutes: u32,
        from: NaiveDateTime,
        preferred: Option<TimeOfDay>,
    ) -> Self {
        ReviewSearch::Searching {
            subject: subject.into(),
            duration_minutes,
            from,
            preferred,
        }
    }

    /// Advance `Searching` to `Found` or `Exhausted`; other states are kept.
    pub fn run(
        self,
        finder: &SlotFinder,
        events: &[CalendarEvent],
        blocked: &[BlockedTimePreference],
    ) -> Self {
        match self {
            ReviewSearch::Searching {
                subject,
                duration_minutes,
                from,
                preferred,
            } => match finder.find_next(from, duration_minutes, events, blocked, preferred) {
                Ok(interval) => ReviewSearch::Found { subject, interval },
                Err(reason) => ReviewSearch::Exhausted { subject, reason },
            },
            other => other,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ReviewSearch::Found { .. } | ReviewSearch::Exhausted { .. })
    }
}

fn check_weeks(weeks: u32) -> std::result::Result<(), ValidationError> {
    if (1..=MAX_WEEKS_AHEAD).contains(&weeks) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "weeks_ahead",
            format!("must be between 1 and {MAX_WEEKS_AHEAD}, got {weeks}"),
        ))
    }
}

/// Expand recurring events into one busy event per occurrence in `window`.
pub fn expand_busy(events: &[CalendarEvent], window: &TimeInterval) -> Vec<CalendarEvent> {
    let mut busy = Vec::with_capacity(events.len());
    for event in events {
        let Some(rule) = &event.recurrence else {
            busy.push(event.clone());
            continue;
        };
        match Recurrence::new(event.interval, rule.clone()) {
            Ok(recurrence) => {
                busy.extend(
                    recurrence
                        .occurrences_within(window, MAX_OCCURRENCES)
                        .into_iter()
                        .map(|interval| CalendarEvent {
                            interval,
                            recurrence: None,
                            ..event.clone()
                        }),
                );
            }
            Err(err) => {
                warn!(event = %event.id, %err, "ignoring invalid recurrence");
                busy.push(event.clone());
            }
        }
    }
    busy
}

/// Generates, stores and replaces study plans for one user.
pub struct PlanService<S> {
    store: S,
    user_id: String,
    options: PlanOptions,
}

impl<S: CalendarStore> PlanService<S> {
    pub fn new(store: S, user_id: impl Into<String>, options: PlanOptions) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn check_request(request: &PlanRequest) -> Result<()> {
        if request.slots.is_empty() {
            return Err(PlanError::NoSlots.into());
        }
        if request.subjects.is_empty() {
            return Err(PlanError::NoSubjects.into());
        }
        if let Some(weeks) = request.weeks_ahead {
            check_weeks(weeks)?;
        }
        Ok(())
    }

    fn horizon(&self, request: &PlanRequest, now: NaiveDateTime) -> Result<(u32, TimeInterval)> {
        let weeks = request.weeks_ahead.unwrap_or(self.options.weeks_ahead);
        check_weeks(weeks)?;
        let end = now
            .checked_add_signed(Duration::weeks(i64::from(weeks)))
            .and_then(|end| end.checked_add_signed(self.options.finder.search_window))
            .ok_or_else(|| ValidationError::invalid("weeks_ahead", "planning horizon is out of range"))?;
        Ok((weeks, TimeInterval::new(now, end)?))
    }

    /// Distribute against the stored calendar.
    ///
    /// Events carrying a plan id are ignored: every one of them is removed
    /// when the new plan is stored.
    fn distribute(&self, request: &PlanRequest, now: NaiveDateTime) -> Result<Distribution> {
        let (weeks, window) = self.horizon(request, now)?;
        let mut distributor = SessionDistributor::new(weeks);

        if self.options.respect_existing_events {
            let events: Vec<CalendarEvent> = self
                .store
                .list_events(&self.user_id, Some(&window))?
                .into_iter()
                .filter(|e| e.plan_id.is_none())
                .collect();
            let blocked = self.store.list_blocked_times(&self.user_id)?;
            distributor = distributor.with_constraints(
                expand_busy(&events, &window),
                blocked,
                SlotFinder::with_config(self.options.finder.clone()),
            );
        }

        Ok(distributor.distribute(&request.subjects, &request.slots, now))
    }

    /// Distribute without touching the store's contents.
    pub fn preview(&self, request: &PlanRequest, now: NaiveDateTime) -> Result<Distribution> {
        Self::check_request(request)?;
        self.distribute(request, now)
    }

    /// Generate a new plan and replace the active one.
    ///
    /// # Errors
    /// Configuration errors ([`PlanError`]) are returned before the store
    /// is modified. Store errors part way through leave a state from which
    /// calling this again converges to exactly one plan.
    pub fn regenerate(&mut self, request: &PlanRequest, now: NaiveDateTime) -> Result<PlanOutcome> {
        Self::check_request(request)?;

        let previous = self.store.active_plan(&self.user_id)?;
        let distribution = self.distribute(request, now)?;
        if distribution.is_empty() {
            return Err(PlanError::NothingScheduled.into());
        }

        // Every study session a plan ever wrote is stale, not just the
        // active plan's, so an interrupted earlier run is cleaned up too.
        let all_events = self.store.list_events(&self.user_id, None)?;
        let mut stale: Vec<String> = previous
            .as_deref()
            .map(|plan| cleanup_previous(plan, &all_events))
            .unwrap_or_default();
        stale.extend(
            all_events
                .iter()
                .filter(|e| e.plan_id.is_some() && e.plan_id != previous)
                .map(|e| e.id.clone()),
        );

        let plan_id = uuid::Uuid::new_v4().to_string();
        let events: Vec<CalendarEvent> =
            assemble(&distribution.sessions, self.options.pomodoro, Some(plan_id.as_str()))
                .into_iter()
                .map(|draft| draft.into_event())
                .collect();

        let inserted = self
            .store
            .replace_plan(&self.user_id, &stale, &events, &plan_id)?;

        info!(
            plan = %plan_id,
            removed = stale.len(),
            inserted = inserted.len(),
            "replaced study plan"
        );
        if distribution.shortfall() > 0 {
            warn!(shortfall = distribution.shortfall(), "plan is short of the weekly quotas");
        }

        Ok(PlanOutcome {
            plan_id,
            previous_plan_id: previous,
            removed: stale.len(),
            inserted,
            sessions: distribution.sessions,
            expected: distribution.expected,
        })
    }

    /// The active plan's events, if a plan is active.
    pub fn current_plan(&self) -> Result<Option<(String, Vec<CalendarEvent>)>> {
        let Some(plan_id) = self.store.active_plan(&self.user_id)? else {
            return Ok(None);
        };
        let events = self.store.list_events(&self.user_id, None)?;
        let mine = events
            .into_iter()
            .filter(|e| e.plan_id.as_deref() == Some(plan_id.as_str()))
            .collect();
        Ok(Some((plan_id, mine)))
    }

    /// Remove the active plan. Returns the number of deleted events.
    pub fn clear_plan(&mut self) -> Result<usize> {
        let Some(plan_id) = self.store.active_plan(&self.user_id)? else {
            return Ok(0);
        };
        let events = self.store.list_events(&self.user_id, None)?;
        let ids = cleanup_previous(&plan_id, &events);
        self.store.delete_events(&self.user_id, &ids)?;
        self.store.set_active_plan(&self.user_id, None)?;
        info!(plan = %plan_id, removed = ids.len(), "cleared study plan");
        Ok(ids.len())
    }

    /// Run a review-slot search against the stored calendar.
    pub fn find_review_slot(
        &self,
        subject: &str,
        duration_minutes: u32,
        preferred: Option<TimeOfDay>,
        now: NaiveDateTime,
    ) -> Result<ReviewSearch> {
        let finder = SlotFinder::with_config(self.options.finder.clone());
        let end = now
            .checked_add_signed(finder.config().search_window)
            .and_then(|end| end.checked_add_signed(Duration::days(1)))
            .ok_or_else(|| ValidationError::invalid("search_window", "search window is out of range"))?;
        let window = TimeInterval::new(now, end)?;
        let events = expand_busy(&self.store.list_events(&self.user_id, Some(&window))?, &window);
        let blocked = self.store.list_blocked_times(&self.user_id)?;

        Ok(ReviewSearch::start(subject, duration_minutes, now, preferred).run(&finder, &events, &blocked))
    }

    /// Like [`Self::find_review_slot`], then book the slot when one is found.
    pub fn schedule_review(
        &mut self,
        subject: &str,
        duration_minutes: u32,
        preferred: Option<TimeOfDay>,
        now: NaiveDateTime,
        source_session_id: Option<String>,
    ) -> Result<ReviewSearch> {
        let state = self.find_review_slot(subject, duration_minutes, preferred, now)?;

        match &state {
            ReviewSearch::Found { subject, interval } => {
                let mut review = CalendarEvent::new(
                    format!("{subject} Review Session"),
                    *interval,
                    EventKind::ReviewSession,
                )
                .with_subject(subject.clone());
                review.source_session_id = source_session_id;
                self.store.insert_events(&self.user_id, &[review])?;
                info!(subject = %subject, start = %interval.start(), "booked review session");
            }
            ReviewSearch::Exhausted { subject, reason } => {
                warn!(subject = %subject, %reason, "no review slot; continuing without one");
            }
            _ => {}
        }
        Ok(state)
    }
}
