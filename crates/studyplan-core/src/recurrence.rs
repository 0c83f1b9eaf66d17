//! Recurrence expansion.
//!
//! A [`Recurrence`] pairs a template occurrence with a [`RecurrenceRule`]
//! and yields concrete occurrences, bounded by the rule's end date and a
//! caller-supplied maximum. Every occurrence keeps the template's duration.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::interval::TimeInterval;
use crate::schedule::{check_day, day_of_week, DayOfWeek};

/// How a template occurrence repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "lowercase")]
pub enum RecurrencePattern {
    /// Every `interval` days.
    Daily { interval: u32 },
    /// Every `interval` weeks; on each listed weekday when `weekdays` is set.
    Weekly {
        interval: u32,
        #[serde(default)]
        weekdays: Vec<DayOfWeek>,
    },
    /// Every `interval` calendar months, clamped to the month's last day.
    Monthly { interval: u32 },
}

impl RecurrencePattern {
    pub fn interval(&self) -> u32 {
        match self {
            RecurrencePattern::Daily { interval }
            | RecurrencePattern::Weekly { interval, .. }
            | RecurrencePattern::Monthly { interval } => *interval,
        }
    }
}

/// A recurrence pattern with an optional last start instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    #[serde(flatten)]
    pub pattern: RecurrencePattern,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
}

impl RecurrenceRule {
    pub fn daily(interval: u32) -> Self {
        Self {
            pattern: RecurrencePattern::Daily { interval },
            end_date: None,
        }
    }

    pub fn weekly(interval: u32, weekdays: Vec<DayOfWeek>) -> Self {
        Self {
            pattern: RecurrencePattern::Weekly { interval, weekdays },
            end_date: None,
        }
    }

    pub fn monthly(interval: u32) -> Self {
        Self {
            pattern: RecurrencePattern::Monthly { interval },
            end_date: None,
        }
    }

    pub fn until(mut self, end_date: NaiveDateTime) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// A validated template occurrence plus its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    template: TimeInterval,
    rule: RecurrenceRule,
}

impl Recurrence {
    /// Validate and normalize a rule against its template occurrence.
    ///
    /// # Errors
    /// Rejects a zero interval, weekdays outside 0..=6, and an end date
    /// before the template start.
    pub fn new(template: TimeInterval, mut rule: RecurrenceRule) -> Result<Self, ValidationError> {
        if rule.pattern.interval() == 0 {
            return Err(ValidationError::invalid(
                "interval",
                "recurrence interval must be at least 1",
            ));
        }
        if let RecurrencePattern::Weekly { weekdays, .. } = &mut rule.pattern {
            for day in weekdays.iter() {
                check_day("weekdays", *day)?;
            }
            weekdays.sort_unstable();
            weekdays.dedup();
        }
        if let Some(end) = rule.end_date {
            if end < template.start() {
                return Err(ValidationError::InvalidTimeRange {
                    start: template.start(),
                    end,
                });
            }
        }
        Ok(Self { template, rule })
    }

    pub fn template(&self) -> &TimeInterval {
        &self.template
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Iterate over at most `max_occurrences` occurrences.
    pub fn occurrences(&self, max_occurrences: usize) -> Occurrences<'_> {
        Occurrences {
            recurrence: self,
            step: 0,
            day_idx: 0,
            emitted: 0,
            max: max_occurrences,
            done: false,
        }
    }

    /// Occurrences that overlap `window`, scanning at most `max_occurrences`.
    ///
    /// Cycles that end well before the window are skipped without counting
    /// against the maximum, so old templates still reach the window.
    pub fn occurrences_within(&self, window: &TimeInterval, max_occurrences: usize) -> Vec<TimeInterval> {
        let mut occurrences = self.occurrences(max_occurrences);
        occurrences.step = self.cycles_before(window.start());
        occurrences
            .take_while(|occ| occ.start() < window.end())
            .filter(|occ| occ.overlaps(window))
            .collect()
    }
}

impl Recurrence {
    /// Number of leading cycles whose occurrences all end before `from`.
    ///
    /// Uses the longest possible cycle (31 days per month) and a week of
    /// slack for weekday sets, so it never skips an overlapping occurrence.
    fn cycles_before(&self, from: NaiveDateTime) -> u32 {
        let slack_days = (from - self.template.end()).num_days() - 7;
        if slack_days <= 0 {
            return 0;
        }
        let cycle_days = i64::from(self.rule.pattern.interval())
            * match self.rule.pattern {
                RecurrencePattern::Daily { .. } => 1,
                RecurrencePattern::Weekly { .. } => 7,
                RecurrencePattern::Monthly { .. } => 31,
            };
        u32::try_from(slack_days / cycle_days).unwrap_or(u32::MAX)
    }
}

/// Expand `template` under `rule` into at most `max_occurrences` intervals.
pub fn expand(
    template: TimeInterval,
    rule: &RecurrenceRule,
    max_occurrences: usize,
) -> Result<Vec<TimeInterval>, ValidationError> {
    let recurrence = Recurrence::new(template, rule.clone())?;
    Ok(recurrence.occurrences(max_occurrences).collect())
}

/// Iterator returned by [`Recurrence::occurrences`].
pub struct Occurrences<'a> {
    recurrence: &'a Recurrence,
    step: u32,
    day_idx: usize,
    emitted: usize,
    max: usize,
    done: bool,
}

impl Occurrences<'_> {
    fn next_start(&mut self) -> Option<NaiveDateTime> {
        let template_start = self.recurrence.template.start();
        match &self.recurrence.rule.pattern {
            RecurrencePattern::Daily { interval } => {
                let days = i64::from(self.step) * i64::from(*interval);
                self.step += 1;
                template_start.checked_add_signed(Duration::days(days))
            }
            RecurrencePattern::Weekly { interval, weekdays } if weekdays.is_empty() => {
                let days = 7 * i64::from(self.step) * i64::from(*interval);
                self.step += 1;
                template_start.checked_add_signed(Duration::days(days))
            }
            RecurrencePattern::Weekly { interval, weekdays } => loop {
                if self.day_idx >= weekdays.len() {
                    self.day_idx = 0;
                    self.step += 1;
                }
                let week_start = week_start(template_start.date())
                    .checked_add_signed(Duration::days(7 * i64::from(self.step) * i64::from(*interval)))?;
                let date = week_start
                    .checked_add_signed(Duration::days(i64::from(weekdays[self.day_idx])))?;
                self.day_idx += 1;
                let start = date.and_time(template_start.time());
                if start >= template_start {
                    return Some(start);
                }
            },
            RecurrencePattern::Monthly { interval } => {
                let months = self.step.checked_mul(*interval)?;
                self.step += 1;
                template_start
                    .date()
                    .checked_add_months(Months::new(months))
                    .map(|date| date.and_time(template_start.time()))
            }
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.emitted >= self.max {
            return None;
        }
        let Some(start) = self.next_start() else {
            self.done = true;
            return None;
        };
        if let Some(end) = self.recurrence.rule.end_date {
            if start > end {
                self.done = true;
                return None;
            }
        }
        self.emitted += 1;
        let template = &self.recurrence.template;
        Some(template.shifted(start - template.start()))
    }
}

/// Sunday on or before `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(day_of_week(date)))
}
