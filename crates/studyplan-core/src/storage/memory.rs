//! In-memory calendar store.

use std::collections::HashMap;

use crate::error::{CoreError, DatabaseError, Result};
use crate::interval::TimeInterval;
use crate::schedule::{BlockedTimePreference, CalendarEvent};

use super::store::CalendarStore;

#[derive(Debug, Clone, Default)]
struct UserCalendar {
    events: Vec<CalendarEvent>,
    blocked: Vec<BlockedTimePreference>,
    active_plan: Option<String>,
}

/// A [`CalendarStore`] held in memory.
///
/// Used by tests and dry runs. `fail_inserts` makes every insert fail,
/// which simulates a crash between the cleanup and insert phases.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: HashMap<String, UserCalendar>,
    fail_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&mut self, fail: bool) {
        self.fail_inserts = fail;
    }

    fn user(&self, user_id: &str) -> Option<&UserCalendar> {
        self.users.get(user_id)
    }

    fn user_mut(&mut self, user_id: &str) -> &mut UserCalendar {
        self.users.entry(user_id.to_string()).or_default()
    }
}

impl CalendarStore for MemoryStore {
    fn list_events(&self, user_id: &str, range: Option<&TimeInterval>) -> Result<Vec<CalendarEvent>> {
        let Some(cal) = self.user(user_id) else {
            return Ok(Vec::new());
        };
        let mut events: Vec<CalendarEvent> = cal
            .events
            .iter()
            .filter(|e| match range {
                Some(range) => e.recurrence.is_some() || e.overlaps(range),
                None => true,
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.interval.start());
        Ok(events)
    }

    fn list_blocked_times(&self, user_id: &str) -> Result<Vec<BlockedTimePreference>> {
        Ok(self.user(user_id).map(|c| c.blocked.clone()).unwrap_or_default())
    }

    fn insert_events(&mut self, user_id: &str, events: &[CalendarEvent]) -> Result<Vec<String>> {
        if self.fail_inserts {
            return Err(CoreError::Database(DatabaseError::QueryFailed(
                "insert rejected".into(),
            )));
        }
        let cal = self.user_mut(user_id);
        cal.events.extend(events.iter().cloned());
        Ok(events.iter().map(|e| e.id.clone()).collect())
    }

    fn delete_events(&mut self, user_id: &str, ids: &[String]) -> Result<()> {
        let cal = self.user_mut(user_id);
        cal.events.retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    fn insert_blocked_time(&mut self, user_id: &str, blocked: &BlockedTimePreference) -> Result<()> {
        self.user_mut(user_id).blocked.push(blocked.clone());
        Ok(())
    }

    fn delete_blocked_time(&mut self, user_id: &str, id: &str) -> Result<bool> {
        let cal = self.user_mut(user_id);
        let before = cal.blocked.len();
        cal.blocked.retain(|b| b.id != id);
        Ok(cal.blocked.len() != before)
    }

    fn active_plan(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.user(user_id).and_then(|c| c.active_plan.clone()))
    }

    fn set_active_plan(&mut self, user_id: &str, plan_id: Option<&str>) -> Result<()> {
        self.user_mut(user_id).active_plan = plan_id.map(str::to_string);
        Ok(())
    }
}
