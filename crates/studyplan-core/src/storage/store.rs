//! Persistence collaborator consumed by the plan orchestration.
//!
//! The scheduling engine never calls a store; [`crate::planner::PlanService`]
//! reads events and blocked times through this trait, runs the engine, and
//! writes the result back.

use crate::error::Result;
use crate::interval::TimeInterval;
use crate::schedule::{BlockedTimePreference, CalendarEvent};

/// Calendar storage for one or more users.
pub trait CalendarStore {
    /// Events of `user_id`. With a range, one-off events outside it are
    /// omitted; recurring events are always returned.
    fn list_events(&self, user_id: &str, range: Option<&TimeInterval>) -> Result<Vec<CalendarEvent>>;

    fn list_blocked_times(&self, user_id: &str) -> Result<Vec<BlockedTimePreference>>;

    /// Insert events and return their ids in input order.
    fn insert_events(&mut self, user_id: &str, events: &[CalendarEvent]) -> Result<Vec<String>>;

    /// Delete events by id. Unknown ids are ignored.
    fn delete_events(&mut self, user_id: &str, ids: &[String]) -> Result<()>;

    fn insert_blocked_time(&mut self, user_id: &str, blocked: &BlockedTimePreference) -> Result<()>;

    /// Returns whether a blocked time was removed.
    fn delete_blocked_time(&mut self, user_id: &str, id: &str) -> Result<bool>;

    /// Id of the user's active plan, if any.
    fn active_plan(&self, user_id: &str) -> Result<Option<String>>;

    fn set_active_plan(&mut self, user_id: &str, plan_id: Option<&str>) -> Result<()>;

    /// Replace a plan: delete `stale_ids`, insert `events`, mark `plan_id`
    /// active.
    ///
    /// The default runs the phases as separate calls in cleanup-then-insert
    /// order; a failure part way leaves a state the whole flow can be
    /// re-run against. Stores with transactions override this.
    fn replace_plan(
        &mut self,
        user_id: &str,
        stale_ids: &[String],
        events: &[CalendarEvent],
        plan_id: &str,
    ) -> Result<Vec<String>> {
        self.delete_events(user_id, stale_ids)?;
        let ids = self.insert_events(user_id, events)?;
        self.set_active_plan(user_id, Some(plan_id))?;
        Ok(ids)
    }
}
