//! SQLite-based storage for calendar events, blocked times and active plans.

use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::store::CalendarStore;
use crate::error::{DatabaseError, Result};
use crate::interval::TimeInterval;
use crate::schedule::{BlockedTimePreference, CalendarEvent, EventKind, Priority};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";

const EVENT_COLUMNS: &str = "id, title, subject, topic, start_at, end_at, kind, recurrence, \
                             source_session_id, plan_id, pomodoro";

// === Helper Functions ===

fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn corrupt(table: &str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: table.to_string(),
        message: message.into(),
    }
}

fn parse_datetime(table: &str, s: &str) -> std::result::Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| corrupt(table, format!("bad datetime '{s}': {e}")))
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| corrupt("blocked_times", format!("bad time '{s}': {e}")))
}

/// Raw `calendar_events` row before validation.
struct EventRow {
    id: String,
    title: String,
    subject: Option<String>,
    topic: Option<String>,
    start_at: String,
    end_at: String,
    kind: String,
    recurrence: Option<String>,
    source_session_id: Option<String>,
    plan_id: Option<String>,
    pomodoro: Option<String>,
}

fn row_to_event_row(row: &rusqlite::Row) -> std::result::Result<EventRow, rusqlite::Error> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: row.get(2)?,
        topic: row.get(3)?,
        start_at: row.get(4)?,
        end_at: row.get(5)?,
        kind: row.get(6)?,
        recurrence: row.get(7)?,
        source_session_id: row.get(8)?,
        plan_id: row.get(9)?,
        pomodoro: row.get(10)?,
    })
}

impl EventRow {
    fn into_event(self) -> std::result::Result<CalendarEvent, DatabaseError> {
        const TABLE: &str = "calendar_events";
        let start = parse_datetime(TABLE, &self.start_at)?;
        let end = parse_datetime(TABLE, &self.end_at)?;
        let interval = TimeInterval::new(start, end).map_err(|e| corrupt(TABLE, e.to_string()))?;
        let recurrence = self
            .recurrence
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| corrupt(TABLE, format!("bad recurrence: {e}")))?;
        let pomodoro = self
            .pomodoro
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| corrupt(TABLE, format!("bad pomodoro: {e}")))?;

        Ok(CalendarEvent {
            id: self.id,
            title: self.title,
            subject: self.subject,
            topic: self.topic,
            interval,
            kind: EventKind::parse(&self.kind),
            recurrence,
            source_session_id: self.source_session_id,
            plan_id: self.plan_id,
            pomodoro,
        })
    }
}

/// Raw `blocked_times` row before validation.
struct BlockedRow {
    id: String,
    title: String,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    priority: String,
    reason: Option<String>,
}

fn row_to_blocked_row(row: &rusqlite::Row) -> std::result::Result<BlockedRow, rusqlite::Error> {
    Ok(BlockedRow {
        id: row.get(0)?,
        title: row.get(1)?,
        day_of_week: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        priority: row.get(5)?,
        reason: row.get(6)?,
    })
}

impl BlockedRow {
    fn into_blocked(self) -> std::result::Result<BlockedTimePreference, DatabaseError> {
        let priority = Priority::parse(&self.priority).unwrap_or_default();
        let mut pref = BlockedTimePreference::new(
            self.title,
            self.day_of_week,
            parse_time(&self.start_time)?,
            parse_time(&self.end_time)?,
            priority,
        )
        .map_err(|e| corrupt("blocked_times", e.to_string()))?;
        pref.id = self.id;
        pref.reason = self.reason;
        Ok(pref)
    }
}

fn insert_events_in(conn: &Connection, user_id: &str, events: &[CalendarEvent]) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "INSERT INTO calendar_events
            (id, user_id, title, subject, topic, start_at, end_at, kind, recurrence,
             source_session_id, plan_id, pomodoro)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    let mut ids = Vec::with_capacity(events.len());
    for event in events {
        let recurrence = event.recurrence.as_ref().map(serde_json::to_string).transpose()?;
        let pomodoro = event.pomodoro.as_ref().map(serde_json::to_string).transpose()?;
        stmt.execute(params![
            event.id,
            user_id,
            event.title,
            event.subject,
            event.topic,
            format_datetime(event.interval.start()),
            format_datetime(event.interval.end()),
            event.kind.as_str(),
            recurrence,
            event.source_session_id,
            event.plan_id,
            pomodoro,
        ])?;
        ids.push(event.id.clone());
    }
    Ok(ids)
}

fn delete_events_in(conn: &Connection, user_id: &str, ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare("DELETE FROM calendar_events WHERE user_id = ?1 AND id = ?2")?;
    for id in ids {
        stmt.execute(params![user_id, id])?;
    }
    Ok(())
}

fn set_active_plan_in(conn: &Connection, user_id: &str, plan_id: Option<&str>) -> Result<()> {
    match plan_id {
        Some(plan_id) => {
            conn.execute(
                "INSERT INTO active_plans (user_id, plan_id, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET plan_id = excluded.plan_id,
                                                    updated_at = excluded.updated_at",
                params![user_id, plan_id, Utc::now().to_rfc3339()],
            )?;
        }
        None => {
            conn.execute("DELETE FROM active_plans WHERE user_id = ?1", params![user_id])?;
        }
    }
    Ok(())
}

/// SQLite database for calendar storage.
pub struct PlanDb {
    conn: Connection,
}

impl PlanDb {
    /// Open the database at `~/.config/studyplan/studyplan.db`.
    ///
    /// Creates tables if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyplan.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS calendar_events (
                id                 TEXT PRIMARY KEY,
                user_id            TEXT NOT NULL,
                title              TEXT NOT NULL,
                subject            TEXT,
                topic              TEXT,
                start_at           TEXT NOT NULL,
                end_at             TEXT NOT NULL,
                kind               TEXT NOT NULL DEFAULT 'other',
                recurrence         TEXT,
                source_session_id  TEXT,
                plan_id            TEXT,
                pomodoro           TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_events_user_start
                ON calendar_events (user_id, start_at);
            CREATE INDEX IF NOT EXISTS idx_events_plan
                ON calendar_events (plan_id);

            CREATE TABLE IF NOT EXISTS blocked_times (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL,
                title        TEXT NOT NULL,
                day_of_week  INTEGER NOT NULL,
                start_time   TEXT NOT NULL,
                end_time     TEXT NOT NULL,
                priority     TEXT NOT NULL DEFAULT 'medium',
                reason       TEXT
            );

            CREATE TABLE IF NOT EXISTS active_plans (
                user_id     TEXT PRIMARY KEY,
                plan_id     TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )
    }

    /// Events linked to `plan_id`.
    pub fn events_for_plan(&self, user_id: &str, plan_id: &str) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE user_id = ?1 AND plan_id = ?2 ORDER BY start_at"
        ))?;
        let rows = stmt
            .query_map(params![user_id, plan_id], row_to_event_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(EventRow::into_event)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl CalendarStore for PlanDb {
    fn list_events(&self, user_id: &str, range: Option<&TimeInterval>) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE user_id = ?1
               AND (?2 IS NULL OR recurrence IS NOT NULL OR (start_at < ?3 AND end_at > ?2))
             ORDER BY start_at"
        ))?;
        let from = range.map(|r| format_datetime(r.start()));
        let until = range.map(|r| format_datetime(r.end()));
        let rows = stmt
            .query_map(params![user_id, from, until], row_to_event_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(EventRow::into_event)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn list_blocked_times(&self, user_id: &str) -> Result<Vec<BlockedTimePreference>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, day_of_week, start_time, end_time, priority, reason
             FROM blocked_times WHERE user_id = ?1 ORDER BY day_of_week, start_time",
        )?;
        let rows = stmt
            .query_map(params![user_id], row_to_blocked_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(BlockedRow::into_blocked)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn insert_events(&mut self, user_id: &str, events: &[CalendarEvent]) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        let ids = insert_events_in(&tx, user_id, events)?;
        tx.commit()?;
        Ok(ids)
    }

    fn delete_events(&mut self, user_id: &str, ids: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        delete_events_in(&tx, user_id, ids)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_blocked_time(&mut self, user_id: &str, blocked: &BlockedTimePreference) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO blocked_times
                (id, user_id, title, day_of_week, start_time, end_time, priority, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                blocked.id,
                user_id,
                blocked.title,
                blocked.day_of_week,
                blocked.start_time.format(TIME_FORMAT).to_string(),
                blocked.end_time.format(TIME_FORMAT).to_string(),
                blocked.priority.as_str(),
                blocked.reason,
            ],
        )?;
        Ok(())
    }

    fn delete_blocked_time(&mut self, user_id: &str, id: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM blocked_times WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(n > 0)
    }

    fn active_plan(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT plan_id FROM active_plans WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_active_plan(&mut self, user_id: &str, plan_id: Option<&str>) -> Result<()> {
        set_active_plan_in(&self.conn, user_id, plan_id)
    }

    /// Both phases run in one transaction.
    fn replace_plan(
        &mut self,
        user_id: &str,
        stale_ids: &[String],
        events: &[CalendarEvent],
        plan_id: &str,
    ) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        delete_events_in(&tx, user_id, stale_ids)?;
        let ids = insert_events_in(&tx, user_id, events)?;
        set_active_plan_in(&tx, user_id, Some(plan_id))?;
        tx.commit()?;
        Ok(ids)
    }
}
