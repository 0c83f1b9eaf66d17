//! Subcommand implementations and the argument parsers they share.

pub mod blocked;
pub mod config;
pub mod event;
pub mod plan;
pub mod slot;

use chrono::{Local, NaiveDateTime, NaiveTime};
use studyplan_core::{Config, PlanDb, PlanOptions, PlanService};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the user's database behind a plan service configured from disk.
pub fn open_service() -> Result<PlanService<PlanDb>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    config.validate()?;
    let db = PlanDb::open()?;
    Ok(PlanService::new(db, config.user.id.clone(), PlanOptions::from_config(&config)))
}

/// Current user id from the config file.
pub fn user_id() -> Result<String, Box<dyn std::error::Error>> {
    Ok(Config::load()?.user.id)
}

/// `--now` override or the local wall clock.
pub fn now_or(now: Option<NaiveDateTime>) -> NaiveDateTime {
    now.unwrap_or_else(|| Local::now().naive_local())
}

/// Parse `2026-10-19T16:00` or `2026-10-19 16:00[:00]`.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("invalid date-time '{s}', expected YYYY-MM-DDTHH:MM"))
}

/// Parse `15:00` or `15:00:00`.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{s}', expected HH:MM"))
}
