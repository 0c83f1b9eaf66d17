use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Subcommand;
use studyplan_core::schedule::{day_name, day_of_week};
use studyplan_core::{Confidence, PlanRequest, StudySlotTemplate, SubjectPreference};

use super::{now_or, open_service, parse_datetime, CmdResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate a new plan, replacing the active one
    Generate {
        /// JSON file with `subjects` and `slots`
        #[arg(long, conflicts_with_all = ["subject", "slot"])]
        request: Option<PathBuf>,
        /// Subject as NAME:CONFIDENCE (low, medium, high); repeatable
        #[arg(long, value_parser = parse_subject)]
        subject: Vec<SubjectPreference>,
        /// Weekly slot as DAY:HOUR:MINUTES with Sunday = 0; repeatable
        #[arg(long, value_parser = parse_slot)]
        slot: Vec<StudySlotTemplate>,
        /// Planning horizon in weeks (defaults to the config)
        #[arg(long)]
        weeks: Option<u32>,
        /// Reference instant instead of the local clock
        #[arg(long, value_parser = parse_datetime)]
        now: Option<NaiveDateTime>,
        /// Print the sessions without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the active plan
    Show,
    /// Remove the active plan's sessions
    Clear,
}

fn parse_subject(s: &str) -> Result<SubjectPreference, String> {
    let (name, level) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:CONFIDENCE, got '{s}'"))?;
    let confidence =
        Confidence::parse(level).ok_or_else(|| format!("unknown confidence level '{level}'"))?;
    Ok(SubjectPreference::new(name.trim(), confidence))
}

fn parse_slot(s: &str) -> Result<StudySlotTemplate, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [day, hour, minutes] = parts.as_slice() else {
        return Err(format!("expected DAY:HOUR:MINUTES, got '{s}'"));
    };
    let num = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    let day = u8::try_from(num(day)?).map_err(|e| e.to_string())?;
    StudySlotTemplate::new(day, num(hour)?, num(minutes)?).map_err(|e| e.to_string())
}

pub fn run(action: PlanAction) -> CmdResult {
    match action {
        PlanAction::Generate {
            request,
            subject,
            slot,
            weeks,
            now,
            dry_run,
        } => {
            let mut request = match request {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)?;
                    serde_json::from_str::<PlanRequest>(&raw)?
                }
                None => PlanRequest {
                    subjects: subject,
                    slots: slot,
                    weeks_ahead: None,
                },
            };
            if weeks.is_some() {
                request.weeks_ahead = weeks;
            }
            let now = now_or(now);
            let mut service = open_service()?;

            if dry_run {
                let preview = service.preview(&request, now)?;
                println!("{}", serde_json::to_string_pretty(&preview)?);
                return Ok(());
            }

            let outcome = service.regenerate(&request, now)?;
            for session in &outcome.sessions {
                println!(
                    "{} {} {}-{}  {}",
                    session.day_label,
                    session.interval.start().format("%Y-%m-%d"),
                    session.formatted_start,
                    session.formatted_end,
                    session.subject,
                );
            }
            println!(
                "plan {}: {} sessions, {} replaced",
                outcome.plan_id,
                outcome.sessions.len(),
                outcome.removed
            );
            if outcome.shortfall() > 0 {
                eprintln!(
                    "note: {} of {} requested sessions could not be placed",
                    outcome.shortfall(),
                    outcome.expected
                );
            }
        }
        PlanAction::Show => {
            let service = open_service()?;
            match service.current_plan()? {
                Some((plan_id, events)) => {
                    println!("plan {plan_id}");
                    for event in events {
                        let start = event.interval.start();
                        println!(
                            "{} {} {}-{}  {}",
                            day_name(day_of_week(start.date())),
                            start.format("%Y-%m-%d"),
                            start.format("%H:%M"),
                            event.interval.end().format("%H:%M"),
                            event.title,
                        );
                    }
                }
                None => println!("no active plan"),
            }
        }
        PlanAction::Clear => {
            let mut service = open_service()?;
            let removed = service.clear_plan()?;
            println!("removed {removed} sessions");
        }
    }
    Ok(())
}
