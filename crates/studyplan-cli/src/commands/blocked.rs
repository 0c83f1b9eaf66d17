use chrono::NaiveTime;
use clap::Subcommand;
use studyplan_core::schedule::day_name;
use studyplan_core::{BlockedTimePreference, CalendarStore, PlanDb, Priority};

use super::{parse_time, user_id, CmdResult};

#[derive(Subcommand)]
pub enum BlockedAction {
    /// Add a weekly blocked window
    Add {
        /// Title (e.g. "Work")
        title: String,
        /// Day of week, Sunday = 0
        #[arg(long)]
        day: u8,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        /// End time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Free-form reason
        #[arg(long)]
        reason: Option<String>,
    },
    /// List blocked windows
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a blocked window
    Remove {
        /// Blocked window ID
        id: String,
    },
}

pub fn run(action: BlockedAction) -> CmdResult {
    let user = user_id()?;
    let mut db = PlanDb::open()?;

    match action {
        BlockedAction::Add {
            title,
            day,
            start,
            end,
            priority,
            reason,
        } => {
            let priority = Priority::parse(&priority)
                .ok_or_else(|| format!("unknown priority '{priority}'"))?;
            let mut blocked = BlockedTimePreference::new(title, day, start, end, priority)?;
            if let Some(reason) = reason {
                blocked = blocked.with_reason(reason);
            }
            db.insert_blocked_time(&user, &blocked)?;
            println!("blocked time added: {}", blocked.id);
        }
        BlockedAction::List { json } => {
            let blocked = db.list_blocked_times(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&blocked)?);
            } else {
                for b in blocked {
                    println!(
                        "{}  {} {}-{}  {} [{}]",
                        b.id,
                        day_name(b.day_of_week),
                        b.start_time.format("%H:%M"),
                        b.end_time.format("%H:%M"),
                        b.title,
                        b.priority.as_str(),
                    );
                }
            }
        }
        BlockedAction::Remove { id } => {
            if db.delete_blocked_time(&user, &id)? {
                println!("blocked time removed");
            } else {
                return Err(format!("blocked time not found: {id}").into());
            }
        }
    }
    Ok(())
}
