use chrono::NaiveDateTime;
use clap::Subcommand;
use studyplan_core::{CalendarEvent, CalendarStore, EventKind, PlanDb, TimeInterval};

use super::{parse_datetime, user_id, CmdResult};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a one-off calendar event
    Add {
        /// Event title
        title: String,
        /// Start (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_datetime)]
        start: NaiveDateTime,
        /// End (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_datetime)]
        end: NaiveDateTime,
        /// study_session, review_session or other
        #[arg(long, default_value = "other")]
        kind: String,
        /// Subject label
        #[arg(long)]
        subject: Option<String>,
    },
    /// List calendar events
    List {
        /// Only events overlapping [from, to)
        #[arg(long, value_parser = parse_datetime, requires = "to")]
        from: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime, requires = "from")]
        to: Option<NaiveDateTime>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: EventAction) -> CmdResult {
    let user = user_id()?;
    let mut db = PlanDb::open()?;

    match action {
        EventAction::Add {
            title,
            start,
            end,
            kind,
            subject,
        } => {
            let interval = TimeInterval::new(start, end)?;
            let mut event = CalendarEvent::new(title, interval, EventKind::parse(&kind));
            if let Some(subject) = subject {
                event = event.with_subject(subject);
            }
            let ids = db.insert_events(&user, &[event])?;
            for id in ids {
                println!("event created: {id}");
            }
        }
        EventAction::List { from, to, json } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => Some(TimeInterval::new(from, to)?),
                _ => None,
            };
            let events = db.list_events(&user, range.as_ref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                for e in events {
                    println!(
                        "{}  {} - {}  [{}] {}",
                        e.id,
                        e.interval.start().format("%Y-%m-%d %H:%M"),
                        e.interval.end().format("%H:%M"),
                        e.kind.as_str(),
                        e.title,
                    );
                }
            }
        }
    }
    Ok(())
}
