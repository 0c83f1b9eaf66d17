use chrono::NaiveDateTime;
use clap::Subcommand;
use studyplan_core::{ReviewSearch, TimeOfDay};

use super::{now_or, open_service, parse_datetime, CmdResult};

#[derive(Subcommand)]
pub enum SlotAction {
    /// Find the next free slot, optionally booking it as a review session
    Find {
        /// Subject the slot is for
        #[arg(long, default_value = "Review")]
        subject: String,
        /// Slot length in minutes
        #[arg(long, default_value = "30")]
        duration: u32,
        /// morning, afternoon, evening or night
        #[arg(long, value_parser = parse_time_of_day)]
        prefer: Option<TimeOfDay>,
        /// Search from this instant instead of the local clock
        #[arg(long, value_parser = parse_datetime)]
        from: Option<NaiveDateTime>,
        /// Book the slot as a review session
        #[arg(long)]
        book: bool,
        /// Study session the review follows up on
        #[arg(long, requires = "book")]
        source_session: Option<String>,
    },
}

fn parse_time_of_day(s: &str) -> Result<TimeOfDay, String> {
    TimeOfDay::parse(s).ok_or_else(|| format!("unknown time of day '{s}'"))
}

pub fn run(action: SlotAction) -> CmdResult {
    match action {
        SlotAction::Find {
            subject,
            duration,
            prefer,
            from,
            book,
            source_session,
        } => {
            let from = now_or(from);
            let mut service = open_service()?;
            let state = if book {
                service.schedule_review(&subject, duration, prefer, from, source_session)?
            } else {
                service.find_review_slot(&subject, duration, prefer, from)?
            };

            match state {
                ReviewSearch::Found { interval, .. } => {
                    println!(
                        "{} {}-{}{}",
                        interval.start().format("%Y-%m-%d"),
                        interval.start().format("%H:%M"),
                        interval.end().format("%H:%M"),
                        if book { " (booked)" } else { "" },
                    );
                }
                ReviewSearch::Exhausted { reason, .. } => {
                    // Not an error for the caller's workflow
                    println!("no suitable slot found: {reason}");
                }
                ReviewSearch::Idle | ReviewSearch::Searching { .. } => {}
            }
        }
    }
    Ok(())
}
