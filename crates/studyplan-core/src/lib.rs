//! # Studyplan Core Library
//!
//! This library provides the scheduling engine behind the `studyplan` CLI:
//! it turns subject confidence levels and weekly study slots into concrete
//! study sessions, keeps them clear of existing commitments, and replaces
//! a previously generated plan without leaving duplicates behind.
//!
//! ## Architecture
//!
//! - **Engine**: pure functions over caller-supplied snapshots
//!   ([`interval`], [`recurrence`], [`availability`], [`slot_finder`],
//!   [`distributor`], [`plan`]). Nothing here reads a clock or a database.
//! - **Planner**: [`PlanService`] wires the engine to a [`CalendarStore`]
//!   and owns the cleanup-then-insert replacement flow.
//! - **Storage**: SQLite calendar persistence and TOML configuration.
//!
//! ## Key Components
//!
//! - [`SlotFinder`]: forward search for the next free slot
//! - [`SessionDistributor`]: round-robin placement of weekly quotas
//! - [`PomodoroBreakdown`]: work/break split of a session
//! - [`PlanDb`]: calendar persistence
//! - [`Config`]: application configuration management

pub mod availability;
pub mod distributor;
pub mod error;
pub mod interval;
pub mod plan;
pub mod planner;
pub mod recurrence;
pub mod schedule;
pub mod slot_finder;
pub mod storage;

pub use availability::{conflicts, is_free, Conflict};
pub use distributor::{distribute, Distribution, GeneratedSession, SessionDistributor};
pub use error::{ConfigError, CoreError, DatabaseError, PlanError, ValidationError};
pub use interval::TimeInterval;
pub use plan::{
    assemble, cleanup_previous, CalendarEventDraft, PomodoroBlock, PomodoroBlockKind,
    PomodoroBreakdown, PomodoroSettings,
};
pub use planner::{PlanOptions, PlanOutcome, PlanRequest, PlanService, ReviewSearch};
pub use recurrence::{expand, Recurrence, RecurrencePattern, RecurrenceRule};
pub use schedule::{
    BlockedTimePreference, CalendarEvent, Confidence, DayOfWeek, EventKind, Priority,
    StudySlotTemplate, SubjectPreference, TimeOfDay,
};
pub use slot_finder::{find_next, SlotFinder, SlotFinderConfig, SlotNotFound};
pub use storage::{CalendarStore, Config, MemoryStore, PlanDb};
