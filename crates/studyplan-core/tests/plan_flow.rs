//! Plan replacement against both stores, including recovery after a
//! failed insert.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use studyplan_core::{
    BlockedTimePreference, CalendarEvent, CalendarStore, Confidence, CoreError, EventKind,
    MemoryStore, PlanDb, PlanOptions, PlanRequest, PlanService, Priority, StudySlotTemplate,
    SubjectPreference, TimeInterval,
};
use tempfile::TempDir;

const USER: &str = "student";

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn request() -> PlanRequest {
    PlanRequest {
        subjects: vec![
            SubjectPreference::new("Science", Confidence::High),
            SubjectPreference::new("English", Confidence::Medium),
        ],
        slots: vec![
            StudySlotTemplate::new(4, 18, 60).unwrap(),
            StudySlotTemplate::new(2, 17, 60).unwrap(),
        ],
        weeks_ahead: Some(4),
    }
}

fn study_sessions<S: CalendarStore>(store: &S) -> Vec<CalendarEvent> {
    store
        .list_events(USER, None)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EventKind::StudySession)
        .collect()
}

#[test]
fn regenerating_twice_leaves_one_plan() {
    let mut service = PlanService::new(MemoryStore::new(), USER, PlanOptions::default());
    let first = service.regenerate(&request(), at(19, 8, 0)).unwrap();
    assert_eq!(first.sessions.len(), 4);
    assert_eq!(first.removed, 0);

    let second = service.regenerate(&request(), at(19, 8, 0)).unwrap();
    assert_eq!(second.previous_plan_id.as_deref(), Some(first.plan_id.as_str()));
    assert_eq!(second.removed, 4);

    let sessions = study_sessions(service.store());
    assert_eq!(sessions.len(), 4);
    assert!(sessions
        .iter()
        .all(|e| e.plan_id.as_deref() == Some(second.plan_id.as_str())));
}

#[test]
fn failed_insert_recovers_on_retry() {
    let mut service = PlanService::new(MemoryStore::new(), USER, PlanOptions::default());
    let first = service.regenerate(&request(), at(19, 8, 0)).unwrap();

    service.store_mut().fail_inserts(true);
    let err = service.regenerate(&request(), at(19, 8, 0)).unwrap_err();
    assert!(matches!(err, CoreError::Database(_)));
    // Cleanup ran, insert did not
    assert!(study_sessions(service.store()).is_empty());

    service.store_mut().fail_inserts(false);
    let retry = service.regenerate(&request(), at(19, 8, 0)).unwrap();
    assert_eq!(retry.previous_plan_id.as_deref(), Some(first.plan_id.as_str()));
    assert_eq!(retry.removed, 0);
    assert_eq!(study_sessions(service.store()).len(), 4);
}

#[test]
fn leftover_plan_events_do_not_displace_new_sessions() {
    let mut store = MemoryStore::new();
    let mut leftover = CalendarEvent::new(
        "Mathematics Study Session",
        TimeInterval::new(at(19, 16, 0), at(19, 17, 0)).unwrap(),
        EventKind::StudySession,
    );
    leftover.plan_id = Some("interrupted".into());
    store.insert_events(USER, &[leftover]).unwrap();

    let request = PlanRequest {
        subjects: vec![SubjectPreference::new("Mathematics", Confidence::High)],
        slots: vec![StudySlotTemplate::new(1, 16, 45).unwrap()],
        weeks_ahead: Some(2),
    };
    let mut service = PlanService::new(store, USER, PlanOptions::default());
    assert_eq!(service.preview(&request, at(19, 8, 0)).unwrap().sessions[0].interval.start(), at(19, 16, 0));

    let outcome = service.regenerate(&request, at(19, 8, 0)).unwrap();
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.sessions[0].interval.start(), at(19, 16, 0));

    let sessions = study_sessions(service.store());
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].plan_id.as_deref(), Some(outcome.plan_id.as_str()));
}

#[test]
fn review_sessions_survive_regeneration() {
    let mut service = PlanService::new(MemoryStore::new(), USER, PlanOptions::default());
    service.regenerate(&request(), at(19, 8, 0)).unwrap();
    service
        .schedule_review("English", 30, None, at(19, 9, 0), None)
        .unwrap();

    service.regenerate(&request(), at(19, 8, 0)).unwrap();
    let reviews: Vec<CalendarEvent> = service
        .store()
        .list_events(USER, None)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EventKind::ReviewSession)
        .collect();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].interval.start(), at(19, 9, 0));
}

#[test]
fn sessions_avoid_stored_commitments() {
    let mut store = MemoryStore::new();
    store
        .insert_events(
            USER,
            &[CalendarEvent::new(
                "Dentist",
                TimeInterval::new(at(20, 17, 0), at(20, 18, 0)).unwrap(),
                EventKind::Other,
            )],
        )
        .unwrap();
    let blocked = BlockedTimePreference::new(
        "Choir",
        4,
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        Priority::Medium,
    )
    .unwrap();
    store.insert_blocked_time(USER, &blocked).unwrap();

    let mut service = PlanService::new(store, USER, PlanOptions::default());
    let outcome = service.regenerate(&request(), at(19, 8, 0)).unwrap();
    assert_eq!(outcome.sessions.len(), 4);

    let events = service.store().list_events(USER, None).unwrap();
    for session in &outcome.sessions {
        let clashes = events
            .iter()
            .filter(|e| e.kind == EventKind::Other && e.overlaps(&session.interval))
            .count();
        assert_eq!(clashes, 0, "{} overlaps a stored event", session.interval.start());
        assert!(blocked.on_date(session.interval.start().date()).map_or(true, |b| !b.overlaps(&session.interval)));
    }
    assert_eq!(outcome.sessions[0].interval.start(), at(20, 18, 0));
}

#[test]
fn sqlite_store_replaces_plan_atomically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("studyplan.db");

    let plan_id = {
        let db = PlanDb::open_at(&path).unwrap();
        let mut service = PlanService::new(db, USER, PlanOptions::default());
        service.regenerate(&request(), at(19, 8, 0)).unwrap();
        service.regenerate(&request(), at(19, 8, 0)).unwrap().plan_id
    };

    let db = PlanDb::open_at(&path).unwrap();
    assert_eq!(db.active_plan(USER).unwrap().as_deref(), Some(plan_id.as_str()));
    assert_eq!(db.events_for_plan(USER, &plan_id).unwrap().len(), 4);
    assert_eq!(study_sessions(&db).len(), 4);

    let mut service = PlanService::new(db, USER, PlanOptions::default());
    assert_eq!(service.clear_plan().unwrap(), 4);
    assert!(service.current_plan().unwrap().is_none());
    assert!(study_sessions(service.store()).is_empty());
}
