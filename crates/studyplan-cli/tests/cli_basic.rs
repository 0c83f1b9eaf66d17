//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME so the
//! config file and database start empty.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyplan"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("STUDYPLAN_ENV")
        .env_remove("STUDYPLAN_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

const NOW: &str = "2026-10-19T08:00";

fn generate(home: &TempDir) -> (i32, String, String) {
    run_cli(
        home,
        &[
            "plan",
            "generate",
            "--now",
            NOW,
            "--subject",
            "Mathematics:medium",
            "--slot",
            "1:16:45",
        ],
    )
}

fn event_count(home: &TempDir) -> usize {
    let (code, stdout, _) = run_cli(home, &["event", "list", "--json"]);
    assert_eq!(code, 0, "event list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    parsed.as_array().unwrap().len()
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "planner.weeks_ahead"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "4");

    let (code, _, _) = run_cli(&home, &["config", "set", "planner.weeks_ahead", "2"]);
    assert_eq!(code, 0, "config set failed");
    let (_, stdout, _) = run_cli(&home, &["config", "get", "planner.weeks_ahead"]);
    assert_eq!(stdout.trim(), "2");

    let (code, _, stderr) = run_cli(&home, &["config", "set", "planner.nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown configuration key"));
}

#[test]
fn test_config_list_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["pomodoro"]["work_minutes"], 25);
}

#[test]
fn test_blocked_add_list_remove() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        &home,
        &["blocked", "add", "Work", "--day", "2", "--start", "15:00", "--end", "17:00", "--priority", "high"],
    );
    assert_eq!(code, 0, "blocked add failed");
    let id = stdout.trim().rsplit(' ').next().unwrap().to_string();

    let (_, stdout, _) = run_cli(&home, &["blocked", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed[0]["id"], id.as_str());
    assert_eq!(parsed[0]["day_of_week"], 2);

    let (code, _, _) = run_cli(&home, &["blocked", "remove", &id]);
    assert_eq!(code, 0);
    let (code, _, _) = run_cli(&home, &["blocked", "remove", &id]);
    assert_ne!(code, 0);
}

#[test]
fn test_blocked_add_rejects_inverted_window() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(
        &home,
        &["blocked", "add", "Work", "--day", "2", "--start", "17:00", "--end", "15:00"],
    );
    assert_ne!(code, 0);
}

#[test]
fn test_plan_generate_is_idempotent() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = generate(&home);
    assert_eq!(code, 0, "plan generate failed");
    assert!(stdout.contains("3 sessions"));
    assert!(stdout.contains("Monday 2026-10-19 16:00-16:45  Mathematics"));
    assert_eq!(event_count(&home), 3);

    let (code, stdout, _) = generate(&home);
    assert_eq!(code, 0);
    assert!(stdout.contains("3 replaced"));
    assert_eq!(event_count(&home), 3);

    let (code, stdout, _) = run_cli(&home, &["plan", "clear"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "removed 3 sessions");
    assert_eq!(event_count(&home), 0);
}

#[test]
fn test_plan_generate_without_slots_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        &home,
        &["plan", "generate", "--now", NOW, "--subject", "Mathematics:low"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("no study slots"));
    assert_eq!(event_count(&home), 0);
}

#[test]
fn test_plan_show_without_plan() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["plan", "show"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "no active plan");
}

#[test]
fn test_slot_find_skips_blocked_time() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(
        &home,
        &["blocked", "add", "Work", "--day", "1", "--start", "15:00", "--end", "17:00"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(
        &home,
        &["slot", "find", "--duration", "30", "--from", "2026-10-19T15:00", "--book"],
    );
    assert_eq!(code, 0, "slot find failed");
    assert_eq!(stdout.trim(), "2026-10-19 17:00-17:30 (booked)");
    assert_eq!(event_count(&home), 1);
}
