//! Integration tests for resuming enumeration across process restarts
//!
//! Each "process" is a fresh ProgressStore over the same file.

use lockstore::{Combination, EnumerationState, ProgressStore, SessionDefaults, SuccessLog};
use tempfile::TempDir;

fn open(dir: &TempDir, length: usize) -> ProgressStore {
    let defaults = SessionDefaults::new(Combination::zero(length, 10).expect("valid zero"));
    ProgressStore::new(dir.path().join("progress.json"), defaults)
        .with_success_log(SuccessLog::new(dir.path().join("successes.log")))
}

/// Deliver `n` guesses the way the runner does: count, then advance
fn attempt(state: EnumerationState, n: usize) -> EnumerationState {
    (0..n).fold(state, |s, _| s.record_attempt().advance())
}

#[test]
fn test_resume_after_restart_continues_sequence() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let store = open(&dir, 4);
    let mut session = store.load();
    assert_eq!(session.state.combination.to_string(), "0000");
    session.state = attempt(session.state, 12);
    store.save(&session).expect("save failed");
    drop(store);

    let store = open(&dir, 4);
    let mut session = store.load();
    assert_eq!(session.state.combination.to_string(), "0012");
    assert_eq!(session.state.attempt_count, 12);

    session.state = attempt(session.state, 3);
    assert_eq!(session.state.combination.to_string(), "0015");
    assert_eq!(session.state.attempt_count, 15);
}

#[test]
fn test_unsaved_attempts_are_replayed_not_skipped() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let store = open(&dir, 4);
    let mut session = store.load();
    session.state = attempt(session.state, 5);
    store.save(&session).expect("save failed");

    // Crash before the next save
    session.state = attempt(session.state, 7);
    drop(session);

    let session = open(&dir, 4).load();
    assert_eq!(session.state.combination.to_string(), "0005");
    assert_eq!(session.state.attempt_count, 5);
}

#[test]
fn test_successes_survive_restart_and_reset_keeps_calibration() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let store = open(&dir, 2);
    let mut session = store.load();
    session.calibration.input_field_pos = Some([640, 360]);
    session.state = attempt(session.state, 43);
    assert!(store.record_success(&mut session, "42"));
    store.save(&session).expect("save failed");

    let store = open(&dir, 2);
    let session = store.load();
    assert_eq!(session.success_combinations(), vec!["42"]);
    assert!(session.successes[0].discovered_at.is_some());

    let entries = store
        .success_log()
        .expect("success log configured")
        .entries()
        .expect("log readable");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "42");

    let session = store.reset(None).expect("reset failed");
    assert_eq!(session.state.combination.to_string(), "00");
    assert_eq!(session.state.attempt_count, 0);
    assert!(session.successes.is_empty());
    assert_eq!(session.calibration.input_field_pos, Some([640, 360]));
}

#[test]
fn test_full_space_exhausts_and_stays_exhausted_after_restart() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let store = open(&dir, 2);
    let mut session = store.load();
    session.state = attempt(session.state, 100);
    assert!(session.state.exhausted);
    store.save(&session).expect("save failed");

    let session = open(&dir, 2).load();
    assert!(session.state.exhausted);
    assert_eq!(session.state.attempt_count, 100);
    assert_eq!(session.state.remaining(), 0);
}
