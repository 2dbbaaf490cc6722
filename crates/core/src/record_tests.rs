// SPDX-License-Identifier: MIT

use super::*;
use crate::id::JobId;
use chrono::Utc;

fn new_record(max_attempts: u32) -> JobRecord {
    JobRecord::new(
        JobId::new(),
        "send-welcome",
        "email",
        serde_json::json!({}),
        max_attempts,
        0,
        JobStatus::Waiting,
        Utc::now(),
        None,
    )
}

#[test]
fn claim_increments_attempts_and_sets_started_at() {
    let mut r = new_record(3);
    r.claim(Utc::now());
    assert_eq!(r.status, JobStatus::Active);
    assert_eq!(r.attempts_made, 1);
    assert!(r.started_at.is_some());
    assert_eq!(r.logs.len(), 1);
}

#[test]
fn complete_sets_terminal_fields() {
    let mut r = new_record(3);
    r.claim(Utc::now());
    r.complete(Utc::now(), serde_json::json!({ "ok": true }));
    assert_eq!(r.status, JobStatus::Completed);
    assert_eq!(r.progress, 100);
    assert!(r.status.is_terminal());
}

#[test]
fn fail_reverts_to_waiting_before_final_attempt() {
    let mut r = new_record(3);
    r.claim(Utc::now());
    let is_final = r.fail(Utc::now(), "boom");
    assert!(!is_final);
    assert_eq!(r.status, JobStatus::Waiting);
    assert_eq!(r.attempts_made, 1);
}

#[test]
fn fail_on_last_attempt_is_terminal() {
    let mut r = new_record(1);
    r.claim(Utc::now());
    let is_final = r.fail(Utc::now(), "boom");
    assert!(is_final);
    assert_eq!(r.status, JobStatus::Failed);
    assert!(r.completed_at.is_some());
}

#[test]
fn retry_resets_attempts_made() {
    let mut r = new_record(1);
    r.claim(Utc::now());
    r.fail(Utc::now(), "boom");
    assert_eq!(r.status, JobStatus::Failed);
    r.retry();
    assert_eq!(r.status, JobStatus::Waiting);
    assert_eq!(r.attempts_made, 0);
    assert!(r.error.is_none());
}

#[test]
fn logs_are_capped_at_max_entries() {
    let mut r = new_record(1);
    for _ in 0..(MAX_LOG_ENTRIES + 50) {
        r.push_log(Utc::now(), LogLevel::Debug, "tick");
    }
    assert_eq!(r.logs.len(), MAX_LOG_ENTRIES);
}

#[test]
#[should_panic]
fn claim_panics_when_not_waiting_in_debug() {
    let mut r = new_record(3);
    r.claim(Utc::now());
    r.claim(Utc::now());
}
