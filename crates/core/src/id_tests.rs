// SPDX-License-Identifier: MIT

use super::*;
use std::collections::HashSet;

#[test]
fn new_id_has_stable_prefix() {
    let id = JobId::new();
    assert!(id.as_str().starts_with("job_"));
}

#[test]
fn ids_are_unique_under_rapid_generation() {
    let mut seen = HashSet::new();
    for _ in 0..2000 {
        assert!(seen.insert(JobId::new().as_str().to_string()));
    }
}

#[test]
fn from_string_round_trips() {
    let id = JobId::from_string("job_abc123");
    assert_eq!(id.as_str(), "job_abc123");
    assert_eq!(id.to_string(), "job_abc123");
}

#[test]
fn suffix_strips_prefix() {
    let id = WorkerId::from_string("wrk_xyz");
    assert_eq!(id.suffix(), "xyz");
}

#[test]
fn different_id_kinds_have_distinct_prefixes() {
    assert_ne!(JobId::PREFIX, WorkerId::PREFIX);
    assert_ne!(WorkerId::PREFIX, CronId::PREFIX);
}
