// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn at_in_the_past_is_rejected() {
    let now = Utc::now();
    let params = ScheduleParams { at: Some(now - chrono::Duration::seconds(1)), ..ScheduleParams::new(DispatchParams::new("q", "j", Value::Null)) };
    assert!(matches!(params.validate(now), Err(JobsError::InvalidSchedule(_))));
}

#[test]
fn cron_and_every_are_mutually_exclusive() {
    let now = Utc::now();
    let params = ScheduleParams {
        cron: Some("0 9 * * *".into()),
        every_ms: Some(1000),
        ..ScheduleParams::new(DispatchParams::new("q", "j", Value::Null))
    };
    assert!(params.validate(now).is_err());
}

#[test]
fn future_at_without_cron_or_every_is_valid() {
    let now = Utc::now();
    let params = ScheduleParams { at: Some(now + chrono::Duration::seconds(60)), ..ScheduleParams::new(DispatchParams::new("q", "j", Value::Null)) };
    assert!(params.validate(now).is_ok());
}
