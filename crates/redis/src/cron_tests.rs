// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;
use jobs_core::CronFilters;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn finds_the_next_minute_boundary() {
    let schedule = parse_schedule("0 * * * * *").unwrap();
    let after = at(2026, 1, 5, 10, 30);
    let next = next_fire_after(&schedule, after, None, None, &CronFilters::default()).unwrap();
    assert_eq!(next, at(2026, 1, 5, 10, 31));
}

#[test]
fn skip_weekends_moves_past_saturday_and_sunday() {
    let schedule = parse_schedule("0 0 9 * * *").unwrap();
    // 2026-01-02 is a Friday; the next midnight-anchored fire lands Saturday.
    let after = at(2026, 1, 2, 9, 0);
    let filters = CronFilters { skip_weekends: true, ..Default::default() };
    let next = next_fire_after(&schedule, after, None, None, &filters).unwrap();
    assert_eq!(next.weekday(), chrono::Weekday::Mon);
}

#[test]
fn respects_end_date() {
    let schedule = parse_schedule("0 * * * * *").unwrap();
    let after = at(2026, 1, 5, 10, 30);
    let end = at(2026, 1, 5, 10, 30);
    let next = next_fire_after(&schedule, after, Some(end), None, &CronFilters::default());
    assert!(next.is_none());
}

#[test]
fn skip_dates_excludes_a_specific_day() {
    let schedule = parse_schedule("0 0 9 * * *").unwrap();
    let after = at(2026, 1, 5, 0, 0);
    let filters = CronFilters { skip_dates: vec![at(2026, 1, 5, 9, 0).date_naive()], ..Default::default() };
    let next = next_fire_after(&schedule, after, None, None, &filters).unwrap();
    assert_eq!(next.day(), 6);
}
