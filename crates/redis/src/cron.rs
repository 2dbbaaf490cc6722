// SPDX-License-Identifier: MIT

//! Cron fire-time evaluation: parses the cron expression with the `cron`
//! crate and layers the advanced filters from spec §3 ("Cron definition")
//! on top, since none of those filters are expressible in cron syntax
//! itself.

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use cron::Schedule;
use jobs_core::{CronFilters, JobsError};
use std::str::FromStr;

pub fn parse_schedule(expr: &str) -> Result<Schedule, JobsError> {
    Schedule::from_str(expr).map_err(|e| JobsError::InvalidCron(e.to_string()))
}

/// The next fire time strictly after `after`, honouring `end_date` and the
/// advanced filters. `tz` names an IANA zone used to evaluate
/// weekday/business-hours filters in local time; unparseable or absent
/// zones fall back to UTC.
pub fn next_fire_after(
    schedule: &Schedule,
    after: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    tz: Option<&str>,
    filters: &CronFilters,
) -> Option<DateTime<Utc>> {
    let zone = tz.and_then(|name| name.parse::<chrono_tz::Tz>().ok());
    schedule
        .after(&after)
        .take_while(|candidate| end_date.map(|end| *candidate <= end).unwrap_or(true))
        .take(10_000)
        .find(|candidate| passes_filters(*candidate, zone, filters))
}

fn passes_filters(candidate: DateTime<Utc>, zone: Option<chrono_tz::Tz>, filters: &CronFilters) -> bool {
    let local = match zone {
        Some(zone) => candidate.with_timezone(&zone).naive_local(),
        None => candidate.naive_utc(),
    };

    if filters.skip_weekends {
        let weekday = local.weekday();
        if matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun) {
            return false;
        }
    }

    if let Some(allowed) = &filters.only_weekdays {
        let day = local.weekday().num_days_from_sunday() as u8;
        if !allowed.contains(&day) {
            return false;
        }
    }

    if filters.skip_dates.contains(&local.date()) {
        return false;
    }

    if let Some(hours) = &filters.only_business_hours {
        let (Some(start), Some(end)) = (parse_time(&hours.start), parse_time(&hours.end)) else {
            return true;
        };
        let time = local.time();
        if start <= end {
            if time < start || time > end {
                return false;
            }
        } else if time < start && time > end {
            // Wraps past midnight (e.g. 22:00-06:00): outside the gap is in range.
            return false;
        }
    }

    true
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Readiness of the very first scheduled fire, relative to `start_date`.
pub fn first_fire_at_or_after(schedule: &Schedule, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
    // `after` is exclusive, so step back a moment to include `start` itself.
    schedule.after(&(start - chrono::Duration::milliseconds(1))).next()
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
