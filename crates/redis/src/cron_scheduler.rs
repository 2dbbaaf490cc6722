// SPDX-License-Identifier: MIT

//! Cron-driving background loop (spec §4.7, §9 "jobs-redis drives
//! repeated schedules"). One task per registered cron definition:
//! computes the next fire time with [`crate::cron`], sleeps until due,
//! invokes the handler, and persists `next_fire_ms`/`exec_count` in
//! Redis so a restart resumes the schedule rather than replaying it.

use crate::cron::{next_fire_after, parse_schedule};
use crate::error::from_redis;
use crate::keys::cron_state_key;
use chrono::{DateTime, Utc};
use jobs_core::{CronDefinition, JobContext, JobId};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

struct CronState {
    next_fire_ms: Option<i64>,
    exec_count: u32,
}

async fn load_state(conn: &mut ConnectionManager, queue: &str, name: &str) -> CronState {
    let key = cron_state_key(queue, name);
    let next_fire_ms: Option<i64> = conn.hget(&key, "next_fire_ms").await.ok().flatten();
    let exec_count: u32 = conn.hget(&key, "exec_count").await.ok().flatten().unwrap_or(0);
    CronState { next_fire_ms, exec_count }
}

async fn save_state(conn: &mut ConnectionManager, queue: &str, name: &str, state: &CronState) -> jobs_core::Result<()> {
    let key = cron_state_key(queue, name);
    let _: () = conn
        .hset_multiple(&key, &[("exec_count", state.exec_count.to_string())])
        .await
        .map_err(from_redis)?;
    if let Some(next) = state.next_fire_ms {
        let _: () = conn.hset(&key, "next_fire_ms", next).await.map_err(from_redis)?;
    }
    Ok(())
}

/// Drives one cron definition until the task is aborted (on backend
/// shutdown) or the schedule is exhausted (`max_executions`/`end_date`).
pub async fn run(conn: ConnectionManager, queue: String, name: String, def: Arc<CronDefinition>, clock: Arc<dyn jobs_core::Clock>) {
    let mut conn = conn;
    let Ok(schedule) = parse_schedule(&def.cron) else { return };

    loop {
        let state = load_state(&mut conn, &queue, &name).await;
        if let Some(max) = def.max_executions {
            if state.exec_count >= max {
                return;
            }
        }

        let now = clock.now();
        let next = match state.next_fire_ms {
            Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(now),
            None => {
                let start = def.start_date.unwrap_or(now) - chrono::Duration::milliseconds(1);
                match next_fire_after(&schedule, start, def.end_date, def.tz.as_deref(), &def.filters) {
                    Some(next) => next,
                    None => return,
                }
            }
        };

        let delay = (next - clock.now()).num_milliseconds().max(0) as u64;
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;

        let job_id = JobId::new();
        let ctx = JobContext::new(job_id, queue.clone(), name.clone(), 1, 1, None, Arc::new(|_, _| {}));
        let _ = (def.handler)(ctx).await;

        let next_scheduled = next_fire_after(&schedule, next, def.end_date, def.tz.as_deref(), &def.filters);
        let state = CronState { next_fire_ms: next_scheduled.map(|d| d.timestamp_millis()), exec_count: state.exec_count + 1 };
        let _ = save_state(&mut conn, &queue, &name, &state).await;

        if next_scheduled.is_none() {
            return;
        }
    }
}
