// SPDX-License-Identifier: MIT

//! Redis key naming. One namespace per queue, rooted at
//! [`jobs_core::queue_name`] so keys stay consistent with the event
//! channel naming in [`jobs_core::prefix`].

use jobs_core::queue_name;

pub struct QueueKeys {
    pub waiting: String,
    pub delayed: String,
    pub active: String,
    pub failed: String,
    pub data: String,
    /// String flag key, present ("1") iff the queue is paused.
    pub paused_flag: String,
    /// Ids parked here while the queue is paused (spec §3 `paused` status).
    pub paused_jobs: String,
}

impl QueueKeys {
    pub fn new(queue: &str) -> Self {
        let root = queue_name(queue);
        Self {
            waiting: format!("{root}:waiting"),
            delayed: format!("{root}:delayed"),
            active: format!("{root}:active"),
            failed: format!("{root}:failed"),
            data: format!("{root}:data"),
            paused_flag: format!("{root}:paused"),
            paused_jobs: format!("{root}:paused_jobs"),
        }
    }
}

/// Registry key under which every known queue name is tracked (so
/// `list_queues`/`search_queues` don't need `KEYS *`).
pub fn registry_key() -> String {
    format!("{}:registry:queues", jobs_core::BASE_PREFIX)
}

/// Hash holding one cron task's `next_fire_ms`/`exec_count` (spec §4.7's
/// cron engine tracks these durably so a restart resumes the schedule).
pub fn cron_state_key(queue: &str, name: &str) -> String {
    format!("{}:cron:{name}", queue_name(queue))
}
