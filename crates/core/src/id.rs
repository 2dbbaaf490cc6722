// SPDX-License-Identifier: MIT

//! Identifiers for jobs, workers, and cron tasks.
//!
//! Every ID is `{prefix}{19-char nanoid}`: unique under far more than
//! 1000 generations per millisecond (nanoid draws from a 64-symbol
//! alphabet), with a stable prefix so log lines and metrics can be
//! grepped by entity kind without parsing the suffix.

crate::define_id! {
    /// Identifies a single enqueued job instance.
    pub struct JobId("job_");
}

crate::define_id! {
    /// Identifies a worker handle created over one or more queues.
    pub struct WorkerId("wrk_");
}

crate::define_id! {
    /// Identifies a registered cron task.
    pub struct CronId("cron_");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
