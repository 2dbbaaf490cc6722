// SPDX-License-Identifier: MIT

//! Lifecycle events (spec §3, §6.4): one event per job/cron phase,
//! published on the pub/sub channel built by [`crate::prefix`].

use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enqueued,
    Scheduled,
    Started,
    Progress,
    Completed,
    Failed,
    Retrying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Enqueued => "enqueued",
            Phase::Scheduled => "scheduled",
            Phase::Started => "started",
            Phase::Progress => "progress",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
            Phase::Retrying => "retrying",
        };
        f.write_str(s)
    }
}

/// `"<queue>:<job>:<phase>"`, e.g. `"email:sendWelcome:completed"`.
pub fn event_type(queue: &str, job: &str, phase: Phase) -> String {
    format!("{queue}:{job}:{phase}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

impl LifecycleEvent {
    pub fn new(
        queue: &str,
        job: &str,
        phase: Phase,
        data: Value,
        timestamp: DateTime<Utc>,
        scope: Option<Scope>,
    ) -> Self {
        Self { event_type: event_type(queue, job, phase), data, timestamp, scope }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
