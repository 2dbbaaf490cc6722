// SPDX-License-Identifier: MIT

//! Enqueued job and worker records (spec §3) and the job-record state
//! machine (spec §3 "State machine for a job record"). Only backend
//! crates construct and mutate these; `jobs-runtime` only ever reads a
//! snapshot or asks a backend to mutate one on its behalf.

use crate::id::{JobId, WorkerId};
use crate::scope::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Bound on `JobRecord::logs` (SPEC_FULL §2.2): the oldest entries are
/// dropped once a record accumulates more than this many.
pub const MAX_LOG_ENTRIES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
    Paused,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// The record a backend owns for one enqueued job (spec §3). Field names
/// are `snake_case` in Rust; the durable backend re-derives the `camelCase`
/// wire shape only where an external protocol requires it, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub queue: String,
    pub status: JobStatus,
    pub progress: u8,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub input: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub logs: VecDeque<LogEntry>,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        name: impl Into<String>,
        queue: impl Into<String>,
        input: Value,
        max_attempts: u32,
        priority: i64,
        status: JobStatus,
        created_at: DateTime<Utc>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            queue: queue.into(),
            status,
            progress: 0,
            attempts_made: 0,
            max_attempts,
            priority,
            created_at,
            started_at: None,
            completed_at: None,
            input,
            result: None,
            error: None,
            metadata,
            logs: VecDeque::new(),
        }
    }

    fn push_log(&mut self, now: DateTime<Utc>, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry { timestamp: now, level, message: message.into() });
    }

    /// `delayed → waiting` once the delay has elapsed.
    pub fn promote(&mut self) {
        debug_assert!(
            matches!(self.status, JobStatus::Delayed),
            "promote() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Waiting;
    }

    /// `waiting → active`, incrementing the attempt counter.
    pub fn claim(&mut self, now: DateTime<Utc>) {
        debug_assert!(
            matches!(self.status, JobStatus::Waiting),
            "claim() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Active;
        self.started_at = Some(now);
        self.attempts_made += 1;
        self.push_log(now, LogLevel::Info, "started");
    }

    /// `active → completed`.
    pub fn complete(&mut self, now: DateTime<Utc>, result: Value) {
        debug_assert!(
            matches!(self.status, JobStatus::Active),
            "complete() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.completed_at = Some(now);
    }

    /// `active → waiting` (retryable) or `active → failed` (final attempt),
    /// chosen by comparing `attempts_made` to `max_attempts`. Returns
    /// `true` when this was the final attempt.
    pub fn fail(&mut self, now: DateTime<Utc>, error: impl Into<String>) -> bool {
        debug_assert!(
            matches!(self.status, JobStatus::Active),
            "fail() called on a record in {:?}",
            self.status
        );
        let error = error.into();
        self.push_log(now, LogLevel::Error, error.clone());
        self.error = Some(error);
        if self.attempts_made < self.max_attempts {
            self.status = JobStatus::Waiting;
            false
        } else {
            self.status = JobStatus::Failed;
            self.completed_at = Some(now);
            true
        }
    }

    pub fn set_progress(&mut self, now: DateTime<Utc>, progress: u8, message: Option<&str>) {
        self.progress = progress.min(100);
        if let Some(message) = message {
            self.push_log(now, LogLevel::Debug, message);
        }
    }

    /// `waiting → paused` when the queue or job type is paused.
    pub fn pause(&mut self) {
        debug_assert!(
            matches!(self.status, JobStatus::Waiting),
            "pause() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Paused;
    }

    /// `paused → waiting` when the queue or job type resumes.
    pub fn resume(&mut self) {
        debug_assert!(
            matches!(self.status, JobStatus::Paused),
            "resume() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Waiting;
    }

    /// Operator-initiated retry from `failed → waiting`. Resets
    /// `attempts_made` to 0 (see SPEC_FULL §9's documented resolution of
    /// the attempt-counter ambiguity).
    pub fn retry(&mut self) {
        debug_assert!(
            matches!(self.status, JobStatus::Failed),
            "retry() called on a record in {:?}",
            self.status
        );
        self.status = JobStatus::Waiting;
        self.attempts_made = 0;
        self.error = None;
        self.completed_at = None;
    }
}

/// Running counters tracked on a worker handle (spec §4.5 `getMetrics`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub processed: u64,
    pub failed: u64,
    pub total_duration_ms: u64,
}

impl WorkerMetrics {
    pub fn avg_duration_ms(&self) -> f64 {
        let total = self.processed + self.failed;
        if total == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub queues: Vec<String>,
    pub concurrency: u32,
    pub paused: bool,
    pub closed: bool,
    pub started_at: DateTime<Utc>,
    pub metrics: WorkerMetrics,
}

impl WorkerRecord {
    pub fn new(id: WorkerId, queues: Vec<String>, concurrency: u32, started_at: DateTime<Utc>) -> Self {
        Self { id, queues, concurrency, paused: false, closed: false, started_at, metrics: WorkerMetrics::default() }
    }

    pub fn uptime_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_milliseconds().max(0)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
