// SPDX-License-Identifier: MIT

//! The one interface every persistence/transport concern lives behind
//! (spec §4.5). `jobs-memory` and `jobs-redis` each implement [`Backend`];
//! `jobs-runtime` never talks to either directly.

use crate::definition::{CronDefinition, CronFilters, JobDefinition, LimiterConfig};
use crate::definition::{JobFuture, RemovePolicy};
use crate::error::{JobsError, Result};
use crate::event::LifecycleEvent;
use crate::id::{JobId, WorkerId};
use crate::record::{JobRecord, JobStatus, LogEntry, WorkerRecord};
use crate::scope::{Metadata, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Parameters for `dispatch` (spec §6.2).
#[derive(Clone)]
pub struct DispatchParams {
    pub queue: String,
    pub name: String,
    pub input: Value,
    pub scope: Option<Scope>,
    pub job_id: Option<JobId>,
    pub priority: Option<i64>,
    pub delay_ms: Option<u64>,
    pub attempts: Option<u32>,
    pub remove_on_complete: Option<RemovePolicy>,
    pub remove_on_fail: Option<RemovePolicy>,
    pub metadata: Option<Metadata>,
    pub limiter: Option<LimiterConfig>,
}

impl DispatchParams {
    pub fn new(queue: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            queue: queue.into(),
            name: name.into(),
            input,
            scope: None,
            job_id: None,
            priority: None,
            delay_ms: None,
            attempts: None,
            remove_on_complete: None,
            remove_on_fail: None,
            metadata: None,
            limiter: None,
        }
    }
}

/// Parameters for `schedule`, extending dispatch with the advanced
/// scheduling options from spec §6.2.
#[derive(Clone)]
pub struct ScheduleParams {
    pub dispatch: DispatchParams,
    pub at: Option<DateTime<Utc>>,
    pub cron: Option<String>,
    pub every_ms: Option<u64>,
    pub max_executions: Option<u32>,
    pub tz: Option<String>,
    pub filters: CronFilters,
}

impl ScheduleParams {
    pub fn new(dispatch: DispatchParams) -> Self {
        Self { dispatch, at: None, cron: None, every_ms: None, max_executions: None, tz: None, filters: CronFilters::default() }
    }

    /// `at` must be in the future; `cron` and `every` are mutually
    /// exclusive (spec §6.2).
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if let Some(at) = self.at {
            if at <= now {
                return Err(JobsError::InvalidSchedule("`at` must be in the future".into()));
            }
        }
        if self.cron.is_some() && self.every_ms.is_some() {
            return Err(JobsError::InvalidSchedule("`cron` and `every` are mutually exclusive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub name: String,
    pub paused: bool,
    pub job_names: Vec<String>,
    pub cron_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub paused: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub status: Vec<JobStatus>,
    pub older_than_ms: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct JobSearchFilter {
    pub queue: Option<String>,
    pub name: Option<String>,
    pub status: Option<JobStatus>,
    pub scope: Option<Scope>,
}

pub type WorkerLifecycleHook = Arc<dyn Fn(&JobRecord) + Send + Sync>;
pub type WorkerFailureHook = Arc<dyn Fn(&JobRecord, &JobsError) + Send + Sync>;
pub type WorkerIdleHook = Arc<dyn Fn() + Send + Sync>;

pub struct WorkerConfig {
    pub queues: Vec<String>,
    pub concurrency: u32,
    pub limiter: Option<LimiterConfig>,
    pub on_active: Option<WorkerLifecycleHook>,
    pub on_success: Option<WorkerLifecycleHook>,
    pub on_failure: Option<WorkerFailureHook>,
    pub on_idle: Option<WorkerIdleHook>,
}

impl WorkerConfig {
    pub fn new(queues: Vec<String>) -> Self {
        Self { queues, concurrency: 1, limiter: None, on_active: None, on_success: None, on_failure: None, on_idle: None }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerMetricsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub avg_duration_ms: f64,
    pub concurrency: u32,
    pub uptime_ms: i64,
}

/// A running worker (spec §4.5 "Worker handle").
#[async_trait]
pub trait WorkerHandle: Send + Sync {
    fn id(&self) -> &WorkerId;
    fn queues(&self) -> &[String];
    async fn pause(&self);
    async fn resume(&self);
    async fn close(&self);
    fn is_running(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn metrics(&self) -> WorkerMetricsSnapshot;
}

pub type EventHandler = Arc<dyn Fn(LifecycleEvent) -> JobFuture<()> + Send + Sync>;
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Everything persistence- and transport-facing lives behind this trait
/// (spec §4.5's operation table). `jobs-memory` is the reference
/// implementation; `jobs-redis` is the durable one.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn register_job(&self, queue: &str, name: &str, def: Arc<JobDefinition>) -> Result<()>;
    async fn register_cron(&self, queue: &str, name: &str, def: Arc<CronDefinition>) -> Result<()>;

    async fn dispatch(&self, params: DispatchParams) -> Result<JobId>;
    async fn schedule(&self, params: ScheduleParams) -> Result<JobId>;

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>>;
    async fn get_job_state(&self, id: &JobId) -> Result<Option<JobStatus>>;
    async fn get_job_logs(&self, id: &JobId) -> Result<Vec<LogEntry>>;
    async fn get_job_progress(&self, id: &JobId) -> Result<Option<u8>>;

    async fn retry_job(&self, id: &JobId) -> Result<()>;
    async fn remove_job(&self, id: &JobId) -> Result<()>;
    async fn promote_job(&self, id: &JobId) -> Result<()>;
    async fn move_job_to_failed(&self, id: &JobId, error: String) -> Result<()>;
    async fn retry_many(&self, ids: &[JobId]) -> Result<()>;
    async fn remove_many(&self, ids: &[JobId]) -> Result<()>;

    async fn get_queue_info(&self, queue: &str) -> Result<QueueInfo>;
    async fn get_queue_job_counts(&self, queue: &str) -> Result<JobCounts>;
    async fn list_queues(&self) -> Result<Vec<String>>;
    async fn pause_queue(&self, queue: &str) -> Result<()>;
    async fn resume_queue(&self, queue: &str) -> Result<()>;
    async fn drain_queue(&self, queue: &str) -> Result<()>;
    async fn clean_queue(&self, queue: &str, options: CleanOptions) -> Result<u64>;
    async fn obliterate_queue(&self, queue: &str) -> Result<()>;
    async fn retry_all_in_queue(&self, queue: &str) -> Result<u64>;

    /// Backends that cannot implement a per-job-type gate must fail
    /// loudly with `QueueOperationFailed` rather than approximate it
    /// (spec §4.5, §9).
    async fn pause_job_type(&self, queue: &str, name: &str) -> Result<()>;
    async fn resume_job_type(&self, queue: &str, name: &str) -> Result<()>;

    async fn search_jobs(&self, filter: JobSearchFilter) -> Result<Vec<JobRecord>>;
    async fn search_queues(&self, name_contains: Option<&str>) -> Result<Vec<String>>;
    async fn search_workers(&self, queue: Option<&str>) -> Result<Vec<WorkerRecord>>;

    async fn create_worker(&self, config: WorkerConfig) -> Result<Arc<dyn WorkerHandle>>;
    async fn get_workers(&self) -> Result<Vec<Arc<dyn WorkerHandle>>>;

    async fn publish_event(&self, channel: &str, payload: LifecycleEvent) -> Result<()>;
    async fn subscribe_event(&self, channel: &str, handler: EventHandler) -> Result<Unsubscribe>;

    async fn shutdown(&self) -> Result<()>;
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
