// SPDX-License-Identifier: MIT

//! Job and cron definitions and the frozen queue shape they live in
//! (spec §3 "Job definition" / "Cron definition" / "Queue", builder
//! surface in spec §6.1). Accumulation and name-uniqueness validation
//! happen in `jobs-runtime`'s `QueueBuilder`; this module only owns the
//! shapes.

use crate::backoff::BackoffPolicy;
use crate::error::JobsError;
use crate::id::JobId;
use crate::scope::{Metadata, Scope};
use crate::validate::Validator;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type JobFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Backend-supplied invocation metadata handed to a job or cron handler.
/// The application context itself is *not* carried here: per spec §4.10
/// it is materialised fresh from the `contextFactory` on every attempt by
/// the wrapper `jobs-runtime` builds around the user's handler, and
/// passed directly into that handler — the backend never sees it.
///
/// `Clone` is cheap (an id, two strings, a copied scope, an `Arc` closure)
/// and lets `jobs-runtime` hand a copy to lifecycle hooks while the
/// original continues on into the handler.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub queue: String,
    pub name: String,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub scope: Option<Scope>,
    report_progress: Arc<dyn Fn(u8, Option<String>) + Send + Sync>,
}

impl JobContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: JobId,
        queue: impl Into<String>,
        name: impl Into<String>,
        attempts_made: u32,
        max_attempts: u32,
        scope: Option<Scope>,
        report_progress: Arc<dyn Fn(u8, Option<String>) + Send + Sync>,
    ) -> Self {
        Self {
            job_id,
            queue: queue.into(),
            name: name.into(),
            attempts_made,
            max_attempts,
            scope,
            report_progress,
        }
    }

    pub fn report_progress(&self, progress: u8, message: Option<String>) {
        (self.report_progress)(progress.min(100), message);
    }
}

pub type JobHandler = Arc<dyn Fn(JobContext, Value) -> JobFuture<Result<Value, JobsError>> + Send + Sync>;
pub type CronHandler = Arc<dyn Fn(JobContext) -> JobFuture<Result<(), JobsError>> + Send + Sync>;

pub type StartHook = Arc<dyn Fn(&JobContext) + Send + Sync>;
pub type ProgressHook = Arc<dyn Fn(&JobContext, u8, Option<&str>) + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(&JobContext, &Value) + Send + Sync>;
pub type FailureHook = Arc<dyn Fn(&JobContext, &JobsError) + Send + Sync>;

/// `removeOnComplete`/`removeOnFail`: either a bool or a keep-N count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovePolicy {
    Keep,
    Always,
    KeepLast(u32),
}

impl Default for RemovePolicy {
    fn default() -> Self {
        RemovePolicy::Keep
    }
}

impl From<bool> for RemovePolicy {
    fn from(value: bool) -> Self {
        if value {
            RemovePolicy::Always
        } else {
            RemovePolicy::Keep
        }
    }
}

impl From<u32> for RemovePolicy {
    fn from(value: u32) -> Self {
        RemovePolicy::KeepLast(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    pub max: u32,
    pub duration_ms: u64,
}

/// A registered job (spec §3 "Job definition"). Constructed via
/// [`JobDefinition::new`] and the fluent setters, mirroring the builder
/// surface in spec §6.1.
pub struct JobDefinition {
    pub name: String,
    pub validator: Option<Arc<dyn Validator>>,
    pub handler: JobHandler,
    pub attempts: u32,
    pub priority: i64,
    pub delay_ms: u64,
    pub remove_on_complete: RemovePolicy,
    pub remove_on_fail: RemovePolicy,
    pub metadata: Option<Metadata>,
    pub limiter: Option<LimiterConfig>,
    pub backoff: BackoffPolicy,
    pub on_start: Option<StartHook>,
    pub on_progress: Option<ProgressHook>,
    pub on_success: Option<SuccessHook>,
    pub on_failure: Option<FailureHook>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, handler: JobHandler) -> Self {
        Self {
            name: name.into(),
            validator: None,
            handler,
            attempts: 3,
            priority: 0,
            delay_ms: 0,
            remove_on_complete: RemovePolicy::default(),
            remove_on_fail: RemovePolicy::default(),
            metadata: None,
            limiter: None,
            backoff: BackoffPolicy::default(),
            on_start: None,
            on_progress: None,
            on_success: None,
            on_failure: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn remove_on_complete(mut self, policy: impl Into<RemovePolicy>) -> Self {
        self.remove_on_complete = policy.into();
        self
    }

    pub fn remove_on_fail(mut self, policy: impl Into<RemovePolicy>) -> Self {
        self.remove_on_fail = policy.into();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn limiter(mut self, limiter: LimiterConfig) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn on_start(mut self, hook: StartHook) -> Self {
        self.on_start = Some(hook);
        self
    }

    pub fn on_progress(mut self, hook: ProgressHook) -> Self {
        self.on_progress = Some(hook);
        self
    }

    pub fn on_success(mut self, hook: SuccessHook) -> Self {
        self.on_success = Some(hook);
        self
    }

    pub fn on_failure(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusinessHours {
    pub start: String,
    pub end: String,
    pub timezone: Option<String>,
}

/// Advanced cron filters (spec §3 "Cron definition").
#[derive(Debug, Clone, Default)]
pub struct CronFilters {
    pub skip_weekends: bool,
    pub only_business_hours: Option<BusinessHours>,
    pub only_weekdays: Option<Vec<u8>>,
    pub skip_dates: Vec<NaiveDate>,
}

pub struct CronDefinition {
    pub name: String,
    pub cron: String,
    pub tz: Option<String>,
    pub max_executions: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub filters: CronFilters,
    pub handler: CronHandler,
}

impl CronDefinition {
    pub fn new(name: impl Into<String>, cron: impl Into<String>, handler: CronHandler) -> Self {
        Self {
            name: name.into(),
            cron: cron.into(),
            tz: None,
            max_executions: None,
            start_date: None,
            end_date: None,
            filters: CronFilters::default(),
            handler,
        }
    }

    pub fn tz(mut self, tz: impl Into<String>) -> Self {
        self.tz = Some(tz.into());
        self
    }

    pub fn max_executions(mut self, max_executions: u32) -> Self {
        self.max_executions = Some(max_executions);
        self
    }

    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn filters(mut self, filters: CronFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Frozen queue shape: no two jobs share a name, no job name equals a
/// cron name (enforced by `QueueBuilder` in `jobs-runtime`).
pub struct QueueDef {
    pub name: String,
    pub jobs: HashMap<String, Arc<JobDefinition>>,
    pub crons: HashMap<String, Arc<CronDefinition>>,
}

impl QueueDef {
    pub fn new(name: impl Into<String>, jobs: HashMap<String, Arc<JobDefinition>>, crons: HashMap<String, Arc<CronDefinition>>) -> Self {
        Self { name: name.into(), jobs, crons }
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
