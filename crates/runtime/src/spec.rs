// SPDX-License-Identifier: MIT

//! Raw per-job/per-cron configuration accumulated by [`crate::queue_builder::QueueBuilder`]
//! (spec §6.1 `IgniterQueue.addJob`/`addCron`). A [`JobSpec`]/[`CronSpec`]
//! is not yet a `jobs_core::JobDefinition` — its handler still needs the
//! application context type `C`, which is only known once
//! [`crate::runtime::RuntimeBuilder::with_context`] supplies a
//! [`ContextFactory`]. `Runtime::build` does that wrapping (see
//! `crate::wrap`), producing the core `JobDefinition`/`CronDefinition`
//! actually registered with the backend.

use jobs_core::definition::{FailureHook, ProgressHook, StartHook, SuccessHook};
use jobs_core::{BackoffPolicy, CronFilters, JobContext, JobFuture, JobsError, LimiterConfig, Metadata, RemovePolicy, Result, Validator};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Materialises one application-context value per handler invocation.
/// Spec §4.10: "fresh from the `contextFactory` on every attempt".
pub type ContextFactory<C> = Arc<dyn Fn() -> JobFuture<Result<C>> + Send + Sync>;

pub type UserJobHandler<C> = Arc<dyn Fn(JobContext, C, Value) -> JobFuture<Result<Value>> + Send + Sync>;
pub type UserCronHandler<C> = Arc<dyn Fn(JobContext, C) -> JobFuture<Result<()>> + Send + Sync>;

/// Per-queue partial defaults (spec §6.1 `withQueueDefaults`), applied to
/// any [`JobSpec`]/[`CronSpec`] field left unset by the caller.
#[derive(Clone, Default)]
pub struct QueueDefaults {
    pub attempts: Option<u32>,
    pub priority: Option<i64>,
    pub delay_ms: Option<u64>,
    pub remove_on_complete: Option<RemovePolicy>,
    pub remove_on_fail: Option<RemovePolicy>,
    pub backoff: Option<BackoffPolicy>,
    pub limiter: Option<LimiterConfig>,
}

/// Per-worker partial defaults (spec §6.1 `withWorkerDefaults`).
#[derive(Clone, Default)]
pub struct WorkerDefaults {
    pub concurrency: Option<u32>,
    pub limiter: Option<LimiterConfig>,
}

pub struct JobSpec<C> {
    pub name: String,
    pub validator: Option<Arc<dyn Validator>>,
    pub handler: UserJobHandler<C>,
    pub attempts: Option<u32>,
    pub priority: Option<i64>,
    pub delay_ms: Option<u64>,
    pub remove_on_complete: Option<RemovePolicy>,
    pub remove_on_fail: Option<RemovePolicy>,
    pub metadata: Option<Metadata>,
    pub limiter: Option<LimiterConfig>,
    pub backoff: Option<BackoffPolicy>,
    pub on_start: Option<StartHook>,
    pub on_progress: Option<ProgressHook>,
    pub on_success: Option<SuccessHook>,
    pub on_failure: Option<FailureHook>,
}

impl<C> JobSpec<C> {
    pub fn new(name: impl Into<String>, handler: UserJobHandler<C>) -> Self {
        Self {
            name: name.into(),
            validator: None,
            handler,
            attempts: None,
            priority: None,
            delay_ms: None,
            remove_on_complete: None,
            remove_on_fail: None,
            metadata: None,
            limiter: None,
            backoff: None,
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
        self.attempts = Some(attempts);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn remove_on_complete(mut self, policy: impl Into<RemovePolicy>) -> Self {
        self.remove_on_complete = Some(policy.into());
        self
    }

    pub fn remove_on_fail(mut self, policy: impl Into<RemovePolicy>) -> Self {
        self.remove_on_fail = Some(policy.into());
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
        self.backoff = Some(backoff);
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

    /// Apply unset fields from `defaults`, innermost-wins.
    pub(crate) fn apply_defaults(&mut self, defaults: &QueueDefaults) {
        self.attempts = self.attempts.or(defaults.attempts);
        self.priority = self.priority.or(defaults.priority);
        self.delay_ms = self.delay_ms.or(defaults.delay_ms);
        self.remove_on_complete = self.remove_on_complete.or(defaults.remove_on_complete);
        self.remove_on_fail = self.remove_on_fail.or(defaults.remove_on_fail);
        self.backoff = self.backoff.or(defaults.backoff);
        self.limiter = self.limiter.or(defaults.limiter);
    }
}

pub struct CronSpec<C> {
    pub name: String,
    pub cron: String,
    pub tz: Option<String>,
    pub max_executions: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub filters: CronFilters,
    pub handler: UserCronHandler<C>,
    pub on_failure: Option<FailureHook>,
}

impl<C> CronSpec<C> {
    pub fn new(name: impl Into<String>, cron: impl Into<String>, handler: UserCronHandler<C>) -> Self {
        Self {
            name: name.into(),
            cron: cron.into(),
            tz: None,
            max_executions: None,
            start_date: None,
            end_date: None,
            filters: CronFilters::default(),
            handler,
            on_failure: None,
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

    pub fn on_failure(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }
}

/// `cron`'s own `Schedule::from_str` is the single source of truth for
/// "is this a valid expression" — no separate validation crate needed.
pub(crate) fn validate_cron_expr(expr: &str) -> Result<()> {
    expr.parse::<cron::Schedule>().map(|_| ()).map_err(|e| JobsError::InvalidCron(e.to_string()))
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
