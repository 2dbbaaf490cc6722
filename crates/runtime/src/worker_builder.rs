// SPDX-License-Identifier: MIT

//! `runtime.worker().addQueue(...).start()` (spec §6.1 "Worker builder").
//! Defaults come from `withWorkerDefaults` but any setter here overrides
//! them for this one worker.

use crate::runtime::Runtime;
use jobs_core::backend::{WorkerFailureHook, WorkerIdleHook, WorkerLifecycleHook};
use jobs_core::{Backend, JobsError, LimiterConfig, Result, WorkerConfig, WorkerHandle};
use std::sync::Arc;

pub struct WorkerBuilder<B: Backend> {
    runtime: Arc<Runtime<B>>,
    queues: Vec<String>,
    concurrency: u32,
    limiter: Option<LimiterConfig>,
    on_active: Option<WorkerLifecycleHook>,
    on_success: Option<WorkerLifecycleHook>,
    on_failure: Option<WorkerFailureHook>,
    on_idle: Option<WorkerIdleHook>,
}

impl<B: Backend> WorkerBuilder<B> {
    pub(crate) fn new(runtime: Arc<Runtime<B>>) -> Self {
        let defaults = &runtime.inner.worker_defaults;
        let concurrency = defaults.concurrency.unwrap_or(1);
        let limiter = defaults.limiter;
        Self { runtime, queues: Vec::new(), concurrency, limiter, on_active: None, on_success: None, on_failure: None, on_idle: None }
    }

    /// Only queues registered on this runtime may be attached (spec §4.5).
    pub fn add_queue(mut self, name: &str) -> Result<Self> {
        if !self.runtime.inner.queue_names.iter().any(|q| q == name) {
            return Err(JobsError::QueueNotFound(name.to_string()));
        }
        if !self.queues.iter().any(|q| q == name) {
            self.queues.push(name.to_string());
        }
        Ok(self)
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Result<Self> {
        if concurrency == 0 {
            return Err(JobsError::ConfigurationInvalid("worker concurrency must be greater than zero".into()));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_limiter(mut self, limiter: LimiterConfig) -> Result<Self> {
        if limiter.max == 0 || limiter.duration_ms == 0 {
            return Err(JobsError::ConfigurationInvalid("limiter max and duration must be greater than zero".into()));
        }
        self.limiter = Some(limiter);
        Ok(self)
    }

    pub fn on_active(mut self, hook: WorkerLifecycleHook) -> Self {
        self.on_active = Some(hook);
        self
    }

    pub fn on_success(mut self, hook: WorkerLifecycleHook) -> Self {
        self.on_success = Some(hook);
        self
    }

    pub fn on_failure(mut self, hook: WorkerFailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    pub fn on_idle(mut self, hook: WorkerIdleHook) -> Self {
        self.on_idle = Some(hook);
        self
    }

    pub async fn start(self) -> Result<Arc<dyn WorkerHandle>> {
        let config = WorkerConfig {
            queues: self.queues,
            concurrency: self.concurrency,
            limiter: self.limiter,
            on_active: self.on_active,
            on_success: self.on_success,
            on_failure: self.on_failure,
            on_idle: self.on_idle,
        };
        self.runtime.inner.backend.create_worker(config).await
    }
}

#[cfg(test)]
#[path = "worker_builder_tests.rs"]
mod tests;
