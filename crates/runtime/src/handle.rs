// SPDX-License-Identifier: MIT

//! Typed proxy surface (spec §4.10, §6.1 "Proxy surface"):
//! `runtime.queue(name)` yields a [`QueueHandle`]; `queue.job(name)`
//! yields a [`JobHandle`]. Neither carries the application-context type
//! parameter — by the time a handle exists, every handler is already
//! wrapped into a plain `jobs_core::Backend` call.

use crate::runtime::Runtime;
use crate::wrap::{emit, publish};
use crate::worker_builder::WorkerBuilder;
use jobs_core::{
    merge_metadata_with_scope, Backend, CleanOptions, DispatchParams, EventHandler, JobId, JobRecord, JobSearchFilter,
    Level, LifecycleEvent, Phase, QueueInfo, Result, ScheduleParams, Unsubscribe,
};
use std::sync::Arc;

/// `runtime.queue(name)` (spec §4.10).
pub struct QueueHandle<B: Backend> {
    runtime: Arc<Runtime<B>>,
    name: String,
}

impl<B: Backend> QueueHandle<B> {
    pub(crate) fn new(runtime: Arc<Runtime<B>>, name: String) -> Self {
        Self { runtime, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// No existence check against the registered job-name set: a backend
    /// never validates job names at dispatch time either (spec §4.5) — an
    /// unregistered name simply fails at claim time with `NotRegistered`.
    pub fn job(&self, name: &str) -> JobHandle<B> {
        JobHandle { runtime: Arc::clone(&self.runtime), queue: self.name.clone(), name: name.to_string() }
    }

    pub fn worker(&self) -> Result<WorkerBuilder<B>> {
        self.runtime.worker().add_queue(&self.name)
    }

    pub async fn retrieve(&self) -> Result<QueueInfo> {
        self.runtime.inner.backend.get_queue_info(&self.name).await
    }

    pub async fn list(&self, mut filter: JobSearchFilter) -> Result<Vec<JobRecord>> {
        filter.queue = Some(self.name.clone());
        self.runtime.inner.backend.search_jobs(filter).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.runtime.inner.backend.pause_queue(&self.name).await?;
        emit(&self.runtime.inner, "igniter.jobs.queue.paused", serde_json::json!({ "queue": self.name }), Level::Debug);
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        self.runtime.inner.backend.resume_queue(&self.name).await?;
        emit(&self.runtime.inner, "igniter.jobs.queue.resumed", serde_json::json!({ "queue": self.name }), Level::Debug);
        Ok(())
    }

    pub async fn drain(&self) -> Result<()> {
        self.runtime.inner.backend.drain_queue(&self.name).await?;
        emit(&self.runtime.inner, "igniter.jobs.queue.drained", serde_json::json!({ "queue": self.name }), Level::Debug);
        Ok(())
    }

    pub async fn clean(&self, options: CleanOptions) -> Result<u64> {
        let removed = self.runtime.inner.backend.clean_queue(&self.name, options).await?;
        emit(
            &self.runtime.inner,
            "igniter.jobs.queue.cleaned",
            serde_json::json!({ "queue": self.name, "removed": removed }),
            Level::Debug,
        );
        Ok(removed)
    }

    pub async fn obliterate(&self) -> Result<()> {
        self.runtime.inner.backend.obliterate_queue(&self.name).await?;
        emit(&self.runtime.inner, "igniter.jobs.queue.obliterated", serde_json::json!({ "queue": self.name }), Level::Debug);
        Ok(())
    }

    pub async fn retry_all(&self) -> Result<u64> {
        self.runtime.inner.backend.retry_all_in_queue(&self.name).await
    }

    pub async fn subscribe(&self, handler: EventHandler) -> Result<Unsubscribe> {
        let prefix = format!("{}:", self.name);
        self.runtime.subscribe(prefix_filter(prefix, handler)).await
    }
}

/// `queue.job(name)` (spec §4.10).
pub struct JobHandle<B: Backend> {
    runtime: Arc<Runtime<B>>,
    queue: String,
    name: String,
}

impl<B: Backend> JobHandle<B> {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn base_params(&self, input: serde_json::Value) -> DispatchParams {
        DispatchParams::new(self.queue.clone(), self.name.clone(), input)
    }

    /// Dispatch path (spec §4.10 "Dispatch path"): validate input, resolve
    /// scope, merge metadata, call the backend, publish `"enqueued"`, emit
    /// telemetry.
    pub async fn dispatch(&self, input: serde_json::Value) -> Result<JobId> {
        self.dispatch_with(self.base_params(input)).await
    }

    /// Validates `input` against this job's declared schema, if any (spec
    /// §4.10, §8: a validation failure creates no record and emits no
    /// lifecycle event, so this runs before the backend is ever called).
    fn validate(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        match self.runtime.inner.validators.get(&(self.queue.clone(), self.name.clone())) {
            Some(validator) => validator.validate(input),
            None => Ok(input),
        }
    }

    pub async fn dispatch_with(&self, mut params: DispatchParams) -> Result<JobId> {
        params.queue = self.queue.clone();
        params.name = self.name.clone();
        params.input = self.validate(params.input)?;
        let scope = self.runtime.resolve_scope(params.scope.take())?;
        params.metadata = Some(merge_metadata_with_scope(params.metadata.take(), scope.as_ref()));
        params.scope = scope.clone();

        let id = self.runtime.inner.backend.dispatch(params).await?;
        self.publish_enqueued(&id, scope).await;
        Ok(id)
    }

    /// Schedule path (spec §4.10 "Schedule path"): same validation and
    /// scope resolution, then `backend.schedule`, publish `"scheduled"`.
    pub async fn schedule(&self, input: serde_json::Value) -> Result<JobId> {
        self.schedule_with(ScheduleParams::new(self.base_params(input))).await
    }

    pub async fn schedule_with(&self, mut params: ScheduleParams) -> Result<JobId> {
        params.dispatch.queue = self.queue.clone();
        params.dispatch.name = self.name.clone();
        params.dispatch.input = self.validate(params.dispatch.input)?;
        let scope = self.runtime.resolve_scope(params.dispatch.scope.take())?;
        params.dispatch.metadata = Some(merge_metadata_with_scope(params.dispatch.metadata.take(), scope.as_ref()));
        params.dispatch.scope = scope.clone();

        let id = self.runtime.inner.backend.schedule(params).await?;
        let event = LifecycleEvent::new(&self.queue, &self.name, Phase::Scheduled, serde_json::json!({ "jobId": id.as_str() }), self.runtime.inner.clock.now(), scope);
        publish(&self.runtime.inner, event).await;
        emit(
            &self.runtime.inner,
            "igniter.jobs.job.scheduled",
            serde_json::json!({ "queue": self.queue, "job": self.name, "jobId": id.as_str() }),
            Level::Debug,
        );
        Ok(id)
    }

    async fn publish_enqueued(&self, id: &JobId, scope: Option<jobs_core::Scope>) {
        let event = LifecycleEvent::new(&self.queue, &self.name, Phase::Enqueued, serde_json::json!({ "jobId": id.as_str() }), self.runtime.inner.clock.now(), scope);
        publish(&self.runtime.inner, event).await;
        emit(
            &self.runtime.inner,
            "igniter.jobs.job.enqueued",
            serde_json::json!({ "queue": self.queue, "job": self.name, "jobId": id.as_str() }),
            Level::Debug,
        );
    }

    pub async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        self.runtime.inner.backend.get_job(id).await
    }

    pub async fn many(&self, ids: &[JobId]) -> Result<Vec<JobRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Pauses this job type across the queue (spec §4.5) — unsupported on
    /// backends that cannot gate by job type without a full scan; those
    /// surface `QueueOperationFailed` rather than approximating it.
    pub async fn pause(&self) -> Result<()> {
        self.runtime.inner.backend.pause_job_type(&self.queue, &self.name).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.runtime.inner.backend.resume_job_type(&self.queue, &self.name).await
    }

    pub async fn subscribe(&self, handler: EventHandler) -> Result<Unsubscribe> {
        let prefix = format!("{}:{}:", self.queue, self.name);
        self.runtime.subscribe(prefix_filter(prefix, handler)).await
    }
}

fn prefix_filter(prefix: String, handler: EventHandler) -> EventHandler {
    Arc::new(move |event: LifecycleEvent| {
        let handler = handler.clone();
        let matches = event.event_type.starts_with(&prefix);
        Box::pin(async move {
            if matches {
                (handler)(event).await;
            }
        })
    })
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
