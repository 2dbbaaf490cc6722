// SPDX-License-Identifier: MIT

//! The runtime manager (spec §4.10, builder surface spec §6.1
//! `IgniterJobs.create()...build()`). Owns one backend instance, the
//! frozen set of registered queues, and the typed proxy
//! (`Runtime::queue(name).job(name)`) applications actually call.

use crate::handle::QueueHandle;
use crate::queue_builder::QueueSpec;
use crate::scope_def::ScopeDef;
use crate::spec::{ContextFactory, QueueDefaults, WorkerDefaults};
use crate::worker_builder::WorkerBuilder;
use crate::wrap::{wrap_cron, wrap_job};
use jobs_core::{
    channel_for, default_logger, noop_telemetry, Backend, Clock, EventHandler, JobSearchFilter, JobsError, Logger,
    NoopValidator, QueueInfo, Result, Scope, ScopeId, SystemClock, Telemetry, Unsubscribe, Validator, WorkerConfig,
    WorkerHandle, WorkerRecord,
};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Global guard against registering the same backend instance with more
/// than one runtime (spec §4.10 "registration exactly once"). The JS
/// source keys this off a `WeakSet` over live objects; Rust has no
/// built-in analogue, so this keys off `(TypeId, pointer address)` —
/// sound as long as a backend `Arc` is never deallocated and its address
/// reused for an unrelated `Arc<B>` while still held here, which a
/// process-lifetime `Arc` clone (kept in [`RuntimeInner`]) guarantees.
static REGISTERED: OnceLock<Mutex<HashSet<(TypeId, usize)>>> = OnceLock::new();

fn registration_guard() -> &'static Mutex<HashSet<(TypeId, usize)>> {
    REGISTERED.get_or_init(|| Mutex::new(HashSet::new()))
}

fn claim_registration<B: Backend>(adapter: &Arc<B>) -> Result<()> {
    let key = (TypeId::of::<B>(), Arc::as_ptr(adapter) as *const () as usize);
    if !registration_guard().lock().insert(key) {
        return Err(JobsError::ConfigurationInvalid(
            "this backend instance is already registered with a runtime".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct AutoStartWorkerConfig {
    pub concurrency: u32,
}

pub(crate) struct RuntimeInner<B: Backend> {
    pub(crate) backend: Arc<B>,
    pub(crate) service: String,
    pub(crate) environment: String,
    pub(crate) scope_def: Option<ScopeDef>,
    pub(crate) telemetry: Arc<dyn Telemetry>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) queue_names: Vec<String>,
    pub(crate) worker_defaults: WorkerDefaults,
    /// Per-`(queue, job)` validator, consulted by `JobHandle::dispatch_with`/
    /// `schedule_with` before the backend ever sees the input (spec §4.10
    /// "Dispatch path: Validate input (if schema)..."). Jobs with no
    /// declared validator get a `NoopValidator`, so lookups never need to
    /// branch on `Option`.
    pub(crate) validators: HashMap<(String, String), Arc<dyn Validator>>,
    /// Set once if `withAutoStartWorker` started one. Its lifecycle
    /// (pause/resume/close) is otherwise identical to any worker started
    /// through `WorkerBuilder::start` — the backend's own `shutdown`
    /// closes every worker it created, this one included, so `Runtime`
    /// does not need to track it for cleanup, only for lookup.
    pub(crate) auto_worker: Mutex<Option<Arc<dyn WorkerHandle>>>,
}

/// `IgniterJobs.create().withAdapter(...)...build()` (spec §6.1).
pub struct RuntimeBuilder<B: Backend, C> {
    adapter: Option<Arc<B>>,
    service: Option<String>,
    environment: Option<String>,
    context_factory: Option<ContextFactory<C>>,
    scope_def: Option<ScopeDef>,
    queues: Vec<QueueSpec<C>>,
    queue_defaults: QueueDefaults,
    worker_defaults: WorkerDefaults,
    auto_start_worker: Option<AutoStartWorkerConfig>,
    logger: Option<Arc<dyn Logger>>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl<B: Backend, C: Send + 'static> Default for RuntimeBuilder<B, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend, C: Send + 'static> RuntimeBuilder<B, C> {
    pub fn new() -> Self {
        Self {
            adapter: None,
            service: None,
            environment: None,
            context_factory: None,
            scope_def: None,
            queues: Vec::new(),
            queue_defaults: QueueDefaults::default(),
            worker_defaults: WorkerDefaults::default(),
            auto_start_worker: None,
            logger: None,
            telemetry: None,
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<B>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_context(mut self, factory: ContextFactory<C>) -> Self {
        self.context_factory = Some(factory);
        self
    }

    /// At most one scope type per runtime (spec §6.1).
    pub fn add_scope(mut self, scope: ScopeDef) -> Result<Self> {
        if self.scope_def.is_some() {
            return Err(JobsError::ScopeAlreadyDefined);
        }
        self.scope_def = Some(scope);
        Ok(self)
    }

    pub fn add_queue(mut self, queue: QueueSpec<C>) -> Result<Self> {
        if self.queues.iter().any(|q| q.name == queue.name) {
            return Err(JobsError::QueueDuplicate(queue.name));
        }
        self.queues.push(queue);
        Ok(self)
    }

    pub fn with_queue_defaults(mut self, defaults: QueueDefaults) -> Self {
        self.queue_defaults = defaults;
        self
    }

    pub fn with_worker_defaults(mut self, defaults: WorkerDefaults) -> Self {
        self.worker_defaults = defaults;
        self
    }

    pub fn with_auto_start_worker(mut self, concurrency: u32) -> Self {
        self.auto_start_worker = Some(AutoStartWorkerConfig { concurrency });
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub async fn build(self) -> Result<Arc<Runtime<B>>> {
        let adapter = self.adapter.ok_or(JobsError::AdapterRequired)?;
        let service = self.service.ok_or(JobsError::ServiceRequired)?;
        let environment = self
            .environment
            .ok_or_else(|| JobsError::ConfigurationInvalid("environment is required".into()))?;
        let context_factory = self.context_factory.ok_or(JobsError::ContextRequired)?;

        claim_registration(&adapter)?;

        let telemetry = self.telemetry.unwrap_or_else(|| noop_telemetry(service.clone(), environment.clone()));
        let logger = self.logger.unwrap_or_else(default_logger);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let queue_names: Vec<String> = self.queues.iter().map(|q| q.name.clone()).collect();

        let mut validators: HashMap<(String, String), Arc<dyn Validator>> = HashMap::new();
        for queue in &self.queues {
            for job in queue.jobs.values() {
                let validator = job.validator.clone().unwrap_or_else(|| Arc::new(NoopValidator) as Arc<dyn Validator>);
                validators.insert((queue.name.clone(), job.name.clone()), validator);
            }
        }

        let inner = Arc::new(RuntimeInner {
            backend: Arc::clone(&adapter),
            service,
            environment,
            scope_def: self.scope_def,
            telemetry,
            logger,
            clock,
            queue_names,
            worker_defaults: self.worker_defaults,
            validators,
            auto_worker: Mutex::new(None),
        });

        for queue in self.queues {
            for (_, mut job) in queue.jobs {
                job.apply_defaults(&self.queue_defaults);
                let def = wrap_job(Arc::clone(&inner), Arc::clone(&context_factory), queue.name.clone(), job);
                let name = def.name.clone();
                adapter.register_job(&queue.name, &name, def).await?;
            }
            for (_, cron) in queue.crons {
                let def = wrap_cron(Arc::clone(&inner), Arc::clone(&context_factory), queue.name.clone(), cron);
                let name = def.name.clone();
                adapter.register_cron(&queue.name, &name, def).await?;
            }
        }

        if let Some(cfg) = self.auto_start_worker {
            let config = WorkerConfig {
                queues: Vec::new(),
                concurrency: cfg.concurrency,
                limiter: inner.worker_defaults.limiter,
                on_active: None,
                on_success: None,
                on_failure: None,
                on_idle: None,
            };
            let handle = adapter.create_worker(config).await?;
            *inner.auto_worker.lock() = Some(handle);
        }

        Ok(Arc::new(Runtime { inner, bound_scope: None }))
    }
}

/// The typed proxy applications hold onto (spec §4.10, §6.1 "Proxy surface").
pub struct Runtime<B: Backend> {
    pub(crate) inner: Arc<RuntimeInner<B>>,
    pub(crate) bound_scope: Option<Scope>,
}

impl<B: Backend> Runtime<B> {
    pub fn queue(self: &Arc<Self>, name: &str) -> Result<QueueHandle<B>> {
        if !self.inner.queue_names.iter().any(|q| q == name) {
            return Err(JobsError::QueueNotFound(name.to_string()));
        }
        Ok(QueueHandle::new(Arc::clone(self), name.to_string()))
    }

    pub fn worker(self: &Arc<Self>) -> WorkerBuilder<B> {
        WorkerBuilder::new(Arc::clone(self))
    }

    /// Derives a runtime carrying a bound `(type, id)` scope (spec §6.1
    /// `runtime.scope(type, id, tags?)`). Only callable if `addScope` was
    /// used with a matching `type` at build time.
    pub fn scope(self: &Arc<Self>, kind: &str, id: impl Into<ScopeId>, tags: Option<Vec<String>>) -> Result<Arc<Self>> {
        let scope_def = self
            .inner
            .scope_def
            .as_ref()
            .ok_or_else(|| JobsError::ConfigurationInvalid("no scope type was declared for this runtime".into()))?;
        if scope_def.kind != kind {
            return Err(JobsError::ConfigurationInvalid(format!(
                "runtime declared scope type `{}`, not `{kind}`",
                scope_def.kind
            )));
        }
        let mut scope = Scope::new(kind, id);
        if let Some(tags) = tags {
            scope = scope.with_tags(tags);
        }
        Ok(Arc::new(Runtime { inner: Arc::clone(&self.inner), bound_scope: Some(scope) }))
    }

    pub(crate) fn channel(&self) -> String {
        channel_for(&self.inner.environment, &self.inner.service, self.bound_scope.as_ref())
    }

    pub async fn subscribe(&self, handler: EventHandler) -> Result<Unsubscribe> {
        self.inner.backend.subscribe_event(&self.channel(), handler).await
    }

    pub async fn search_jobs(&self, filter: JobSearchFilter) -> Result<Vec<jobs_core::JobRecord>> {
        self.inner.backend.search_jobs(filter).await
    }

    pub async fn search_queues(&self, name_contains: Option<&str>) -> Result<Vec<String>> {
        self.inner.backend.search_queues(name_contains).await
    }

    pub async fn search_workers(&self, queue: Option<&str>) -> Result<Vec<WorkerRecord>> {
        self.inner.backend.search_workers(queue).await
    }

    pub async fn get_queue_info(&self, queue: &str) -> Result<QueueInfo> {
        self.inner.backend.get_queue_info(queue).await
    }

    /// Enforces the declared scope's `required` flag and resolves the
    /// effective scope for a dispatch/schedule call: the per-call scope if
    /// one was passed, else the runtime's bound scope, else none. When
    /// both are present they must refer to the same `(type, id)` (spec
    /// §4.10 scope resolution).
    pub(crate) fn resolve_scope(&self, per_call: Option<Scope>) -> Result<Option<Scope>> {
        let resolved = match (per_call, &self.bound_scope) {
            (Some(call_scope), Some(bound)) => {
                if !call_scope.same_identity(bound) {
                    return Err(JobsError::ConfigurationInvalid(
                        "per-call scope does not match the runtime's bound scope".into(),
                    ));
                }
                Some(call_scope)
            }
            (Some(call_scope), None) => Some(call_scope),
            (None, Some(bound)) => Some(bound.clone()),
            (None, None) => None,
        };
        if let Some(def) = &self.inner.scope_def {
            if def.required && resolved.is_none() {
                return Err(JobsError::ConfigurationInvalid(format!(
                    "a `{}` scope is required for this runtime",
                    def.kind
                )));
            }
        }
        Ok(resolved)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.inner.backend.shutdown().await
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
