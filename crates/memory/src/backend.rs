// SPDX-License-Identifier: MIT

//! `MemoryBackend`: the reference implementation of the `Backend`
//! contract (spec §4.6). Volatile, concurrent-safe, and the semantics
//! oracle the durable backend is tested against.

use crate::pubsub::PubSub;
use crate::store::{now_waiting_status, Notifiers, Store};
use crate::worker::{run, MemoryWorkerHandle, WorkerShared};
use async_trait::async_trait;
use jobs_core::{
    Backend, Clock, CleanOptions, CronDefinition, DispatchParams, EventHandler, JobCounts, JobDefinition,
    JobId, JobRecord, JobSearchFilter, JobStatus, JobsError, LifecycleEvent, LogEntry, QueueInfo, Result,
    ScheduleParams, SystemClock, Unsubscribe, WorkerConfig, WorkerHandle, WorkerId, WorkerRecord,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

pub struct MemoryBackend {
    store: Arc<RwLock<Store>>,
    notifiers: Notifiers,
    pubsub: Arc<PubSub>,
    clock: Arc<dyn Clock>,
    workers: Mutex<Vec<Arc<MemoryWorkerHandle>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            notifiers: Notifiers::default(),
            pubsub: Arc::new(PubSub::default()),
            clock,
            workers: Mutex::new(Vec::new()),
        }
    }

    fn promote_after_delay(&self, store: Arc<RwLock<Store>>, notifiers: Notifiers, job_id: JobId, queue: String, delay_ms: u64) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let snapshot = {
                let mut store = store.write();
                let Some(record) = store.records.get_mut(&job_id) else { return };
                if record.status != JobStatus::Delayed {
                    return;
                }
                record.promote();
                record.clone()
            };
            store.write().index_waiting(&snapshot);
            notifiers.kick(&queue);
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn register_job(&self, queue: &str, name: &str, def: Arc<JobDefinition>) -> Result<()> {
        self.store.write().queue_mut(queue).job_defs.insert(name.to_string(), def);
        Ok(())
    }

    async fn register_cron(&self, queue: &str, name: &str, def: Arc<CronDefinition>) -> Result<()> {
        self.store.write().queue_mut(queue).cron_defs.insert(name.to_string(), def);
        Ok(())
    }

    async fn dispatch(&self, params: DispatchParams) -> Result<JobId> {
        let now = self.clock.now();
        let id = params.job_id.unwrap_or_else(JobId::new);
        let delay_ms = params.delay_ms.unwrap_or(0);
        let paused = self.store.read().queues.get(&params.queue).map(|q| q.paused).unwrap_or(false);
        let status = now_waiting_status(paused, delay_ms);
        let metadata = jobs_core::merge_metadata_with_scope(params.metadata, params.scope.as_ref());

        let record = JobRecord::new(
            id.clone(),
            &params.name,
            &params.queue,
            params.input,
            params.attempts.unwrap_or(3),
            params.priority.unwrap_or(0),
            status,
            now,
            Some(metadata),
        );

        {
            let mut store = self.store.write();
            store.records.insert(id.clone(), record.clone());
            if status == JobStatus::Waiting {
                store.index_waiting(&record);
            }
        }

        if status == JobStatus::Delayed {
            self.promote_after_delay(Arc::clone(&self.store), self.notifiers.clone(), id.clone(), params.queue.clone(), delay_ms);
        } else if status == JobStatus::Waiting {
            self.notifiers.kick(&params.queue);
        }

        Ok(id)
    }

    async fn schedule(&self, params: ScheduleParams) -> Result<JobId> {
        let now = self.clock.now();
        params.validate(now)?;

        // §4.6/§9: the memory backend never drives cron/every — it only
        // arms a one-shot delay from `at`/`delay`. `cron`/`every` alone
        // (no `at`) are stored delayed with the configured delay, if any.
        let delay_ms = match params.at {
            Some(at) => (at - now).num_milliseconds().max(0) as u64,
            None => params.dispatch.delay_ms.unwrap_or(0),
        };

        let mut dispatch = params.dispatch;
        dispatch.delay_ms = Some(delay_ms.max(1));
        self.dispatch(dispatch).await
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.store.read().records.get(id).cloned())
    }

    async fn get_job_state(&self, id: &JobId) -> Result<Option<JobStatus>> {
        Ok(self.store.read().records.get(id).map(|r| r.status))
    }

    async fn get_job_logs(&self, id: &JobId) -> Result<Vec<LogEntry>> {
        Ok(self.store.read().records.get(id).map(|r| r.logs.iter().cloned().collect()).unwrap_or_default())
    }

    async fn get_job_progress(&self, id: &JobId) -> Result<Option<u8>> {
        Ok(self.store.read().records.get(id).map(|r| r.progress))
    }

    async fn retry_job(&self, id: &JobId) -> Result<()> {
        let mut store = self.store.write();
        let record = store.records.get_mut(id).ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        if record.status != JobStatus::Failed {
            return Err(JobsError::InvalidInput(format!("job {id} is not in a failed state")));
        }
        record.retry();
        let snapshot = record.clone();
        let queue = snapshot.queue.clone();
        store.index_waiting(&snapshot);
        drop(store);
        self.notifiers.kick(&queue);
        Ok(())
    }

    async fn remove_job(&self, id: &JobId) -> Result<()> {
        let mut store = self.store.write();
        if let Some(record) = store.records.remove(id) {
            store.unindex_waiting(&record);
        }
        Ok(())
    }

    async fn promote_job(&self, id: &JobId) -> Result<()> {
        let mut store = self.store.write();
        let record = store.records.get_mut(id).ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        if record.status != JobStatus::Delayed {
            return Err(JobsError::InvalidInput(format!("job {id} is not delayed")));
        }
        record.promote();
        let snapshot = record.clone();
        let queue = snapshot.queue.clone();
        store.index_waiting(&snapshot);
        drop(store);
        self.notifiers.kick(&queue);
        Ok(())
    }

    async fn move_job_to_failed(&self, id: &JobId, error: String) -> Result<()> {
        let mut store = self.store.write();
        let existing = store.records.get(id).cloned().ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        store.unindex_waiting(&existing);
        let now = self.clock.now();
        if let Some(record) = store.records.get_mut(id) {
            record.status = JobStatus::Failed;
            record.error = Some(error);
            record.completed_at = Some(now);
        }
        Ok(())
    }

    async fn retry_many(&self, ids: &[JobId]) -> Result<()> {
        for id in ids {
            self.retry_job(id).await?;
        }
        Ok(())
    }

    async fn remove_many(&self, ids: &[JobId]) -> Result<()> {
        for id in ids {
            self.remove_job(id).await?;
        }
        Ok(())
    }

    async fn get_queue_info(&self, queue: &str) -> Result<QueueInfo> {
        let store = self.store.read();
        let q = store.queues.get(queue);
        Ok(QueueInfo {
            name: queue.to_string(),
            paused: q.map(|q| q.paused).unwrap_or(false),
            job_names: q.map(|q| q.job_defs.keys().cloned().collect()).unwrap_or_default(),
            cron_names: q.map(|q| q.cron_defs.keys().cloned().collect()).unwrap_or_default(),
        })
    }

    async fn get_queue_job_counts(&self, queue: &str) -> Result<JobCounts> {
        let store = self.store.read();
        let mut counts = JobCounts::default();
        for record in store.records.values().filter(|r| r.queue == queue) {
            match record.status {
                JobStatus::Waiting => counts.waiting += 1,
                JobStatus::Active => counts.active += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Delayed => counts.delayed += 1,
                JobStatus::Paused => counts.paused += 1,
            }
        }
        Ok(counts)
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        Ok(self.store.read().queues.keys().cloned().collect())
    }

    async fn pause_queue(&self, queue: &str) -> Result<()> {
        let mut store = self.store.write();
        store.queue_mut(queue).paused = true;
        let ids: Vec<JobId> = store
            .records
            .values()
            .filter(|r| r.queue == queue && r.status == JobStatus::Waiting)
            .map(|r| r.id.clone())
            .collect();
        for id in ids {
            if let Some(record) = store.records.get(&id).cloned() {
                store.unindex_waiting(&record);
            }
            if let Some(record) = store.records.get_mut(&id) {
                record.pause();
            }
        }
        Ok(())
    }

    async fn resume_queue(&self, queue: &str) -> Result<()> {
        let mut store = self.store.write();
        store.queue_mut(queue).paused = false;
        let ids: Vec<JobId> = store
            .records
            .values()
            .filter(|r| r.queue == queue && r.status == JobStatus::Paused)
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            if let Some(record) = store.records.get_mut(id) {
                record.resume();
            }
            if let Some(record) = store.records.get(id).cloned() {
                store.index_waiting(&record);
            }
        }
        drop(store);
        self.notifiers.kick(queue);
        Ok(())
    }

    async fn drain_queue(&self, queue: &str) -> Result<()> {
        let mut store = self.store.write();
        let ids: Vec<JobId> = store
            .records
            .values()
            .filter(|r| r.queue == queue && matches!(r.status, JobStatus::Waiting | JobStatus::Paused))
            .map(|r| r.id.clone())
            .collect();
        for id in ids {
            if let Some(record) = store.records.remove(&id) {
                store.unindex_waiting(&record);
            }
        }
        Ok(())
    }

    async fn clean_queue(&self, queue: &str, options: CleanOptions) -> Result<u64> {
        let now = self.clock.now();
        let mut store = self.store.write();
        let mut candidates: Vec<JobId> = store
            .records
            .values()
            .filter(|r| {
                r.queue == queue
                    && options.status.contains(&r.status)
                    && options
                        .older_than_ms
                        .map(|older_than| (now - r.created_at).num_milliseconds() as u64 >= older_than)
                        .unwrap_or(true)
            })
            .map(|r| r.id.clone())
            .collect();
        if let Some(limit) = options.limit {
            candidates.truncate(limit);
        }
        let removed = candidates.len() as u64;
        for id in candidates {
            if let Some(record) = store.records.remove(&id) {
                store.unindex_waiting(&record);
            }
        }
        Ok(removed)
    }

    async fn obliterate_queue(&self, queue: &str) -> Result<()> {
        let mut store = self.store.write();
        let ids: Vec<JobId> = store.records.values().filter(|r| r.queue == queue).map(|r| r.id.clone()).collect();
        for id in ids {
            store.records.remove(&id);
        }
        store.queues.remove(queue);
        Ok(())
    }

    async fn retry_all_in_queue(&self, queue: &str) -> Result<u64> {
        let mut store = self.store.write();
        let ids: Vec<JobId> = store
            .records
            .values()
            .filter(|r| r.queue == queue && r.status == JobStatus::Failed)
            .map(|r| r.id.clone())
            .collect();
        let count = ids.len() as u64;
        for id in &ids {
            if let Some(record) = store.records.get_mut(id) {
                record.retry();
            }
            if let Some(record) = store.records.get(id).cloned() {
                store.index_waiting(&record);
            }
        }
        drop(store);
        if count > 0 {
            self.notifiers.kick(queue);
        }
        Ok(count)
    }

    async fn pause_job_type(&self, queue: &str, name: &str) -> Result<()> {
        let mut store = self.store.write();
        store.queue_mut(queue).paused_job_types.insert(name.to_string());
        Ok(())
    }

    async fn resume_job_type(&self, queue: &str, name: &str) -> Result<()> {
        let mut store = self.store.write();
        store.queue_mut(queue).paused_job_types.remove(name);
        drop(store);
        self.notifiers.kick(queue);
        Ok(())
    }

    async fn search_jobs(&self, filter: JobSearchFilter) -> Result<Vec<JobRecord>> {
        let store = self.store.read();
        Ok(store
            .records
            .values()
            .filter(|r| filter.queue.as_deref().map(|q| q == r.queue).unwrap_or(true))
            .filter(|r| filter.name.as_deref().map(|n| n == r.name).unwrap_or(true))
            .filter(|r| filter.status.map(|s| s == r.status).unwrap_or(true))
            .filter(|r| {
                filter
                    .scope
                    .as_ref()
                    .map(|s| r.metadata.as_ref().and_then(jobs_core::extract_scope_from_metadata).map(|rs| rs.same_identity(s)).unwrap_or(false))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn search_queues(&self, name_contains: Option<&str>) -> Result<Vec<String>> {
        let store = self.store.read();
        Ok(store.queues.keys().filter(|name| name_contains.map(|needle| name.contains(needle)).unwrap_or(true)).cloned().collect())
    }

    async fn search_workers(&self, queue: Option<&str>) -> Result<Vec<WorkerRecord>> {
        let workers = self.workers.lock();
        Ok(workers
            .iter()
            .filter(|w| queue.map(|q| w.shared.queues.iter().any(|wq| wq == q)).unwrap_or(true))
            .map(|w| {
                let metrics = *w.shared.metrics.read();
                WorkerRecord {
                    id: w.shared.id.clone(),
                    queues: w.shared.queues.clone(),
                    concurrency: w.shared.config.concurrency,
                    paused: w.is_paused(),
                    closed: w.is_closed(),
                    started_at: w.shared.started_at,
                    metrics,
                }
            })
            .collect())
    }

    async fn create_worker(&self, config: WorkerConfig) -> Result<Arc<dyn WorkerHandle>> {
        if config.concurrency == 0 {
            return Err(JobsError::ConfigurationInvalid("concurrency must be positive".into()));
        }
        let concurrency = config.concurrency.max(1) as usize;
        let shared = Arc::new(WorkerShared {
            id: WorkerId::new(),
            queues: config.queues.clone(),
            config,
            store: Arc::clone(&self.store),
            notifiers: self.notifiers.clone(),
            clock: Arc::clone(&self.clock),
            paused: std::sync::atomic::AtomicBool::new(false),
            closed: std::sync::atomic::AtomicBool::new(false),
            started_at: self.clock.now(),
            metrics: RwLock::new(Default::default()),
            wake: tokio::sync::Notify::new(),
            in_flight: Arc::new(tokio::sync::Semaphore::new(concurrency)),
        });
        tokio::spawn(run(Arc::clone(&shared)));
        let handle = Arc::new(MemoryWorkerHandle { shared });
        self.workers.lock().push(Arc::clone(&handle));
        Ok(handle)
    }

    async fn get_workers(&self) -> Result<Vec<Arc<dyn WorkerHandle>>> {
        Ok(self.workers.lock().iter().map(|w| Arc::clone(w) as Arc<dyn WorkerHandle>).collect())
    }

    async fn publish_event(&self, channel: &str, payload: LifecycleEvent) -> Result<()> {
        self.pubsub.publish(channel, payload).await;
        Ok(())
    }

    async fn subscribe_event(&self, channel: &str, handler: EventHandler) -> Result<Unsubscribe> {
        Ok(self.pubsub.subscribe(channel, handler))
    }

    async fn shutdown(&self) -> Result<()> {
        let workers: Vec<Arc<MemoryWorkerHandle>> = self.workers.lock().drain(..).collect();
        for worker in workers {
            worker.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
