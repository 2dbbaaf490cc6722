// SPDX-License-Identifier: MIT

//! Worker loop (spec §4.6 "Worker loop per queue") and the handle the
//! backend hands back to callers.

use crate::store::{Notifiers, Store};
use async_trait::async_trait;
use jobs_core::{
    Clock, JobId, JobStatus, WorkerConfig, WorkerHandle, WorkerId, WorkerMetrics, WorkerMetricsSnapshot,
};
use parking_lot::RwLock as SyncRwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

pub struct WorkerShared {
    pub id: WorkerId,
    pub queues: Vec<String>,
    pub config: WorkerConfig,
    pub store: Arc<SyncRwLock<Store>>,
    pub notifiers: Notifiers,
    pub clock: Arc<dyn Clock>,
    pub paused: AtomicBool,
    pub closed: AtomicBool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub metrics: SyncRwLock<WorkerMetrics>,
    pub wake: Notify,
    /// Holds one permit per in-flight handler invocation. `close()`
    /// acquires every permit back (bounded by a timeout) so it returns
    /// only once in-flight work has actually finished, not merely
    /// signalled to stop.
    pub in_flight: Arc<Semaphore>,
}

/// How long `close()` waits for in-flight handlers to finish before
/// giving up and returning anyway (spec §5: released "along every exit
/// path", not "blocks forever").
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives claims for one worker until closed. Spawned as a background
/// task by `MemoryBackend::create_worker`.
pub async fn run(shared: Arc<WorkerShared>) {
    let queues = effective_queues(&shared);
    let mut was_idle = false;

    loop {
        if shared.closed.load(Ordering::Acquire) {
            break;
        }
        if shared.paused.load(Ordering::Acquire) {
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
            continue;
        }

        let permit = match Arc::clone(&shared.in_flight).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tokio::select! {
                    _ = shared.wake.notified() => {}
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                }
                continue;
            }
        };

        let claimed = queues.iter().find_map(|queue| shared.store.write().claim_next(queue).map(|id| (queue.clone(), id)));

        match claimed {
            Some((queue, job_id)) => {
                was_idle = false;
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    process_job(&shared, &queue, job_id).await;
                    drop(permit);
                    shared.wake.notify_waiters();
                });
            }
            None => {
                drop(permit);
                if !was_idle {
                    was_idle = true;
                    if let Some(hook) = &shared.config.on_idle {
                        hook();
                    }
                }
                tokio::select! {
                    _ = shared.wake.notified() => {}
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                }
            }
        }
    }
}

fn effective_queues(shared: &WorkerShared) -> Vec<String> {
    if shared.queues.is_empty() {
        shared.store.read().queues.keys().cloned().collect()
    } else {
        shared.queues.clone()
    }
}

async fn process_job(shared: &Arc<WorkerShared>, queue: &str, job_id: JobId) {
    let now = shared.clock.now();
    let def = {
        let mut store = shared.store.write();
        let record = match store.records.get_mut(&job_id) {
            Some(r) => r,
            None => return,
        };
        record.claim(now);
        let def = store.queues.get(queue).and_then(|q| q.job_defs.get(&record.name).cloned());
        def
    };

    if let Some(hook) = &shared.config.on_active {
        if let Some(record) = shared.store.read().records.get(&job_id) {
            hook(record);
        }
    }

    let Some(def) = def else {
        let mut store = shared.store.write();
        if let Some(record) = store.records.get_mut(&job_id) {
            record.error = Some(jobs_core::JobsError::NotRegistered(record.name.clone()).to_string());
            record.status = JobStatus::Failed;
            record.completed_at = Some(shared.clock.now());
        }
        shared.metrics.write().failed += 1;
        return;
    };

    let Some((input, ctx_job_id, queue_name, name, attempts_made, max_attempts, scope)) = ({
        let store = shared.store.read();
        store.records.get(&job_id).map(|record| {
            (
                record.input.clone(),
                record.id.clone(),
                record.queue.clone(),
                record.name.clone(),
                record.attempts_made,
                record.max_attempts,
                record.metadata.as_ref().and_then(jobs_core::extract_scope_from_metadata),
            )
        })
    }) else {
        return;
    };

    let progress_store = Arc::clone(&shared.store);
    let progress_job_id = ctx_job_id.clone();
    let progress_clock = Arc::clone(&shared.clock);
    let report_progress: Arc<dyn Fn(u8, Option<String>) + Send + Sync> = Arc::new(move |progress, message| {
        let now = progress_clock.now();
        let mut store = progress_store.write();
        if let Some(record) = store.records.get_mut(&progress_job_id) {
            record.set_progress(now, progress, message.as_deref());
        }
    });

    let ctx = jobs_core::JobContext::new(ctx_job_id, queue_name, name, attempts_made, max_attempts, scope, report_progress);

    let started = shared.clock.now();
    let result = (def.handler)(ctx, input).await;
    let duration_ms = (shared.clock.now() - started).num_milliseconds().max(0) as u64;

    let mut store = shared.store.write();
    let Some(record) = store.records.get_mut(&job_id) else { return };
    match result {
        Ok(value) => {
            record.complete(shared.clock.now(), value);
            drop(store);
            shared.metrics.write().processed += 1;
            shared.metrics.write().total_duration_ms += duration_ms;
            if let Some(hook) = &shared.config.on_success {
                if let Some(record) = shared.store.read().records.get(&job_id) {
                    hook(record);
                }
            }
        }
        Err(err) => {
            let is_final = record.fail(shared.clock.now(), err.to_string());
            let snapshot = (!is_final).then(|| store.records.get(&job_id).cloned()).flatten();
            drop(store);
            if let Some(snapshot) = snapshot {
                shared.store.write().index_waiting(&snapshot);
                shared.notifiers.kick(queue);
            }
            shared.metrics.write().failed += 1;
            shared.metrics.write().total_duration_ms += duration_ms;
            if let Some(hook) = &shared.config.on_failure {
                if let Some(record) = shared.store.read().records.get(&job_id) {
                    hook(record, &err);
                }
            }
        }
    }
}

pub struct MemoryWorkerHandle {
    pub shared: Arc<WorkerShared>,
}

#[async_trait]
impl WorkerHandle for MemoryWorkerHandle {
    fn id(&self) -> &WorkerId {
        &self.shared.id
    }

    fn queues(&self) -> &[String] {
        &self.shared.queues
    }

    async fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    async fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        self.shared.wake.notify_waiters();
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.wake.notify_waiters();
        let concurrency = self.shared.config.concurrency.max(1);
        let drain = self.shared.in_flight.acquire_many(concurrency);
        let _ = tokio::time::timeout(DRAIN_TIMEOUT, drain).await;
    }

    fn is_running(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire)
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn metrics(&self) -> WorkerMetricsSnapshot {
        let metrics = *self.shared.metrics.read();
        WorkerMetricsSnapshot {
            processed: metrics.processed,
            failed: metrics.failed,
            avg_duration_ms: metrics.avg_duration_ms(),
            concurrency: self.shared.config.concurrency,
            uptime_ms: (self.shared.clock.now() - self.shared.started_at).num_milliseconds().max(0),
        }
    }
}
