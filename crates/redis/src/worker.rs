// SPDX-License-Identifier: MIT

//! Worker loop (spec §4.7): polls `claim.lua` per assigned queue, runs the
//! registered handler, and reports the outcome back through
//! `complete.lua`/`fail.lua`. Delayed-job promotion and cron advancement
//! are driven by periodic tickers rather than one-shot timers, since a
//! durable backend must resume them after a restart (spec §4.7, grounded
//! on the `apalis-redis` `enqueue_scheduled` interval).

use crate::envelope::JobEnvelope;
use crate::error::{from_json, from_redis};
use crate::keys::QueueKeys;
use crate::registry::Registry;
use crate::score::waiting_score;
use async_trait::async_trait;
use chrono::Utc;
use jobs_core::{
    Clock, JobId, JobsError, WorkerConfig, WorkerHandle, WorkerId, WorkerMetrics, WorkerMetricsSnapshot,
};
use parking_lot::RwLock as SyncRwLock;
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

const CLAIM_SCAN_LIMIT: usize = 16;
const PROMOTE_INTERVAL: Duration = Duration::from_millis(200);

pub struct WorkerShared {
    pub id: WorkerId,
    pub queues: Vec<String>,
    pub config: WorkerConfig,
    pub conn: ConnectionManager,
    pub scripts: crate::script::Scripts,
    pub registry: Arc<Registry>,
    pub clock: Arc<dyn Clock>,
    pub paused: AtomicBool,
    pub closed: AtomicBool,
    pub started_at: chrono::DateTime<Utc>,
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

pub async fn run(shared: Arc<WorkerShared>) {
    let mut promote_ticker = tokio::time::interval(PROMOTE_INTERVAL);
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

        promote_ticker.tick().await;
        for queue in effective_queues(&shared) {
            let _ = promote_delayed(&shared, &queue).await;
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

        let mut claimed = None;
        for queue in effective_queues(&shared) {
            if let Some(id) = claim_one(&shared, &queue).await {
                claimed = Some((queue, id));
                break;
            }
        }

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
        shared.registry.known_queues()
    } else {
        shared.queues.clone()
    }
}

async fn promote_delayed(shared: &WorkerShared, queue: &str) -> jobs_core::Result<u64> {
    let keys = QueueKeys::new(queue);
    let now_ms = shared.clock.now().timestamp_millis();
    let mut conn = shared.conn.clone();
    let moved: u64 = shared
        .scripts
        .promote_delayed
        .key(&keys.delayed)
        .key(&keys.data)
        .key(&keys.waiting)
        .arg(now_ms)
        .arg(1000)
        .invoke_async(&mut conn)
        .await
        .map_err(from_redis)?;
    if moved > 0 {
        shared.wake.notify_waiters();
    }
    Ok(moved)
}

async fn claim_one(shared: &WorkerShared, queue: &str) -> Option<JobId> {
    let keys = QueueKeys::new(queue);
    let now_ms = shared.clock.now().timestamp_millis();
    let mut conn = shared.conn.clone();
    let claimed: Option<String> = shared
        .scripts
        .claim
        .key(&keys.waiting)
        .key(&keys.data)
        .key(&keys.active)
        .arg(now_ms)
        .arg(CLAIM_SCAN_LIMIT)
        .invoke_async(&mut conn)
        .await
        .ok()
        .flatten();
    claimed.map(JobId::from)
}

async fn load_envelope(conn: &mut ConnectionManager, queue: &str, id: &JobId) -> jobs_core::Result<Option<JobEnvelope>> {
    use redis::AsyncCommands;
    let keys = QueueKeys::new(queue);
    let raw: Option<String> = conn.hget(&keys.data, id.as_str()).await.map_err(from_redis)?;
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw).map_err(from_json)?)),
        None => Ok(None),
    }
}

async fn process_job(shared: &Arc<WorkerShared>, queue: &str, job_id: JobId) {
    let mut conn = shared.conn.clone();
    let Ok(Some(envelope)) = load_envelope(&mut conn, queue, &job_id).await else { return };
    let record = envelope.record;

    let Some(def) = shared.registry.job_def(queue, &record.name) else {
        let error = JobsError::NotRegistered(record.name.clone()).to_string();
        let now_ms = shared.clock.now().timestamp_millis();
        let keys = QueueKeys::new(queue);
        let _: jobs_core::Result<u8> = shared
            .scripts
            .fail
            .key(&keys.data)
            .key(&keys.active)
            .key(&keys.waiting)
            .key(&keys.failed)
            .arg(job_id.as_str())
            .arg(&error)
            .arg(now_ms)
            .arg(f64::MAX)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis);
        shared.metrics.write().failed += 1;
        return;
    };

    if let Some(hook) = &shared.config.on_active {
        hook(&record);
    }

    let progress_conn = shared.conn.clone();
    let progress_queue = queue.to_string();
    let progress_id = job_id.clone();
    let report_progress: Arc<dyn Fn(u8, Option<String>) + Send + Sync> = Arc::new(move |progress, message| {
        let mut conn = progress_conn.clone();
        let queue = progress_queue.clone();
        let id = progress_id.clone();
        tokio::spawn(async move {
            use redis::AsyncCommands;
            let keys = QueueKeys::new(&queue);
            if let Ok(Some(raw)) = conn.hget::<_, _, Option<String>>(&keys.data, id.as_str()).await {
                if let Ok(mut envelope) = serde_json::from_str::<JobEnvelope>(&raw) {
                    envelope.record.set_progress(Utc::now(), progress, message.as_deref());
                    if let Ok(encoded) = serde_json::to_string(&envelope) {
                        let _: Result<(), _> = conn.hset(&keys.data, id.as_str(), encoded).await;
                    }
                }
            }
        });
    });

    let ctx = jobs_core::JobContext::new(
        record.id.clone(),
        queue.to_string(),
        record.name.clone(),
        record.attempts_made,
        record.max_attempts,
        record.metadata.as_ref().and_then(jobs_core::extract_scope_from_metadata),
        report_progress,
    );

    let started = shared.clock.now();
    let result = (def.handler)(ctx, record.input.clone()).await;
    let duration_ms = (shared.clock.now() - started).num_milliseconds().max(0) as u64;
    let now_ms = shared.clock.now().timestamp_millis();
    let keys = QueueKeys::new(queue);

    match result {
        Ok(value) => {
            let Ok(payload) = serde_json::to_string(&value) else { return };
            let _: jobs_core::Result<u8> = shared
                .scripts
                .complete
                .key(&keys.data)
                .key(&keys.active)
                .arg(job_id.as_str())
                .arg(payload)
                .arg(now_ms)
                .invoke_async(&mut conn)
                .await
                .map_err(from_redis);
            shared.metrics.write().processed += 1;
            shared.metrics.write().total_duration_ms += duration_ms;
            if let Some(hook) = &shared.config.on_success {
                hook(&record);
            }
        }
        Err(err) => {
            let requeue_score = waiting_score(record.priority, now_ms);
            let _: jobs_core::Result<u8> = shared
                .scripts
                .fail
                .key(&keys.data)
                .key(&keys.active)
                .key(&keys.waiting)
                .key(&keys.failed)
                .arg(job_id.as_str())
                .arg(err.to_string())
                .arg(now_ms)
                .arg(requeue_score)
                .invoke_async(&mut conn)
                .await
                .map_err(from_redis);
            shared.wake.notify_waiters();
            shared.metrics.write().failed += 1;
            shared.metrics.write().total_duration_ms += duration_ms;
            if let Some(hook) = &shared.config.on_failure {
                hook(&record, &err);
            }
        }
    }
}

pub struct RedisWorkerHandle {
    pub shared: Arc<WorkerShared>,
}

#[async_trait]
impl WorkerHandle for RedisWorkerHandle {
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
