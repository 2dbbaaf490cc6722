// SPDX-License-Identifier: MIT

//! `RedisBackend`: the durable implementation of the `Backend` contract
//! (spec §4.7). Job/cron definitions stay in the in-process [`Registry`]
//! (their handler closures can't cross the wire); job records, queue
//! indexes, and cron progress live in Redis and are mutated exclusively
//! through the Lua scripts in [`crate::script`].

use crate::cron_scheduler;
use crate::envelope::JobEnvelope;
use crate::error::{from_json, from_redis};
use crate::keys::{registry_key, QueueKeys};
use crate::pubsub::RedisPubSub;
use crate::registry::Registry;
use crate::score::waiting_score;
use crate::script::Scripts;
use crate::worker::{run, RedisWorkerHandle, WorkerShared};
use async_trait::async_trait;
use jobs_core::{
    Backend, CleanOptions, Clock, CronDefinition, DispatchParams, EventHandler, JobCounts, JobDefinition, JobId,
    JobRecord, JobSearchFilter, JobStatus, JobsError, LifecycleEvent, LogEntry, QueueInfo, Result, ScheduleParams,
    SystemClock, Unsubscribe, WorkerConfig, WorkerHandle, WorkerRecord,
};
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct RedisBackend {
    client: redis::Client,
    conn: ConnectionManager,
    scripts: Scripts,
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    pubsub: Arc<RedisPubSub>,
    workers: Mutex<Vec<Arc<RedisWorkerHandle>>>,
    cron_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RedisBackend {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`), establishing both
    /// the command connection manager and the dedicated pub/sub connection.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_clock(url, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(url: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = redis::Client::open(url).map_err(from_redis)?;
        let conn = ConnectionManager::new(client.clone()).await.map_err(from_redis)?;
        let pubsub = RedisPubSub::connect(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            scripts: Scripts::default(),
            registry: Arc::new(Registry::default()),
            clock,
            pubsub,
            workers: Mutex::new(Vec::new()),
            cron_tasks: Mutex::new(Vec::new()),
        })
    }

    async fn remember_queue(&self, queue: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(registry_key(), queue).await.map_err(from_redis)?;
        Ok(())
    }

    async fn read_envelope(&self, queue: &str, id: &JobId) -> Result<Option<JobEnvelope>> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(&keys.data, id.as_str()).await.map_err(from_redis)?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).map_err(from_json)?)),
            None => Ok(None),
        }
    }

    async fn find_record(&self, id: &JobId) -> Result<Option<(String, JobRecord)>> {
        let queues = self.list_queues().await?;
        for queue in queues {
            if let Some(envelope) = self.read_envelope(&queue, id).await? {
                return Ok(Some((queue, envelope.record)));
            }
        }
        Ok(None)
    }

    /// Ad-hoc repeat loop for `schedule()`'s `cron`/`every` options — not
    /// persisted across restarts, unlike a builder-registered
    /// `CronDefinition` driven by [`cron_scheduler`]: this path re-dispatches
    /// the already-registered job itself rather than invoking a separate
    /// cron handler, so there is no handler to recover after a crash.
    fn spawn_repeating_dispatch(&self, params: ScheduleParams, first_delay_ms: u64) {
        let dispatch = params.dispatch;
        let max_executions = params.max_executions;
        let tz = params.tz;
        let filters = params.filters;
        let every_ms = params.every_ms;
        let schedule = params.cron.as_deref().and_then(|expr| crate::cron::parse_schedule(expr).ok());
        let clock = Arc::clone(&self.clock);
        let conn = self.conn.clone();

        tokio::spawn(async move {
            let mut conn = conn;
            tokio::time::sleep(Duration::from_millis(first_delay_ms)).await;
            let mut executions = 0u32;
            loop {
                if let Some(max) = max_executions {
                    if executions >= max {
                        return;
                    }
                }
                let mut dispatch = dispatch.clone();
                dispatch.delay_ms = Some(0);
                let _ = do_dispatch(&mut conn, &clock, dispatch).await;
                executions += 1;

                let wait_ms = match (&schedule, every_ms) {
                    (Some(schedule), _) => {
                        let now = clock.now();
                        match crate::cron::next_fire_after(schedule, now, None, tz.as_deref(), &filters) {
                            Some(next) => (next - now).num_milliseconds().max(0) as u64,
                            None => return,
                        }
                    }
                    (None, Some(every_ms)) => every_ms,
                    (None, None) => return,
                };
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        });
    }
}

/// Shared dispatch logic used both by `Backend::dispatch` and the
/// ad-hoc repeat loop spawned from `schedule()`.
async fn do_dispatch(conn: &mut ConnectionManager, clock: &Arc<dyn Clock>, params: DispatchParams) -> Result<JobId> {
    let now = clock.now();
    let id = params.job_id.unwrap_or_else(JobId::new);
    let delay_ms = params.delay_ms.unwrap_or(0);
    let keys = QueueKeys::new(&params.queue);

    let paused: bool = conn.exists(&keys.paused_flag).await.map_err(from_redis)?;
    let status = if paused {
        JobStatus::Paused
    } else if delay_ms > 0 {
        JobStatus::Delayed
    } else {
        JobStatus::Waiting
    };

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

    let score = waiting_score(record.priority, now.timestamp_millis());
    let envelope = JobEnvelope { record, waiting_score: score };
    let payload = serde_json::to_string(&envelope).map_err(from_json)?;
    let _: () = conn.hset(&keys.data, id.as_str(), payload).await.map_err(from_redis)?;

    match status {
        JobStatus::Waiting => {
            let _: () = conn.zadd(&keys.waiting, id.as_str(), score).await.map_err(from_redis)?;
        }
        JobStatus::Delayed => {
            let ready_at = now.timestamp_millis() + delay_ms as i64;
            let _: () = conn.zadd(&keys.delayed, id.as_str(), ready_at).await.map_err(from_redis)?;
        }
        JobStatus::Paused => {
            let _: () = conn.sadd(&keys.paused_jobs, id.as_str()).await.map_err(from_redis)?;
        }
        _ => {}
    }

    let _: () = conn.sadd(registry_key(), &params.queue).await.map_err(from_redis)?;
    Ok(id)
}

#[async_trait]
impl Backend for RedisBackend {
    async fn register_job(&self, queue: &str, name: &str, def: Arc<JobDefinition>) -> Result<()> {
        self.registry.register_job(queue, name, def);
        self.remember_queue(queue).await
    }

    async fn register_cron(&self, queue: &str, name: &str, def: Arc<CronDefinition>) -> Result<()> {
        self.registry.register_cron(queue, name, Arc::clone(&def));
        self.remember_queue(queue).await?;
        let handle = tokio::spawn(cron_scheduler::run(
            self.conn.clone(),
            queue.to_string(),
            name.to_string(),
            def,
            Arc::clone(&self.clock),
        ));
        self.cron_tasks.lock().push(handle);
        Ok(())
    }

    async fn dispatch(&self, params: DispatchParams) -> Result<JobId> {
        let mut conn = self.conn.clone();
        do_dispatch(&mut conn, &self.clock, params).await
    }

    async fn schedule(&self, params: ScheduleParams) -> Result<JobId> {
        let now = self.clock.now();
        params.validate(now)?;

        if params.cron.is_none() && params.every_ms.is_none() {
            let delay_ms = match params.at {
                Some(at) => (at - now).num_milliseconds().max(0) as u64,
                None => params.dispatch.delay_ms.unwrap_or(0),
            };
            let mut dispatch = params.dispatch;
            dispatch.delay_ms = Some(delay_ms);
            return self.dispatch(dispatch).await;
        }

        let first_delay_ms = params.at.map(|at| (at - now).num_milliseconds().max(0) as u64).unwrap_or(0);
        let id = params.dispatch.job_id.clone().unwrap_or_else(JobId::new);
        self.spawn_repeating_dispatch(params, first_delay_ms);
        Ok(id)
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.find_record(id).await?.map(|(_, record)| record))
    }

    async fn get_job_state(&self, id: &JobId) -> Result<Option<JobStatus>> {
        Ok(self.find_record(id).await?.map(|(_, record)| record.status))
    }

    async fn get_job_logs(&self, id: &JobId) -> Result<Vec<LogEntry>> {
        Ok(self.find_record(id).await?.map(|(_, record)| record.logs.into_iter().collect()).unwrap_or_default())
    }

    async fn get_job_progress(&self, id: &JobId) -> Result<Option<u8>> {
        Ok(self.find_record(id).await?.map(|(_, record)| record.progress))
    }

    async fn retry_job(&self, id: &JobId) -> Result<()> {
        let (queue, record) = self.find_record(id).await?.ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        if record.status != JobStatus::Failed {
            return Err(JobsError::InvalidInput(format!("job {id} is not in a failed state")));
        }
        let keys = QueueKeys::new(&queue);
        let score = waiting_score(record.priority, self.clock.now().timestamp_millis());
        let mut conn = self.conn.clone();
        let updated: u8 = self
            .scripts
            .retry
            .key(&keys.data)
            .key(&keys.failed)
            .key(&keys.waiting)
            .arg(id.as_str())
            .arg(score)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        if updated == 0 {
            return Err(JobsError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn remove_job(&self, id: &JobId) -> Result<()> {
        let Some((queue, _)) = self.find_record(id).await? else { return Ok(()) };
        let keys = QueueKeys::new(&queue);
        let mut conn = self.conn.clone();
        let _: u64 = self
            .scripts
            .remove_ids
            .key(&keys.data)
            .key(&keys.waiting)
            .key(&keys.paused_jobs)
            .key(&keys.failed)
            .key(&keys.active)
            .arg(id.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(())
    }

    async fn promote_job(&self, id: &JobId) -> Result<()> {
        let (queue, record) = self.find_record(id).await?.ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        if record.status != JobStatus::Delayed {
            return Err(JobsError::InvalidInput(format!("job {id} is not delayed")));
        }
        let keys = QueueKeys::new(&queue);
        let mut conn = self.conn.clone();
        let _: () = conn.zrem(&keys.delayed, id.as_str()).await.map_err(from_redis)?;
        let score = waiting_score(record.priority, self.clock.now().timestamp_millis());
        let _: () = conn.zadd(&keys.waiting, id.as_str(), score).await.map_err(from_redis)?;
        let mut envelope = JobEnvelope { record, waiting_score: score };
        envelope.record.promote();
        let payload = serde_json::to_string(&envelope).map_err(from_json)?;
        let _: () = conn.hset(&keys.data, id.as_str(), payload).await.map_err(from_redis)?;
        Ok(())
    }

    async fn move_job_to_failed(&self, id: &JobId, error: String) -> Result<()> {
        let (queue, mut record) = self.find_record(id).await?.ok_or_else(|| JobsError::NotFound(id.to_string()))?;
        let keys = QueueKeys::new(&queue);
        let now = self.clock.now();
        record.status = JobStatus::Failed;
        record.error = Some(error);
        record.completed_at = Some(now);
        let score = waiting_score(record.priority, now.timestamp_millis());
        let envelope = JobEnvelope { record, waiting_score: score };
        let payload = serde_json::to_string(&envelope).map_err(from_json)?;
        let mut conn = self.conn.clone();
        let _: () = conn.hset(&keys.data, id.as_str(), payload).await.map_err(from_redis)?;
        let _: () = conn.zrem(&keys.waiting, id.as_str()).await.map_err(from_redis)?;
        let _: () = conn.sadd(&keys.failed, id.as_str()).await.map_err(from_redis)?;
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
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let paused: bool = conn.exists(&keys.paused_flag).await.map_err(from_redis)?;
        Ok(QueueInfo {
            name: queue.to_string(),
            paused,
            job_names: self.registry.job_names(queue),
            cron_names: self.registry.cron_names(queue),
        })
    }

    async fn get_queue_job_counts(&self, queue: &str) -> Result<JobCounts> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.zcard(&keys.waiting).await.map_err(from_redis)?;
        let delayed: u64 = conn.zcard(&keys.delayed).await.map_err(from_redis)?;
        let active: u64 = conn.scard(&keys.active).await.map_err(from_redis)?;
        let failed: u64 = conn.scard(&keys.failed).await.map_err(from_redis)?;
        let paused: u64 = conn.scard(&keys.paused_jobs).await.map_err(from_redis)?;
        let total: u64 = conn.hlen(&keys.data).await.map_err(from_redis)?;
        let completed = total.saturating_sub(waiting + delayed + active + failed + paused);
        Ok(JobCounts { waiting, active, completed, failed, delayed, paused })
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let queues: Vec<String> = conn.smembers(registry_key()).await.map_err(from_redis)?;
        Ok(queues)
    }

    async fn pause_queue(&self, queue: &str) -> Result<()> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let _: u64 = self
            .scripts
            .pause_queue
            .key(&keys.paused_flag)
            .key(&keys.waiting)
            .key(&keys.data)
            .key(&keys.paused_jobs)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(())
    }

    async fn resume_queue(&self, queue: &str) -> Result<()> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let _: u64 = self
            .scripts
            .resume_queue
            .key(&keys.paused_flag)
            .key(&keys.waiting)
            .key(&keys.data)
            .key(&keys.paused_jobs)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(())
    }

    async fn drain_queue(&self, queue: &str) -> Result<()> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let _: u64 = self
            .scripts
            .drain_queue
            .key(&keys.waiting)
            .key(&keys.paused_jobs)
            .key(&keys.data)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(())
    }

    async fn clean_queue(&self, queue: &str, options: CleanOptions) -> Result<u64> {
        let now = self.clock.now();
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let raw: std::collections::HashMap<String, String> = conn.hgetall(&keys.data).await.map_err(from_redis)?;
        let mut ids: Vec<String> = raw
            .into_iter()
            .filter_map(|(id, json)| serde_json::from_str::<JobEnvelope>(&json).ok().map(|e| (id, e.record)))
            .filter(|(_, record)| {
                options.status.contains(&record.status)
                    && options
                        .older_than_ms
                        .map(|older_than| (now - record.created_at).num_milliseconds() as u64 >= older_than)
                        .unwrap_or(true)
            })
            .map(|(id, _)| id)
            .collect();
        if let Some(limit) = options.limit {
            ids.truncate(limit);
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let mut cmd = self.scripts.remove_ids.key(&keys.data).key(&keys.waiting).key(&keys.paused_jobs).key(&keys.failed).key(&keys.active);
        for id in &ids {
            cmd.arg(id);
        }
        let removed: u64 = cmd.invoke_async(&mut conn).await.map_err(from_redis)?;
        Ok(removed)
    }

    async fn obliterate_queue(&self, queue: &str) -> Result<()> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&keys.waiting).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.delayed).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.active).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.failed).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.data).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.paused_flag).await.map_err(from_redis)?;
        let _: () = conn.del(&keys.paused_jobs).await.map_err(from_redis)?;
        let _: () = conn.srem(registry_key(), queue).await.map_err(from_redis)?;
        Ok(())
    }

    async fn retry_all_in_queue(&self, queue: &str) -> Result<u64> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.conn.clone();
        let retried: u64 = self
            .scripts
            .retry_all
            .key(&keys.data)
            .key(&keys.failed)
            .key(&keys.waiting)
            .invoke_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(retried)
    }

    /// Redis sorted-set queues have no native per-job-type gate without a
    /// full scan; approximating one would violate "do not fake it"
    /// (SPEC_FULL §9), so this fails loudly instead.
    async fn pause_job_type(&self, queue: &str, name: &str) -> Result<()> {
        Err(JobsError::QueueOperationFailed(format!(
            "jobs-redis cannot pause individual job types (queue={queue}, name={name}) without a full scan"
        )))
    }

    async fn resume_job_type(&self, queue: &str, name: &str) -> Result<()> {
        Err(JobsError::QueueOperationFailed(format!(
            "jobs-redis cannot resume individual job types (queue={queue}, name={name}) without a full scan"
        )))
    }

    async fn search_jobs(&self, filter: JobSearchFilter) -> Result<Vec<JobRecord>> {
        let queues = match &filter.queue {
            Some(queue) => vec![queue.clone()],
            None => self.list_queues().await?,
        };
        let mut conn = self.conn.clone();
        let mut matches = Vec::new();
        for queue in queues {
            let keys = QueueKeys::new(&queue);
            let raw: std::collections::HashMap<String, String> = conn.hgetall(&keys.data).await.map_err(from_redis)?;
            for json in raw.into_values() {
                let Ok(envelope) = serde_json::from_str::<JobEnvelope>(&json) else { continue };
                let record = envelope.record;
                if filter.name.as_deref().map(|n| n == record.name).unwrap_or(true)
                    && filter.status.map(|s| s == record.status).unwrap_or(true)
                    && filter
                        .scope
                        .as_ref()
                        .map(|s| record.metadata.as_ref().and_then(jobs_core::extract_scope_from_metadata).map(|rs| rs.same_identity(s)).unwrap_or(false))
                        .unwrap_or(true)
                {
                    matches.push(record);
                }
            }
        }
        Ok(matches)
    }

    async fn search_queues(&self, name_contains: Option<&str>) -> Result<Vec<String>> {
        let queues = self.list_queues().await?;
        Ok(queues.into_iter().filter(|name| name_contains.map(|needle| name.contains(needle)).unwrap_or(true)).collect())
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
            id: jobs_core::WorkerId::new(),
            queues: config.queues.clone(),
            config,
            conn: self.conn.clone(),
            scripts: self.scripts.clone(),
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            paused: std::sync::atomic::AtomicBool::new(false),
            closed: std::sync::atomic::AtomicBool::new(false),
            started_at: self.clock.now(),
            metrics: parking_lot::RwLock::new(Default::default()),
            wake: tokio::sync::Notify::new(),
            in_flight: Arc::new(tokio::sync::Semaphore::new(concurrency)),
        });
        tokio::spawn(run(Arc::clone(&shared)));
        let handle = Arc::new(RedisWorkerHandle { shared });
        self.workers.lock().push(Arc::clone(&handle));
        Ok(handle)
    }

    async fn get_workers(&self) -> Result<Vec<Arc<dyn WorkerHandle>>> {
        Ok(self.workers.lock().iter().map(|w| Arc::clone(w) as Arc<dyn WorkerHandle>).collect())
    }

    async fn publish_event(&self, channel: &str, payload: LifecycleEvent) -> Result<()> {
        self.pubsub.publish(channel, &payload).await
    }

    async fn subscribe_event(&self, channel: &str, handler: EventHandler) -> Result<Unsubscribe> {
        Ok(self.pubsub.subscribe(channel, handler))
    }

    async fn shutdown(&self) -> Result<()> {
        let workers: Vec<Arc<RedisWorkerHandle>> = self.workers.lock().drain(..).collect();
        for worker in workers {
            worker.close().await;
        }
        for task in self.cron_tasks.lock().drain(..) {
            task.abort();
        }
        self.pubsub.shutdown();
        Ok(())
    }
}
