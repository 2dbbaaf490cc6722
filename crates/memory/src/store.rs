// SPDX-License-Identifier: MIT

//! Shared in-process state: job records, the per-queue claim index, queue
//! registrations, and the paused-queue/paused-job-type sets. Guarded by a
//! single `parking_lot::RwLock` (spec §5 "mutated under exclusive access;
//! reads during iteration snapshot keys/values").

use chrono::{DateTime, Utc};
use jobs_core::{CronDefinition, JobDefinition, JobId, JobRecord, JobStatus, LimiterState};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

/// `(priority desc, createdAt asc, id)` ordering key for the waiting-job
/// claim index (spec §4.6 "Selection policy").
pub type ClaimKey = (Reverse<i64>, DateTime<Utc>, JobId);

#[derive(Default)]
pub struct QueueState {
    pub paused: bool,
    pub job_defs: HashMap<String, Arc<JobDefinition>>,
    pub cron_defs: HashMap<String, Arc<CronDefinition>>,
    pub paused_job_types: HashSet<String>,
    pub limiter_state: HashMap<String, LimiterState>,
    pub waiting: BTreeSet<ClaimKey>,
}

#[derive(Default)]
pub struct Store {
    pub records: HashMap<JobId, JobRecord>,
    pub queues: HashMap<String, QueueState>,
}

impl Store {
    pub fn queue_mut(&mut self, name: &str) -> &mut QueueState {
        self.queues.entry(name.to_string()).or_default()
    }

    /// Insert (or re-insert, on promote/retry/resume) a record into its
    /// queue's waiting index.
    pub fn index_waiting(&mut self, record: &JobRecord) {
        let key = (Reverse(record.priority), record.created_at, record.id.clone());
        self.queue_mut(&record.queue).waiting.insert(key);
    }

    pub fn unindex_waiting(&mut self, record: &JobRecord) {
        let key = (Reverse(record.priority), record.created_at, record.id.clone());
        if let Some(q) = self.queues.get_mut(&record.queue) {
            q.waiting.remove(&key);
        }
    }

    /// Pop the next eligible job for `queue` honouring priority/FIFO
    /// order and any job-type pause.
    pub fn claim_next(&mut self, queue: &str) -> Option<JobId> {
        let q = self.queues.get(queue)?;
        if q.paused {
            return None;
        }
        let candidate = q
            .waiting
            .iter()
            .find(|(_, _, id)| {
                self.records
                    .get(id)
                    .map(|r| !q.paused_job_types.contains(&r.name))
                    .unwrap_or(false)
            })
            .cloned()?;
        self.queues.get_mut(queue)?.waiting.remove(&candidate);
        Some(candidate.2)
    }
}

/// One `Notify` per queue so workers can wake as soon as work arrives
/// instead of polling (spec §4.6 "signals workers").
#[derive(Default, Clone)]
pub struct Notifiers {
    inner: Arc<parking_lot::Mutex<HashMap<String, Arc<Notify>>>>,
}

impl Notifiers {
    pub fn get(&self, queue: &str) -> Arc<Notify> {
        self.inner.lock().entry(queue.to_string()).or_insert_with(|| Arc::new(Notify::new())).clone()
    }

    pub fn kick(&self, queue: &str) {
        self.get(queue).notify_waiters();
    }
}

pub fn now_waiting_status(paused: bool, delay_ms: u64) -> JobStatus {
    if paused {
        JobStatus::Paused
    } else if delay_ms > 0 {
        JobStatus::Delayed
    } else {
        JobStatus::Waiting
    }
}

pub fn now_ms(now: DateTime<Utc>) -> u64 {
    now.timestamp_millis().max(0) as u64
}
