// SPDX-License-Identifier: MIT

//! Local (in-process) registry of job/cron definitions. Handlers are
//! closures and cannot be serialised into Redis, so — exactly like
//! `jobs-memory` — every process that wants to execute a given job or
//! cron must register it itself; only the job *records* are durable.

use jobs_core::{CronDefinition, JobDefinition};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct QueueRegistration {
    pub job_defs: HashMap<String, Arc<JobDefinition>>,
    pub cron_defs: HashMap<String, Arc<CronDefinition>>,
}

#[derive(Default)]
pub struct Registry {
    queues: RwLock<HashMap<String, QueueRegistration>>,
}

impl Registry {
    pub fn register_job(&self, queue: &str, name: &str, def: Arc<JobDefinition>) {
        self.queues.write().entry(queue.to_string()).or_default().job_defs.insert(name.to_string(), def);
    }

    pub fn register_cron(&self, queue: &str, name: &str, def: Arc<CronDefinition>) {
        self.queues.write().entry(queue.to_string()).or_default().cron_defs.insert(name.to_string(), def);
    }

    pub fn job_def(&self, queue: &str, name: &str) -> Option<Arc<JobDefinition>> {
        self.queues.read().get(queue).and_then(|q| q.job_defs.get(name).cloned())
    }

    pub fn job_names(&self, queue: &str) -> Vec<String> {
        self.queues.read().get(queue).map(|q| q.job_defs.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn cron_names(&self, queue: &str) -> Vec<String> {
        self.queues.read().get(queue).map(|q| q.cron_defs.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn crons(&self, queue: &str) -> Vec<(String, Arc<CronDefinition>)> {
        self.queues.read().get(queue).map(|q| q.cron_defs.iter().map(|(n, d)| (n.clone(), Arc::clone(d))).collect()).unwrap_or_default()
    }

    pub fn known_queues(&self) -> Vec<String> {
        self.queues.read().keys().cloned().collect()
    }
}
