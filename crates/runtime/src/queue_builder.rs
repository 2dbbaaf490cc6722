// SPDX-License-Identifier: MIT

//! Accumulates a queue's jobs and crons with name-uniqueness validation
//! (spec §6.1 `IgniterQueue.create(name).addJob(...).addCron(...).build()`).

use crate::spec::{validate_cron_expr, CronSpec, JobSpec};
use jobs_core::{JobsError, Result};
use std::collections::HashMap;

/// The frozen output of [`QueueBuilder::build`]: still keyed by name, not
/// yet wrapped into `jobs_core::JobDefinition`/`CronDefinition` (that
/// happens in `crate::runtime::RuntimeBuilder::build`, once a
/// `contextFactory` is known).
pub struct QueueSpec<C> {
    pub name: String,
    pub jobs: HashMap<String, JobSpec<C>>,
    pub crons: HashMap<String, CronSpec<C>>,
}

pub struct QueueBuilder<C> {
    name: String,
    jobs: HashMap<String, JobSpec<C>>,
    crons: HashMap<String, CronSpec<C>>,
}

impl<C> QueueBuilder<C> {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(JobsError::ConfigurationInvalid("queue name must not be empty".into()));
        }
        Ok(Self { name, jobs: HashMap::new(), crons: HashMap::new() })
    }

    /// Spec §3: "A job name may not collide with a cron name in the same
    /// queue", and no two jobs may share a name.
    pub fn add_job(mut self, spec: JobSpec<C>) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(JobsError::ConfigurationInvalid("job name must not be empty".into()));
        }
        if self.jobs.contains_key(&spec.name) {
            return Err(JobsError::DuplicateJob(spec.name));
        }
        if self.crons.contains_key(&spec.name) {
            return Err(JobsError::InvalidDefinition(format!(
                "job name `{}` collides with a cron of the same name in queue `{}`",
                spec.name, self.name
            )));
        }
        self.jobs.insert(spec.name.clone(), spec);
        Ok(self)
    }

    pub fn add_cron(mut self, spec: CronSpec<C>) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(JobsError::ConfigurationInvalid("cron name must not be empty".into()));
        }
        validate_cron_expr(&spec.cron)?;
        if self.crons.contains_key(&spec.name) {
            return Err(JobsError::DuplicateJob(spec.name));
        }
        if self.jobs.contains_key(&spec.name) {
            return Err(JobsError::InvalidDefinition(format!(
                "cron name `{}` collides with a job of the same name in queue `{}`",
                spec.name, self.name
            )));
        }
        self.crons.insert(spec.name.clone(), spec);
        Ok(self)
    }

    pub fn build(self) -> Result<QueueSpec<C>> {
        Ok(QueueSpec { name: self.name, jobs: self.jobs, crons: self.crons })
    }
}

#[cfg(test)]
#[path = "queue_builder_tests.rs"]
mod tests;
