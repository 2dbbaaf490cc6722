// SPDX-License-Identifier: MIT

use super::*;
use crate::spec::{CronSpec, JobSpec};
use std::sync::Arc;

fn handler() -> crate::spec::UserJobHandler<()> {
    Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) }))
}

fn cron_handler() -> crate::spec::UserCronHandler<()> {
    Arc::new(|_ctx, _app| Box::pin(async move { Ok(()) }))
}

#[test]
fn rejects_empty_queue_name() {
    assert!(QueueBuilder::<()>::new("").is_err());
}

#[test]
fn rejects_duplicate_job_names() {
    let builder = QueueBuilder::<()>::new("email").unwrap();
    let builder = builder.add_job(JobSpec::new("sendWelcome", handler())).unwrap();
    let err = builder.add_job(JobSpec::new("sendWelcome", handler())).unwrap_err();
    assert!(matches!(err, JobsError::DuplicateJob(name) if name == "sendWelcome"));
}

#[test]
fn rejects_job_name_colliding_with_cron_name() {
    let builder = QueueBuilder::<()>::new("email").unwrap();
    let builder = builder.add_cron(CronSpec::new("nightly", "0 0 * * * *", cron_handler())).unwrap();
    assert!(builder.add_job(JobSpec::new("nightly", handler())).is_err());
}

#[test]
fn rejects_cron_name_colliding_with_job_name() {
    let builder = QueueBuilder::<()>::new("email").unwrap();
    let builder = builder.add_job(JobSpec::new("nightly", handler())).unwrap();
    assert!(builder.add_cron(CronSpec::new("nightly", "0 0 * * * *", cron_handler())).is_err());
}

#[test]
fn rejects_invalid_cron_expression() {
    let builder = QueueBuilder::<()>::new("email").unwrap();
    assert!(builder.add_cron(CronSpec::new("nightly", "not a cron", cron_handler())).is_err());
}

#[test]
fn builds_queue_spec_with_jobs_and_crons() {
    let builder = QueueBuilder::<()>::new("email").unwrap();
    let builder = builder.add_job(JobSpec::new("sendWelcome", handler())).unwrap();
    let builder = builder.add_cron(CronSpec::new("nightly", "0 0 * * * *", cron_handler())).unwrap();
    let spec = builder.build().unwrap();
    assert_eq!(spec.name, "email");
    assert!(spec.jobs.contains_key("sendWelcome"));
    assert!(spec.crons.contains_key("nightly"));
}
