// SPDX-License-Identifier: MIT

use super::*;
use crate::queue_builder::QueueBuilder;
use crate::runtime::RuntimeBuilder;
use crate::spec::{ContextFactory, JobSpec};
use jobs_core::JobFuture;
use jobs_memory::MemoryBackend;
use std::sync::Arc;

fn context_factory() -> ContextFactory<()> {
    Arc::new(|| Box::pin(async { Ok(()) }) as JobFuture<Result<()>>)
}

async fn build_runtime() -> Arc<Runtime<MemoryBackend>> {
    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(JobSpec::new("sendWelcome", Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) }))))
        .unwrap()
        .build()
        .unwrap();

    RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn rejects_queue_not_registered_on_the_runtime() {
    let runtime = build_runtime().await;
    assert!(runtime.worker().add_queue("unknown").is_err());
}

#[tokio::test]
async fn rejects_zero_concurrency() {
    let runtime = build_runtime().await;
    assert!(runtime.worker().with_concurrency(0).is_err());
}

#[tokio::test]
async fn rejects_degenerate_limiter() {
    let runtime = build_runtime().await;
    assert!(runtime.worker().with_limiter(jobs_core::LimiterConfig { max: 0, duration_ms: 1000 }).is_err());
}

#[tokio::test]
async fn starts_a_worker_over_an_attached_queue() {
    let runtime = build_runtime().await;
    let worker = runtime.worker().add_queue("email").unwrap().with_concurrency(2).unwrap().start().await.unwrap();
    assert_eq!(worker.queues(), &["email".to_string()]);
    worker.close().await;
}
