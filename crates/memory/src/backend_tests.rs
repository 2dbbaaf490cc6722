// SPDX-License-Identifier: MIT

use super::*;
use jobs_core::{DispatchParams, JobDefinition, JobHandler};
use std::sync::Arc;

fn echo_handler() -> JobHandler {
    Arc::new(|_ctx, input| Box::pin(async move { Ok(input) }))
}

#[tokio::test]
async fn dispatch_without_delay_is_immediately_waiting() {
    let backend = MemoryBackend::new();
    let id = backend.dispatch(DispatchParams::new("email", "sendWelcome", serde_json::json!({}))).await.unwrap();
    let state = backend.get_job_state(&id).await.unwrap();
    assert_eq!(state, Some(JobStatus::Waiting));
}

#[tokio::test]
async fn dispatch_with_delay_starts_delayed_then_promotes() {
    let backend = MemoryBackend::new();
    let mut params = DispatchParams::new("email", "sendWelcome", serde_json::json!({}));
    params.delay_ms = Some(30);
    let id = backend.dispatch(params).await.unwrap();
    assert_eq!(backend.get_job_state(&id).await.unwrap(), Some(JobStatus::Delayed));
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    assert_eq!(backend.get_job_state(&id).await.unwrap(), Some(JobStatus::Waiting));
}

#[tokio::test]
async fn worker_claims_and_completes_a_waiting_job() {
    let backend = Arc::new(MemoryBackend::new());
    backend.register_job("email", "sendWelcome", Arc::new(JobDefinition::new("sendWelcome", echo_handler()))).await.unwrap();
    let worker = backend.create_worker(WorkerConfig::new(vec!["email".into()])).await.unwrap();

    let id = backend.dispatch(DispatchParams::new("email", "sendWelcome", serde_json::json!({"email": "a@example.com"}))).await.unwrap();

    let mut record = None;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let r = backend.get_job(&id).await.unwrap().unwrap();
        if r.status == JobStatus::Completed {
            record = Some(r);
            break;
        }
    }
    let record = record.expect("job did not complete in time");
    assert_eq!(record.attempts_made, 1);
    assert_eq!(record.result, Some(serde_json::json!({"email": "a@example.com"})));
    worker.close().await;
}

#[tokio::test]
async fn failing_handler_retries_until_max_attempts() {
    let backend = Arc::new(MemoryBackend::new());
    let handler: JobHandler = Arc::new(|_ctx, _input| Box::pin(async move { Err(JobsError::ExecutionFailed("boom".into())) }));
    backend.register_job("email", "flaky", Arc::new(JobDefinition::new("flaky", handler).attempts(2))).await.unwrap();
    let worker = backend.create_worker(WorkerConfig::new(vec!["email".into()])).await.unwrap();

    let id = backend.dispatch(DispatchParams::new("email", "flaky", serde_json::json!({}))).await.unwrap();

    let mut record = None;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let r = backend.get_job(&id).await.unwrap().unwrap();
        if r.status == JobStatus::Failed {
            record = Some(r);
            break;
        }
    }
    let record = record.expect("job did not fail in time");
    assert_eq!(record.attempts_made, 2);
    worker.close().await;
}

#[tokio::test]
async fn pause_queue_prevents_new_claims_until_resumed() {
    let backend = Arc::new(MemoryBackend::new());
    backend.register_job("email", "sendWelcome", Arc::new(JobDefinition::new("sendWelcome", echo_handler()))).await.unwrap();
    backend.pause_queue("email").await.unwrap();

    let id = backend.dispatch(DispatchParams::new("email", "sendWelcome", serde_json::json!({}))).await.unwrap();
    assert_eq!(backend.get_job_state(&id).await.unwrap(), Some(JobStatus::Paused));

    let worker = backend.create_worker(WorkerConfig::new(vec!["email".into()])).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(backend.get_job_state(&id).await.unwrap(), Some(JobStatus::Paused));

    backend.resume_queue("email").await.unwrap();
    let mut completed = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if backend.get_job_state(&id).await.unwrap() == Some(JobStatus::Completed) {
            completed = true;
            break;
        }
    }
    assert!(completed);
    worker.close().await;
}

#[tokio::test]
async fn drain_queue_removes_waiting_and_paused_records() {
    let backend = MemoryBackend::new();
    for _ in 0..3 {
        backend.dispatch(DispatchParams::new("email", "sendWelcome", serde_json::json!({}))).await.unwrap();
    }
    backend.pause_queue("email").await.unwrap();
    backend.drain_queue("email").await.unwrap();
    let counts = backend.get_queue_job_counts("email").await.unwrap();
    assert_eq!(counts.waiting, 0);
    assert_eq!(counts.paused, 0);
}

#[tokio::test]
async fn retry_all_in_queue_resets_attempts_made() {
    let backend = MemoryBackend::new();
    let id = backend.dispatch(DispatchParams::new("email", "flaky", serde_json::json!({}))).await.unwrap();
    backend.move_job_to_failed(&id, "boom".into()).await.unwrap();
    let before = backend.get_job(&id).await.unwrap().unwrap();
    assert_eq!(before.status, JobStatus::Failed);

    let retried = backend.retry_all_in_queue("email").await.unwrap();
    assert_eq!(retried, 1);
    let after = backend.get_job(&id).await.unwrap().unwrap();
    assert_eq!(after.status, JobStatus::Waiting);
    assert_eq!(after.attempts_made, 0);
}

#[tokio::test]
async fn publish_and_subscribe_roundtrip() {
    let backend = MemoryBackend::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let unsubscribe = backend
        .subscribe_event(
            "igniter:jobs:events:test:svc",
            Arc::new(move |event| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx.send(event);
                })
            }),
        )
        .await
        .unwrap();

    let event = jobs_core::LifecycleEvent::new("email", "sendWelcome", jobs_core::Phase::Completed, serde_json::json!({}), chrono::Utc::now(), None);
    backend.publish_event("igniter:jobs:events:test:svc", event).await.unwrap();

    let received = rx.recv().await.expect("expected an event");
    assert_eq!(received.event_type, "email:sendWelcome:completed");
    unsubscribe();
}
