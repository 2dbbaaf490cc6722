// SPDX-License-Identifier: MIT

//! End-to-end scenarios against the public `jobs-runtime` surface.
//! Scenarios 1-4 and 6 run against `jobs-memory`; scenario 5 needs
//! repeated cron firing, which only `jobs-redis` drives, so it is
//! `#[ignore]`d and requires `REDIS_URL` pointing at a running Redis.

use jobs_core::{JobFuture, JobsError, LifecycleEvent, Result as JobsResult, Validator};
use jobs_memory::MemoryBackend;
use jobs_runtime::{ContextFactory, JobSpec, QueueBuilder, RuntimeBuilder, ScopeDef};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

struct EmailValidator;

impl Validator for EmailValidator {
    fn validate(&self, raw: serde_json::Value) -> std::result::Result<serde_json::Value, JobsError> {
        let email = raw.get("email").and_then(|v| v.as_str()).ok_or_else(|| JobsError::ValidationFailed {
            message: "email is required".into(),
            status: 400,
            details: json!({ "issues": [{ "path": "email", "message": "required" }] }),
        })?;
        if !email.contains('@') {
            return Err(JobsError::ValidationFailed {
                message: "email is not a valid address".into(),
                status: 400,
                details: json!({ "issues": [{ "path": "email", "message": "must contain '@'" }] }),
            });
        }
        Ok(raw)
    }
}

fn context_factory() -> ContextFactory<()> {
    Arc::new(|| Box::pin(async { Ok(()) }) as JobFuture<JobsResult<()>>)
}

fn collect_events() -> (jobs_core::EventHandler, Arc<TokioMutex<Vec<String>>>) {
    let events = Arc::new(TokioMutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let handler: jobs_core::EventHandler = Arc::new(move |event: LifecycleEvent| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().await.push(event.event_type);
        })
    });
    (handler, events)
}

#[tokio::test]
async fn happy_path_on_the_memory_backend() {
    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(
            JobSpec::new(
                "sendWelcome",
                Arc::new(|_ctx, _app, input| {
                    Box::pin(async move {
                        let email = input["email"].as_str().unwrap().to_string();
                        Ok(json!({ "sent": email }))
                    })
                }),
            )
            .with_validator(Arc::new(EmailValidator)),
        )
        .unwrap()
        .build()
        .unwrap();

    let runtime = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    let job = runtime.queue("email").unwrap().job("sendWelcome");
    let (handler, events) = collect_events();
    let _unsub = job.subscribe(handler).await.unwrap();
    let _worker = runtime.worker().add_queue("email").unwrap().start().await.unwrap();

    let id = job.dispatch(json!({ "email": "user@example.com" })).await.unwrap();

    let mut record = None;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let r = job.get(&id).await.unwrap().unwrap();
        if r.status == jobs_core::JobStatus::Completed {
            record = Some(r);
            break;
        }
    }
    let record = record.expect("job did not complete in time");
    assert_eq!(record.result, Some(json!({ "sent": "user@example.com" })));
    assert_eq!(record.attempts_made, 1);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let seen = events.lock().await.clone();
    assert_eq!(seen, vec!["email:sendWelcome:enqueued", "email:sendWelcome:started", "email:sendWelcome:completed"]);
}

#[tokio::test]
async fn validation_rejection_creates_no_record_and_emits_no_events() {
    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(
            JobSpec::new("sendWelcome", Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) })))
                .with_validator(Arc::new(EmailValidator)),
        )
        .unwrap()
        .build()
        .unwrap();

    let runtime = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    let job = runtime.queue("email").unwrap().job("sendWelcome");
    let (handler, events) = collect_events();
    let _unsub = job.subscribe(handler).await.unwrap();

    let err = job.dispatch(json!({ "email": "not-an-email" })).await.unwrap_err();
    assert_eq!(err.code(), "JOBS_VALIDATION_FAILED");

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert!(events.lock().await.is_empty());

    let records = runtime.search_jobs(jobs_core::JobSearchFilter { queue: Some("email".into()), ..Default::default() }).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn retry_then_succeed_on_the_third_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let handler_attempts = Arc::clone(&attempts);

    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(
            JobSpec::new(
                "sendWelcome",
                Arc::new(move |_ctx, _app, input| {
                    let attempts = Arc::clone(&handler_attempts);
                    Box::pin(async move {
                        let made = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                        if made < 3 {
                            return Err(JobsError::ExecutionFailed(format!("attempt {made} failed")));
                        }
                        Ok(input)
                    })
                }),
            )
            .attempts(3),
        )
        .unwrap()
        .build()
        .unwrap();

    let runtime = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    let job = runtime.queue("email").unwrap().job("sendWelcome");
    let (handler, events) = collect_events();
    let _unsub = job.subscribe(handler).await.unwrap();
    let _worker = runtime.worker().add_queue("email").unwrap().start().await.unwrap();

    let id = job.dispatch(json!({})).await.unwrap();

    let mut record = None;
    for _ in 0..200 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let r = job.get(&id).await.unwrap().unwrap();
        if r.status == jobs_core::JobStatus::Completed {
            record = Some(r);
            break;
        }
    }
    let record = record.expect("job did not complete in time");
    assert_eq!(record.attempts_made, 3);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let seen = events.lock().await.clone();
    let started = seen.iter().filter(|e| e.as_str() == "email:sendWelcome:started").count();
    let failed = seen.iter().filter(|e| e.as_str() == "email:sendWelcome:failed").count();
    let completed = seen.iter().filter(|e| e.as_str() == "email:sendWelcome:completed").count();
    assert_eq!(started, 3);
    assert_eq!(failed, 2);
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn scope_required_rejects_unscoped_dispatch_and_tags_metadata() {
    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(JobSpec::new("send", Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) }))))
        .unwrap()
        .build()
        .unwrap();

    let runtime = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_scope(ScopeDef::new("organization").required(true))
        .unwrap()
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    let job = runtime.queue("email").unwrap().job("send");
    let err = job.dispatch(json!({})).await.unwrap_err();
    assert_eq!(err.code(), "JOBS_CONFIGURATION_INVALID");

    let scoped_runtime = runtime.scope("organization", "org_1", None).unwrap();
    let scoped_job = scoped_runtime.queue("email").unwrap().job("send");
    let id = scoped_job.dispatch(json!({})).await.unwrap();

    let record = scoped_job.get(&id).await.unwrap().unwrap();
    let metadata = record.metadata.expect("dispatch merges scope into metadata");
    let scope = metadata.get("__scope").expect("scope was merged into metadata");
    assert_eq!(scope["type"], json!("organization"));
    assert_eq!(scope["id"], json!("org_1"));
}

#[tokio::test]
async fn draining_a_paused_queue_removes_every_waiting_job() {
    let queue = QueueBuilder::<()>::new("email")
        .unwrap()
        .add_job(JobSpec::new("send", Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) }))))
        .unwrap()
        .build()
        .unwrap();

    let runtime = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    let handle = runtime.queue("email").unwrap();
    let job = handle.job("send");
    for _ in 0..3 {
        job.dispatch(json!({})).await.unwrap();
    }

    handle.pause().await.unwrap();
    handle.drain().await.unwrap();

    let counts = runtime.get_queue_info("email").await.unwrap();
    assert_eq!(counts.job_names, vec!["send".to_string()]);
    let records = handle.list(jobs_core::JobSearchFilter::default()).await.unwrap();
    assert!(records.is_empty());
}

/// Requires `REDIS_URL` (e.g. `redis://127.0.0.1:6379`) pointing at a
/// disposable Redis instance — cron filters only matter under repeated,
/// clock-driven firing, which `jobs-memory` never does (spec §9).
#[tokio::test]
#[ignore]
async fn cron_with_weekday_and_skip_date_filters_against_redis() {
    use chrono::NaiveDate;
    use jobs_core::CronFilters;
    use jobs_redis::RedisBackend;
    use jobs_runtime::{CronSpec, UserCronHandler};

    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for this scenario");
    let backend = Arc::new(RedisBackend::connect(&url).await.unwrap());

    let fired = Arc::new(AtomicU32::new(0));
    let handler_fired = Arc::clone(&fired);
    let cron_handler: UserCronHandler<()> = Arc::new(move |_ctx, _app| {
        let fired = Arc::clone(&handler_fired);
        Box::pin(async move {
            fired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let filters = CronFilters {
        only_weekdays: Some(vec![1, 2, 3, 4, 5]),
        skip_dates: vec![NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()],
        ..CronFilters::default()
    };

    let queue = QueueBuilder::<()>::new("reports")
        .unwrap()
        .add_cron(CronSpec::new("nightly", "0 9 * * *", cron_handler).filters(filters))
        .unwrap()
        .build()
        .unwrap();

    let _runtime = RuntimeBuilder::<RedisBackend, ()>::new()
        .with_adapter(backend)
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_queue(queue)
        .unwrap()
        .build()
        .await
        .unwrap();

    // A real assertion here needs a `FakeClock`-driven scheduler tick,
    // which `jobs-redis` does not expose publicly; this scenario is a
    // wiring smoke test until such a hook exists.
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
