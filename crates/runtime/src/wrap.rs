// SPDX-License-Identifier: MIT

//! Builds the actual `jobs_core::JobHandler`/`CronHandler` registered with
//! a backend, wrapping the caller's typed handler with the nine-step
//! pipeline from spec §4.10:
//!
//! 1. Materialise `contextFactory` fresh for this attempt.
//! 2. Extract scope from the job record (already on `JobContext`).
//! 3. Validate input, replacing it with the validated value.
//! 4. Publish `"started"`; emit telemetry `job.started`.
//! 5. Invoke `onStart`.
//! 6. Run the handler.
//! 7. On success: publish `"completed"`, emit `job.completed`, invoke `onSuccess`.
//! 8. On failure: publish `"failed"` with `isFinalAttempt`, emit `job.failed`,
//!    invoke `onFailure`, re-raise for the backend's retry/backoff.
//! 9. Progress reports flow through a wrapped `report_progress` that
//!    publishes `"progress"`, emits telemetry, then calls `onProgress`.
//!
//! Cron handlers get the abbreviated form: no input/validation, and a
//! failure publishes `"failed"` and re-raises without a retry concept.

use crate::runtime::RuntimeInner;
use crate::spec::{ContextFactory, CronSpec, JobSpec, UserCronHandler, UserJobHandler};
use jobs_core::definition::CronHandler;
use jobs_core::{
    channel_for, Backend, CronDefinition, EmitOptions, JobContext, JobDefinition, JobFuture, JobHandler, JobsError,
    Level, LifecycleEvent, NoopValidator, Phase, Result, Validator,
};
use serde_json::Value;
use std::sync::Arc;

pub(crate) async fn publish(inner: &RuntimeInner<impl Backend>, event: LifecycleEvent) {
    let channel = channel_for(&inner.environment, &inner.service, event.scope.as_ref());
    if let Err(err) = inner.backend.publish_event(&channel, event).await {
        inner.logger.error(&format!("failed to publish lifecycle event: {err}"));
    }
}

pub(crate) fn emit(inner: &RuntimeInner<impl Backend>, name: &str, data: Value, level: Level) {
    let mut attributes = jobs_core::Attributes::new();
    if let Value::Object(map) = data {
        attributes.extend(map);
    }
    inner.telemetry.emit(name, EmitOptions { attributes, level });
}

pub(crate) fn wrap_job<B, C>(inner: Arc<RuntimeInner<B>>, context_factory: ContextFactory<C>, queue: String, spec: JobSpec<C>) -> Arc<JobDefinition>
where
    B: Backend,
    C: Send + 'static,
{
    let validator: Arc<dyn Validator> = spec.validator.clone().unwrap_or_else(|| Arc::new(NoopValidator));
    let on_start = spec.on_start.clone();
    let on_progress = spec.on_progress.clone();
    let on_success = spec.on_success.clone();
    let on_failure = spec.on_failure.clone();
    let user_handler: UserJobHandler<C> = Arc::clone(&spec.handler);
    let job_name = spec.name.clone();
    let queue_for_handler = queue.clone();

    let handler: JobHandler = Arc::new(move |ctx: JobContext, input: Value| {
        let inner = Arc::clone(&inner);
        let context_factory = Arc::clone(&context_factory);
        let validator = Arc::clone(&validator);
        let on_start = on_start.clone();
        let on_progress = on_progress.clone();
        let on_success = on_success.clone();
        let on_failure = on_failure.clone();
        let user_handler = Arc::clone(&user_handler);
        let queue = queue_for_handler.clone();
        let job_name = job_name.clone();

        Box::pin(async move {
            let app_ctx = (context_factory)().await.map_err(|err| JobsError::ContextFactoryFailed(err.to_string()))?;
            let validated = validator.validate(input)?;

            let ctx_for_progress = ctx.clone();
            let inner_for_progress = Arc::clone(&inner);
            let queue_for_progress = queue.clone();
            let name_for_progress = job_name.clone();
            let report_progress: Arc<dyn Fn(u8, Option<String>) + Send + Sync> = Arc::new(move |progress, message| {
                ctx_for_progress.report_progress(progress, message.clone());
                let event = LifecycleEvent::new(
                    &queue_for_progress,
                    &name_for_progress,
                    Phase::Progress,
                    serde_json::json!({ "progress": progress, "message": message }),
                    inner_for_progress.clock.now(),
                    ctx_for_progress.scope.clone(),
                );
                emit(
                    &inner_for_progress,
                    "igniter.jobs.job.progress",
                    serde_json::json!({ "queue": queue_for_progress, "job": name_for_progress, "progress": progress }),
                    Level::Debug,
                );
                if let Some(hook) = &on_progress {
                    hook(&ctx_for_progress, progress, message.as_deref());
                }
                let inner = Arc::clone(&inner_for_progress);
                tokio::spawn(async move { publish(&inner, event).await });
            });

            let inner_ctx = JobContext::new(
                ctx.job_id.clone(),
                ctx.queue.clone(),
                ctx.name.clone(),
                ctx.attempts_made,
                ctx.max_attempts,
                ctx.scope.clone(),
                report_progress,
            );

            let started = inner.clock.now();
            publish(
                &inner,
                LifecycleEvent::new(&queue, &job_name, Phase::Started, Value::Null, started, ctx.scope.clone()),
            )
            .await;
            emit(&inner, "igniter.jobs.job.started", serde_json::json!({ "queue": queue, "job": job_name }), Level::Debug);
            if let Some(hook) = &on_start {
                hook(&ctx);
            }

            let result = (user_handler)(inner_ctx, app_ctx, validated).await;
            let now = inner.clock.now();
            let duration_ms = (now - started).num_milliseconds().max(0);

            match result {
                Ok(value) => {
                    publish(
                        &inner,
                        LifecycleEvent::new(
                            &queue,
                            &job_name,
                            Phase::Completed,
                            serde_json::json!({ "durationMs": duration_ms, "result": value }),
                            now,
                            ctx.scope.clone(),
                        ),
                    )
                    .await;
                    emit(
                        &inner,
                        "igniter.jobs.job.completed",
                        serde_json::json!({ "queue": queue, "job": job_name, "durationMs": duration_ms }),
                        Level::Debug,
                    );
                    if let Some(hook) = &on_success {
                        hook(&ctx, &value);
                    }
                    Ok(value)
                }
                Err(err) => {
                    let is_final_attempt = ctx.attempts_made >= ctx.max_attempts;
                    publish(
                        &inner,
                        LifecycleEvent::new(
                            &queue,
                            &job_name,
                            Phase::Failed,
                            serde_json::json!({
                                "durationMs": duration_ms,
                                "error": err.to_string(),
                                "isFinalAttempt": is_final_attempt,
                            }),
                            now,
                            ctx.scope.clone(),
                        ),
                    )
                    .await;
                    emit(
                        &inner,
                        "igniter.jobs.job.failed",
                        serde_json::json!({ "queue": queue, "job": job_name, "durationMs": duration_ms }),
                        Level::Error,
                    );
                    if let Some(hook) = &on_failure {
                        hook(&ctx, &err);
                    }
                    Err(err)
                }
            }
        }) as JobFuture<Result<Value>>
    });

    let mut def = JobDefinition::new(spec.name.clone(), handler);
    if let Some(validator) = spec.validator {
        def = def.with_validator(validator);
    }
    def = def.attempts(spec.attempts.unwrap_or(3));
    def = def.priority(spec.priority.unwrap_or(0));
    def = def.delay_ms(spec.delay_ms.unwrap_or(0));
    if let Some(policy) = spec.remove_on_complete {
        def = def.remove_on_complete(policy);
    }
    if let Some(policy) = spec.remove_on_fail {
        def = def.remove_on_fail(policy);
    }
    if let Some(metadata) = spec.metadata {
        def = def.metadata(metadata);
    }
    if let Some(limiter) = spec.limiter {
        def = def.limiter(limiter);
    }
    if let Some(backoff) = spec.backoff {
        def = def.backoff(backoff);
    }
    if let Some(hook) = spec.on_start {
        def = def.on_start(hook);
    }
    if let Some(hook) = spec.on_progress {
        def = def.on_progress(hook);
    }
    if let Some(hook) = spec.on_success {
        def = def.on_success(hook);
    }
    if let Some(hook) = spec.on_failure {
        def = def.on_failure(hook);
    }
    Arc::new(def)
}

pub(crate) fn wrap_cron<B, C>(inner: Arc<RuntimeInner<B>>, context_factory: ContextFactory<C>, queue: String, spec: CronSpec<C>) -> Arc<CronDefinition>
where
    B: Backend,
    C: Send + 'static,
{
    let on_failure = spec.on_failure.clone();
    let user_handler: UserCronHandler<C> = Arc::clone(&spec.handler);
    let cron_name = spec.name.clone();

    let handler: CronHandler = Arc::new(move |ctx: JobContext| {
        let inner = Arc::clone(&inner);
        let context_factory = Arc::clone(&context_factory);
        let on_failure = on_failure.clone();
        let user_handler = Arc::clone(&user_handler);
        let queue = queue.clone();
        let cron_name = cron_name.clone();

        Box::pin(async move {
            let app_ctx = (context_factory)().await.map_err(|err| JobsError::ContextFactoryFailed(err.to_string()))?;
            let started = inner.clock.now();
            let result = (user_handler)(ctx.clone(), app_ctx).await;
            if let Err(err) = &result {
                let now = inner.clock.now();
                publish(
                    &inner,
                    LifecycleEvent::new(
                        &queue,
                        &cron_name,
                        Phase::Failed,
                        serde_json::json!({
                            "durationMs": (now - started).num_milliseconds().max(0),
                            "error": err.to_string(),
                        }),
                        now,
                        ctx.scope.clone(),
                    ),
                )
                .await;
                emit(&inner, "igniter.jobs.job.failed", serde_json::json!({ "queue": queue, "job": cron_name }), Level::Error);
                if let Some(hook) = &on_failure {
                    hook(&ctx, err);
                }
            }
            result
        }) as JobFuture<Result<()>>
    });

    let mut def = CronDefinition::new(spec.name, spec.cron, handler);
    if let Some(tz) = spec.tz {
        def = def.tz(tz);
    }
    if let Some(max) = spec.max_executions {
        def = def.max_executions(max);
    }
    if let Some(start) = spec.start_date {
        def = def.start_date(start);
    }
    if let Some(end) = spec.end_date {
        def = def.end_date(end);
    }
    def = def.filters(spec.filters);
    Arc::new(def)
}
