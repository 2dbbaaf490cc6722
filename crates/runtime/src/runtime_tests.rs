// SPDX-License-Identifier: MIT

use super::*;
use crate::spec::ContextFactory;
use jobs_core::JobFuture;
use jobs_memory::MemoryBackend;

fn context_factory() -> ContextFactory<()> {
    Arc::new(|| Box::pin(async { Ok(()) }) as JobFuture<Result<()>>)
}

#[tokio::test]
async fn build_requires_an_adapter() {
    let err = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, JobsError::AdapterRequired));
}

#[tokio::test]
async fn build_requires_a_service_name() {
    let err = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_environment("test")
        .with_context(context_factory())
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, JobsError::ServiceRequired));
}

#[tokio::test]
async fn build_requires_a_context_factory() {
    let err = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, JobsError::ContextRequired));
}

#[tokio::test]
async fn the_same_backend_instance_cannot_register_twice() {
    let adapter = Arc::new(MemoryBackend::new());
    let first = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::clone(&adapter))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .build()
        .await;
    assert!(first.is_ok());

    let second = RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(adapter)
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .build()
        .await;
    assert!(matches!(second, Err(JobsError::ConfigurationInvalid(_))));
}

async fn build_scoped_runtime() -> Arc<Runtime<MemoryBackend>> {
    RuntimeBuilder::<MemoryBackend, ()>::new()
        .with_adapter(Arc::new(MemoryBackend::new()))
        .with_service("svc")
        .with_environment("test")
        .with_context(context_factory())
        .add_scope(ScopeDef::new("tenant").required(true))
        .unwrap()
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn resolve_scope_requires_a_scope_when_declared_required() {
    let runtime = build_scoped_runtime().await;
    assert!(runtime.resolve_scope(None).is_err());
}

#[tokio::test]
async fn scope_binds_an_identity_that_resolve_scope_then_returns() {
    let runtime = build_scoped_runtime().await;
    let scoped = runtime.scope("tenant", "acme", None).unwrap();
    let resolved = scoped.resolve_scope(None).unwrap().expect("bound scope present");
    assert_eq!(resolved.id.to_string(), "acme");
}

#[tokio::test]
async fn scope_rejects_a_type_the_runtime_never_declared() {
    let runtime = build_scoped_runtime().await;
    assert!(runtime.scope("org", "acme", None).is_err());
}

#[tokio::test]
async fn per_call_scope_conflicting_with_bound_scope_is_rejected() {
    let runtime = build_scoped_runtime().await;
    let scoped = runtime.scope("tenant", "acme", None).unwrap();
    let other = Scope::new("tenant", "other");
    assert!(scoped.resolve_scope(Some(other)).is_err());
}
