// SPDX-License-Identifier: MIT

//! Typed builder and proxy layer over `jobs-core`/`jobs-backend`
//! (spec §4.10, §6.1). Wraps application-context-aware handlers into
//! the context-free `JobHandler`/`CronHandler` a `Backend` registers,
//! and hands applications a typed `Runtime` to dispatch, schedule, and
//! manage queues and workers through.

mod handle;
mod queue_builder;
mod runtime;
mod scope_def;
mod spec;
mod worker_builder;
mod wrap;

pub use handle::{JobHandle, QueueHandle};
pub use queue_builder::{QueueBuilder, QueueSpec};
pub use runtime::{AutoStartWorkerConfig, Runtime, RuntimeBuilder};
pub use scope_def::ScopeDef;
pub use spec::{ContextFactory, CronSpec, JobSpec, QueueDefaults, UserCronHandler, UserJobHandler, WorkerDefaults};
pub use worker_builder::WorkerBuilder;
