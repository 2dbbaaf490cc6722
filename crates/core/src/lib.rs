// SPDX-License-Identifier: MIT

//! Core types for the jobs runtime: ids, clock, prefixer, scope, error
//! taxonomy, input validation, lifecycle events, records, definitions,
//! and the `Backend` contract every backend crate implements. No I/O
//! lives here — that is `jobs-memory`/`jobs-redis`'s job.

#[macro_use]
mod macros;

pub mod backend;
pub mod backoff;
pub mod clock;
pub mod definition;
pub mod error;
pub mod event;
pub mod id;
pub mod limiter;
pub mod logger;
pub mod prefix;
pub mod record;
pub mod scope;
pub mod telemetry;
pub mod validate;

pub use backend::{
    Backend, CleanOptions, DispatchParams, EventHandler, JobCounts, JobSearchFilter, QueueInfo,
    ScheduleParams, Unsubscribe, WorkerConfig, WorkerHandle, WorkerMetricsSnapshot,
};
pub use backoff::BackoffPolicy;
pub use clock::{Clock, FakeClock, SystemClock};
pub use definition::{
    CronDefinition, CronFilters, JobContext, JobDefinition, JobFuture, JobHandler, LimiterConfig,
    QueueDef, RemovePolicy,
};
pub use error::{JobsError, Result};
pub use event::{event_type, LifecycleEvent, Phase};
pub use id::{CronId, JobId, WorkerId};
pub use limiter::{FixedWindowLimiter, LimiterState};
pub use logger::{default_logger, Logger};
pub use prefix::{channel_for, events_channel, queue_name, scoped_events_channel, BASE_PREFIX};
pub use record::{JobRecord, JobStatus, LogEntry, LogLevel, WorkerMetrics, WorkerRecord};
pub use scope::{extract_scope_from_metadata, merge_metadata_with_scope, Metadata, Scope, ScopeId};
pub use telemetry::{noop_telemetry, Attributes, EmitOptions, Level, Telemetry};
pub use validate::{typed_validator, NoopValidator, Validator};
