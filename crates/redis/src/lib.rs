// SPDX-License-Identifier: MIT

//! Durable implementation of `jobs_core::Backend` on top of Redis (spec
//! §4.7). Job/cron records and queue indexes live in Redis, manipulated
//! through atomic Lua scripts; job/cron handler closures stay local to the
//! process via [`registry::Registry`]. Unlike `jobs-memory`, this backend
//! drives repeated `cron`/`every` firing itself (spec §9).

mod backend;
mod cron;
mod cron_scheduler;
mod envelope;
mod error;
mod keys;
mod pubsub;
mod registry;
mod score;
mod script;
mod worker;

pub use backend::RedisBackend;
pub use worker::RedisWorkerHandle;
