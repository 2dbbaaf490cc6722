// SPDX-License-Identifier: MIT

//! In-process reference implementation of `jobs_core::Backend`. Volatile
//! (state is lost on restart) and cooperative-only for cron/every
//! schedules (spec §4.6, §9) — the durable backend in `jobs-redis`
//! drives repeated schedules.

mod backend;
mod pubsub;
mod store;
mod worker;

pub use backend::MemoryBackend;
pub use worker::MemoryWorkerHandle;
