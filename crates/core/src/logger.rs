// SPDX-License-Identifier: MIT

//! Best-effort logging sink (spec §6.5). Calls must never fail or panic —
//! a broken logger must not be able to take down a worker loop.

use std::sync::Arc;

pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn success(&self, message: &str) {
        self.debug(message);
    }
    fn error(&self, message: &str);
}

/// Default logger, backed by `tracing`. Matches the template's use of
/// `tracing` throughout the daemon/engine crates.
#[derive(Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "jobs", "{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(target: "jobs", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "jobs", "{message}");
    }
}

/// Logger that drops every call. Used when the builder omits `.withLogger(...)`.
#[derive(Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
