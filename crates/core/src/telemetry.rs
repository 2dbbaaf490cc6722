// SPDX-License-Identifier: MIT

//! Telemetry adapter (spec §6.5). No-op when the application hasn't wired
//! one in; the runtime always calls through this trait rather than
//! branching on "is telemetry configured".

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
}

impl Default for Level {
    fn default() -> Self {
        Level::Debug
    }
}

/// Attribute values are restricted to JSON primitives per spec §6.5.
pub type Attributes = HashMap<String, Value>;

pub struct EmitOptions {
    pub attributes: Attributes,
    pub level: Level,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { attributes: Attributes::new(), level: Level::Debug }
    }
}

/// Telemetry sink under the `igniter.jobs.*` namespace (`job.*`, `worker.*`,
/// `queue.*` event groups — see spec §6.5 for the full emitted-event list).
pub trait Telemetry: Send + Sync {
    fn service(&self) -> &str;
    fn environment(&self) -> &str;
    fn emit(&self, name: &str, options: EmitOptions);
}

pub struct NoopTelemetry {
    service: String,
    environment: String,
}

impl NoopTelemetry {
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self { service: service.into(), environment: environment.into() }
    }
}

impl Telemetry for NoopTelemetry {
    fn service(&self) -> &str {
        &self.service
    }

    fn environment(&self) -> &str {
        &self.environment
    }

    fn emit(&self, _name: &str, _options: EmitOptions) {}
}

pub fn noop_telemetry(service: impl Into<String>, environment: impl Into<String>) -> Arc<dyn Telemetry> {
    Arc::new(NoopTelemetry::new(service, environment))
}
