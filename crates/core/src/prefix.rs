// SPDX-License-Identifier: MIT

//! Canonical key/channel naming. Pure and deterministic: given the same
//! inputs these functions always produce the same string, so both
//! backends and tests can derive keys independently without sharing state.

use crate::scope::Scope;

/// Root namespace under which every queue key and event channel lives.
pub const BASE_PREFIX: &str = "igniter:jobs";

/// Canonical Redis/registry key for a queue.
pub fn queue_name(queue: &str) -> String {
    format!("{BASE_PREFIX}:{queue}")
}

/// Global event channel for a service in an environment.
pub fn events_channel(environment: &str, service: &str) -> String {
    format!("{BASE_PREFIX}:events:{environment}:{service}")
}

/// Event channel narrowed to a single scope, when the runtime has one bound.
pub fn scoped_events_channel(environment: &str, service: &str, scope: &Scope) -> String {
    format!(
        "{}:scope:{}:{}",
        events_channel(environment, service),
        scope.kind,
        scope.id,
    )
}

/// The channel a given runtime (service/environment, optionally scoped)
/// should publish and subscribe on.
pub fn channel_for(environment: &str, service: &str, scope: Option<&Scope>) -> String {
    match scope {
        Some(scope) => scoped_events_channel(environment, service, scope),
        None => events_channel(environment, service),
    }
}

#[cfg(test)]
#[path = "prefix_tests.rs"]
mod tests;
