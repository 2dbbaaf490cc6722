// SPDX-License-Identifier: MIT

//! Retry backoff policy (§7, expanded per SPEC_FULL §2.2). The in-memory
//! backend re-kicks immediately per spec §4.6 regardless of policy; the
//! durable backend consults this to compute the delay before a failed
//! job's next attempt becomes `waiting` again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    Fixed { delay_ms: u64 },
    Exponential { base_ms: u64, factor: f64, max_ms: u64 },
}

impl BackoffPolicy {
    /// Delay before attempt number `attempt` (1-indexed, the attempt that
    /// just failed) is retried.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        match *self {
            BackoffPolicy::Fixed { delay_ms } => delay_ms,
            BackoffPolicy::Exponential { base_ms, factor, max_ms } => {
                let exp = factor.powi(attempt.saturating_sub(1) as i32);
                let delay = (base_ms as f64 * exp).round();
                if delay.is_finite() {
                    (delay as u64).min(max_ms)
                } else {
                    max_ms
                }
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed { delay_ms: 0 }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
