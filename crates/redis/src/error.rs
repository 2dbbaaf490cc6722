// SPDX-License-Identifier: MIT

//! Maps transport/encoding failures onto the shared [`JobsError`]
//! taxonomy. `jobs-core` stays Redis-agnostic, so this conversion lives
//! here rather than as a `From` impl upstream.

use jobs_core::JobsError;

pub fn from_redis(err: redis::RedisError) -> JobsError {
    if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
        JobsError::AdapterConnectionFailed(err.to_string())
    } else {
        JobsError::AdapterError(err.to_string())
    }
}

pub fn from_json(err: serde_json::Error) -> JobsError {
    JobsError::AdapterError(format!("malformed job record: {err}"))
}
