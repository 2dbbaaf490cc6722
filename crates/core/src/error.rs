// SPDX-License-Identifier: MIT

//! Stable error taxonomy shared by every backend and the runtime manager.
//!
//! Every variant carries a stable `code()` string so application code and
//! tests can match on the error kind without depending on message text.

use serde_json::Value;
use thiserror::Error;

/// Errors raised across the jobs core: builder validation, dispatch,
/// backend operations, and handler wrapping.
#[derive(Debug, Error)]
pub enum JobsError {
    #[error("adapter is required")]
    AdapterRequired,

    #[error("service name is required")]
    ServiceRequired,

    #[error("context factory is required")]
    ContextRequired,

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("queue already defined: {0}")]
    QueueDuplicate(String),

    #[error("queue operation failed: {0}")]
    QueueOperationFailed(String),

    #[error("invalid job/cron definition: {0}")]
    InvalidDefinition(String),

    #[error("handler is required for {0}")]
    HandlerRequired(String),

    #[error("duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job is not registered: {0}")]
    NotRegistered(String),

    #[error("job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("job timed out after {0}ms")]
    Timeout(u64),

    #[error("application context factory failed: {0}")]
    ContextFactoryFailed(String),

    /// Input validation failure. Carries the raw validator issues so
    /// callers can surface field-level detail, per spec §4.4's "details".
    #[error("input validation failed: {message}")]
    ValidationFailed { message: String, status: u16, details: Value },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("a scope has already been defined for this runtime")]
    ScopeAlreadyDefined,

    #[error("worker failed: {0}")]
    WorkerFailed(String),

    #[error("adapter error: {0}")]
    AdapterError(String),

    #[error("adapter connection failed: {0}")]
    AdapterConnectionFailed(String),

    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
}

impl JobsError {
    /// Stable, machine-matchable error code (see spec §7).
    pub fn code(&self) -> &'static str {
        match self {
            Self::AdapterRequired => "JOBS_ADAPTER_REQUIRED",
            Self::ServiceRequired => "JOBS_SERVICE_REQUIRED",
            Self::ContextRequired => "JOBS_CONTEXT_REQUIRED",
            Self::ConfigurationInvalid(_) => "JOBS_CONFIGURATION_INVALID",
            Self::QueueNotFound(_) => "JOBS_QUEUE_NOT_FOUND",
            Self::QueueDuplicate(_) => "JOBS_QUEUE_DUPLICATE",
            Self::QueueOperationFailed(_) => "JOBS_QUEUE_OPERATION_FAILED",
            Self::InvalidDefinition(_) => "JOBS_INVALID_DEFINITION",
            Self::HandlerRequired(_) => "JOBS_HANDLER_REQUIRED",
            Self::DuplicateJob(_) => "JOBS_DUPLICATE_JOB",
            Self::NotFound(_) => "JOBS_NOT_FOUND",
            Self::NotRegistered(_) => "JOBS_NOT_REGISTERED",
            Self::ExecutionFailed(_) => "JOBS_EXECUTION_FAILED",
            Self::Timeout(_) => "JOBS_TIMEOUT",
            Self::ContextFactoryFailed(_) => "JOBS_CONTEXT_FACTORY_FAILED",
            Self::ValidationFailed { .. } => "JOBS_VALIDATION_FAILED",
            Self::InvalidInput(_) => "JOBS_INVALID_INPUT",
            Self::InvalidCron(_) => "JOBS_INVALID_CRON",
            Self::InvalidSchedule(_) => "JOBS_INVALID_SCHEDULE",
            Self::ScopeAlreadyDefined => "JOBS_SCOPE_ALREADY_DEFINED",
            Self::WorkerFailed(_) => "JOBS_WORKER_FAILED",
            Self::AdapterError(_) => "JOBS_ADAPTER_ERROR",
            Self::AdapterConnectionFailed(_) => "JOBS_ADAPTER_CONNECTION_FAILED",
            Self::SubscribeFailed(_) => "JOBS_SUBSCRIBE_FAILED",
        }
    }

    /// True when a worker should count this as the job's final failed
    /// attempt rather than something retryable by the backend's own logic.
    /// Configuration/validation errors never reach the backend's retry
    /// machinery at all (they abort dispatch before a record exists).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AdapterRequired
                | Self::ServiceRequired
                | Self::ContextRequired
                | Self::ConfigurationInvalid(_)
                | Self::ScopeAlreadyDefined
        )
    }
}

pub type Result<T> = std::result::Result<T, JobsError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
