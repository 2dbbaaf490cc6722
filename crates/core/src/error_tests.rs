// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn validation_failed_carries_400_status() {
    let err = JobsError::ValidationFailed {
        message: "bad email".into(),
        status: 400,
        details: serde_json::json!({"issues": [{"message": "bad email"}]}),
    };
    assert_eq!(err.code(), "JOBS_VALIDATION_FAILED");
    assert_eq!(format!("{err}"), "input validation failed: bad email");
}

#[test]
fn every_code_is_stable_and_prefixed() {
    let errs: Vec<JobsError> = vec![
        JobsError::AdapterRequired,
        JobsError::ServiceRequired,
        JobsError::ContextRequired,
        JobsError::ConfigurationInvalid("x".into()),
        JobsError::QueueNotFound("q".into()),
        JobsError::QueueDuplicate("q".into()),
        JobsError::QueueOperationFailed("x".into()),
        JobsError::InvalidDefinition("x".into()),
        JobsError::HandlerRequired("x".into()),
        JobsError::DuplicateJob("x".into()),
        JobsError::NotFound("x".into()),
        JobsError::NotRegistered("x".into()),
        JobsError::ExecutionFailed("x".into()),
        JobsError::Timeout(5),
        JobsError::ContextFactoryFailed("x".into()),
        JobsError::InvalidInput("x".into()),
        JobsError::InvalidCron("x".into()),
        JobsError::InvalidSchedule("x".into()),
        JobsError::ScopeAlreadyDefined,
        JobsError::WorkerFailed("x".into()),
        JobsError::AdapterError("x".into()),
        JobsError::AdapterConnectionFailed("x".into()),
        JobsError::SubscribeFailed("x".into()),
    ];
    for err in errs {
        assert!(err.code().starts_with("JOBS_"));
    }
}

#[test]
fn configuration_errors_are_flagged() {
    assert!(JobsError::ScopeAlreadyDefined.is_configuration_error());
    assert!(!JobsError::NotFound("x".into()).is_configuration_error());
}
