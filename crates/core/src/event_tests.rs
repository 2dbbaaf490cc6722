// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn event_type_follows_queue_job_phase_shape() {
    assert_eq!(event_type("email", "sendWelcome", Phase::Completed), "email:sendWelcome:completed");
}

#[test]
fn phase_display_is_lowercase() {
    assert_eq!(Phase::Retrying.to_string(), "retrying");
}

#[test]
fn serializes_with_type_key_and_optional_scope() {
    let event = LifecycleEvent::new(
        "email",
        "sendWelcome",
        Phase::Started,
        serde_json::json!({ "attemptsMade": 1 }),
        Utc::now(),
        None,
    );
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "email:sendWelcome:started");
    assert!(value.get("scope").is_none());
}
