// SPDX-License-Identifier: MIT

use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Payload {
    name: String,
    count: u32,
}

#[test]
fn noop_passes_anything_through() {
    let v = NoopValidator;
    let raw = serde_json::json!({ "whatever": true });
    assert_eq!(v.validate(raw.clone()).unwrap(), raw);
}

#[test]
fn typed_validator_accepts_matching_shape() {
    let v = typed_validator::<Payload>();
    let raw = serde_json::json!({ "name": "a", "count": 3 });
    let out = v.validate(raw).unwrap();
    assert_eq!(out, serde_json::json!({ "name": "a", "count": 3 }));
}

#[test]
fn typed_validator_rejects_missing_field() {
    let v = typed_validator::<Payload>();
    let raw = serde_json::json!({ "name": "a" });
    let err = v.validate(raw).unwrap_err();
    match err {
        JobsError::ValidationFailed { status, .. } => assert_eq!(status, 400),
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn typed_validator_rejects_wrong_type() {
    let v = typed_validator::<Payload>();
    let raw = serde_json::json!({ "name": "a", "count": "not a number" });
    assert!(v.validate(raw).is_err());
}
