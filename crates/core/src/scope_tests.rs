// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn round_trip_preserves_scope() {
    let scope = Scope::new("organization", "org_1");
    let merged = merge_metadata_with_scope(None, Some(&scope));
    let extracted = extract_scope_from_metadata(&merged);
    assert_eq!(extracted, Some(scope));
}

#[test]
fn merge_with_none_is_identity() {
    let mut metadata = Metadata::new();
    metadata.insert("k".into(), serde_json::json!("v"));
    let merged = merge_metadata_with_scope(Some(metadata.clone()), None);
    assert_eq!(merged, metadata);
}

#[test]
fn numeric_scope_id_is_not_string_coerced() {
    let scope = Scope::new("tenant", 42i64);
    let merged = merge_metadata_with_scope(None, Some(&scope));
    let extracted = extract_scope_from_metadata(&merged).expect("scope present");
    assert_eq!(extracted.id, ScopeId::Int(42));
}

#[test]
fn merge_does_not_disturb_other_metadata_keys() {
    let mut metadata = Metadata::new();
    metadata.insert("other".into(), serde_json::json!(1));
    let scope = Scope::new("org", "org_1");
    let merged = merge_metadata_with_scope(Some(metadata), Some(&scope));
    assert_eq!(merged.get("other"), Some(&serde_json::json!(1)));
    assert!(merged.contains_key(SCOPE_METADATA_KEY));
}

#[test]
fn same_identity_ignores_tags() {
    let a = Scope::new("org", "org_1").with_tags(vec!["a".into()]);
    let b = Scope::new("org", "org_1").with_tags(vec!["b".into()]);
    assert!(a.same_identity(&b));
}
