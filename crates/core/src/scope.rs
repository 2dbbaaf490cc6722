// SPDX-License-Identifier: MIT

//! Multi-tenant scope: a `(kind, id)` pair injected into job metadata so
//! a durable backend (or an operator reading records) can isolate work
//! by tenant without the runtime needing to know what a tenant is.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reserved metadata key under which a scope is stored. Application code
/// must never set this key directly; [`merge_metadata_with_scope`] owns it.
pub const SCOPE_METADATA_KEY: &str = "__scope";

/// A scope identifier: kept as its original numeric or string form so a
/// numeric tenant id round-trips without being coerced to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeId {
    String(String),
    Int(i64),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::String(s) => write!(f, "{s}"),
            ScopeId::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        ScopeId::String(s.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(s: String) -> Self {
        ScopeId::String(s)
    }
}

impl From<i64> for ScopeId {
    fn from(i: i64) -> Self {
        ScopeId::Int(i)
    }
}

/// A tenant/organization/user scope bound to a runtime or a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: ScopeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Scope {
    pub fn new(kind: impl Into<String>, id: impl Into<ScopeId>) -> Self {
        Self { kind: kind.into(), id: id.into(), tags: None }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Scopes are compared by `(type, id)` only — tags are informational.
    pub fn same_identity(&self, other: &Scope) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

/// Metadata carried on a job record: arbitrary string-keyed JSON values,
/// plus (optionally) a scope stored under the reserved key.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Merge a scope into metadata under the reserved key. `merge(m, None) == m`.
/// Any existing value under the reserved key is overwritten; no other key
/// is touched.
pub fn merge_metadata_with_scope(metadata: Option<Metadata>, scope: Option<&Scope>) -> Metadata {
    let mut metadata = metadata.unwrap_or_default();
    match scope {
        Some(scope) => {
            // Unwrap is safe: Scope always serializes to a JSON object/value.
            if let Ok(value) = serde_json::to_value(scope) {
                metadata.insert(SCOPE_METADATA_KEY.to_string(), value);
            }
        }
        None => {
            metadata.remove(SCOPE_METADATA_KEY);
        }
    }
    metadata
}

/// Extract a previously merged scope back out of metadata.
pub fn extract_scope_from_metadata(metadata: &Metadata) -> Option<Scope> {
    metadata
        .get(SCOPE_METADATA_KEY)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
