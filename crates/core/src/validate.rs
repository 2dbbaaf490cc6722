// SPDX-License-Identifier: MIT

//! Input validation contract (spec §4.4 / §6.3).
//!
//! The TS source detects a schema's "shape" at runtime (standard-schema
//! vs. parse/safeParse) because JS has no static types to dispatch on.
//! Rust resolves that dynamism at compile time instead: every validator
//! implements one [`Validator`] trait, so the job registry never branches
//! on schema shape — it just calls `validate`. This is the idiomatic
//! replacement called for in spec §9's Redesign Flags.

use crate::error::JobsError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Validates and normalizes a raw JSON input value. Implementors may
/// transform the value (e.g. trimming strings, applying defaults); the
/// returned value replaces the job's stored input.
pub trait Validator: Send + Sync {
    fn validate(&self, raw: Value) -> Result<Value, JobsError>;
}

/// No declared schema: input passes through unchanged (spec §4.4's
/// "matches neither shape" fallback).
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, raw: Value) -> Result<Value, JobsError> {
        Ok(raw)
    }
}

/// Validates by deserializing into a concrete Rust type and serializing
/// back to `Value`. Failure surfaces the serde error message as the sole
/// issue, matching spec §4.4's "details object containing raw issues".
pub struct TypedValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedValidator<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for TypedValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator for TypedValidator<T>
where
    T: DeserializeOwned + serde::Serialize + Send + Sync,
{
    fn validate(&self, raw: Value) -> Result<Value, JobsError> {
        let typed: T = serde_json::from_value(raw).map_err(|e| JobsError::ValidationFailed {
            message: e.to_string(),
            status: 400,
            details: serde_json::json!({ "issues": [{ "message": e.to_string() }] }),
        })?;
        serde_json::to_value(typed).map_err(|e| JobsError::ValidationFailed {
            message: e.to_string(),
            status: 400,
            details: serde_json::json!({ "issues": [{ "message": e.to_string() }] }),
        })
    }
}

pub fn typed_validator<T>() -> Arc<dyn Validator>
where
    T: DeserializeOwned + serde::Serialize + Send + Sync + 'static,
{
    Arc::new(TypedValidator::<T>::new())
}

#[cfg(feature = "json-schema")]
pub use self::json_schema::JsonSchemaValidator;

#[cfg(feature = "json-schema")]
mod json_schema {
    use super::*;
    use jsonschema::JSONSchema;

    /// Validates against a declarative JSON Schema document (the
    /// "standard schema" flavour from spec §6.3, made concrete for
    /// callers who want a schema document instead of a Rust type).
    pub struct JsonSchemaValidator {
        compiled: JSONSchema,
    }

    impl JsonSchemaValidator {
        pub fn compile(schema: &Value) -> Result<Self, JobsError> {
            let compiled = JSONSchema::compile(schema)
                .map_err(|e| JobsError::InvalidDefinition(format!("invalid json schema: {e}")))?;
            Ok(Self { compiled })
        }
    }

    impl Validator for JsonSchemaValidator {
        fn validate(&self, raw: Value) -> Result<Value, JobsError> {
            let result = self.compiled.validate(&raw);
            if let Err(errors) = result {
                let issues: Vec<Value> = errors
                    .map(|e| serde_json::json!({ "message": e.to_string() }))
                    .collect();
                return Err(JobsError::ValidationFailed {
                    message: "schema validation failed".into(),
                    status: 400,
                    details: serde_json::json!({ "issues": issues }),
                });
            }
            Ok(raw)
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
