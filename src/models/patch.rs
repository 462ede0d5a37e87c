//! Whitelisted, all-or-nothing partial updates.
//!
//! A patch body is checked against the set of mutable fields before anything is
//! deserialized or written. A single disallowed key rejects the whole request.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Fails with one aggregate `BadRequest` naming every key outside `allowed`.
pub fn ensure_allowed_fields(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    let rejected: Vec<&str> = body
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid updates: {}",
            rejected.join(", ")
        )))
    }
}

/// Patches cannot clear a field: an explicit `null` is rejected rather than
/// read as "leave unchanged".
pub fn ensure_no_nulls(body: &Map<String, Value>) -> Result<(), AppError> {
    let nulls: Vec<&str> = body
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.as_str())
        .collect();

    if nulls.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid updates: null not allowed for {}",
            nulls.join(", ")
        )))
    }
}

/// Checks the whitelist and rejects nulls, then deserializes the body into the typed patch.
pub fn parse_patch<T: DeserializeOwned>(
    body: Map<String, Value>,
    allowed: &[&str],
) -> Result<T, AppError> {
    ensure_allowed_fields(&body, allowed)?;
    ensure_no_nulls(&body)?;
    serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::BadRequest(format!("Invalid updates: {}", e)))
}
