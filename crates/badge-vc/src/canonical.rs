//! # Credential Canonicalization
//!
//! The signed payload of a badge is the JCS form of an object holding only
//! `id`, `type`, `badge`, `recipient`, `issuedOn` and, if present, `expires`.
//! Keys are sorted at every depth, there is no insignificant whitespace, and
//! timestamps are rendered as `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! ## Security Invariant
//!
//! Both entry points, typed ([`canonicalize`]) and raw JSON
//! ([`canonicalize_value`]), produce identical bytes for the same logical
//! credential. Signing and verification may go through different ones.
//!
//! Proofs, `credentialStatus`, `revoked` and any extension members are never
//! part of the payload.

use serde_json::{Map, Value};

use badge_core::{CanonicalBytes, CanonicalizationError, Timestamp};

use crate::credential::Credential;

/// Members of the signed payload, in no particular order.
pub const SIGNED_FIELDS: [&str; 6] = ["id", "type", "badge", "recipient", "issuedOn", "expires"];

const TIMESTAMP_FIELDS: [&str; 2] = ["issuedOn", "expires"];

/// Canonical payload of a typed credential.
pub fn canonicalize(credential: &Credential) -> Result<CanonicalBytes, CanonicalizationError> {
    canonicalize_value(&serde_json::to_value(credential)?)
}

/// Canonical payload of a credential given as raw JSON.
///
/// # Errors
///
/// - `NotAnObject` if `value` is not an object.
/// - `MissingField` if `id`, `badge`, `recipient` or `issuedOn` is missing
///   or empty.
/// - `InvalidField` if a timestamp does not parse.
/// - `FloatRejected` if a float appears anywhere in the payload.
pub fn canonicalize_value(value: &Value) -> Result<CanonicalBytes, CanonicalizationError> {
    let obj = value
        .as_object()
        .ok_or(CanonicalizationError::NotAnObject(json_kind(value)))?;

    for field in ["id", "badge", "recipient", "issuedOn"] {
        if is_blank(obj.get(field)) {
            return Err(CanonicalizationError::MissingField(field.to_string()));
        }
    }

    let mut payload = Map::new();
    for field in SIGNED_FIELDS {
        match obj.get(field) {
            None | Some(Value::Null) => {}
            Some(v) if TIMESTAMP_FIELDS.contains(&field) => {
                payload.insert(field.to_string(), Value::String(normalize_timestamp(field, v)?));
            }
            Some(v) => {
                payload.insert(field.to_string(), v.clone());
            }
        }
    }
    CanonicalBytes::from_value(Value::Object(payload))
}

fn normalize_timestamp(field: &str, value: &Value) -> Result<String, CanonicalizationError> {
    let invalid = |reason: String| CanonicalizationError::InvalidField {
        field: field.to_string(),
        reason,
    };
    let s = value
        .as_str()
        .ok_or_else(|| invalid(format!("expected a string, got {}", json_kind(value))))?;
    Timestamp::parse_lenient(s)
        .map(|t| t.to_iso8601())
        .map_err(|e| invalid(e.to_string()))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Object(m)) => m.is_empty(),
        Some(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
