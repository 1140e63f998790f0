//! # Canonical Serialization — RFC 8785 Byte Production
//!
//! `CanonicalBytes` is the only construction path for bytes that get signed
//! or hashed anywhere in the badge stack.
//!
//! ## Security Invariant
//!
//! The inner buffer is private. The only constructors run the full pipeline
//! (float rejection, then JCS serialization), so a signer can never be handed
//! bytes produced by `serde_json::to_vec()` with insertion-ordered keys.
//!
//! Key ordering is applied at every nesting level. Two values that are
//! structurally equal produce identical bytes regardless of the order in
//! which their object keys were inserted or parsed.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted at every depth.
/// - Separators are compact, no insignificant whitespace.
/// - Numbers are integers; floats are rejected.
/// - The content is valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, `SerializationFailed` if serde cannot produce JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let s = serde_jcs::to_string(&coerced)?;
        Ok(Self(s))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Access the canonical form as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recursively walk the value tree, rejecting floats.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sorts_top_level_keys() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        assert_eq!(cb.as_str(), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn sorts_nested_keys() {
        let data = serde_json::json!({
            "recipient": {"type": "email", "identity": "mailto:x@example.com", "hashed": false},
            "id": "urn:a",
            "list": [{"z": 1, "a": 2}]
        });
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        assert_eq!(
            cb.as_str(),
            r#"{"id":"urn:a","list":[{"a":2,"z":1}],"recipient":{"hashed":false,"identity":"mailto:x@example.com","type":"email"}}"#
        );
    }

    #[test]
    fn parse_order_does_not_matter() {
        let a: Value =
            serde_json::from_str(r#"{"outer":{"y":1,"x":{"q":true,"p":null}},"k":"v"}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"k":"v","outer":{"x":{"p":null,"q":true},"y":1}}"#).unwrap();
        assert_eq!(
            CanonicalBytes::new(&a).unwrap(),
            CanonicalBytes::new(&b).unwrap()
        );
    }

    #[test]
    fn float_rejected() {
        let data = serde_json::json!({"amount": 1.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 1.5),
            other => panic!("expected FloatRejected, got: {other:?}"),
        }
    }

    #[test]
    fn nested_float_rejected() {
        let data = serde_json::json!({"a": [{"b": 0.25}]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integers_and_null_pass_through() {
        let data = serde_json::json!({"n": 42, "neg": -7, "none": null});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"n":42,"neg":-7,"none":null}"#);
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert_eq!(cb.len(), 2);
        assert!(!cb.is_empty());
    }

    #[test]
    fn string_escaping_is_minimal() {
        let cb = CanonicalBytes::new(&serde_json::json!({"s": "é\"\n"})).unwrap();
        assert_eq!(cb.as_str(), "{\"s\":\"é\\\"\\n\"}");
    }

    proptest! {
        #[test]
        fn insertion_order_independent(entries in proptest::collection::vec(("[a-z]{1,8}", any::<i64>()), 0..16)) {
            let forward: serde_json::Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect();
            let reverse: serde_json::Map<String, Value> = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect();
            // Duplicate keys resolve last-wins, so rebuild reverse with forward's winners.
            let reverse: serde_json::Map<String, Value> = reverse
                .keys()
                .map(|k| (k.clone(), forward[k].clone()))
                .collect();
            let wrapped_a = serde_json::json!({ "outer": Value::Object(forward) });
            let wrapped_b = serde_json::json!({ "outer": Value::Object(reverse) });
            prop_assert_eq!(
                CanonicalBytes::new(&wrapped_a).unwrap(),
                CanonicalBytes::new(&wrapped_b).unwrap()
            );
        }

        #[test]
        fn output_reparses_to_same_value(entries in proptest::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 0..10)) {
            let value = serde_json::to_value(&entries).unwrap();
            let cb = CanonicalBytes::new(&value).unwrap();
            let back: Value = serde_json::from_str(cb.as_str()).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
