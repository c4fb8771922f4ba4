// gait-core/src/canonical.rs
// ============================================================================
// Module: Canonical JSON (JCS)
// Description: RFC 8785 serialization; sole source of digest and signature bytes.
// Purpose: Guarantee that two semantically equal JSON values produce
// byte-identical canonical output.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! Every digest or signature computed anywhere in Gait is taken over the
//! canonical JSON form of a record, never over an ad hoc serialization. This
//! module is the sole façade other crates call through, so there is exactly
//! one place that can get canonicalization wrong.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when canonicalizing a value to JCS bytes.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Serialization into canonical JSON failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns RFC 8785 canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`CanonicalError::Canonicalization`] when serialization fails,
/// for example when the value contains a non-finite float.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    serde_jcs::to_vec(value).map_err(|err| CanonicalError::Canonicalization(err.to_string()))
}

/// Returns RFC 8785 canonical JSON as a `String`.
///
/// # Errors
///
/// Returns [`CanonicalError::Canonicalization`] when serialization fails.
pub fn canonical_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let bytes = canonical_json_bytes(value)?;
    String::from_utf8(bytes)
        .map_err(|err| CanonicalError::Canonicalization(format!("non-utf8 canonical output: {err}")))
}

#[cfg(test)]
mod tests {
    use super::canonical_json_bytes;
    use serde_json::json;

    #[test]
    fn key_order_is_lexicographic() {
        let value = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let bytes = canonical_json_bytes(&value).expect("canonicalize");
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":2,"b":1,"c":{"y":2,"z":1}}"#);
    }

    #[test]
    fn equal_values_produce_identical_bytes_regardless_of_source_order() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(canonical_json_bytes(&a).unwrap(), canonical_json_bytes(&b).unwrap());
    }

    #[test]
    fn distinct_values_produce_distinct_bytes() {
        let a = json!({"x": 1});
        let b = json!({"x": 2});
        assert_ne!(canonical_json_bytes(&a).unwrap(), canonical_json_bytes(&b).unwrap());
    }
}
