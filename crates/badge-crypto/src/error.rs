//! # Cryptographic Error Types
//!
//! Structured errors for key handling and signature operations. Signature
//! *verification* that simply fails is usually reported as `false` or a
//! rejection value by callers; these errors cover the cases where the
//! operation itself could not be attempted.

use thiserror::Error;

/// Errors from cryptographic operations in `badge-crypto`.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// No key with this identifier is loaded.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The algorithm name is not one of the supported JWS algorithms, or the
    /// operation is not defined for the key family.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key family cannot be used with the requested algorithm.
    #[error("key mismatch: algorithm {algorithm} cannot use a {family} key")]
    KeyMismatch {
        /// Requested algorithm.
        algorithm: String,
        /// Family of the key that was supplied.
        family: String,
    },

    /// The key pair was loaded without private material.
    #[error("private key unavailable for {0}")]
    PrivateKeyUnavailable(String),

    /// Two key sources produced the same identifier.
    #[error("duplicate key identifier: {0}")]
    DuplicateKey(String),

    /// Key material could not be parsed or generated.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The signing operation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// A compact JWS or one of its segments is malformed.
    #[error("malformed JWS: {0}")]
    MalformedJws(String),

    /// Loading keys from a key source failed.
    #[error("key loading failed: {0}")]
    KeyLoad(String),

    /// I/O error while reading key files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading JWKs or JWS segments.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_not_found_display() {
        let err = CryptoError::KeyNotFound("k9".to_string());
        assert_eq!(err.to_string(), "key not found: k9");
    }

    #[test]
    fn key_mismatch_display() {
        let err = CryptoError::KeyMismatch {
            algorithm: "ES256".into(),
            family: "rsa".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ES256"));
        assert!(msg.contains("rsa"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CryptoError = io.into();
        assert!(matches!(err, CryptoError::Io(_)));
    }
}
