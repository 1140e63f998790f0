//! # Credential Error Types
//!
//! Everything that can stop a proof from being created or checked. Note the
//! split: a proof that does not verify is a `false` or a rejection value,
//! never an error. Errors here mean the check could not be carried out.

use thiserror::Error;

use badge_core::CanonicalizationError;
use badge_crypto::CryptoError;
use badge_status::StatusError;

/// Errors from `badge-vc`.
#[derive(Error, Debug)]
pub enum VcError {
    /// The signed payload could not be built.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Key lookup, signing, or key parsing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A status list operation failed.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The proof type is not one this crate can produce or check.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// The cryptosuite is not one this crate can produce or check.
    #[error("unsupported cryptosuite: {0}")]
    UnsupportedCryptosuite(String),

    /// No key id was given and no default is configured.
    #[error("no signing key configured")]
    NoSigningKey,

    /// The credential store could not be read.
    #[error("credential store error: {0}")]
    Store(String),
}

impl VcError {
    /// `true` when the error is an unknown key id.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::KeyNotFound(_)))
    }
}
