//! # Verification Orchestrator
//!
//! Runs the three checks on a credential and folds them into a
//! [`VerificationResult`]:
//!
//! 1. **Revocation.** The stored `revoked` flag, then, if a status list
//!    manager is attached and the credential's `credentialStatus` points at
//!    one of its lists, the status bit.
//! 2. **Expiry.** `expires < now`, strictly.
//! 3. **Signature.** The legacy `verification` object if present, else the
//!    first supported proof, checked with the matching codec.
//!
//! All three always run. `details` reports the first failing check in that
//! order, or that the credential is valid.
//!
//! ## Security Invariant
//!
//! The orchestrator never returns an error. Anything unexpected (an unknown
//! key id, a credential that cannot be canonicalized, a store failure) yields
//! a result with every flag false and the details string
//! [`DETAILS_ERROR`]. In particular an error can never produce `isValid`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use badge_core::Timestamp;
use badge_crypto::KeyManager;
use badge_status::{Status, StatusListManager};

use crate::canonical::{canonicalize, canonicalize_value};
use crate::credential::Credential;
use crate::data_integrity;
use crate::error::VcError;
use crate::jwt_proof::{self, JwtVerificationOutcome, JwtVerifyOptions};
use crate::legacy::verify_verification;
use crate::proof::Proof;
use crate::store::CredentialStore;

pub const DETAILS_REVOKED: &str = "Credential has been revoked";
pub const DETAILS_EXPIRED: &str = "Credential has expired";
pub const DETAILS_INVALID_SIGNATURE: &str = "Invalid signature";
pub const DETAILS_VALID: &str = "Credential is valid";
pub const DETAILS_NOT_FOUND: &str = "Credential not found";
pub const DETAILS_ERROR: &str = "Error during verification process";

pub const REASON_REVOKED_VIA_STATUS_LIST: &str = "revoked via status list";
pub const REASON_SUSPENDED_VIA_STATUS_LIST: &str = "suspended via status list";

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of verifying one credential.
///
/// `isValid` is derived from the other flags and cannot be set on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    is_valid: bool,
    is_expired: bool,
    is_revoked: bool,
    has_valid_signature: bool,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revocation_reason: Option<String>,
}

impl VerificationResult {
    /// Fold the three check outcomes. `revocation_reason` is kept only when
    /// the credential is revoked.
    pub fn from_checks(
        is_revoked: bool,
        is_expired: bool,
        has_valid_signature: bool,
        revocation_reason: Option<String>,
    ) -> Self {
        let details = if is_revoked {
            DETAILS_REVOKED
        } else if is_expired {
            DETAILS_EXPIRED
        } else if !has_valid_signature {
            DETAILS_INVALID_SIGNATURE
        } else {
            DETAILS_VALID
        };
        Self {
            is_valid: !is_revoked && !is_expired && has_valid_signature,
            is_expired,
            is_revoked,
            has_valid_signature,
            details: details.to_string(),
            revocation_reason: revocation_reason.filter(|_| is_revoked),
        }
    }

    pub fn not_found() -> Self {
        Self::all_false(DETAILS_NOT_FOUND)
    }

    pub fn error() -> Self {
        Self::all_false(DETAILS_ERROR)
    }

    fn all_false(details: &str) -> Self {
        Self {
            is_valid: false,
            is_expired: false,
            is_revoked: false,
            has_valid_signature: false,
            details: details.to_string(),
            revocation_reason: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired
    }

    pub fn is_revoked(&self) -> bool {
        self.is_revoked
    }

    pub fn has_valid_signature(&self) -> bool {
        self.has_valid_signature
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn revocation_reason(&self) -> Option<&str> {
        self.revocation_reason.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies credentials against the keys in a shared [`KeyManager`].
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    keys: Arc<KeyManager>,
    status: Option<Arc<StatusListManager>>,
    jwt_options: JwtVerifyOptions,
}

impl CredentialVerifier {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self {
            keys,
            status: None,
            jwt_options: JwtVerifyOptions::default(),
        }
    }

    /// Consult `status` for credentials whose `credentialStatus` points at
    /// one of its lists.
    pub fn with_status_lists(mut self, status: Arc<StatusListManager>) -> Self {
        self.status = Some(status);
        self
    }

    /// Issuer, audience and leeway checks for JWT proofs.
    pub fn with_jwt_options(mut self, options: JwtVerifyOptions) -> Self {
        self.jwt_options = options;
        self
    }

    /// Whether the credential's proof verifies. Failures of any kind are
    /// `false`.
    pub async fn verify_credential_signature(&self, credential: &Credential) -> bool {
        match self.check_signature(credential, Timestamp::now()).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(credential = %credential.id, error = %e, "signature check failed");
                false
            }
        }
    }

    pub async fn verify_credential(&self, credential: &Credential) -> VerificationResult {
        self.verify_credential_at(credential, Timestamp::now()).await
    }

    /// [`verify_credential`](Self::verify_credential) against a fixed clock.
    pub async fn verify_credential_at(&self, credential: &Credential, now: Timestamp) -> VerificationResult {
        match self.run_checks(credential, now).await {
            Ok(result) => {
                tracing::info!(
                    credential = %credential.id,
                    valid = result.is_valid(),
                    details = %result.details(),
                    "credential verified"
                );
                result
            }
            Err(e) => {
                tracing::warn!(credential = %credential.id, error = %e, "verification error");
                VerificationResult::error()
            }
        }
    }

    /// Verify a credential given as raw JSON.
    pub async fn verify_credential_json(&self, value: &Value) -> VerificationResult {
        match serde_json::from_value::<Credential>(value.clone()) {
            Ok(credential) => self.verify_credential(&credential).await,
            Err(e) => {
                tracing::warn!(error = %e, "credential JSON does not parse");
                VerificationResult::error()
            }
        }
    }

    /// Look the credential up in `store` and verify it.
    pub async fn verify_credential_by_id(
        &self,
        id: &str,
        store: &dyn CredentialStore,
    ) -> VerificationResult {
        match store.find_by_id(id) {
            Ok(Some(credential)) => self.verify_credential(&credential).await,
            Ok(None) => {
                tracing::debug!(credential = %id, "credential not found");
                VerificationResult::not_found()
            }
            Err(e) => {
                tracing::warn!(credential = %id, error = %e, "credential store error");
                VerificationResult::error()
            }
        }
    }

    async fn run_checks(&self, credential: &Credential, now: Timestamp) -> Result<VerificationResult, VcError> {
        let flagged = credential.is_flagged_revoked();
        let list_reason = self.status_list_reason(credential)?;
        let reason = if flagged {
            credential.revocation_reason.clone()
        } else {
            list_reason.map(str::to_string)
        };
        let is_revoked = flagged || list_reason.is_some();
        let is_expired = credential.is_expired_at(now);
        let has_valid_signature = self.check_signature(credential, now).await?;
        Ok(VerificationResult::from_checks(
            is_revoked,
            is_expired,
            has_valid_signature,
            reason,
        ))
    }

    fn status_list_reason(&self, credential: &Credential) -> Result<Option<&'static str>, VcError> {
        let (Some(status), Some(entry)) = (&self.status, &credential.credential_status) else {
            return Ok(None);
        };
        if !status.manages(entry.list_iri()) {
            tracing::debug!(list = %entry.list_iri(), "status list not managed locally");
            return Ok(None);
        }
        Ok(match status.get_status(entry)? {
            Status::Active => None,
            Status::Revoked => Some(REASON_REVOKED_VIA_STATUS_LIST),
            Status::Suspended => Some(REASON_SUSPENDED_VIA_STATUS_LIST),
        })
    }

    async fn check_signature(&self, credential: &Credential, now: Timestamp) -> Result<bool, VcError> {
        let Some(proof) = credential.primary_proof() else {
            tracing::debug!(credential = %credential.id, "credential carries no proof");
            return Ok(false);
        };
        match proof {
            Proof::LegacyHosted(p) => verify_verification(credential, p, &self.keys).await,
            Proof::Jwt(p) => {
                let options = self.jwt_options.clone().at(now);
                match jwt_proof::verify_with_key_manager(p, &self.keys, &options).await? {
                    JwtVerificationOutcome::Verified(verified) => {
                        embedded_matches(credential, &verified.credential)
                    }
                    JwtVerificationOutcome::Rejected(reason) => {
                        tracing::debug!(credential = %credential.id, %reason, "JWT proof rejected");
                        Ok(false)
                    }
                }
            }
            Proof::DataIntegrity(p) => {
                data_integrity::verify_with_key_manager(credential, p, &self.keys).await
            }
            Proof::Unsupported(_) => {
                tracing::debug!(
                    credential = %credential.id,
                    proof_type = ?proof.type_name(),
                    "unsupported proof type"
                );
                Ok(false)
            }
        }
    }
}

/// The `vc` claim of a JWT must describe the same credential it is attached to.
fn embedded_matches(credential: &Credential, embedded: &Value) -> Result<bool, VcError> {
    let expected = canonicalize(credential)?;
    Ok(match canonicalize_value(embedded) {
        Ok(actual) => actual == expected,
        Err(e) => {
            tracing::debug!(error = %e, "embedded vc claim does not canonicalize");
            false
        }
    })
}
