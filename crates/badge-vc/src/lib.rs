//! # badge-vc — Badge Credentials and Proofs
//!
//! The credential data model and everything that signs or checks it:
//!
//! - [`canonical`]: the signed payload of a credential.
//! - [`legacy`]: Open Badges 2.0 `SignedBadge` verification objects.
//! - [`jwt_proof`]: `JwtProof2020` generation and verification.
//! - [`data_integrity`]: `eddsa-jcs-2022` and `ecdsa-jcs-2019` proofs.
//! - [`issuer`]: attach a proof according to an issuance policy.
//! - [`verifier`]: the verification orchestrator.
//!
//! ## Crate Policy
//!
//! - Keys are always resolved through a shared `badge_crypto::KeyManager`.
//! - Signatures are always computed over [`canonical::canonicalize`] output,
//!   never over ad-hoc serializations.
//! - Verification entry points return values, not errors.

pub mod canonical;
pub mod credential;
pub mod data_integrity;
pub mod error;
pub mod issuer;
pub mod jwt_proof;
pub mod legacy;
pub mod proof;
pub mod store;
pub mod verifier;

pub use canonical::{canonicalize, canonicalize_value};
pub use credential::{Credential, CredentialType, Recipient};
pub use error::VcError;
pub use issuer::{CredentialIssuer, IssuancePolicy, ProofFormat};
pub use jwt_proof::{
    extract_credential_from_jwt, generate_jwt_proof, verify_jwt_proof, JwtProofOptions,
    JwtRejection, JwtVerificationOutcome, JwtVerifyOptions, VerifiedJwt,
};
pub use proof::{DataIntegrityProof, JwtProof, LegacyHostedProof, Proof, ProofPurpose};
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use verifier::{CredentialVerifier, VerificationResult};
