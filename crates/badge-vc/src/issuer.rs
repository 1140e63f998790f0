//! # Issuance
//!
//! Attaches a proof to a credential according to an [`IssuancePolicy`]:
//! legacy hosted signature, JWT, or Data Integrity. The key is looked up in
//! the shared [`KeyManager`]; the public half is expected to be published at
//! `<base>/public-keys/<key id>`, which is the IRI every proof points at.
//!
//! A freshly proved credential carries exactly one kind of proof. A legacy
//! signature replaces the `proof` list, and a JWT or Data Integrity proof
//! removes any legacy `verification` object.

use std::str::FromStr;
use std::sync::Arc;

use badge_crypto::KeyManager;
use badge_status::{StatusListManager, StatusPurpose};

use crate::credential::Credential;
use crate::data_integrity::create_data_integrity_proof;
use crate::error::VcError;
use crate::jwt_proof::{generate_jwt_proof, JwtProofOptions};
use crate::legacy::{create_verification, key_iri};
use crate::proof::{Proof, ProofPurpose};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Which proof an issuer attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProofFormat {
    #[default]
    Legacy,
    Jwt,
    DataIntegrity,
}

impl ProofFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Jwt => "jwt",
            Self::DataIntegrity => "data-integrity",
        }
    }
}

impl std::fmt::Display for ProofFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofFormat {
    type Err = VcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "hosted" | "signed" => Ok(Self::Legacy),
            "jwt" => Ok(Self::Jwt),
            "data-integrity" | "di" => Ok(Self::DataIntegrity),
            other => Err(VcError::UnsupportedProofType(other.to_string())),
        }
    }
}

/// How credentials are proved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuancePolicy {
    pub format: ProofFormat,
    /// Base URL for key IRIs and the JWT `iss` claim. No trailing slash.
    pub base_url: String,
    /// Key used when the caller does not name one.
    pub default_key_id: Option<String>,
    /// `exp` offset for JWT proofs, in seconds.
    pub jwt_expires_in: Option<i64>,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl IssuancePolicy {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            format: ProofFormat::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            default_key_id: None,
            jwt_expires_in: None,
        }
    }

    pub fn with_format(mut self, format: ProofFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.default_key_id = Some(key_id.into());
        self
    }

    /// Read `BADGE_BASE_URL`, `BADGE_PROOF_FORMAT` and `BADGE_DEFAULT_KEY_ID`.
    /// An unrecognized format falls back to legacy with a warning.
    pub fn from_env() -> Self {
        let base_url = std::env::var("BADGE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let format = match std::env::var("BADGE_PROOF_FORMAT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "BADGE_PROOF_FORMAT not recognized, using legacy");
                ProofFormat::Legacy
            }),
            Err(_) => ProofFormat::Legacy,
        };
        let mut policy = Self::new(base_url).with_format(format);
        policy.default_key_id = std::env::var("BADGE_DEFAULT_KEY_ID").ok().filter(|s| !s.is_empty());
        policy
    }
}

/// Signs credentials with keys from a shared key manager.
#[derive(Debug)]
pub struct CredentialIssuer {
    keys: Arc<KeyManager>,
    policy: IssuancePolicy,
    status: Option<Arc<StatusListManager>>,
}

impl CredentialIssuer {
    pub fn new(keys: Arc<KeyManager>, policy: IssuancePolicy) -> Self {
        Self {
            keys,
            policy,
            status: None,
        }
    }

    /// Allocate a revocation entry for every credential issued.
    pub fn with_status_lists(mut self, status: Arc<StatusListManager>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    fn resolve_key_id(&self, key_id: Option<&str>) -> Result<String, VcError> {
        key_id
            .or(self.policy.default_key_id.as_deref())
            .or(self.keys.default_key_id())
            .map(str::to_string)
            .ok_or(VcError::NoSigningKey)
    }

    /// Return a copy of `credential` with a proof in the policy's format.
    ///
    /// # Errors
    ///
    /// - `NoSigningKey` if no key id is given or configured.
    /// - `KeyNotFound` / `PrivateKeyUnavailable` from the key manager.
    /// - `Canonicalization` if a required field is missing.
    /// - `UnsupportedAlgorithm` / `UnsupportedCryptosuite` if the key family
    ///   cannot produce the requested format.
    pub async fn create_proof_for_credential(
        &self,
        credential: &Credential,
        key_id: Option<&str>,
    ) -> Result<Credential, VcError> {
        let key_id = self.resolve_key_id(key_id)?;
        let key = self.keys.private_key(&key_id).await?;
        let method = key_iri(&self.policy.base_url, &key_id);
        let mut proved = credential.clone();

        match self.policy.format {
            ProofFormat::Legacy => {
                let verification =
                    create_verification(credential, key, &self.policy.base_url, &key_id)?;
                proved.proofs.clear();
                proved.verification = Some(Proof::LegacyHosted(verification));
            }
            ProofFormat::Jwt => {
                let mut claims_source = credential.clone();
                claims_source.verification = None;
                claims_source.proofs.clear();
                let claims = serde_json::to_value(&claims_source)?;
                let mut options = JwtProofOptions::new(
                    key,
                    key.family().default_algorithm(),
                    key_id.as_str(),
                    method,
                    self.policy.base_url.as_str(),
                );
                options.expires_in = self.policy.jwt_expires_in;
                let proof = generate_jwt_proof(&claims, &options)?;
                proved.verification = None;
                proved.proofs.push(Proof::Jwt(proof));
            }
            ProofFormat::DataIntegrity => {
                let proof =
                    create_data_integrity_proof(credential, key, &method, ProofPurpose::AssertionMethod)?;
                proved.verification = None;
                proved.proofs.push(Proof::DataIntegrity(proof));
            }
        }

        tracing::info!(
            credential = %credential.id,
            key_id = %key_id,
            format = %self.policy.format,
            "proof attached"
        );
        Ok(proved)
    }

    /// Assign a status entry if a status list manager is attached and the
    /// credential has none, then attach a proof.
    pub async fn issue(&self, mut credential: Credential, key_id: Option<&str>) -> Result<Credential, VcError> {
        if let (Some(status), None) = (&self.status, &credential.credential_status) {
            credential.credential_status =
                Some(status.allocate_for(&credential.id, StatusPurpose::Revocation));
        }
        self.create_proof_for_credential(&credential, key_id).await
    }
}
