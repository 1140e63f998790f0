//! # Proofs
//!
//! The three proof shapes a badge can carry, discriminated by their `type`:
//!
//! | `type`               | Variant                  | Signature                       |
//! |----------------------|--------------------------|---------------------------------|
//! | `SignedBadge`        | [`LegacyHostedProof`]    | RSA-SHA256, base64              |
//! | `JwtProof2020`       | [`JwtProof`]             | compact JWS over a `vc` claim   |
//! | `DataIntegrityProof` | [`DataIntegrityProof`]   | `eddsa-jcs-2022`/`ecdsa-jcs-2019` |
//!
//! Anything else, including a known `type` whose body does not parse, is kept
//! verbatim as [`Proof::Unsupported`]. It survives a round trip through
//! serde but never verifies.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use badge_core::Timestamp;

pub const LEGACY_PROOF_TYPE: &str = "SignedBadge";
pub const JWT_PROOF_TYPE: &str = "JwtProof2020";
pub const DATA_INTEGRITY_PROOF_TYPE: &str = "DataIntegrityProof";

/// Why a proof was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the credential claims are true.
    #[default]
    AssertionMethod,
    /// Authentication of the credential holder.
    Authentication,
}

impl std::fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofPurpose::AssertionMethod => write!(f, "assertionMethod"),
            ProofPurpose::Authentication => write!(f, "authentication"),
        }
    }
}

/// Open Badges 2.0 signed verification object.
///
/// `creator` is the IRI of the signing key, normally
/// `<base>/public-keys/<key id>`; the key id is recovered from it at
/// verification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHostedProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub creator: String,
    pub created: Timestamp,
    pub signature_value: String,
}

impl LegacyHostedProof {
    pub fn new(creator: impl Into<String>, created: Timestamp, signature_value: String) -> Self {
        Self {
            proof_type: LEGACY_PROOF_TYPE.to_string(),
            creator: creator.into(),
            created,
            signature_value,
        }
    }
}

/// A compact JWS whose payload embeds the credential as the `vc` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: Timestamp,
    pub verification_method: String,
    pub proof_purpose: ProofPurpose,
    pub jws: String,
}

impl JwtProof {
    pub fn new(
        created: Timestamp,
        verification_method: impl Into<String>,
        proof_purpose: ProofPurpose,
        jws: String,
    ) -> Self {
        Self {
            proof_type: JWT_PROOF_TYPE.to_string(),
            created,
            verification_method: verification_method.into(),
            proof_purpose,
            jws,
        }
    }
}

/// W3C Data Integrity proof with a JCS cryptosuite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub cryptosuite: String,
    pub created: Timestamp,
    pub verification_method: String,
    pub proof_purpose: ProofPurpose,
    /// Multibase base58btc (`z` prefix) signature.
    pub proof_value: String,
}

/// A proof attached to a credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Proof {
    LegacyHosted(LegacyHostedProof),
    Jwt(JwtProof),
    DataIntegrity(DataIntegrityProof),
    /// Unknown or malformed proof, kept as received.
    Unsupported(Value),
}

impl Proof {
    /// The `type` string of the proof, if it has one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Proof::LegacyHosted(p) => Some(&p.proof_type),
            Proof::Jwt(p) => Some(&p.proof_type),
            Proof::DataIntegrity(p) => Some(&p.proof_type),
            Proof::Unsupported(v) => v.get("type").and_then(Value::as_str),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Proof::Unsupported(_))
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match value.get("type").and_then(Value::as_str) {
            Some(LEGACY_PROOF_TYPE) => serde_json::from_value(value.clone())
                .map(Proof::LegacyHosted)
                .ok(),
            Some(JWT_PROOF_TYPE) => serde_json::from_value(value.clone()).map(Proof::Jwt).ok(),
            Some(DATA_INTEGRITY_PROOF_TYPE) => serde_json::from_value(value.clone())
                .map(Proof::DataIntegrity)
                .ok(),
            _ => None,
        };
        Ok(parsed.unwrap_or_else(|| {
            tracing::debug!(proof_type = ?value.get("type"), "keeping unrecognized proof");
            Proof::Unsupported(value)
        }))
    }
}

impl From<LegacyHostedProof> for Proof {
    fn from(p: LegacyHostedProof) -> Self {
        Proof::LegacyHosted(p)
    }
}

impl From<JwtProof> for Proof {
    fn from(p: JwtProof) -> Self {
        Proof::Jwt(p)
    }
}

impl From<DataIntegrityProof> for Proof {
    fn from(p: DataIntegrityProof) -> Self {
        Proof::DataIntegrity(p)
    }
}
