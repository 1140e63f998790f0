//! # Data Integrity Proofs
//!
//! `DataIntegrityProof` with the JCS cryptosuites:
//!
//! - `eddsa-jcs-2022`: Ed25519, SHA-256.
//! - `ecdsa-jcs-2019`: P-256 with SHA-256, or P-384 with SHA-384.
//!
//! The signed bytes are `H(canonical proof configuration) ||
//! H(canonical credential payload)`, where the proof configuration is the
//! proof object without `proofValue`. The signature is carried as multibase
//! base58btc, i.e. `z` followed by base58.

use serde_json::{json, Value};
use sha2::{Digest, Sha256, Sha384};

use badge_core::{CanonicalBytes, Timestamp};
use badge_crypto::{JwsAlgorithm, KeyFamily, KeyManager, PrivateKey, PublicKey};

use crate::canonical::canonicalize;
use crate::credential::Credential;
use crate::error::VcError;
use crate::jwt_proof::key_id_from_method;
use crate::proof::{DataIntegrityProof, ProofPurpose, DATA_INTEGRITY_PROOF_TYPE};

pub const EDDSA_JCS_2022: &str = "eddsa-jcs-2022";
pub const ECDSA_JCS_2019: &str = "ecdsa-jcs-2019";

const MULTIBASE_BASE58BTC: char = 'z';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suite {
    EddsaJcs2022,
    EcdsaJcs2019,
}

impl Suite {
    fn for_family(family: KeyFamily) -> Result<Self, VcError> {
        match family {
            KeyFamily::Ed25519 => Ok(Self::EddsaJcs2022),
            KeyFamily::P256 | KeyFamily::P384 => Ok(Self::EcdsaJcs2019),
            other => Err(VcError::UnsupportedCryptosuite(format!(
                "no JCS cryptosuite for {other} keys"
            ))),
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            EDDSA_JCS_2022 => Some(Self::EddsaJcs2022),
            ECDSA_JCS_2019 => Some(Self::EcdsaJcs2019),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::EddsaJcs2022 => EDDSA_JCS_2022,
            Self::EcdsaJcs2019 => ECDSA_JCS_2019,
        }
    }

    /// Signature algorithm for a key of `family`, if the suite allows it.
    fn algorithm(self, family: KeyFamily) -> Option<JwsAlgorithm> {
        match (self, family) {
            (Self::EddsaJcs2022, KeyFamily::Ed25519) => Some(JwsAlgorithm::EdDsa),
            (Self::EcdsaJcs2019, KeyFamily::P256) => Some(JwsAlgorithm::Es256),
            (Self::EcdsaJcs2019, KeyFamily::P384) => Some(JwsAlgorithm::Es384),
            _ => None,
        }
    }
}

/// Sign `credential` with `key` using the suite that matches its family.
///
/// # Errors
///
/// `UnsupportedCryptosuite` for RSA and P-521 keys; canonicalization and
/// signing failures.
pub fn create_data_integrity_proof(
    credential: &Credential,
    key: &PrivateKey,
    verification_method: &str,
    proof_purpose: ProofPurpose,
) -> Result<DataIntegrityProof, VcError> {
    let family = key.family();
    let suite = Suite::for_family(family)?;
    let algorithm = suite
        .algorithm(family)
        .ok_or_else(|| VcError::UnsupportedCryptosuite(suite.name().to_string()))?;

    let mut proof = DataIntegrityProof {
        proof_type: DATA_INTEGRITY_PROOF_TYPE.to_string(),
        cryptosuite: suite.name().to_string(),
        created: Timestamp::now(),
        verification_method: verification_method.to_string(),
        proof_purpose,
        proof_value: String::new(),
    };
    let hash_data = hash_data(&proof, &canonicalize(credential)?, family)?;
    let signature = key.sign(algorithm, &hash_data)?;
    proof.proof_value = format!("{MULTIBASE_BASE58BTC}{}", bs58::encode(signature).into_string());
    Ok(proof)
}

/// Check `proof` over `credential` with `public_key`. Never errors: anything
/// that does not verify, including an unknown cryptosuite, is `false`.
pub fn verify_data_integrity_proof(
    credential: &Credential,
    proof: &DataIntegrityProof,
    public_key: &PublicKey,
) -> bool {
    match check(credential, proof, public_key) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!(error = %e, "data integrity proof not checkable");
            false
        }
    }
}

fn check(
    credential: &Credential,
    proof: &DataIntegrityProof,
    public_key: &PublicKey,
) -> Result<bool, VcError> {
    if proof.proof_type != DATA_INTEGRITY_PROOF_TYPE {
        return Ok(false);
    }
    let suite = Suite::parse(&proof.cryptosuite)
        .ok_or_else(|| VcError::UnsupportedCryptosuite(proof.cryptosuite.clone()))?;
    let family = public_key.family();
    let Some(algorithm) = suite.algorithm(family) else {
        return Ok(false);
    };
    let Some(encoded) = proof.proof_value.strip_prefix(MULTIBASE_BASE58BTC) else {
        return Ok(false);
    };
    let Ok(signature) = bs58::decode(encoded).into_vec() else {
        return Ok(false);
    };
    let hash_data = hash_data(proof, &canonicalize(credential)?, family)?;
    Ok(public_key.verify(algorithm, &hash_data, &signature).is_ok())
}

/// Resolve the verification method through `keys` and check the proof.
///
/// # Errors
///
/// `KeyNotFound` for an unknown key id and canonicalization failures of the
/// credential. A verification method with no key id is `Ok(false)`.
pub async fn verify_with_key_manager(
    credential: &Credential,
    proof: &DataIntegrityProof,
    keys: &KeyManager,
) -> Result<bool, VcError> {
    let Some(key_id) = key_id_from_method(&proof.verification_method) else {
        tracing::debug!(method = %proof.verification_method, "no key id in verification method");
        return Ok(false);
    };
    let key = keys.public_key(&key_id).await?;
    match check(credential, proof, key) {
        Err(VcError::UnsupportedCryptosuite(suite)) => {
            tracing::debug!(%suite, "unsupported cryptosuite");
            Ok(false)
        }
        other => other,
    }
}

fn hash_data(
    proof: &DataIntegrityProof,
    payload: &CanonicalBytes,
    family: KeyFamily,
) -> Result<Vec<u8>, VcError> {
    let config = proof_configuration(proof);
    let config = CanonicalBytes::from_value(config)?;
    Ok(match family {
        KeyFamily::P384 => [
            Sha384::digest(config.as_bytes()).to_vec(),
            Sha384::digest(payload.as_bytes()).to_vec(),
        ]
        .concat(),
        _ => [
            Sha256::digest(config.as_bytes()).to_vec(),
            Sha256::digest(payload.as_bytes()).to_vec(),
        ]
        .concat(),
    })
}

fn proof_configuration(proof: &DataIntegrityProof) -> Value {
    json!({
        "type": proof.proof_type,
        "cryptosuite": proof.cryptosuite,
        "created": proof.created,
        "verificationMethod": proof.verification_method,
        "proofPurpose": proof.proof_purpose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Recipient;
    use badge_crypto::{KeyPair, StaticKeySource};

    const METHOD: &str = "https://badges.example/public-keys/k1";

    fn credential() -> Credential {
        Credential::new(
            "urn:a",
            "urn:b",
            Recipient::identity("mailto:x@example.com"),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn sign_and_verify_each_supported_family() {
        for (family, suite) in [
            (KeyFamily::Ed25519, EDDSA_JCS_2022),
            (KeyFamily::P256, ECDSA_JCS_2019),
            (KeyFamily::P384, ECDSA_JCS_2019),
        ] {
            let key = PrivateKey::generate(family).unwrap();
            let proof =
                create_data_integrity_proof(&credential(), &key, METHOD, ProofPurpose::AssertionMethod)
                    .unwrap();
            assert_eq!(proof.cryptosuite, suite);
            assert!(proof.proof_value.starts_with('z'));
            assert!(
                verify_data_integrity_proof(&credential(), &proof, &key.public_key()),
                "{family}"
            );
        }
    }

    #[test]
    fn tampering_is_detected() {
        let key = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        let proof =
            create_data_integrity_proof(&credential(), &key, METHOD, ProofPurpose::AssertionMethod)
                .unwrap();

        let mut tampered = credential();
        tampered.recipient = Recipient::identity("mailto:y@example.com");
        assert!(!verify_data_integrity_proof(&tampered, &proof, &key.public_key()));

        let mut moved = proof.clone();
        moved.verification_method = "https://evil.example/public-keys/k1".into();
        assert!(!verify_data_integrity_proof(&credential(), &moved, &key.public_key()));

        let mut garbled = proof.clone();
        garbled.proof_value = "u0000".into();
        assert!(!verify_data_integrity_proof(&credential(), &garbled, &key.public_key()));

        let mut unknown = proof;
        unknown.cryptosuite = "bbs-2023".into();
        assert!(!verify_data_integrity_proof(&credential(), &unknown, &key.public_key()));
    }

    #[test]
    fn unsupported_families() {
        let rsa = PrivateKey::generate_rsa(1024).unwrap();
        assert!(matches!(
            create_data_integrity_proof(&credential(), &rsa, METHOD, ProofPurpose::AssertionMethod),
            Err(VcError::UnsupportedCryptosuite(_))
        ));
        let p521 = PrivateKey::generate(KeyFamily::P521).unwrap();
        assert!(create_data_integrity_proof(&credential(), &p521, METHOD, ProofPurpose::AssertionMethod)
            .is_err());
    }

    #[test]
    fn wrong_family_public_key_is_false() {
        let key = PrivateKey::generate(KeyFamily::P256).unwrap();
        let proof =
            create_data_integrity_proof(&credential(), &key, METHOD, ProofPurpose::AssertionMethod)
                .unwrap();
        let ed = PrivateKey::generate(KeyFamily::Ed25519).unwrap().public_key();
        assert!(!verify_data_integrity_proof(&credential(), &proof, &ed));
    }

    #[tokio::test]
    async fn resolves_key_through_manager() {
        let key = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        let keys = KeyManager::new(StaticKeySource::new(vec![KeyPair::from_private("k1", key.clone())]));
        let proof =
            create_data_integrity_proof(&credential(), &key, METHOD, ProofPurpose::AssertionMethod)
                .unwrap();
        assert!(verify_with_key_manager(&credential(), &proof, &keys).await.unwrap());

        let mut unknown = proof;
        unknown.verification_method = "https://badges.example/public-keys/k2".into();
        let err = verify_with_key_manager(&credential(), &unknown, &keys).await.unwrap_err();
        assert!(err.is_key_not_found());
    }
}
