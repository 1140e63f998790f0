//! # JWT Proofs
//!
//! `JwtProof2020`: the credential claims travel as the `vc` claim of a
//! compact JWS signed with any of the supported JOSE algorithms.
//!
//! Payload:
//!
//! ```json
//! { "iss": "<issuer IRI>", "iat": 1704067200, "vc": { ... },
//!   "sub": "...", "aud": "...", "exp": 1704070800, "nbf": 1704067200 }
//! ```
//!
//! `sub`, `aud`, `exp` and `nbf` appear only when asked for. Verification
//! never errors on bad input: every failure is a [`JwtRejection`]. The one
//! exception is [`verify_with_key_manager`], which reports an unknown key id
//! as `KeyNotFound` so callers can tell "who signed this?" apart from "the
//! signature is wrong".

use serde_json::{json, Map, Value};

use badge_core::Timestamp;
use badge_crypto::{jws, CryptoError, JwsAlgorithm, JwsHeader, KeyFamily, KeyManager, PrivateKey, PublicKey};

use crate::error::VcError;
use crate::legacy::extract_key_id;
use crate::proof::{JwtProof, ProofPurpose};

/// Default allowance for clock skew on `exp` and `nbf`, in seconds.
pub const DEFAULT_LEEWAY_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// How to sign a JWT proof.
#[derive(Debug, Clone)]
pub struct JwtProofOptions<'a> {
    pub private_key: &'a PrivateKey,
    pub algorithm: JwsAlgorithm,
    pub key_id: String,
    pub verification_method: String,
    pub issuer: String,
    pub subject: Option<String>,
    pub audience: Option<String>,
    /// `exp` offset from now, in seconds.
    pub expires_in: Option<i64>,
    /// `nbf` offset from now, in seconds.
    pub not_before: Option<i64>,
    pub proof_purpose: ProofPurpose,
}

impl<'a> JwtProofOptions<'a> {
    pub fn new(
        private_key: &'a PrivateKey,
        algorithm: JwsAlgorithm,
        key_id: impl Into<String>,
        verification_method: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            private_key,
            algorithm,
            key_id: key_id.into(),
            verification_method: verification_method.into(),
            issuer: issuer.into(),
            subject: None,
            audience: None,
            expires_in: None,
            not_before: None,
            proof_purpose: ProofPurpose::default(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_expires_in(mut self, secs: i64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn with_not_before(mut self, secs: i64) -> Self {
        self.not_before = Some(secs);
        self
    }
}

/// Sign `claims` into a `JwtProof2020`.
///
/// # Errors
///
/// `UnsupportedAlgorithm` if the algorithm does not belong to the key's
/// family; any signing failure from the key.
pub fn generate_jwt_proof(claims: &Value, options: &JwtProofOptions<'_>) -> Result<JwtProof, VcError> {
    let family = options.private_key.family();
    if options.algorithm.family() != family {
        return Err(CryptoError::UnsupportedAlgorithm(format!(
            "{} cannot be used with a {family} key",
            options.algorithm
        ))
        .into());
    }

    let now = Timestamp::now();
    let iat = now.epoch_secs();
    let mut payload = Map::new();
    payload.insert("iss".into(), json!(options.issuer));
    payload.insert("iat".into(), json!(iat));
    payload.insert("vc".into(), claims.clone());
    if let Some(sub) = &options.subject {
        payload.insert("sub".into(), json!(sub));
    }
    if let Some(aud) = &options.audience {
        payload.insert("aud".into(), json!(aud));
    }
    if let Some(secs) = options.expires_in {
        payload.insert("exp".into(), json!(iat.saturating_add(secs)));
    }
    if let Some(secs) = options.not_before {
        payload.insert("nbf".into(), json!(iat.saturating_add(secs)));
    }

    let header = JwsHeader::jwt(options.algorithm, Some(&options.key_id));
    let token = jws::encode(&header, &Value::Object(payload), options.private_key)?;
    tracing::debug!(
        key_id = %options.key_id,
        algorithm = %options.algorithm,
        "generated JWT proof"
    );
    Ok(JwtProof::new(
        now,
        options.verification_method.clone(),
        options.proof_purpose,
        token,
    ))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Claim checks applied after the signature.
#[derive(Debug, Clone)]
pub struct JwtVerifyOptions {
    pub expected_issuer: Option<String>,
    pub expected_audience: Option<String>,
    pub leeway_secs: i64,
    /// Clock override; `None` means the current time.
    pub now: Option<Timestamp>,
}

impl Default for JwtVerifyOptions {
    fn default() -> Self {
        Self {
            expected_issuer: None,
            expected_audience: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            now: None,
        }
    }
}

impl JwtVerifyOptions {
    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }
}

/// Claims of a JWT that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedJwt {
    pub algorithm: JwsAlgorithm,
    pub key_id: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub audience: Vec<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    /// The `vc` claim.
    pub credential: Value,
}

/// Why a JWT proof was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtRejection {
    #[error("malformed JWT: {0}")]
    Malformed(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("algorithm {algorithm} cannot be verified with a {family} key")]
    KeyMismatch {
        algorithm: JwsAlgorithm,
        family: KeyFamily,
    },
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("token expired at {exp}")]
    Expired { exp: i64 },
    #[error("token not valid before {nbf}")]
    NotYetValid { nbf: i64 },
    #[error("issuer mismatch: expected {expected}, got {actual:?}")]
    IssuerMismatch {
        expected: String,
        actual: Option<String>,
    },
    #[error("audience {expected} not present")]
    AudienceMismatch { expected: String },
    #[error("no vc claim")]
    MissingCredential,
}

/// Result of checking a JWT proof.
#[derive(Debug, Clone, PartialEq)]
pub enum JwtVerificationOutcome {
    Verified(VerifiedJwt),
    Rejected(JwtRejection),
}

impl JwtVerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    pub fn verified(&self) -> Option<&VerifiedJwt> {
        match self {
            Self::Verified(v) => Some(v),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&JwtRejection> {
        match self {
            Self::Verified(_) => None,
            Self::Rejected(r) => Some(r),
        }
    }
}

/// Check `proof` against `public_key`, then its time, issuer and audience
/// claims.
pub fn verify_jwt_proof(
    proof: &JwtProof,
    public_key: &PublicKey,
    options: &JwtVerifyOptions,
) -> JwtVerificationOutcome {
    match check(proof, public_key, options) {
        Ok(verified) => JwtVerificationOutcome::Verified(verified),
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "JWT proof rejected");
            JwtVerificationOutcome::Rejected(rejection)
        }
    }
}

fn check(
    proof: &JwtProof,
    public_key: &PublicKey,
    options: &JwtVerifyOptions,
) -> Result<VerifiedJwt, JwtRejection> {
    let decoded = jws::decode(&proof.jws).map_err(|e| JwtRejection::Malformed(e.to_string()))?;
    let algorithm = decoded
        .header
        .algorithm()
        .map_err(|_| JwtRejection::UnsupportedAlgorithm(decoded.header.alg.clone()))?;
    if algorithm.family() != public_key.family() {
        return Err(JwtRejection::KeyMismatch {
            algorithm,
            family: public_key.family(),
        });
    }
    decoded
        .verify(public_key)
        .map_err(|_| JwtRejection::InvalidSignature)?;

    let claims = decoded
        .payload
        .as_object()
        .ok_or_else(|| JwtRejection::Malformed("payload is not an object".into()))?;
    let now = options.now.unwrap_or_else(Timestamp::now).epoch_secs();
    let leeway = options.leeway_secs.max(0);

    let expires_at = numeric_claim(claims, "exp")?;
    if let Some(exp) = expires_at {
        if now >= exp.saturating_add(leeway) {
            return Err(JwtRejection::Expired { exp });
        }
    }
    if let Some(nbf) = numeric_claim(claims, "nbf")? {
        if now.saturating_add(leeway) < nbf {
            return Err(JwtRejection::NotYetValid { nbf });
        }
    }

    let issuer = string_claim(claims, "iss");
    if let Some(expected) = &options.expected_issuer {
        if issuer.as_ref() != Some(expected) {
            return Err(JwtRejection::IssuerMismatch {
                expected: expected.clone(),
                actual: issuer,
            });
        }
    }

    let audience = audience_claim(claims);
    if let Some(expected) = &options.expected_audience {
        if !audience.contains(expected) {
            return Err(JwtRejection::AudienceMismatch {
                expected: expected.clone(),
            });
        }
    }

    let credential = claims
        .get("vc")
        .filter(|v| v.is_object())
        .cloned()
        .ok_or(JwtRejection::MissingCredential)?;

    Ok(VerifiedJwt {
        algorithm,
        key_id: decoded.header.kid.clone(),
        issuer,
        subject: string_claim(claims, "sub"),
        audience,
        issued_at: numeric_claim(claims, "iat")?,
        expires_at,
        credential,
    })
}

/// Like [`verify_jwt_proof`], resolving the key through `keys`.
///
/// The key id comes from the `kid` header, or failing that from the proof's
/// verification method (`.../public-keys/<id>` or a `#<id>` fragment).
///
/// # Errors
///
/// `KeyNotFound` when the key id is not loaded, and any key source failure
/// during lazy initialization.
pub async fn verify_with_key_manager(
    proof: &JwtProof,
    keys: &KeyManager,
    options: &JwtVerifyOptions,
) -> Result<JwtVerificationOutcome, CryptoError> {
    let kid = match jws::decode(&proof.jws) {
        Ok(decoded) => decoded.header.kid,
        Err(e) => {
            return Ok(JwtVerificationOutcome::Rejected(JwtRejection::Malformed(
                e.to_string(),
            )))
        }
    };
    let Some(key_id) = kid.or_else(|| key_id_from_method(&proof.verification_method)) else {
        return Ok(JwtVerificationOutcome::Rejected(JwtRejection::Malformed(
            "no key id in header or verification method".into(),
        )));
    };
    let key = keys.public_key(&key_id).await?;
    Ok(verify_jwt_proof(proof, key, options))
}

pub(crate) fn key_id_from_method(method: &str) -> Option<String> {
    extract_key_id(method).or_else(|| {
        method
            .rsplit_once('#')
            .map(|(_, fragment)| fragment.to_string())
            .filter(|f| !f.is_empty())
    })
}

/// The `vc` claim of a JWT proof, without checking anything.
///
/// For display only. Nothing returned here has been verified.
pub fn extract_credential_from_jwt(proof: &JwtProof) -> Option<Value> {
    extract_credential_from_token(&proof.jws)
}

/// [`extract_credential_from_jwt`] for a bare compact token.
pub fn extract_credential_from_token(token: &str) -> Option<Value> {
    jws::decode(token).ok()?.payload.get("vc").cloned()
}

fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<i64>, JwtRejection> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| JwtRejection::Malformed(format!("{name} is out of range"))),
        Some(_) => Err(JwtRejection::Malformed(format!("{name} is not a number"))),
    }
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims.get(name).and_then(Value::as_str).map(str::to_string)
}

fn audience_claim(claims: &Map<String, Value>) -> Vec<String> {
    match claims.get("aud") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badge_crypto::{KeyPair, StaticKeySource};

    fn claims() -> Value {
        json!({
            "id": "urn:a",
            "type": "Assertion",
            "badge": "urn:b",
            "recipient": {"identity": "mailto:x@example.com"},
            "issuedOn": "2024-01-01T00:00:00Z"
        })
    }

    fn key(family: KeyFamily) -> PrivateKey {
        match family {
            KeyFamily::Rsa => PrivateKey::generate_rsa(1024).unwrap(),
            other => PrivateKey::generate(other).unwrap(),
        }
    }

    fn options(key: &PrivateKey, alg: JwsAlgorithm) -> JwtProofOptions<'_> {
        JwtProofOptions::new(
            key,
            alg,
            "k1",
            "https://badges.example/public-keys/k1",
            "https://badges.example",
        )
    }

    #[test]
    fn round_trip_every_algorithm() {
        let rsa = key(KeyFamily::Rsa);
        for alg in JwsAlgorithm::ALL {
            let owned;
            let signer = if alg.family() == KeyFamily::Rsa {
                &rsa
            } else {
                owned = key(alg.family());
                &owned
            };
            let proof = generate_jwt_proof(&claims(), &options(signer, alg)).unwrap();
            assert_eq!(proof.proof_type, "JwtProof2020");
            assert_eq!(proof.proof_purpose, ProofPurpose::AssertionMethod);

            let outcome =
                verify_jwt_proof(&proof, &signer.public_key(), &JwtVerifyOptions::default());
            let verified = outcome.verified().unwrap_or_else(|| panic!("{alg}: {outcome:?}"));
            assert_eq!(verified.algorithm, alg);
            assert_eq!(verified.issuer.as_deref(), Some("https://badges.example"));
            assert_eq!(verified.key_id.as_deref(), Some("k1"));
            assert_eq!(verified.credential, claims());
        }
    }

    #[test]
    fn header_and_optional_claims() {
        let signer = key(KeyFamily::Ed25519);
        let opts = options(&signer, JwsAlgorithm::EdDsa)
            .with_subject("mailto:x@example.com")
            .with_audience("https://verifier.example")
            .with_expires_in(3600)
            .with_not_before(0);
        let proof = generate_jwt_proof(&claims(), &opts).unwrap();
        let decoded = jws::decode(&proof.jws).unwrap();
        assert_eq!(decoded.header.alg, "EdDSA");
        assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
        let iat = decoded.payload["iat"].as_i64().unwrap();
        assert_eq!(decoded.payload["exp"].as_i64().unwrap(), iat + 3600);
        assert_eq!(decoded.payload["nbf"].as_i64().unwrap(), iat);

        let bare = generate_jwt_proof(&claims(), &options(&signer, JwsAlgorithm::EdDsa)).unwrap();
        let payload = jws::decode(&bare.jws).unwrap().payload;
        for absent in ["sub", "aud", "exp", "nbf"] {
            assert!(payload.get(absent).is_none(), "{absent} should be absent");
        }
    }

    #[test]
    fn algorithm_family_mismatch_at_generation() {
        let signer = key(KeyFamily::Ed25519);
        let err = generate_jwt_proof(&claims(), &options(&signer, JwsAlgorithm::Es256)).unwrap_err();
        assert!(matches!(err, VcError::Crypto(CryptoError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn key_mismatch_and_wrong_key() {
        let signer = key(KeyFamily::P256);
        let proof = generate_jwt_proof(&claims(), &options(&signer, JwsAlgorithm::Es256)).unwrap();

        let ed = key(KeyFamily::Ed25519).public_key();
        assert!(matches!(
            verify_jwt_proof(&proof, &ed, &JwtVerifyOptions::default()),
            JwtVerificationOutcome::Rejected(JwtRejection::KeyMismatch { .. })
        ));

        let other = key(KeyFamily::P256).public_key();
        assert_eq!(
            verify_jwt_proof(&proof, &other, &JwtVerifyOptions::default()).rejection(),
            Some(&JwtRejection::InvalidSignature)
        );
    }

    #[test]
    fn time_claims_respect_leeway() {
        let signer = key(KeyFamily::Ed25519);
        let opts = options(&signer, JwsAlgorithm::EdDsa)
            .with_expires_in(100)
            .with_not_before(50);
        let proof = generate_jwt_proof(&claims(), &opts).unwrap();
        let public = signer.public_key();
        let now = Timestamp::now();

        let at = |offset: i64| JwtVerifyOptions::default().at(now.plus_secs(offset));
        assert!(verify_jwt_proof(&proof, &public, &at(60)).is_valid());
        assert!(verify_jwt_proof(&proof, &public, &at(150)).is_valid());
        assert!(matches!(
            verify_jwt_proof(&proof, &public, &at(300)).rejection(),
            Some(JwtRejection::Expired { .. })
        ));
        assert!(matches!(
            verify_jwt_proof(&proof, &public, &at(-120)).rejection(),
            Some(JwtRejection::NotYetValid { .. })
        ));
    }

    #[test]
    fn token_is_expired_at_exactly_exp() {
        let signer = key(KeyFamily::Ed25519);
        let proof = generate_jwt_proof(
            &claims(),
            &options(&signer, JwsAlgorithm::EdDsa).with_expires_in(30),
        )
        .unwrap();
        let exp = jws::decode(&proof.jws).unwrap().payload["exp"].as_i64().unwrap();
        let public = signer.public_key();
        let strict = |at: i64| JwtVerifyOptions {
            leeway_secs: 0,
            ..JwtVerifyOptions::default().at(Timestamp::from_epoch_secs(at).unwrap())
        };

        assert!(verify_jwt_proof(&proof, &public, &strict(exp - 1)).is_valid());
        assert_eq!(
            verify_jwt_proof(&proof, &public, &strict(exp)).rejection(),
            Some(&JwtRejection::Expired { exp })
        );
    }

    #[test]
    fn issuer_and_audience() {
        let signer = key(KeyFamily::Ed25519);
        let opts = options(&signer, JwsAlgorithm::EdDsa).with_audience("https://verifier.example");
        let proof = generate_jwt_proof(&claims(), &opts).unwrap();
        let public = signer.public_key();

        let good = JwtVerifyOptions {
            expected_issuer: Some("https://badges.example".into()),
            expected_audience: Some("https://verifier.example".into()),
            ..JwtVerifyOptions::default()
        };
        assert!(verify_jwt_proof(&proof, &public, &good).is_valid());

        let wrong_iss = JwtVerifyOptions {
            expected_issuer: Some("https://evil.example".into()),
            ..JwtVerifyOptions::default()
        };
        assert!(matches!(
            verify_jwt_proof(&proof, &public, &wrong_iss).rejection(),
            Some(JwtRejection::IssuerMismatch { .. })
        ));

        let wrong_aud = JwtVerifyOptions {
            expected_audience: Some("https://other.example".into()),
            ..JwtVerifyOptions::default()
        };
        assert!(matches!(
            verify_jwt_proof(&proof, &public, &wrong_aud).rejection(),
            Some(JwtRejection::AudienceMismatch { .. })
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected_not_errors() {
        let public = key(KeyFamily::Ed25519).public_key();
        let mut proof = JwtProof::new(
            Timestamp::now(),
            "urn:key",
            ProofPurpose::AssertionMethod,
            "not-a-jwt".into(),
        );
        assert!(matches!(
            verify_jwt_proof(&proof, &public, &JwtVerifyOptions::default()).rejection(),
            Some(JwtRejection::Malformed(_))
        ));
        proof.jws = "a.b".into();
        assert!(!verify_jwt_proof(&proof, &public, &JwtVerifyOptions::default()).is_valid());
        assert!(extract_credential_from_jwt(&proof).is_none());
    }

    #[test]
    fn extract_without_verification() {
        let signer = key(KeyFamily::P384);
        let proof = generate_jwt_proof(&claims(), &options(&signer, JwsAlgorithm::Es384)).unwrap();
        assert_eq!(extract_credential_from_jwt(&proof), Some(claims()));
    }

    #[tokio::test]
    async fn key_manager_resolution() {
        let signer = key(KeyFamily::Ed25519);
        let keys = KeyManager::new(StaticKeySource::new(vec![KeyPair::from_private(
            "k1",
            signer.clone(),
        )]));
        let proof = generate_jwt_proof(&claims(), &options(&signer, JwsAlgorithm::EdDsa)).unwrap();
        let outcome = verify_with_key_manager(&proof, &keys, &JwtVerifyOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_valid());

        let mut unknown = options(&signer, JwsAlgorithm::EdDsa);
        unknown.key_id = "k9".into();
        let proof = generate_jwt_proof(&claims(), &unknown).unwrap();
        let err = verify_with_key_manager(&proof, &keys, &JwtVerifyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyNotFound(ref id) if id == "k9"));
    }

    #[test]
    fn key_id_fallbacks() {
        assert_eq!(
            key_id_from_method("https://b.example/public-keys/k1").as_deref(),
            Some("k1")
        );
        assert_eq!(key_id_from_method("did:web:b.example#key-1").as_deref(), Some("key-1"));
        assert_eq!(key_id_from_method("did:web:b.example"), None);
    }
}
