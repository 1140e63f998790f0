//! # Key Material
//!
//! Closed sums over every key family the stack understands, with PEM and JWK
//! import/export, generation, and raw sign/verify per [`JwsAlgorithm`].
//!
//! ## Security Invariants
//!
//! - `PrivateKey` never prints its material through `Debug`.
//! - A key signs or verifies only with algorithms of its own family. A
//!   mismatch is a `KeyMismatch` error, never a silent downgrade.
//! - ECDSA signatures are the fixed-width `r || s` encoding used by JOSE.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::{Zeroize, Zeroizing};

use crate::algorithm::{JwsAlgorithm, KeyFamily};
use crate::error::CryptoError;

/// RSA modulus size for generated keys.
pub const DEFAULT_RSA_BITS: usize = 2048;

// ---------------------------------------------------------------------------
// Private keys
// ---------------------------------------------------------------------------

/// Private signing key of any supported family.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey::{}(<redacted>)", self.family())
    }
}

impl PrivateKey {
    /// Generate a fresh key using the OS CSPRNG.
    pub fn generate(family: KeyFamily) -> Result<Self, CryptoError> {
        match family {
            KeyFamily::Rsa => Self::generate_rsa(DEFAULT_RSA_BITS),
            KeyFamily::P256 => Ok(Self::P256(p256::SecretKey::random(&mut OsRng))),
            KeyFamily::P384 => Ok(Self::P384(p384::SecretKey::random(&mut OsRng))),
            KeyFamily::P521 => Ok(Self::P521(p521::SecretKey::random(&mut OsRng))),
            KeyFamily::Ed25519 => Ok(Self::Ed25519(ed25519_dalek::SigningKey::generate(
                &mut OsRng,
            ))),
        }
    }

    /// Generate an RSA key with an explicit modulus size.
    pub fn generate_rsa(bits: usize) -> Result<Self, CryptoError> {
        RsaPrivateKey::new(&mut OsRng, bits)
            .map(|k| Self::Rsa(Box::new(k)))
            .map_err(|e| CryptoError::InvalidKey(format!("RSA generation failed: {e}")))
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Rsa(_) => KeyFamily::Rsa,
            Self::P256(_) => KeyFamily::P256,
            Self::P384(_) => KeyFamily::P384,
            Self::P521(_) => KeyFamily::P521,
            Self::Ed25519(_) => KeyFamily::Ed25519,
        }
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(k) => PublicKey::Rsa(k.to_public_key()),
            Self::P256(k) => PublicKey::P256(k.public_key()),
            Self::P384(k) => PublicKey::P384(k.public_key()),
            Self::P521(k) => PublicKey::P521(k.public_key()),
            Self::Ed25519(k) => PublicKey::Ed25519(k.verifying_key()),
        }
    }

    /// Sign `msg` with `alg`. The algorithm must belong to this key's family.
    pub fn sign(&self, alg: JwsAlgorithm, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        ensure_family(alg, self.family())?;
        match self {
            Self::Rsa(k) => {
                let (padding, digest) = rsa_padding_and_digest(alg, msg);
                k.sign(padding, &digest)
                    .map_err(|e| CryptoError::Signing(e.to_string()))
            }
            Self::P256(k) => {
                let signing_key = p256::ecdsa::SigningKey::from(k);
                let sig: p256::ecdsa::Signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::P384(k) => {
                let signing_key = p384::ecdsa::SigningKey::from(k);
                let sig: p384::ecdsa::Signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::P521(k) => {
                let signing_key = p521::ecdsa::SigningKey::from_slice(&k.to_bytes())
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                let sig: p521::ecdsa::Signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::Ed25519(k) => Ok(k.sign(msg).to_bytes().to_vec()),
        }
    }

    /// Parse a PEM private key: PKCS#8 for every family, PKCS#1 for RSA.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let pem = pem.trim();
        if let Ok(k) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(Self::Rsa(Box::new(k)));
        }
        if let Ok(k) = RsaPrivateKey::from_pkcs1_pem(pem) {
            return Ok(Self::Rsa(Box::new(k)));
        }
        if let Ok(k) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(Self::P256(k));
        }
        if let Ok(k) = p384::SecretKey::from_pkcs8_pem(pem) {
            return Ok(Self::P384(k));
        }
        if let Ok(k) = p521::SecretKey::from_pkcs8_pem(pem) {
            return Ok(Self::P521(k));
        }
        if let Ok(k) = ed25519_dalek::SigningKey::from_pkcs8_pem(pem) {
            return Ok(Self::Ed25519(k));
        }
        Err(CryptoError::InvalidKey(
            "unrecognized private key PEM (expected PKCS#8, or PKCS#1 for RSA)".into(),
        ))
    }

    /// Encode as a PKCS#8 PEM document.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        let result = match self {
            Self::Rsa(k) => k.to_pkcs8_pem(LineEnding::LF),
            Self::P256(k) => k.to_pkcs8_pem(LineEnding::LF),
            Self::P384(k) => k.to_pkcs8_pem(LineEnding::LF),
            Self::P521(k) => k.to_pkcs8_pem(LineEnding::LF),
            Self::Ed25519(k) => k.to_pkcs8_pem(LineEnding::LF),
        };
        result.map_err(|e| CryptoError::InvalidKey(format!("PKCS#8 encoding failed: {e}")))
    }

    /// Import a private JWK (`d` must be present).
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, CryptoError> {
        let d = jwk
            .d
            .as_deref()
            .ok_or_else(|| CryptoError::InvalidKey("JWK has no private component `d`".into()))?;
        let d = Zeroizing::new(b64_decode("d", d)?);
        match jwk.kty.as_str() {
            "RSA" => {
                let n = BigUint::from_bytes_be(&b64_decode("n", jwk.require("n", &jwk.n)?)?);
                let e = BigUint::from_bytes_be(&b64_decode("e", jwk.require("e", &jwk.e)?)?);
                let mut primes = Vec::new();
                if let (Some(p), Some(q)) = (&jwk.p, &jwk.q) {
                    primes.push(BigUint::from_bytes_be(&b64_decode("p", p)?));
                    primes.push(BigUint::from_bytes_be(&b64_decode("q", q)?));
                }
                let key = RsaPrivateKey::from_components(n, e, BigUint::from_bytes_be(&d), primes)
                    .map_err(|e| CryptoError::InvalidKey(format!("RSA JWK: {e}")))?;
                Ok(Self::Rsa(Box::new(key)))
            }
            "EC" => match jwk.crv.as_deref() {
                Some("P-256") => p256::SecretKey::from_slice(&d)
                    .map(Self::P256)
                    .map_err(|e| CryptoError::InvalidKey(format!("P-256 JWK: {e}"))),
                Some("P-384") => p384::SecretKey::from_slice(&d)
                    .map(Self::P384)
                    .map_err(|e| CryptoError::InvalidKey(format!("P-384 JWK: {e}"))),
                Some("P-521") => p521::SecretKey::from_slice(&d)
                    .map(Self::P521)
                    .map_err(|e| CryptoError::InvalidKey(format!("P-521 JWK: {e}"))),
                other => Err(CryptoError::UnsupportedAlgorithm(format!(
                    "EC curve {other:?}"
                ))),
            },
            "OKP" => {
                if jwk.crv.as_deref() != Some("Ed25519") {
                    return Err(CryptoError::UnsupportedAlgorithm(format!(
                        "OKP curve {:?}",
                        jwk.crv
                    )));
                }
                let seed: [u8; 32] = d.as_slice().try_into().map_err(|_| {
                    CryptoError::InvalidKey(format!("Ed25519 seed must be 32 bytes, got {}", d.len()))
                })?;
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed)))
            }
            other => Err(CryptoError::UnsupportedAlgorithm(format!("JWK kty {other}"))),
        }
    }

    /// Export as a private JWK (public members plus `d`, and `p`/`q` for RSA).
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = self.public_key().to_jwk();
        match self {
            Self::Rsa(k) => {
                jwk.d = Some(URL_SAFE_NO_PAD.encode(k.d().to_bytes_be()));
                if let [p, q] = k.primes() {
                    jwk.p = Some(URL_SAFE_NO_PAD.encode(p.to_bytes_be()));
                    jwk.q = Some(URL_SAFE_NO_PAD.encode(q.to_bytes_be()));
                }
            }
            Self::P256(k) => jwk.d = Some(URL_SAFE_NO_PAD.encode(k.to_bytes())),
            Self::P384(k) => jwk.d = Some(URL_SAFE_NO_PAD.encode(k.to_bytes())),
            Self::P521(k) => jwk.d = Some(URL_SAFE_NO_PAD.encode(k.to_bytes())),
            Self::Ed25519(k) => jwk.d = Some(URL_SAFE_NO_PAD.encode(k.to_bytes())),
        }
        jwk
    }
}

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

/// Public verification key of any supported family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl PublicKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Rsa(_) => KeyFamily::Rsa,
            Self::P256(_) => KeyFamily::P256,
            Self::P384(_) => KeyFamily::P384,
            Self::P521(_) => KeyFamily::P521,
            Self::Ed25519(_) => KeyFamily::Ed25519,
        }
    }

    /// Verify `sig` over `msg`.
    ///
    /// # Errors
    ///
    /// `KeyMismatch` when `alg` is not of this key's family,
    /// `VerificationFailed` for a malformed or non-matching signature.
    pub fn verify(&self, alg: JwsAlgorithm, msg: &[u8], sig: &[u8]) -> Result<(), CryptoError> {
        ensure_family(alg, self.family())?;
        let failed = |e: &dyn std::fmt::Display| CryptoError::VerificationFailed(e.to_string());
        match self {
            Self::Rsa(k) => {
                let (padding, digest) = rsa_padding_and_digest(alg, msg);
                k.verify(padding, &digest, sig).map_err(|e| failed(&e))
            }
            Self::P256(k) => {
                let sig = p256::ecdsa::Signature::from_slice(sig).map_err(|e| failed(&e))?;
                p256::ecdsa::VerifyingKey::from(k)
                    .verify(msg, &sig)
                    .map_err(|e| failed(&e))
            }
            Self::P384(k) => {
                let sig = p384::ecdsa::Signature::from_slice(sig).map_err(|e| failed(&e))?;
                p384::ecdsa::VerifyingKey::from(k)
                    .verify(msg, &sig)
                    .map_err(|e| failed(&e))
            }
            Self::P521(k) => {
                let sig = p521::ecdsa::Signature::from_slice(sig).map_err(|e| failed(&e))?;
                let point = k.to_encoded_point(false);
                p521::ecdsa::VerifyingKey::from_sec1_bytes(point.as_bytes())
                    .map_err(|e| failed(&e))?
                    .verify(msg, &sig)
                    .map_err(|e| failed(&e))
            }
            Self::Ed25519(k) => {
                let sig = ed25519_dalek::Signature::from_slice(sig).map_err(|e| failed(&e))?;
                k.verify(msg, &sig).map_err(|e| failed(&e))
            }
        }
    }

    /// Parse a PEM public key: SPKI for every family, PKCS#1 for RSA.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let pem = pem.trim();
        if let Ok(k) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(Self::Rsa(k));
        }
        if let Ok(k) = RsaPublicKey::from_pkcs1_pem(pem) {
            return Ok(Self::Rsa(k));
        }
        if let Ok(k) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(Self::P256(k));
        }
        if let Ok(k) = p384::PublicKey::from_public_key_pem(pem) {
            return Ok(Self::P384(k));
        }
        if let Ok(k) = p521::PublicKey::from_public_key_pem(pem) {
            return Ok(Self::P521(k));
        }
        if let Ok(k) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) {
            return Ok(Self::Ed25519(k));
        }
        Err(CryptoError::InvalidKey(
            "unrecognized public key PEM (expected SPKI, or PKCS#1 for RSA)".into(),
        ))
    }

    /// Encode as an SPKI PEM document.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let result = match self {
            Self::Rsa(k) => k.to_public_key_pem(LineEnding::LF),
            Self::P256(k) => k.to_public_key_pem(LineEnding::LF),
            Self::P384(k) => k.to_public_key_pem(LineEnding::LF),
            Self::P521(k) => k.to_public_key_pem(LineEnding::LF),
            Self::Ed25519(k) => k.to_public_key_pem(LineEnding::LF),
        };
        result.map_err(|e| CryptoError::InvalidKey(format!("SPKI encoding failed: {e}")))
    }

    /// Import the public members of a JWK. Private members are ignored.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, CryptoError> {
        match jwk.kty.as_str() {
            "RSA" => {
                let n = BigUint::from_bytes_be(&b64_decode("n", jwk.require("n", &jwk.n)?)?);
                let e = BigUint::from_bytes_be(&b64_decode("e", jwk.require("e", &jwk.e)?)?);
                RsaPublicKey::new(n, e)
                    .map(Self::Rsa)
                    .map_err(|e| CryptoError::InvalidKey(format!("RSA JWK: {e}")))
            }
            "EC" => {
                let mut sec1 = vec![0x04];
                sec1.extend(b64_decode("x", jwk.require("x", &jwk.x)?)?);
                sec1.extend(b64_decode("y", jwk.require("y", &jwk.y)?)?);
                let invalid = |e: p256::elliptic_curve::Error| {
                    CryptoError::InvalidKey(format!("EC JWK point: {e}"))
                };
                match jwk.crv.as_deref() {
                    Some("P-256") => p256::PublicKey::from_sec1_bytes(&sec1)
                        .map(Self::P256)
                        .map_err(invalid),
                    Some("P-384") => p384::PublicKey::from_sec1_bytes(&sec1)
                        .map(Self::P384)
                        .map_err(invalid),
                    Some("P-521") => p521::PublicKey::from_sec1_bytes(&sec1)
                        .map(Self::P521)
                        .map_err(invalid),
                    other => Err(CryptoError::UnsupportedAlgorithm(format!(
                        "EC curve {other:?}"
                    ))),
                }
            }
            "OKP" => {
                if jwk.crv.as_deref() != Some("Ed25519") {
                    return Err(CryptoError::UnsupportedAlgorithm(format!(
                        "OKP curve {:?}",
                        jwk.crv
                    )));
                }
                let x = b64_decode("x", jwk.require("x", &jwk.x)?)?;
                let bytes: [u8; 32] = x.as_slice().try_into().map_err(|_| {
                    CryptoError::InvalidKey(format!("Ed25519 key must be 32 bytes, got {}", x.len()))
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map(Self::Ed25519)
                    .map_err(|e| CryptoError::InvalidKey(format!("Ed25519 JWK: {e}")))
            }
            other => Err(CryptoError::UnsupportedAlgorithm(format!("JWK kty {other}"))),
        }
    }

    /// Export as a public JWK.
    pub fn to_jwk(&self) -> Jwk {
        match self {
            Self::Rsa(k) => {
                let mut jwk = Jwk::new("RSA");
                jwk.n = Some(URL_SAFE_NO_PAD.encode(k.n().to_bytes_be()));
                jwk.e = Some(URL_SAFE_NO_PAD.encode(k.e().to_bytes_be()));
                jwk
            }
            Self::P256(k) => ec_jwk("P-256", k.to_encoded_point(false).as_bytes()),
            Self::P384(k) => ec_jwk("P-384", k.to_encoded_point(false).as_bytes()),
            Self::P521(k) => ec_jwk("P-521", k.to_encoded_point(false).as_bytes()),
            Self::Ed25519(k) => {
                let mut jwk = Jwk::new("OKP");
                jwk.crv = Some("Ed25519".into());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(k.as_bytes()));
                jwk
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JWK
// ---------------------------------------------------------------------------

/// JSON Web Key (RFC 7517) members used by RSA, EC and OKP keys.
///
/// Private members are zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    fn new(kty: &str) -> Self {
        Self {
            kty: kty.to_string(),
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            kid: None,
            alg: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    fn require<'a>(&self, member: &str, value: &'a Option<String>) -> Result<&'a str, CryptoError> {
        value
            .as_deref()
            .ok_or_else(|| CryptoError::InvalidKey(format!("{} JWK missing `{member}`", self.kty)))
    }
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("kid", &self.kid)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

impl Drop for Jwk {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Key pairs
// ---------------------------------------------------------------------------

/// A key identifier bound to one public key and, optionally, its private key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    key_id: String,
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl KeyPair {
    pub fn from_private(key_id: impl Into<String>, private: PrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            public: private.public_key(),
            private: Some(private),
        }
    }

    /// A pair that can verify but never sign.
    pub fn verify_only(key_id: impl Into<String>, public: PublicKey) -> Self {
        Self {
            key_id: key_id.into(),
            public,
            private: None,
        }
    }

    pub fn generate(key_id: impl Into<String>, family: KeyFamily) -> Result<Self, CryptoError> {
        Ok(Self::from_private(key_id, PrivateKey::generate(family)?))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn family(&self) -> KeyFamily {
        self.public.family()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The private key, or `PrivateKeyUnavailable` for verify-only pairs.
    pub fn private_key(&self) -> Result<&PrivateKey, CryptoError> {
        self.private
            .as_ref()
            .ok_or_else(|| CryptoError::PrivateKeyUnavailable(self.key_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_family(alg: JwsAlgorithm, family: KeyFamily) -> Result<(), CryptoError> {
    if alg.family() == family {
        Ok(())
    } else {
        Err(CryptoError::KeyMismatch {
            algorithm: alg.to_string(),
            family: family.to_string(),
        })
    }
}

/// PKCS#1 v1.5 padding and the pre-hashed message for an RSA algorithm.
fn rsa_padding_and_digest(alg: JwsAlgorithm, msg: &[u8]) -> (Pkcs1v15Sign, Vec<u8>) {
    match alg {
        JwsAlgorithm::Rs384 => (Pkcs1v15Sign::new::<Sha384>(), Sha384::digest(msg).to_vec()),
        JwsAlgorithm::Rs512 => (Pkcs1v15Sign::new::<Sha512>(), Sha512::digest(msg).to_vec()),
        _ => (Pkcs1v15Sign::new::<Sha256>(), Sha256::digest(msg).to_vec()),
    }
}

fn ec_jwk(crv: &str, uncompressed: &[u8]) -> Jwk {
    // SEC1 uncompressed: 0x04 || x || y, coordinates of equal width.
    let coords = uncompressed.get(1..).unwrap_or_default();
    let (x, y) = coords.split_at(coords.len() / 2);
    let mut jwk = Jwk::new("EC");
    jwk.crv = Some(crv.to_string());
    jwk.x = Some(URL_SAFE_NO_PAD.encode(x));
    jwk.y = Some(URL_SAFE_NO_PAD.encode(y));
    jwk
}

fn b64_decode(member: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::InvalidKey(format!("JWK member `{member}` is not base64url: {e}")))
}
