//! # Algorithms and Key Families
//!
//! [`JwsAlgorithm`] is the closed set of JOSE signature algorithms this
//! stack signs and verifies with. [`KeyFamily`] is the kind of key material
//! behind a key identifier. Every algorithm belongs to exactly one family.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Key family
// ---------------------------------------------------------------------------

/// The kind of key material behind a key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFamily {
    /// RSA, any modulus size.
    Rsa,
    /// ECDSA over NIST P-256.
    P256,
    /// ECDSA over NIST P-384.
    P384,
    /// ECDSA over NIST P-521.
    P521,
    /// Ed25519 (EdDSA).
    Ed25519,
}

impl KeyFamily {
    /// Algorithm used when a caller does not ask for one explicitly.
    pub fn default_algorithm(&self) -> JwsAlgorithm {
        match self {
            Self::Rsa => JwsAlgorithm::Rs256,
            Self::P256 => JwsAlgorithm::Es256,
            Self::P384 => JwsAlgorithm::Es384,
            Self::P521 => JwsAlgorithm::Es512,
            Self::Ed25519 => JwsAlgorithm::EdDsa,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::P256 => "p256",
            Self::P384 => "p384",
            Self::P521 => "p521",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyFamily {
    type Err = CryptoError;

    /// Accepts family names as well as JWS algorithm names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(Self::Rsa),
            "ec" | "ecdsa" | "p256" | "p-256" => Ok(Self::P256),
            "p384" | "p-384" => Ok(Self::P384),
            "p521" | "p-521" => Ok(Self::P521),
            "ed25519" | "eddsa" => Ok(Self::Ed25519),
            _ => JwsAlgorithm::from_str(s).map(|alg| alg.family()),
        }
    }
}

// ---------------------------------------------------------------------------
// JWS algorithm
// ---------------------------------------------------------------------------

/// Supported JOSE signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JwsAlgorithm {
    #[serde(rename = "RS256")]
    Rs256,
    #[serde(rename = "RS384")]
    Rs384,
    #[serde(rename = "RS512")]
    Rs512,
    #[serde(rename = "ES256")]
    Es256,
    #[serde(rename = "ES384")]
    Es384,
    #[serde(rename = "ES512")]
    Es512,
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl JwsAlgorithm {
    pub const ALL: [JwsAlgorithm; 7] = [
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::EdDsa,
    ];

    /// Map a loose key-type name to the algorithm used to sign with it.
    ///
    /// `"rsa"` maps to RS256, `"ec"`/`"ecdsa"` to ES256, `"ed25519"`/`"eddsa"`
    /// to EdDSA. Anything else falls back to RS256.
    pub fn for_key_type(key_type: &str) -> Self {
        match key_type.to_ascii_lowercase().as_str() {
            "rsa" => Self::Rs256,
            "ec" | "ecdsa" => Self::Es256,
            "ed25519" | "eddsa" => Self::EdDsa,
            _ => Self::Rs256,
        }
    }

    /// The JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::EdDsa => "EdDSA",
        }
    }

    /// The only key family this algorithm can sign or verify with.
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Rs256 | Self::Rs384 | Self::Rs512 => KeyFamily::Rsa,
            Self::Es256 => KeyFamily::P256,
            Self::Es384 => KeyFamily::P384,
            Self::Es512 => KeyFamily::P521,
            Self::EdDsa => KeyFamily::Ed25519,
        }
    }

    /// Length of a raw `r || s` signature for ECDSA algorithms.
    pub fn ecdsa_signature_len(&self) -> Option<usize> {
        match self {
            Self::Es256 => Some(64),
            Self::Es384 => Some(96),
            Self::Es512 => Some(132),
            _ => None,
        }
    }
}

impl std::fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwsAlgorithm {
    type Err = CryptoError;

    /// Strict parse of a JOSE `alg` value. Case-sensitive, as in JOSE headers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_string()))
    }
}
