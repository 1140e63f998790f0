//! # Compact JWS
//!
//! Encoding and decoding of RFC 7515 compact serializations
//! (`header.payload.signature`, each segment base64url without padding).
//! Claim validation (`exp`, `nbf`, `iss`, `aud`) is the caller's concern;
//! this module only deals with structure and signatures.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algorithm::JwsAlgorithm;
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Protected header of a compact JWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl JwsHeader {
    /// A `typ: JWT` header for the given algorithm and key id.
    pub fn jwt(alg: JwsAlgorithm, kid: Option<&str>) -> Self {
        Self {
            alg: alg.as_str().to_string(),
            typ: Some("JWT".to_string()),
            kid: kid.map(str::to_string),
        }
    }

    /// The parsed algorithm; fails for anything outside the supported set.
    pub fn algorithm(&self) -> Result<JwsAlgorithm, CryptoError> {
        self.alg.parse()
    }
}

/// A decoded, not yet verified, compact JWS.
#[derive(Debug, Clone)]
pub struct DecodedJws {
    pub header: JwsHeader,
    pub payload: Value,
    signing_input: String,
    signature: Vec<u8>,
}

impl DecodedJws {
    /// Verify the signature with `key`, using the algorithm from the header.
    pub fn verify(&self, key: &PublicKey) -> Result<(), CryptoError> {
        let alg = self.header.algorithm()?;
        key.verify(alg, self.signing_input.as_bytes(), &self.signature)
    }
}

/// Sign `payload` and return the compact serialization.
pub fn encode(header: &JwsHeader, payload: &Value, key: &PrivateKey) -> Result<String, CryptoError> {
    let alg = header.algorithm()?;
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = key.sign(alg, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Split and decode a compact JWS without checking its signature.
pub fn decode(token: &str) -> Result<DecodedJws, CryptoError> {
    let mut parts = token.trim().split('.');
    let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::MalformedJws("expected three segments".into()));
    };

    let header_bytes = segment("header", h)?;
    let header: JwsHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::MalformedJws(format!("header is not JSON: {e}")))?;
    let payload: Value = serde_json::from_slice(&segment("payload", p)?)
        .map_err(|e| CryptoError::MalformedJws(format!("payload is not JSON: {e}")))?;
    let signature = segment("signature", s)?;

    Ok(DecodedJws {
        header,
        payload,
        signing_input: format!("{h}.{p}"),
        signature,
    })
}

fn segment(name: &str, b64: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(b64)
        .map_err(|e| CryptoError::MalformedJws(format!("{name} segment is not base64url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::KeyFamily;

    #[test]
    fn encode_decode_verify() {
        let key = PrivateKey::generate(KeyFamily::P256).unwrap();
        let header = JwsHeader::jwt(JwsAlgorithm::Es256, Some("k1"));
        let payload = serde_json::json!({"iss": "https://issuer.example", "iat": 1});
        let token = encode(&header, &payload, &key).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload, payload);
        decoded.verify(&key.public_key()).unwrap();
    }

    #[test]
    fn tampered_payload_fails() {
        let key = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        let header = JwsHeader::jwt(JwsAlgorithm::EdDsa, None);
        let token = encode(&header, &serde_json::json!({"a": 1}), &key).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"a":2}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(decode(&forged).unwrap().verify(&key.public_key()).is_err());
    }

    #[test]
    fn wrong_segment_count() {
        assert!(matches!(decode("a.b"), Err(CryptoError::MalformedJws(_))));
        assert!(matches!(decode("a.b.c.d"), Err(CryptoError::MalformedJws(_))));
    }

    #[test]
    fn unsupported_header_alg() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        let decoded = decode(&format!("{header}.{payload}.")).unwrap();
        let key = PrivateKey::generate(KeyFamily::Ed25519).unwrap().public_key();
        assert!(matches!(
            decoded.verify(&key),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
