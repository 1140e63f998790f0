//! # Legacy RSA-SHA256 Signatures
//!
//! The hosted-verification signature: RSA PKCS#1 v1.5 with SHA-256 over the
//! canonical payload bytes, carried as standard (padded) base64.
//!
//! Verification is total: any failure, including a non-RSA key or a
//! signature that is not valid base64, is reported as `false`.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::algorithm::{JwsAlgorithm, KeyFamily};
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Sign `payload` and return the base64 signature value.
///
/// # Errors
///
/// `UnsupportedAlgorithm` if `key` is not an RSA key.
pub fn sign(payload: &[u8], key: &PrivateKey) -> Result<String, CryptoError> {
    if key.family() != KeyFamily::Rsa {
        return Err(CryptoError::UnsupportedAlgorithm(format!(
            "legacy signatures require an RSA key, got {}",
            key.family()
        )));
    }
    let signature = key.sign(JwsAlgorithm::Rs256, payload)?;
    Ok(STANDARD.encode(signature))
}

/// Check a base64 signature value over `payload`.
pub fn verify(payload: &[u8], signature_value: &str, key: &PublicKey) -> bool {
    if key.family() != KeyFamily::Rsa {
        tracing::debug!(family = %key.family(), "legacy signature checked against non-RSA key");
        return false;
    }
    let Ok(signature) = STANDARD.decode(signature_value.trim()) else {
        tracing::debug!("legacy signature value is not base64");
        return false;
    };
    key.verify(JwsAlgorithm::Rs256, payload, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_key() -> PrivateKey {
        PrivateKey::generate_rsa(1024).unwrap()
    }

    #[test]
    fn roundtrip() {
        let key = rsa_key();
        let sig = sign(b"{\"id\":\"urn:a\"}", &key).unwrap();
        assert!(verify(b"{\"id\":\"urn:a\"}", &sig, &key.public_key()));
    }

    #[test]
    fn any_flipped_byte_fails() {
        let key = rsa_key();
        let payload = b"{\"badge\":\"urn:b\",\"id\":\"urn:a\"}".to_vec();
        let sig = sign(&payload, &key).unwrap();
        for i in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(&tampered, &sig, &key.public_key()), "byte {i}");
        }
    }

    #[test]
    fn wrong_key_fails() {
        let sig = sign(b"x", &rsa_key()).unwrap();
        assert!(!verify(b"x", &sig, &rsa_key().public_key()));
    }

    #[test]
    fn malformed_signature_is_false_not_error() {
        let key = rsa_key();
        assert!(!verify(b"x", "not base64!!", &key.public_key()));
        assert!(!verify(b"x", "", &key.public_key()));
        assert!(!verify(b"x", "AAAA", &key.public_key()));
    }

    #[test]
    fn non_rsa_keys() {
        let ed = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        assert!(matches!(
            sign(b"x", &ed),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        let sig = sign(b"x", &rsa_key()).unwrap();
        assert!(!verify(b"x", &sig, &ed.public_key()));
    }
}
