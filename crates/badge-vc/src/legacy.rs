//! # Legacy Hosted Verification
//!
//! Creates and checks the `SignedBadge` verification object. The signature
//! itself is `badge_crypto::legacy`; this module binds it to the canonical
//! credential payload and to a key IRI of the form
//! `<base>/public-keys/<key id>`.

use std::sync::OnceLock;

use regex::Regex;

use badge_core::Timestamp;
use badge_crypto::{legacy, KeyManager, PrivateKey};

use crate::canonical::canonicalize;
use crate::credential::Credential;
use crate::error::VcError;
use crate::proof::{LegacyHostedProof, LEGACY_PROOF_TYPE};

const KEY_ID_PATTERN: &str = r"/public-keys/([^/?#]+)$";

/// IRI under which the public half of `key_id` is published.
pub fn key_iri(base_url: &str, key_id: &str) -> String {
    format!("{}/public-keys/{key_id}", base_url.trim_end_matches('/'))
}

/// Sign `credential` and build its verification object.
pub fn create_verification(
    credential: &Credential,
    key: &PrivateKey,
    base_url: &str,
    key_id: &str,
) -> Result<LegacyHostedProof, VcError> {
    let payload = canonicalize(credential)?;
    let signature_value = legacy::sign(payload.as_bytes(), key)?;
    Ok(LegacyHostedProof::new(
        key_iri(base_url, key_id),
        Timestamp::now(),
        signature_value,
    ))
}

/// Key id named by a creator IRI.
///
/// The IRI is parsed as a URL and the last `/public-keys/<id>` segment of its
/// path is taken. If it does not parse as a URL the same pattern is applied
/// to the raw string. Anything else yields `None`.
pub fn extract_key_id(creator: &str) -> Option<String> {
    let pattern = key_id_pattern()?;
    let haystack = match url::Url::parse(creator) {
        Ok(url) => return capture(pattern, url.path()),
        Err(_) => creator,
    };
    capture(pattern, haystack)
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn key_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(KEY_ID_PATTERN).ok())
        .as_ref()
}

/// Check a verification object against `credential`.
///
/// Returns `Ok(false)` for anything that merely fails to verify, including a
/// creator IRI with no recognizable key id.
///
/// # Errors
///
/// `KeyNotFound` if the key id is well formed but unknown, and any
/// canonicalization failure of the credential itself.
pub async fn verify_verification(
    credential: &Credential,
    proof: &LegacyHostedProof,
    keys: &KeyManager,
) -> Result<bool, VcError> {
    if proof.proof_type != LEGACY_PROOF_TYPE {
        tracing::debug!(proof_type = %proof.proof_type, "not a legacy proof");
        return Ok(false);
    }
    let Some(key_id) = extract_key_id(&proof.creator) else {
        tracing::debug!(creator = %proof.creator, "no key id in creator IRI");
        return Ok(false);
    };
    let key = keys.public_key(&key_id).await?;
    let payload = canonicalize(credential)?;
    Ok(legacy::verify(payload.as_bytes(), &proof.signature_value, key))
}
