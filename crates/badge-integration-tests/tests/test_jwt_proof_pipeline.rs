//! # JWT Proof Pipeline
//!
//! JWT proofs generated from key-manager keys, resolved back through the key
//! manager by `kid`, and checked for time, issuer and audience claims.

use std::sync::Arc;

use badge_core::Timestamp;
use badge_crypto::{CryptoError, JwsAlgorithm, KeyFamily, KeyManager, KeyPair, PrivateKey, StaticKeySource};
use badge_vc::jwt_proof::verify_with_key_manager;
use badge_vc::verifier::DETAILS_ERROR;
use badge_vc::{
    extract_credential_from_jwt, generate_jwt_proof, Credential, CredentialIssuer, CredentialVerifier,
    IssuancePolicy, JwtProofOptions, JwtRejection, JwtVerifyOptions, Proof, Recipient,
};
use serde_json::json;

const BASE: &str = "https://badges.example";

fn keys() -> KeyManager {
    KeyManager::new(StaticKeySource::new(vec![
        KeyPair::from_private("k1", PrivateKey::generate_rsa(1024).unwrap()),
        KeyPair::generate("ec", KeyFamily::P384).unwrap(),
    ]))
}

fn claims() -> serde_json::Value {
    json!({
        "id": "urn:a",
        "type": "Assertion",
        "badge": "urn:b",
        "recipient": {"identity": "mailto:x@example.com"},
        "issuedOn": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn round_trip_through_key_manager() {
    let keys = keys();
    for (key_id, alg) in [("k1", JwsAlgorithm::Rs256), ("ec", JwsAlgorithm::Es384)] {
        let key = keys.private_key(key_id).await.unwrap();
        let options = JwtProofOptions::new(key, alg, key_id, format!("{BASE}/public-keys/{key_id}"), BASE)
            .with_subject("mailto:x@example.com")
            .with_audience("https://verifier.example")
            .with_expires_in(3600);
        let proof = generate_jwt_proof(&claims(), &options).unwrap();
        assert_eq!(proof.jws.split('.').count(), 3);

        let verify = JwtVerifyOptions {
            expected_issuer: Some(BASE.into()),
            expected_audience: Some("https://verifier.example".into()),
            ..JwtVerifyOptions::default()
        };
        let outcome = verify_with_key_manager(&proof, &keys, &verify).await.unwrap();
        let verified = outcome.verified().expect("verified");
        assert_eq!(verified.algorithm, alg);
        assert_eq!(verified.key_id.as_deref(), Some(key_id));
        assert_eq!(verified.issuer.as_deref(), Some(BASE));
        assert_eq!(verified.subject.as_deref(), Some("mailto:x@example.com"));
        assert_eq!(verified.audience, vec!["https://verifier.example".to_string()]);
        assert_eq!(verified.credential, claims());

        assert_eq!(extract_credential_from_jwt(&proof), Some(claims()));
    }
}

#[tokio::test]
async fn unknown_kid_is_key_not_found() {
    let keys = keys();
    let outsider = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
    let options = JwtProofOptions::new(&outsider, JwsAlgorithm::EdDsa, "ghost", "did:example:issuer#ghost", BASE);
    let proof = generate_jwt_proof(&claims(), &options).unwrap();

    let err = verify_with_key_manager(&proof, &keys, &JwtVerifyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::KeyNotFound(ref id) if id == "ghost"));

    let mut credential: Credential = serde_json::from_value(claims()).unwrap();
    credential.attach_proof(Proof::Jwt(proof));
    let result = CredentialVerifier::new(Arc::new(keys)).verify_credential(&credential).await;
    assert!(!result.is_valid());
    assert_eq!(result.details(), DETAILS_ERROR);
}

#[tokio::test]
async fn claim_checks_reject() {
    let keys = keys();
    let key = keys.private_key("k1").await.unwrap();
    let base_options = || JwtProofOptions::new(key, JwsAlgorithm::Rs256, "k1", format!("{BASE}/public-keys/k1"), BASE);

    let short_lived = generate_jwt_proof(&claims(), &base_options().with_expires_in(60)).unwrap();
    let later = JwtVerifyOptions::default().at(Timestamp::now().plus_secs(3600));
    let outcome = verify_with_key_manager(&short_lived, &keys, &later).await.unwrap();
    assert!(matches!(outcome.rejection(), Some(JwtRejection::Expired { .. })));

    let future = generate_jwt_proof(&claims(), &base_options().with_not_before(3600)).unwrap();
    let outcome = verify_with_key_manager(&future, &keys, &JwtVerifyOptions::default())
        .await
        .unwrap();
    assert!(matches!(outcome.rejection(), Some(JwtRejection::NotYetValid { .. })));

    let plain = generate_jwt_proof(&claims(), &base_options()).unwrap();
    let wrong_issuer = JwtVerifyOptions {
        expected_issuer: Some("https://impostor.example".into()),
        ..JwtVerifyOptions::default()
    };
    let outcome = verify_with_key_manager(&plain, &keys, &wrong_issuer).await.unwrap();
    assert!(matches!(outcome.rejection(), Some(JwtRejection::IssuerMismatch { .. })));

    let wrong_audience = JwtVerifyOptions {
        expected_audience: Some("https://verifier.example".into()),
        ..JwtVerifyOptions::default()
    };
    let outcome = verify_with_key_manager(&plain, &keys, &wrong_audience).await.unwrap();
    assert!(matches!(outcome.rejection(), Some(JwtRejection::AudienceMismatch { .. })));
}

#[tokio::test]
async fn signature_from_wrong_key_under_known_kid_is_rejected() {
    let keys = keys();
    let impostor = PrivateKey::generate_rsa(1024).unwrap();
    let options = JwtProofOptions::new(&impostor, JwsAlgorithm::Rs256, "k1", format!("{BASE}/public-keys/k1"), BASE);
    let proof = generate_jwt_proof(&claims(), &options).unwrap();

    let outcome = verify_with_key_manager(&proof, &keys, &JwtVerifyOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.rejection(), Some(&JwtRejection::InvalidSignature));

    let mut credential: Credential = serde_json::from_value(claims()).unwrap();
    credential.attach_proof(Proof::Jwt(proof));
    let result = CredentialVerifier::new(Arc::new(keys)).verify_credential(&credential).await;
    assert!(!result.has_valid_signature());
}

#[test]
fn recipient_in_claims_round_trips() {
    let credential: Credential = serde_json::from_value(claims()).unwrap();
    assert_eq!(credential.recipient, Recipient::identity("mailto:x@example.com"));
}

#[tokio::test]
async fn attached_jwt_replaces_legacy_verification() {
    let keys = Arc::new(keys());
    let legacy = CredentialIssuer::new(Arc::clone(&keys), IssuancePolicy::new(BASE))
        .create_proof_for_credential(&serde_json::from_value(claims()).unwrap(), Some("k1"))
        .await
        .unwrap();
    assert!(matches!(legacy.verification, Some(Proof::LegacyHosted(_))));

    let outsider = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
    let options = JwtProofOptions::new(&outsider, JwsAlgorithm::EdDsa, "ghost", "did:example:issuer#ghost", BASE);
    let mut credential = legacy.clone();
    credential.attach_proof(Proof::Jwt(generate_jwt_proof(&claims(), &options).unwrap()));
    assert!(credential.verification.is_none());
    assert!(matches!(credential.primary_proof(), Some(Proof::Jwt(_))));

    let verifier = CredentialVerifier::new(keys);
    assert!(verifier.verify_credential(&legacy).await.is_valid());
    assert_eq!(verifier.verify_credential(&credential).await.details(), DETAILS_ERROR);
}
