//! # Badge Credentials
//!
//! The assertion data model. Only `id`, `type`, `badge`, `recipient`,
//! `issuedOn` and `expires` are covered by signatures (see
//! [`crate::canonical`]); everything else, proofs and status included, can
//! change without invalidating them.
//!
//! Unknown top-level members are kept in [`Credential::extensions`] so that a
//! credential read from storage serializes back the way it came in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use badge_core::Timestamp;
use badge_status::StatusListEntry;

use crate::proof::Proof;

pub const DEFAULT_CREDENTIAL_TYPE: &str = "Assertion";

/// A badge assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<CredentialType>,

    /// IRI of the badge class.
    pub badge: String,

    pub recipient: Recipient,

    pub issued_on: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Timestamp>,

    /// Legacy hosted signature object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Proof>,

    /// Proofs in order of attachment. Accepts a single object on input.
    #[serde(
        rename = "proof",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub proofs: Vec<Proof>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<StatusListEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// `type` is either a string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialType {
    Single(String),
    Array(Vec<String>),
}

impl CredentialType {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            CredentialType::Single(s) => s == name,
            CredentialType::Array(arr) => arr.iter().any(|s| s == name),
        }
    }
}

/// Who the badge was awarded to.
///
/// Either an identity object (`type`, `identity`, optionally `hashed` and
/// `salt`) or the subject-id form (`id`). Fields the issuer did not set stay
/// unset, so the signed form is exactly what the issuer wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub recipient_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Recipient {
    /// Plain identity, e.g. `mailto:someone@example.com`.
    pub fn identity(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::default()
        }
    }

    /// Typed plain identity, e.g. type `email`.
    pub fn typed_identity(recipient_type: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            recipient_type: Some(recipient_type.into()),
            identity: Some(identity.into()),
            hashed: Some(false),
            ..Self::default()
        }
    }

    /// Hashed identity (`sha256$...`) with its salt.
    pub fn hashed(
        recipient_type: impl Into<String>,
        identity_hash: impl Into<String>,
        salt: Option<String>,
    ) -> Self {
        Self {
            recipient_type: Some(recipient_type.into()),
            identity: Some(identity_hash.into()),
            hashed: Some(true),
            salt,
            ..Self::default()
        }
    }

    /// Subject-id form.
    pub fn subject(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// `true` when neither an identity nor a subject id is present.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        blank(&self.identity) && blank(&self.id)
    }
}

impl Credential {
    pub fn new(
        id: impl Into<String>,
        badge: impl Into<String>,
        recipient: Recipient,
        issued_on: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            credential_type: Some(CredentialType::Single(DEFAULT_CREDENTIAL_TYPE.to_string())),
            badge: badge.into(),
            recipient,
            issued_on,
            expires: None,
            verification: None,
            proofs: Vec::new(),
            credential_status: None,
            revoked: None,
            revocation_reason: None,
            extensions: Map::new(),
        }
    }

    pub fn with_expires(mut self, expires: Timestamp) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Expired strictly before `now`. A credential expiring exactly at `now`
    /// is still valid. Both sides are whole seconds, so an `expires` with a
    /// fractional part stays valid until the following second.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }

    pub fn is_flagged_revoked(&self) -> bool {
        self.revoked == Some(true)
    }

    /// Set the stored revocation flag.
    pub fn revoke(&mut self, reason: Option<String>) {
        self.revoked = Some(true);
        self.revocation_reason = reason;
    }

    /// Attach a proof. Legacy hosted proofs go to `verification` and clear
    /// `proof`; the others are appended to `proof` and clear `verification`.
    pub fn attach_proof(&mut self, proof: Proof) {
        match proof {
            Proof::LegacyHosted(_) => {
                self.proofs.clear();
                self.verification = Some(proof);
            }
            other => {
                self.verification = None;
                self.proofs.push(other);
            }
        }
    }

    /// The proof verification should look at: the legacy `verification`
    /// object if present, else the first supported entry of `proof`, else
    /// the first entry of `proof`.
    pub fn primary_proof(&self) -> Option<&Proof> {
        self.verification
            .as_ref()
            .or_else(|| self.proofs.iter().find(|p| p.is_supported()))
            .or_else(|| self.proofs.first())
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Proof>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Proof>),
        One(Box<Proof>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(v)) => v,
        Some(OneOrMany::One(p)) => vec![*p],
    })
}
