//! # Status List Entries
//!
//! The `credentialStatus` object a credential carries, plus the purpose and
//! status vocabularies.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "id": "<credential IRI>#status",
//!   "type": "StatusListEntry",
//!   "statusPurpose": "revocation",
//!   "statusListIndex": 94567,
//!   "statusListCredential": "<list IRI>#list"
//! }
//! ```
//!
//! `statusListIndex` is written as an unsigned integer. A decimal string is
//! also accepted on input, as published by W3C Bitstring Status List issuers.

use serde::{Deserialize, Deserializer, Serialize};

pub const STATUS_LIST_ENTRY_TYPE: &str = "StatusListEntry";

const ENTRY_SUFFIX: &str = "#status";
const LIST_SUFFIX: &str = "#list";

/// What a set bit means for a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPurpose {
    Revocation,
    Suspension,
}

impl StatusPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revocation => "revocation",
            Self::Suspension => "suspension",
        }
    }
}

impl std::fmt::Display for StatusPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Revoked,
    Suspended,
}

impl Status {
    /// Status a set (`true`) or clear bit stands for under `purpose`.
    pub fn from_bit(purpose: StatusPurpose, bit: bool) -> Self {
        match (purpose, bit) {
            (_, false) => Self::Active,
            (StatusPurpose::Revocation, true) => Self::Revoked,
            (StatusPurpose::Suspension, true) => Self::Suspended,
        }
    }

    /// The bit value for this status under `purpose`, or `None` if this
    /// status cannot be expressed by a list of that purpose.
    pub fn to_bit(&self, purpose: StatusPurpose) -> Option<bool> {
        match (self, purpose) {
            (Self::Active, _) => Some(false),
            (Self::Revoked, StatusPurpose::Revocation) => Some(true),
            (Self::Suspended, StatusPurpose::Suspension) => Some(true),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Suspended => "suspended",
        })
    }
}

/// A credential's pointer into a status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub status_purpose: StatusPurpose,
    #[serde(deserialize_with = "index_from_number_or_string")]
    pub status_list_index: u64,
    pub status_list_credential: String,
}

impl StatusListEntry {
    pub fn new(credential_id: &str, purpose: StatusPurpose, index: u64, list_iri: &str) -> Self {
        Self {
            id: format!("{credential_id}{ENTRY_SUFFIX}"),
            entry_type: STATUS_LIST_ENTRY_TYPE.to_string(),
            status_purpose: purpose,
            status_list_index: index,
            status_list_credential: format!("{list_iri}{LIST_SUFFIX}"),
        }
    }

    /// IRI of the status list, without the `#list` fragment.
    pub fn list_iri(&self) -> &str {
        self.status_list_credential
            .strip_suffix(LIST_SUFFIX)
            .unwrap_or(&self.status_list_credential)
    }

    /// IRI of the credential this entry belongs to.
    pub fn credential_id(&self) -> &str {
        self.id.strip_suffix(ENTRY_SUFFIX).unwrap_or(&self.id)
    }
}

fn index_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(u64),
        Text(String),
    }

    match Index::deserialize(deserializer)? {
        Index::Number(n) => Ok(n),
        Index::Text(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("statusListIndex {s:?} is not an unsigned integer"))),
    }
}
