//! # Status List Credentials
//!
//! The published form of a status list: a `BitstringStatusListCredential`
//! whose subject carries the whole bitstring as `encodedList`, i.e. the
//! multibase `u` prefix followed by base64url (no padding) of the GZIP
//! compressed bits.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use badge_core::Timestamp;

use crate::bitstring::Bitstring;
use crate::entry::StatusPurpose;
use crate::error::StatusError;
use crate::gzip::{self, CompressionOptions};

pub const CREDENTIALS_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";
pub const STATUS_LIST_CREDENTIAL_TYPE: &str = "BitstringStatusListCredential";
pub const STATUS_LIST_TYPE: &str = "BitstringStatusList";

const MULTIBASE_BASE64URL: char = 'u';

/// Unsigned status list credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: String,
    pub valid_from: Timestamp,
    pub credential_subject: BitstringStatusList,
}

/// Subject of a [`StatusListCredential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitstringStatusList {
    pub id: String,
    #[serde(rename = "type")]
    pub list_type: String,
    pub status_purpose: StatusPurpose,
    pub encoded_list: String,
}

impl StatusListCredential {
    pub(crate) fn new(
        list_iri: &str,
        issuer: &str,
        purpose: StatusPurpose,
        bits: &Bitstring,
    ) -> Result<Self, StatusError> {
        Ok(Self {
            context: vec![CREDENTIALS_V2_CONTEXT.to_string()],
            id: list_iri.to_string(),
            types: vec![
                "VerifiableCredential".to_string(),
                STATUS_LIST_CREDENTIAL_TYPE.to_string(),
            ],
            issuer: issuer.to_string(),
            valid_from: Timestamp::now(),
            credential_subject: BitstringStatusList {
                id: format!("{list_iri}#list"),
                list_type: STATUS_LIST_TYPE.to_string(),
                status_purpose: purpose,
                encoded_list: encode_list(bits)?,
            },
        })
    }
}

impl BitstringStatusList {
    pub fn decode(&self) -> Result<Bitstring, StatusError> {
        decode_encoded_list(&self.encoded_list)
    }

    /// The bit at `index` of the published list.
    pub fn bit(&self, index: u64) -> Result<bool, StatusError> {
        let bits = self.decode()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| bits.get(i))
            .ok_or(StatusError::IndexOutOfRange {
                index,
                len: bits.len() as u64,
            })
    }
}

/// Encode a bitstring as a multibase base64url GZIP `encodedList`.
pub fn encode_list(bits: &Bitstring) -> Result<String, StatusError> {
    let compressed = gzip::compress(bits.as_bytes(), &CompressionOptions::default())?;
    let mut out = String::with_capacity(1 + compressed.len() * 4 / 3 + 4);
    out.push(MULTIBASE_BASE64URL);
    URL_SAFE_NO_PAD.encode_string(compressed, &mut out);
    Ok(out)
}

/// Decode an `encodedList`. The multibase `u` prefix is optional. The wire
/// form carries whole bytes only; see [`Bitstring::from_bytes`].
pub fn decode_encoded_list(encoded: &str) -> Result<Bitstring, StatusError> {
    let body = encoded.strip_prefix(MULTIBASE_BASE64URL).unwrap_or(encoded);
    let compressed = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| StatusError::InvalidEncodedList(format!("not base64url: {e}")))?;
    if !gzip::looks_compressed(&compressed) {
        return Err(StatusError::InvalidEncodedList("missing GZIP header".into()));
    }
    Ok(Bitstring::from_bytes(gzip::decompress(&compressed)?))
}
