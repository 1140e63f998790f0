//! # badge-status — Bitstring Status Lists
//!
//! Revocation and suspension for issued badges. Each credential gets one
//! index into a shared bitstring; a set bit means revoked (or suspended).
//! Lists are published GZIP-compressed, which keeps a 131,072-entry list
//! that is nearly all zeroes down to a few hundred bytes.

pub mod bitstring;
pub mod credential;
pub mod entry;
pub mod error;
pub mod gzip;
pub mod manager;

pub use bitstring::Bitstring;
pub use credential::{decode_encoded_list, encode_list, BitstringStatusList, StatusListCredential};
pub use entry::{Status, StatusListEntry, StatusPurpose};
pub use error::{CompressionError, StatusError};
pub use gzip::{CompressionOptions, CompressionStats};
pub use manager::{StatusList, StatusListConfig, StatusListManager, DEFAULT_LIST_CAPACITY};
