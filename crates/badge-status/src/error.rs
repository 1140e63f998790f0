//! # Status List Errors

use thiserror::Error;

use crate::entry::{Status, StatusPurpose};

/// Failure of the GZIP codec. Always fatal for the operation that hit it.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// Stream I/O failed, including a corrupt or non-GZIP input.
    #[error("compression I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression levels run from 0 to 9.
    #[error("invalid compression level {0} (expected 0-9)")]
    InvalidLevel(u32),

    /// Inflated output exceeded the allowed size.
    #[error("decompressed output exceeds {limit} bytes")]
    TooLarge {
        /// Cap in bytes.
        limit: u64,
    },
}

/// Errors from status list operations.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The entry points at a list this manager does not hold.
    #[error("unknown status list: {0}")]
    UnknownList(String),

    /// The index was never allocated in this list.
    #[error("status index {index} out of range for list of {len} entries")]
    IndexOutOfRange {
        /// Requested index.
        index: u64,
        /// Number of allocated entries.
        len: u64,
    },

    /// The requested status does not belong to the entry's purpose.
    #[error("status {status} is not valid for a {purpose} entry")]
    PurposeMismatch {
        /// Purpose of the entry.
        purpose: StatusPurpose,
        /// Status the caller tried to set.
        status: Status,
    },

    /// A revocation bit, once set, stays set.
    #[error("credential at index {index} of {list} is revoked; revocation is permanent")]
    RevocationIsPermanent {
        /// List IRI.
        list: String,
        /// Entry index.
        index: u64,
    },

    /// An `encodedList` value could not be decoded.
    #[error("invalid encoded list: {0}")]
    InvalidEncodedList(String),

    /// GZIP codec failure.
    #[error(transparent)]
    Compression(#[from] CompressionError),
}
