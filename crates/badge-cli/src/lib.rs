//! # badge-cli — the `badge` Command
//!
//! ## Subcommands
//!
//! - `badge keygen`: generate a key pair into a key directory.
//! - `badge sign`: attach a legacy, JWT, or Data Integrity proof.
//! - `badge verify`: run the full verification and print the result.
//! - `badge inspect-jwt`: show the unverified `vc` claim of a JWT.
//! - `badge status decode`: read one bit of an encoded status list.
//!
//! ```bash
//! badge keygen --alg rsa --key-id k1 --out keys/
//! BADGE_KEYS_DIR=keys badge sign credential.json --key-id k1 > signed.json
//! BADGE_KEYS_DIR=keys badge verify signed.json
//! ```
//!
//! Every subcommand returns its process exit code; errors are reported by
//! `main` with exit code 1.

pub mod config;
pub mod inspect;
pub mod keygen;
pub mod sign;
pub mod status;
pub mod verify;

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Run `future` to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
