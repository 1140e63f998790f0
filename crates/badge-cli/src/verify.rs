//! # Verify Subcommand
//!
//! `badge verify <FILE>` prints the verification result as JSON. Exit code
//! 0 means valid, 2 means the credential was checked and is not valid.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use badge_vc::CredentialVerifier;

use crate::config::CliConfig;

pub const EXIT_INVALID: u8 = 2;

/// Arguments for `badge verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON file.
    pub file: PathBuf,
}

pub fn run_verify(args: &VerifyArgs, config: &CliConfig) -> Result<u8> {
    config.require_keys_dir()?;
    let value: Value = crate::read_json(&args.file)?;
    let verifier = CredentialVerifier::new(config.key_manager());
    let result = crate::block_on(verifier.verify_credential_json(&value))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.is_valid() { 0 } else { EXIT_INVALID })
}
