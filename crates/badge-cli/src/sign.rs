//! # Sign Subcommand
//!
//! `badge sign <FILE> [--key-id ID] [--format legacy|jwt|data-integrity]`
//! reads a credential, attaches a proof with a key from the key directory,
//! and prints the result (or writes it with `--out`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use badge_vc::{Credential, CredentialIssuer, ProofFormat};

use crate::config::CliConfig;

/// Arguments for `badge sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Credential JSON file.
    pub file: PathBuf,

    /// Signing key id. Defaults to BADGE_DEFAULT_KEY_ID.
    #[arg(long)]
    pub key_id: Option<String>,

    /// Proof format. Defaults to BADGE_PROOF_FORMAT, then legacy.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ProofFormat>,

    /// Write the signed credential here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<ProofFormat, String> {
    s.parse().map_err(|e: badge_vc::VcError| e.to_string())
}

pub fn run_sign(args: &SignArgs, config: &CliConfig) -> Result<u8> {
    config.require_keys_dir()?;
    let credential: Credential = crate::read_json(&args.file)?;
    let issuer = CredentialIssuer::new(config.key_manager(), config.issuance_policy(args.format));

    let signed = crate::block_on(issuer.create_proof_for_credential(&credential, args.key_id.as_deref()))?
        .with_context(|| format!("failed to sign {}", args.file.display()))?;

    let output = serde_json::to_string_pretty(&signed)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, format!("{output}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("OK: signed {} -> {}", credential.id, path.display());
        }
        None => println!("{output}"),
    }
    Ok(0)
}
