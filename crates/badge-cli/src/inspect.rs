//! # Inspect-JWT Subcommand
//!
//! `badge inspect-jwt <TOKEN|FILE>` prints the `vc` claim of a JWT without
//! checking the signature. The argument may be a compact token, a file
//! holding one, or a credential file carrying a `JwtProof2020`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use badge_vc::jwt_proof::extract_credential_from_token;
use badge_vc::{Credential, Proof};

/// Arguments for `badge inspect-jwt`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Compact JWS, or a file containing one or a credential with a JWT proof.
    pub input: String,
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let token = resolve_token(&args.input)?;
    let Some(claims) = extract_credential_from_token(&token) else {
        bail!("input is not a JWT with a vc claim");
    };
    eprintln!("WARNING: signature NOT verified. Use `badge verify` before trusting this content.");
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(0)
}

fn resolve_token(input: &str) -> Result<String> {
    let path = Path::new(input);
    if !path.is_file() {
        return Ok(input.trim().to_string());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    let value: Value = serde_json::from_str(trimmed)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let credential: Credential = serde_json::from_value(value)
        .with_context(|| format!("{} is not a credential", path.display()))?;
    credential
        .proofs
        .iter()
        .find_map(|p| match p {
            Proof::Jwt(jwt) => Some(jwt.jws.clone()),
            _ => None,
        })
        .with_context(|| format!("{} carries no JWT proof", path.display()))
}
