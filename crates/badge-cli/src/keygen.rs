//! # Keygen Subcommand
//!
//! `badge keygen --alg <ALG> --key-id <ID> --out <DIR>` writes a new key
//! pair in the layout the directory key source reads:
//!
//! - `<ID>.pem`: private key, PKCS#8 PEM (mode 0600 on Unix).
//! - `<ID>.pub.pem`: public key, SPKI PEM.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use badge_crypto::{KeyFamily, PrivateKey};

/// Arguments for `badge keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key family or JWS algorithm: rsa, ec, p384, p521, ed25519, RS256, ES256, EdDSA, ...
    #[arg(long, default_value = "rsa")]
    pub alg: String,

    /// Key identifier; also the file stem.
    #[arg(long)]
    pub key_id: String,

    /// Output directory.
    #[arg(long, short, default_value = ".")]
    pub out: PathBuf,

    /// Replace existing key files.
    #[arg(long)]
    pub force: bool,
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let family: KeyFamily = args
        .alg
        .parse()
        .with_context(|| format!("unknown algorithm: {}", args.alg))?;
    validate_key_id(&args.key_id)?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let private_path = args.out.join(format!("{}.pem", args.key_id));
    let public_path = args.out.join(format!("{}.pub.pem", args.key_id));
    if !args.force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                bail!("{} already exists (use --force to replace)", path.display());
            }
        }
    }

    tracing::info!(key_id = %args.key_id, family = %family, "generating key pair");
    let key = PrivateKey::generate(family).context("key generation failed")?;
    let private_pem = key.to_pem().context("failed to encode private key")?;
    let public_pem = key.public_key().to_pem().context("failed to encode public key")?;

    write_private(&private_path, private_pem.as_bytes())?;
    std::fs::write(&public_path, public_pem)
        .with_context(|| format!("failed to write {}", public_path.display()))?;

    println!("OK: generated {family} key '{}'", args.key_id);
    println!("  Private key: {}", private_path.display());
    println!("  Public key:  {}", public_path.display());
    println!("  Default algorithm: {}", family.default_algorithm());
    Ok(0)
}

fn validate_key_id(key_id: &str) -> Result<()> {
    if key_id.is_empty() {
        bail!("key id must not be empty");
    }
    if !key_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || key_id.starts_with('.')
    {
        bail!("key id may only contain ASCII letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
