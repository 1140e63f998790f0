//! # CLI Configuration
//!
//! Settings come from the environment and are overridden by global flags:
//!
//! | Variable | Flag | Default |
//! |---|---|---|
//! | `BADGE_BASE_URL` | `--base-url` | `http://localhost:3000` |
//! | `BADGE_KEYS_DIR` | `--keys-dir` | unset |
//! | `BADGE_DEFAULT_KEY_ID` | | `default` |
//! | `BADGE_DEFAULT_KEY_ALG` | | `rsa` |
//! | `BADGE_PROOF_FORMAT` | `--format` (on `sign`) | `legacy` |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use badge_crypto::{KeyManager, KeyManagerConfig};
use badge_vc::{IssuancePolicy, ProofFormat};

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub keys: KeyManagerConfig,
    pub policy: IssuancePolicy,
}

impl CliConfig {
    /// Read the environment, then apply flag overrides.
    pub fn load(keys_dir: Option<&Path>, base_url: Option<&str>) -> Result<Self> {
        let mut keys = KeyManagerConfig::from_env().context("invalid key configuration")?;
        if let Some(dir) = keys_dir {
            keys.keys_dir = Some(dir.to_path_buf());
        }

        let mut policy = IssuancePolicy::from_env();
        if let Some(url) = base_url {
            policy.base_url = url.trim_end_matches('/').to_string();
        }
        if policy.default_key_id.is_none() {
            policy.default_key_id = Some(keys.default_key_id.clone());
        }

        tracing::debug!(
            keys_dir = ?keys.keys_dir,
            base_url = %policy.base_url,
            format = %policy.format,
            "configuration loaded"
        );
        Ok(Self { keys, policy })
    }

    /// Directory keys are read from. Required by `sign` and `verify`.
    pub fn require_keys_dir(&self) -> Result<&PathBuf> {
        self.keys
            .keys_dir
            .as_ref()
            .context("no key directory: pass --keys-dir or set BADGE_KEYS_DIR")
    }

    pub fn key_manager(&self) -> Arc<KeyManager> {
        Arc::new(KeyManager::from_config(&self.keys))
    }

    /// The issuance policy, with an optional format override.
    pub fn issuance_policy(&self, format: Option<ProofFormat>) -> IssuancePolicy {
        let mut policy = self.policy.clone();
        if let Some(format) = format {
            policy.format = format;
        }
        policy
    }
}
