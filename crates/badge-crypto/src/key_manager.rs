//! # Key Manager
//!
//! Owns signing and verification keys per key identifier. Keys come from a
//! [`KeySource`] and are loaded once, on first use, then cached for the
//! lifetime of the manager.
//!
//! ## Concurrency
//!
//! Initialization is a single shared in-flight future
//! (`tokio::sync::OnceCell::get_or_try_init`). Any number of concurrent first
//! callers wait on the same load; the source is consulted exactly once. A
//! failed load leaves the cell empty, so the next caller retries.
//!
//! ## Sources
//!
//! - [`StaticKeySource`]: an in-memory list of key pairs.
//! - [`DirectoryKeySource`]: PEM and JWK files on disk.
//! - [`EphemeralKeySource`]: fresh keys generated at initialization. Every
//!   signature made with them is unverifiable after a restart.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::algorithm::KeyFamily;
use crate::error::CryptoError;
use crate::keys::{Jwk, KeyPair, PrivateKey, PublicKey};

/// Fallback key identifier when nothing else is configured.
pub const DEFAULT_KEY_ID: &str = "default";

// ---------------------------------------------------------------------------
// KeySource trait
// ---------------------------------------------------------------------------

/// Where key material comes from.
///
/// `load` may block (file I/O, key generation); the manager runs it on the
/// blocking pool.
pub trait KeySource: Send + Sync {
    /// Produce every key pair this source knows about.
    fn load(&self) -> Result<Vec<KeyPair>, CryptoError>;

    /// Human-readable name for diagnostics.
    fn source_name(&self) -> &str;
}

/// Fixed, in-memory set of key pairs.
pub struct StaticKeySource {
    keys: Vec<KeyPair>,
}

impl StaticKeySource {
    pub fn new(keys: Vec<KeyPair>) -> Self {
        Self { keys }
    }
}

impl KeySource for StaticKeySource {
    fn load(&self) -> Result<Vec<KeyPair>, CryptoError> {
        Ok(self.keys.clone())
    }

    fn source_name(&self) -> &str {
        "static"
    }
}

/// Reads keys from a directory.
///
/// | File | Meaning |
/// |---|---|
/// | `<id>.pem` | private key, PKCS#8 (or PKCS#1 for RSA) |
/// | `<id>.pub.pem` | public key only, SPKI |
/// | `<id>.jwk` | JWK, private if it carries `d` |
///
/// A public file next to a private key with the same id must match it.
/// Other files are ignored.
pub struct DirectoryKeySource {
    dir: PathBuf,
}

impl DirectoryKeySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

enum KeyFile {
    Private(String, PathBuf),
    Public(String, PathBuf),
    Jwk(String, PathBuf),
}

fn classify(path: PathBuf) -> Option<KeyFile> {
    let name = path.file_name()?.to_str()?.to_string();
    if let Some(id) = name.strip_suffix(".pub.pem") {
        Some(KeyFile::Public(id.to_string(), path))
    } else if let Some(id) = name.strip_suffix(".pem") {
        Some(KeyFile::Private(id.to_string(), path))
    } else {
        name.strip_suffix(".jwk")
            .map(|id| KeyFile::Jwk(id.to_string(), path))
    }
}

impl KeySource for DirectoryKeySource {
    fn load(&self) -> Result<Vec<KeyPair>, CryptoError> {
        let mut private: BTreeMap<String, KeyPair> = BTreeMap::new();
        let mut public: Vec<(String, PublicKey)> = Vec::new();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some(file) = classify(path.clone()) else {
                tracing::debug!(path = %path.display(), "ignoring non-key file");
                continue;
            };
            match file {
                KeyFile::Private(id, path) => {
                    let key = PrivateKey::from_pem(&std::fs::read_to_string(&path)?).map_err(
                        |e| CryptoError::KeyLoad(format!("{}: {e}", path.display())),
                    )?;
                    insert_unique(&mut private, KeyPair::from_private(id, key))?;
                }
                KeyFile::Public(id, path) => {
                    let key = PublicKey::from_pem(&std::fs::read_to_string(&path)?).map_err(
                        |e| CryptoError::KeyLoad(format!("{}: {e}", path.display())),
                    )?;
                    public.push((id, key));
                }
                KeyFile::Jwk(id, path) => {
                    let jwk: Jwk = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
                    let load_err = |e: CryptoError| CryptoError::KeyLoad(format!("{}: {e}", path.display()));
                    if jwk.is_private() {
                        let key = PrivateKey::from_jwk(&jwk).map_err(load_err)?;
                        insert_unique(&mut private, KeyPair::from_private(id, key))?;
                    } else {
                        public.push((id, PublicKey::from_jwk(&jwk).map_err(load_err)?));
                    }
                }
            }
        }

        let mut pairs: Vec<KeyPair> = Vec::with_capacity(private.len() + public.len());
        for (id, key) in public {
            match private.get(&id) {
                Some(pair) if pair.public_key() == &key => {}
                Some(_) => {
                    return Err(CryptoError::KeyLoad(format!(
                        "public key file for {id} does not match its private key"
                    )))
                }
                None => pairs.push(KeyPair::verify_only(id, key)),
            }
        }
        pairs.extend(private.into_values());
        Ok(pairs)
    }

    fn source_name(&self) -> &str {
        "directory"
    }
}

fn insert_unique(map: &mut BTreeMap<String, KeyPair>, pair: KeyPair) -> Result<(), CryptoError> {
    if map.contains_key(pair.key_id()) {
        return Err(CryptoError::DuplicateKey(pair.key_id().to_string()));
    }
    map.insert(pair.key_id().to_string(), pair);
    Ok(())
}

/// Generates a fresh key per `(key id, family)` each time it is loaded.
pub struct EphemeralKeySource {
    specs: Vec<(String, KeyFamily)>,
}

impl EphemeralKeySource {
    pub fn new(specs: Vec<(String, KeyFamily)>) -> Self {
        Self { specs }
    }

    pub fn single(key_id: impl Into<String>, family: KeyFamily) -> Self {
        Self::new(vec![(key_id.into(), family)])
    }
}

impl KeySource for EphemeralKeySource {
    fn load(&self) -> Result<Vec<KeyPair>, CryptoError> {
        tracing::warn!(
            keys = self.specs.len(),
            "Generating ephemeral signing keys. Signatures will not verify after restart."
        );
        self.specs
            .iter()
            .map(|(id, family)| KeyPair::generate(id.clone(), *family))
            .collect()
    }

    fn source_name(&self) -> &str {
        "ephemeral"
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Key manager settings.
///
/// | Variable | Meaning | Default |
/// |---|---|---|
/// | `BADGE_KEYS_DIR` | directory for [`DirectoryKeySource`] | unset (ephemeral) |
/// | `BADGE_DEFAULT_KEY_ID` | key used when callers pass none | `default` |
/// | `BADGE_DEFAULT_KEY_ALG` | family of the ephemeral key | `rsa` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyManagerConfig {
    pub keys_dir: Option<PathBuf>,
    pub default_key_id: String,
    pub default_family: KeyFamily,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            keys_dir: None,
            default_key_id: DEFAULT_KEY_ID.to_string(),
            default_family: KeyFamily::Rsa,
        }
    }
}

impl KeyManagerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, CryptoError> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("BADGE_KEYS_DIR") {
            if !dir.trim().is_empty() {
                config.keys_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(id) = std::env::var("BADGE_DEFAULT_KEY_ID") {
            if !id.trim().is_empty() {
                config.default_key_id = id;
            }
        }
        if let Ok(alg) = std::env::var("BADGE_DEFAULT_KEY_ALG") {
            config.default_family = alg.parse()?;
        }
        Ok(config)
    }

    /// Build the key source these settings describe.
    pub fn key_source(&self) -> Arc<dyn KeySource> {
        match &self.keys_dir {
            Some(dir) => Arc::new(DirectoryKeySource::new(dir.clone())),
            None => {
                tracing::warn!(
                    key_id = %self.default_key_id,
                    "BADGE_KEYS_DIR not set. Falling back to an ephemeral key."
                );
                Arc::new(EphemeralKeySource::single(
                    self.default_key_id.clone(),
                    self.default_family,
                ))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// KeyManager
// ---------------------------------------------------------------------------

/// Lazily initialized, process-lifetime key cache.
pub struct KeyManager {
    source: Arc<dyn KeySource>,
    keys: OnceCell<HashMap<String, KeyPair>>,
    default_key_id: Option<String>,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("source", &self.source.source_name())
            .field("initialized", &self.keys.initialized())
            .field("default_key_id", &self.default_key_id)
            .finish()
    }
}

impl KeyManager {
    pub fn new(source: impl KeySource + 'static) -> Self {
        Self::from_source(Arc::new(source))
    }

    pub fn from_source(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            keys: OnceCell::new(),
            default_key_id: None,
        }
    }

    pub fn from_config(config: &KeyManagerConfig) -> Self {
        Self::from_source(config.key_source()).with_default_key_id(config.default_key_id.clone())
    }

    /// Key used by [`KeyManager::default_key_id`] consumers when a caller
    /// does not name one.
    pub fn with_default_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.default_key_id = Some(key_id.into());
        self
    }

    pub fn default_key_id(&self) -> Option<&str> {
        self.default_key_id.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.keys.initialized()
    }

    /// Load keys from the source. Idempotent; concurrent callers share one load.
    pub async fn initialize(&self) -> Result<(), CryptoError> {
        self.keys().await.map(|_| ())
    }

    /// The key pair registered under `key_id`.
    pub async fn key_pair(&self, key_id: &str) -> Result<&KeyPair, CryptoError> {
        self.keys()
            .await?
            .get(key_id)
            .ok_or_else(|| CryptoError::KeyNotFound(key_id.to_string()))
    }

    /// Private key for `key_id`.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` for unknown ids, `PrivateKeyUnavailable` for verify-only keys.
    pub async fn private_key(&self, key_id: &str) -> Result<&PrivateKey, CryptoError> {
        self.key_pair(key_id).await?.private_key()
    }

    /// Public key for `key_id`, or `KeyNotFound`.
    pub async fn public_key(&self, key_id: &str) -> Result<&PublicKey, CryptoError> {
        Ok(self.key_pair(key_id).await?.public_key())
    }

    /// Sorted identifiers of every loaded key.
    pub async fn key_ids(&self) -> Result<Vec<String>, CryptoError> {
        let mut ids: Vec<String> = self.keys().await?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn keys(&self) -> Result<&HashMap<String, KeyPair>, CryptoError> {
        self.keys
            .get_or_try_init(|| async {
                let source = Arc::clone(&self.source);
                let name = source.source_name().to_string();
                let pairs = tokio::task::spawn_blocking(move || source.load())
                    .await
                    .map_err(|e| CryptoError::KeyLoad(format!("key loading task failed: {e}")))??;

                let mut map = HashMap::with_capacity(pairs.len());
                for pair in pairs {
                    let id = pair.key_id().to_string();
                    if map.contains_key(&id) {
                        return Err(CryptoError::DuplicateKey(id));
                    }
                    tracing::debug!(key_id = %id, family = %pair.family(), "loaded key");
                    map.insert(id, pair);
                }
                tracing::info!(source = %name, keys = map.len(), "key manager initialized");
                Ok::<_, CryptoError>(map)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: Arc<AtomicUsize>,
        inner: StaticKeySource,
    }

    impl KeySource for CountingSource {
        fn load(&self) -> Result<Vec<KeyPair>, CryptoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.inner.load()
        }

        fn source_name(&self) -> &str {
            "counting"
        }
    }

    struct FailingSource;

    impl KeySource for FailingSource {
        fn load(&self) -> Result<Vec<KeyPair>, CryptoError> {
            Err(CryptoError::KeyLoad("unavailable".into()))
        }

        fn source_name(&self) -> &str {
            "failing"
        }
    }

    fn ed_pair(id: &str) -> KeyPair {
        KeyPair::generate(id, KeyFamily::Ed25519).unwrap()
    }

    #[tokio::test]
    async fn lookups_after_initialize() {
        let manager = KeyManager::new(StaticKeySource::new(vec![ed_pair("k1")]));
        assert!(!manager.is_initialized());
        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();
        assert!(manager.is_initialized());

        assert!(manager.private_key("k1").await.is_ok());
        assert_eq!(manager.public_key("k1").await.unwrap().family(), KeyFamily::Ed25519);
        assert!(matches!(
            manager.public_key("nope").await,
            Err(CryptoError::KeyNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            manager.private_key("nope").await,
            Err(CryptoError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn lookup_initializes_lazily() {
        let manager = KeyManager::new(StaticKeySource::new(vec![ed_pair("k1")]));
        assert!(manager.public_key("k1").await.is_ok());
        assert!(manager.is_initialized());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_initialize_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(KeyManager::new(CountingSource {
            loads: Arc::clone(&loads),
            inner: StaticKeySource::new(vec![ed_pair("k1")]),
        }));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let m = Arc::clone(&manager);
                tokio::spawn(async move { m.initialize().await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let manager = KeyManager::new(FailingSource);
        assert!(matches!(manager.initialize().await, Err(CryptoError::KeyLoad(_))));
        assert!(!manager.is_initialized());
        assert!(manager.initialize().await.is_err());
    }

    #[tokio::test]
    async fn duplicate_ids_rejected() {
        let manager = KeyManager::new(StaticKeySource::new(vec![ed_pair("k1"), ed_pair("k1")]));
        assert!(matches!(
            manager.initialize().await,
            Err(CryptoError::DuplicateKey(id)) if id == "k1"
        ));
    }

    #[tokio::test]
    async fn verify_only_key_has_no_private_half() {
        let public = ed_pair("k2").public_key().clone();
        let manager = KeyManager::new(StaticKeySource::new(vec![KeyPair::verify_only("k2", public)]));
        assert!(manager.public_key("k2").await.is_ok());
        assert!(matches!(
            manager.private_key("k2").await,
            Err(CryptoError::PrivateKeyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn directory_source_reads_pem_and_jwk() {
        let dir = tempfile::tempdir().unwrap();
        let signing = PrivateKey::generate(KeyFamily::P256).unwrap();
        std::fs::write(dir.path().join("issuer.pem"), signing.to_pem().unwrap().as_bytes()).unwrap();
        std::fs::write(
            dir.path().join("issuer.pub.pem"),
            signing.public_key().to_pem().unwrap(),
        )
        .unwrap();

        let other = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        std::fs::write(
            dir.path().join("partner.jwk"),
            serde_json::to_string(&other.public_key().to_jwk()).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a key").unwrap();

        let manager = KeyManager::new(DirectoryKeySource::new(dir.path()));
        assert_eq!(manager.key_ids().await.unwrap(), vec!["issuer", "partner"]);
        assert_eq!(manager.public_key("issuer").await.unwrap(), &signing.public_key());
        assert!(manager.private_key("issuer").await.is_ok());
        assert!(matches!(
            manager.private_key("partner").await,
            Err(CryptoError::PrivateKeyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn directory_source_rejects_mismatched_public_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        let b = PrivateKey::generate(KeyFamily::Ed25519).unwrap();
        std::fs::write(dir.path().join("k.pem"), a.to_pem().unwrap().as_bytes()).unwrap();
        std::fs::write(dir.path().join("k.pub.pem"), b.public_key().to_pem().unwrap()).unwrap();

        let manager = KeyManager::new(DirectoryKeySource::new(dir.path()));
        assert!(matches!(manager.initialize().await, Err(CryptoError::KeyLoad(_))));
    }

    #[tokio::test]
    async fn ephemeral_source_generates_configured_keys() {
        let config = KeyManagerConfig {
            keys_dir: None,
            default_key_id: "dev".into(),
            default_family: KeyFamily::P384,
        };
        let manager = KeyManager::from_config(&config);
        assert_eq!(manager.default_key_id(), Some("dev"));
        assert_eq!(manager.private_key("dev").await.unwrap().family(), KeyFamily::P384);
    }
}
