//! Credential lookup by id. Persistence lives elsewhere; the verifier only
//! needs `find_by_id`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::credential::Credential;
use crate::error::VcError;

/// Read access to stored credentials.
pub trait CredentialStore: Send + Sync {
    /// The credential stored under `id`, or `None`.
    ///
    /// # Errors
    ///
    /// `VcError::Store` when the backing store cannot be read.
    fn find_by_id(&self, id: &str) -> Result<Option<Credential>, VcError>;
}

/// Process-local store, keyed by credential id.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous credential with the same id.
    pub fn insert(&self, credential: Credential) -> Option<Credential> {
        self.credentials
            .write()
            .insert(credential.id.clone(), credential)
    }

    /// Apply `f` to the stored credential, if any. Returns whether it existed.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Credential)) -> bool {
        match self.credentials.write().get_mut(id) {
            Some(credential) => {
                f(credential);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_id(&self, id: &str) -> Result<Option<Credential>, VcError> {
        Ok(self.credentials.read().get(id).cloned())
    }
}
