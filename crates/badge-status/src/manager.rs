//! # Status List Manager
//!
//! Sole writer of status bitstrings. Allocates one index per credential and
//! purpose, flips bits on revoke/suspend/reinstate, and answers status
//! queries.
//!
//! ## Invariants
//!
//! - Indices are handed out monotonically per list and never reused.
//!   Allocating twice for the same credential and purpose returns the
//!   original entry.
//! - A full list (index == capacity) is closed; the next allocation opens a
//!   new list `<base>/status-lists/<purpose>/<n+1>`.
//! - A set revocation bit is never cleared.
//!
//! ## Concurrency
//!
//! Lists live in a `DashMap`, each behind its own `RwLock`. Bit flips on a
//! list are serialized by its write lock; reads take the read lock and see a
//! consistent snapshot. Allocation bookkeeping is behind one mutex that is
//! always taken before any list lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::bitstring::Bitstring;
use crate::credential::StatusListCredential;
use crate::entry::{Status, StatusListEntry, StatusPurpose};
use crate::error::StatusError;

/// 16 KiB of bits: the minimum list size for herd privacy.
pub const DEFAULT_LIST_CAPACITY: usize = 131_072;

/// Status list manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusListConfig {
    /// Base URL list IRIs are minted under.
    pub base_url: String,
    /// Number of entries per list before rolling over.
    pub capacity: usize,
}

impl StatusListConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            capacity: DEFAULT_LIST_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

/// One status list: its bits plus identity.
#[derive(Debug, Clone)]
pub struct StatusList {
    iri: String,
    purpose: StatusPurpose,
    capacity: usize,
    bits: Bitstring,
}

impl StatusList {
    fn new(iri: String, purpose: StatusPurpose, capacity: usize) -> Self {
        Self {
            iri,
            purpose,
            capacity,
            bits: Bitstring::default(),
        }
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn purpose(&self) -> StatusPurpose {
        self.purpose
    }

    /// Number of allocated entries.
    pub fn allocated(&self) -> usize {
        self.bits.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bits(&self) -> &Bitstring {
        &self.bits
    }

    /// Bits padded to full capacity, as published.
    pub fn padded_bits(&self) -> Bitstring {
        let mut bits = self.bits.clone();
        bits.grow_to(self.capacity);
        bits
    }
}

#[derive(Debug, Default)]
struct Allocation {
    /// Open list per purpose: (list IRI, sequence number).
    open: HashMap<StatusPurpose, (String, u64)>,
    /// Existing entries by (credential id, purpose).
    entries: HashMap<(String, StatusPurpose), StatusListEntry>,
}

/// Allocates status entries and owns every bitstring it created.
pub struct StatusListManager {
    config: StatusListConfig,
    lists: DashMap<String, Arc<RwLock<StatusList>>>,
    allocation: Mutex<Allocation>,
}

impl std::fmt::Debug for StatusListManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusListManager")
            .field("config", &self.config)
            .field("lists", &self.lists.len())
            .finish()
    }
}

impl StatusListManager {
    pub fn new(config: StatusListConfig) -> Self {
        Self {
            config,
            lists: DashMap::new(),
            allocation: Mutex::new(Allocation::default()),
        }
    }

    pub fn config(&self) -> &StatusListConfig {
        &self.config
    }

    /// Allocate a revocation entry for `credential_id`.
    pub fn allocate(&self, credential_id: &str) -> StatusListEntry {
        self.allocate_for(credential_id, StatusPurpose::Revocation)
    }

    /// Allocate an entry of `purpose` for `credential_id`, or return the one
    /// it already has.
    pub fn allocate_for(&self, credential_id: &str, purpose: StatusPurpose) -> StatusListEntry {
        let mut alloc = self.allocation.lock();
        let key = (credential_id.to_string(), purpose);
        if let Some(existing) = alloc.entries.get(&key) {
            return existing.clone();
        }

        let (list, index) = loop {
            let open = alloc.open.get(&purpose).cloned();
            let list = match open {
                Some((iri, _)) => self.list(&iri),
                None => None,
            };
            let Some(list) = list else {
                self.open_list(&mut alloc, purpose, 1);
                continue;
            };
            let mut guard = list.write();
            if guard.allocated() >= guard.capacity {
                let seq = alloc.open.get(&purpose).map(|(_, seq)| seq + 1).unwrap_or(1);
                drop(guard);
                self.open_list(&mut alloc, purpose, seq);
                continue;
            }
            let index = guard.allocated();
            guard.bits.grow_to(index + 1);
            break (guard.iri.clone(), index as u64);
        };

        let entry = StatusListEntry::new(credential_id, purpose, index, &list);
        tracing::debug!(
            credential = %credential_id,
            list = %list,
            index,
            purpose = %purpose,
            "allocated status entry"
        );
        alloc.entries.insert(key, entry.clone());
        entry
    }

    fn open_list(&self, alloc: &mut Allocation, purpose: StatusPurpose, seq: u64) {
        let iri = format!("{}/status-lists/{}/{}", self.config.base_url, purpose, seq);
        tracing::info!(list = %iri, capacity = self.config.capacity, "opening status list");
        self.lists.insert(
            iri.clone(),
            Arc::new(RwLock::new(StatusList::new(iri.clone(), purpose, self.config.capacity))),
        );
        alloc.open.insert(purpose, (iri, seq));
    }

    fn list(&self, iri: &str) -> Option<Arc<RwLock<StatusList>>> {
        self.lists.get(iri).map(|entry| Arc::clone(entry.value()))
    }

    fn checked_list(&self, entry: &StatusListEntry) -> Result<(Arc<RwLock<StatusList>>, usize), StatusError> {
        let list = self
            .list(entry.list_iri())
            .ok_or_else(|| StatusError::UnknownList(entry.list_iri().to_string()))?;
        let index = usize::try_from(entry.status_list_index).unwrap_or(usize::MAX);
        Ok((list, index))
    }

    /// Whether `list_iri` (with or without the `#list` fragment) is a list
    /// this manager owns.
    pub fn manages(&self, list_iri: &str) -> bool {
        let iri = list_iri.strip_suffix("#list").unwrap_or(list_iri);
        self.lists.contains_key(iri)
    }

    /// Set the status behind `entry`.
    ///
    /// # Errors
    ///
    /// - `UnknownList` if the entry's list is not managed here.
    /// - `PurposeMismatch` if `status` cannot be expressed by the entry's purpose.
    /// - `IndexOutOfRange` for an index that was never allocated.
    /// - `RevocationIsPermanent` when reinstating a revoked credential.
    pub fn set_status(&self, entry: &StatusListEntry, status: Status) -> Result<(), StatusError> {
        let (list, index) = self.checked_list(entry)?;
        let mut guard = list.write();

        let purpose = guard.purpose;
        if purpose != entry.status_purpose {
            return Err(StatusError::PurposeMismatch {
                purpose: entry.status_purpose,
                status,
            });
        }
        let bit = status
            .to_bit(purpose)
            .ok_or(StatusError::PurposeMismatch { purpose, status })?;

        let current = guard.bits.get(index).ok_or(StatusError::IndexOutOfRange {
            index: entry.status_list_index,
            len: guard.allocated() as u64,
        })?;
        if purpose == StatusPurpose::Revocation && current && !bit {
            return Err(StatusError::RevocationIsPermanent {
                list: guard.iri.clone(),
                index: entry.status_list_index,
            });
        }

        guard.bits.set(index, bit);
        tracing::info!(
            list = %guard.iri,
            index = entry.status_list_index,
            status = %status,
            "status updated"
        );
        Ok(())
    }

    /// Current status behind `entry`.
    pub fn get_status(&self, entry: &StatusListEntry) -> Result<Status, StatusError> {
        let (list, index) = self.checked_list(entry)?;
        let guard = list.read();
        let bit = guard.bits.get(index).ok_or(StatusError::IndexOutOfRange {
            index: entry.status_list_index,
            len: guard.allocated() as u64,
        })?;
        Ok(Status::from_bit(guard.purpose, bit))
    }

    /// Snapshot of one list.
    pub fn snapshot(&self, list_iri: &str) -> Result<StatusList, StatusError> {
        let iri = list_iri.strip_suffix("#list").unwrap_or(list_iri);
        self.list(iri)
            .map(|list| list.read().clone())
            .ok_or_else(|| StatusError::UnknownList(iri.to_string()))
    }

    /// IRIs of every managed list, sorted.
    pub fn list_iris(&self) -> Vec<String> {
        let mut iris: Vec<String> = self.lists.iter().map(|e| e.key().clone()).collect();
        iris.sort();
        iris
    }

    /// Materialize the publishable credential for a list.
    pub fn status_list_credential(&self, list_iri: &str) -> Result<StatusListCredential, StatusError> {
        let snapshot = self.snapshot(list_iri)?;
        StatusListCredential::new(
            snapshot.iri(),
            &self.config.base_url,
            snapshot.purpose(),
            &snapshot.padded_bits(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> StatusListManager {
        StatusListManager::new(StatusListConfig::new("https://badges.example/"))
    }

    #[test]
    fn indices_are_monotonic() {
        let m = manager();
        let a = m.allocate("urn:a");
        let b = m.allocate("urn:b");
        let c = m.allocate("urn:c");
        assert_eq!(
            [a.status_list_index, b.status_list_index, c.status_list_index],
            [0, 1, 2]
        );
        assert_eq!(a.list_iri(), "https://badges.example/status-lists/revocation/1");
        assert_eq!(a.id, "urn:a#status");
    }

    #[test]
    fn reallocation_returns_existing_entry() {
        let m = manager();
        let first = m.allocate("urn:a");
        m.allocate("urn:b");
        assert_eq!(m.allocate("urn:a"), first);
        assert_eq!(m.allocate("urn:c").status_list_index, 2);
    }

    #[test]
    fn purposes_use_separate_lists() {
        let m = manager();
        let r = m.allocate_for("urn:a", StatusPurpose::Revocation);
        let s = m.allocate_for("urn:a", StatusPurpose::Suspension);
        assert_ne!(r.list_iri(), s.list_iri());
        assert_eq!(s.status_list_index, 0);
        assert!(s.list_iri().ends_with("/status-lists/suspension/1"));
    }

    #[test]
    fn full_list_rolls_over() {
        let m = StatusListManager::new(StatusListConfig::new("https://x").with_capacity(2));
        let a = m.allocate("urn:a");
        let b = m.allocate("urn:b");
        let c = m.allocate("urn:c");
        assert_eq!(a.list_iri(), b.list_iri());
        assert_eq!(c.list_iri(), "https://x/status-lists/revocation/2");
        assert_eq!(c.status_list_index, 0);
        assert_eq!(m.list_iris().len(), 2);
    }

    #[test]
    fn revoke_and_query() {
        let m = manager();
        let a = m.allocate("urn:a");
        let b = m.allocate("urn:b");
        m.set_status(&a, Status::Revoked).unwrap();
        assert_eq!(m.get_status(&a).unwrap(), Status::Revoked);
        assert_eq!(m.get_status(&b).unwrap(), Status::Active);
        // Revoking twice is idempotent.
        m.set_status(&a, Status::Revoked).unwrap();
    }

    #[test]
    fn revocation_is_permanent() {
        let m = manager();
        let a = m.allocate("urn:a");
        m.set_status(&a, Status::Revoked).unwrap();
        assert!(matches!(
            m.set_status(&a, Status::Active),
            Err(StatusError::RevocationIsPermanent { index: 0, .. })
        ));
        assert_eq!(m.get_status(&a).unwrap(), Status::Revoked);
    }

    #[test]
    fn suspension_can_be_lifted() {
        let m = manager();
        let s = m.allocate_for("urn:a", StatusPurpose::Suspension);
        m.set_status(&s, Status::Suspended).unwrap();
        assert_eq!(m.get_status(&s).unwrap(), Status::Suspended);
        m.set_status(&s, Status::Active).unwrap();
        assert_eq!(m.get_status(&s).unwrap(), Status::Active);
    }

    #[test]
    fn status_must_match_purpose() {
        let m = manager();
        let r = m.allocate("urn:a");
        assert!(matches!(
            m.set_status(&r, Status::Suspended),
            Err(StatusError::PurposeMismatch { .. })
        ));

        let mut forged = r.clone();
        forged.status_purpose = StatusPurpose::Suspension;
        assert!(matches!(
            m.set_status(&forged, Status::Suspended),
            Err(StatusError::PurposeMismatch { .. })
        ));
    }

    #[test]
    fn foreign_and_unallocated_entries() {
        let m = manager();
        let a = m.allocate("urn:a");
        let foreign = StatusListEntry::new("urn:z", StatusPurpose::Revocation, 0, "https://other/list");
        assert!(matches!(m.get_status(&foreign), Err(StatusError::UnknownList(_))));
        assert!(!m.manages(&foreign.status_list_credential));
        assert!(m.manages(&a.status_list_credential));

        let mut beyond = a.clone();
        beyond.status_list_index = 10;
        assert!(matches!(
            m.get_status(&beyond),
            Err(StatusError::IndexOutOfRange { index: 10, len: 1 })
        ));
    }

    #[test]
    fn published_credential_reflects_bits() {
        let m = manager();
        let a = m.allocate("urn:a");
        let b = m.allocate("urn:b");
        m.set_status(&b, Status::Revoked).unwrap();

        let vc = m.status_list_credential(&b.status_list_credential).unwrap();
        let bits = vc.credential_subject.decode().unwrap();
        assert_eq!(bits.len(), DEFAULT_LIST_CAPACITY);
        assert_eq!(bits.get(a.status_list_index as usize), Some(false));
        assert_eq!(bits.get(b.status_list_index as usize), Some(true));
        assert_eq!(vc.issuer, "https://badges.example");
    }

    #[test]
    fn concurrent_allocation_never_duplicates() {
        let m = Arc::new(StatusListManager::new(
            StatusListConfig::new("https://x").with_capacity(50),
        ));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| m.allocate(&format!("urn:{t}:{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = std::collections::HashSet::new();
        for h in handles {
            for entry in h.join().unwrap() {
                assert!(seen.insert((entry.list_iri().to_string(), entry.status_list_index)));
            }
        }
        assert_eq!(seen.len(), 200);
        assert_eq!(m.list_iris().len(), 4);
    }
}
