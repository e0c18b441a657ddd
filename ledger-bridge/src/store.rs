//! Object status store boundary
//!
//! The status of each bridged record lives on the record itself, in the
//! application's data store. It is the only durable state of the bridge:
//! a restarted worker converges by reading it back.

use crate::types::{BlockchainResult, BlockchainStatus, ObjectRef};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Result of a conditional `Sending` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Status moved from unset to `Sending`
    Claimed,
    /// Status was already set by someone else
    Contended(BlockchainStatus),
}

/// Persistent per-object status store (trusted update path)
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Read the current status of an object (`None` when unset)
    async fn find(&self, object: &ObjectRef) -> Result<Option<BlockchainStatus>>;

    /// Set the status to `Sending` only if it is currently unset
    async fn claim(&self, object: &ObjectRef) -> Result<ClaimOutcome>;

    /// Persist a status and optional result
    async fn save(
        &self,
        object: &ObjectRef,
        status: BlockchainStatus,
        result: Option<&BlockchainResult>,
    ) -> Result<()>;
}

/// Persisted status fields of one object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEntry {
    /// Ledger sync status
    pub status: Option<BlockchainStatus>,
    /// Ledger sync result
    pub result: Option<BlockchainResult>,
}

/// In-process status store
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    objects: Mutex<HashMap<ObjectRef, StatusEntry>>,
}

impl MemoryStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object with unset status
    pub fn insert(&self, object: ObjectRef) {
        self.objects.lock().entry(object).or_default();
    }

    /// Register an object with a given entry
    pub fn insert_entry(&self, object: ObjectRef, entry: StatusEntry) {
        self.objects.lock().insert(object, entry);
    }

    /// Snapshot of an object's persisted fields
    pub fn entry(&self, object: &ObjectRef) -> Option<StatusEntry> {
        self.objects.lock().get(object).cloned()
    }

    fn not_found(object: &ObjectRef) -> Error {
        Error::ObjectNotFound {
            class_name: object.class_name.clone(),
            object_id: object.object_id.clone(),
        }
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn find(&self, object: &ObjectRef) -> Result<Option<BlockchainStatus>> {
        self.objects
            .lock()
            .get(object)
            .map(|entry| entry.status)
            .ok_or_else(|| Self::not_found(object))
    }

    async fn claim(&self, object: &ObjectRef) -> Result<ClaimOutcome> {
        let mut objects = self.objects.lock();
        let entry = objects
            .get_mut(object)
            .ok_or_else(|| Self::not_found(object))?;

        match entry.status {
            None => {
                entry.status = Some(BlockchainStatus::Sending);
                Ok(ClaimOutcome::Claimed)
            }
            Some(current) => Ok(ClaimOutcome::Contended(current)),
        }
    }

    async fn save(
        &self,
        object: &ObjectRef,
        status: BlockchainStatus,
        result: Option<&BlockchainResult>,
    ) -> Result<()> {
        let mut objects = self.objects.lock();
        let entry = objects
            .get_mut(object)
            .ok_or_else(|| Self::not_found(object))?;

        if !BlockchainStatus::can_advance(entry.status, status) {
            return Err(Error::InvalidTransition {
                from: entry.status,
                to: Some(status),
            });
        }

        entry.status = Some(status);
        if let Some(result) = result {
            entry.result = Some(result.clone());
        }
        Ok(())
    }
}
