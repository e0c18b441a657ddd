//! Ledger adapter boundary
//!
//! The worker only needs two capabilities from a ledger: write a record
//! (`send`) and read back what was written for an identity (`get`).

use crate::error::LedgerError;
use crate::types::{ObjectRef, Record};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Fields the ledger derives from the key rather than storing in the payload
const KEY_FIELDS: [&str; 4] = ["__type", "className", "objectId", "updatedAt"];

/// Ledger adapter
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Write a full record to the ledger
    async fn send(&self, record: &Record) -> Result<Record, LedgerError>;

    /// Read the ledger entry of an object
    async fn get(&self, class_name: &str, object_id: &str)
        -> Result<Record, LedgerError>;
}

/// In-process ledger keyed by object identity
///
/// A second `send` for an identity already on the ledger is rejected, so
/// duplicate sends from racing workers cannot create two entries.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<ObjectRef, Record>,
    block_number: u64,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded objects
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    async fn send(&self, record: &Record) -> Result<Record, LedgerError> {
        let object = ObjectRef::from_record(record)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        let mut state = self.state.lock();
        if state.entries.contains_key(&object) {
            return Err(LedgerError::Rejected(format!(
                "The object already exists: {}",
                object
            )));
        }

        let data: Record = record
            .iter()
            .filter(|(key, _)| !KEY_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        state.block_number += 1;
        let block_number = state.block_number;
        state.entries.insert(object, data);

        let mut receipt = Record::new();
        receipt.insert(
            "transactionHash".to_string(),
            Value::from(format!("0x{:064x}", block_number)),
        );
        receipt.insert("blockNumber".to_string(), Value::from(block_number));
        Ok(receipt)
    }

    async fn get(
        &self,
        class_name: &str,
        object_id: &str,
    ) -> Result<Record, LedgerError> {
        self.state
            .lock()
            .entries
            .get(&ObjectRef::new(class_name, object_id))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                class_name: class_name.to_string(),
                object_id: object_id.to_string(),
            })
    }
}
