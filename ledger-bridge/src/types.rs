//! Core types for bridged records

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Full JSON representation of an application record
pub type Record = Map<String, Value>;

/// Record field holding the ledger sync status
pub const STATUS_FIELD: &str = "blockchainStatus";

/// Record field holding the ledger sync result
pub const RESULT_FIELD: &str = "blockchainResult";

/// Queue topic shared by the producer and the worker of one application
pub fn bridge_topic(application_id: &str) -> String {
    format!("{}-parse-server-blockchain", application_id)
}

/// Ledger sync status of a record (unset is `None`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockchainStatus {
    /// Claimed by a worker, ledger write may be in flight
    Sending,
    /// Recorded on the ledger
    Sent,
    /// Ledger write failed; needs operator follow-up
    Failed,
}

impl BlockchainStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, BlockchainStatus::Sent | BlockchainStatus::Failed)
    }

    /// Monotonic transitions: unset -> Sending -> Sent | Failed
    pub fn can_advance(from: Option<BlockchainStatus>, to: BlockchainStatus) -> bool {
        match (from, to) {
            (None, BlockchainStatus::Sending) => true,
            (Some(BlockchainStatus::Sending), to) => to.is_terminal(),
            _ => false,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockchainStatus::Sending => "sending",
            BlockchainStatus::Sent => "sent",
            BlockchainStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BlockchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity input of a `get` reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInput {
    /// Class of the object
    pub class_name: String,
    /// Identifier of the object
    pub object_id: String,
}

/// Outcome persisted next to a terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockchainResult {
    /// Ledger state read back after a stuck `Sending`
    Get {
        /// Object identity that was looked up
        input: GetInput,
        /// Ledger data
        output: Record,
    },
    /// Successful ledger write
    Send {
        /// Serialized record that was sent
        input: String,
        /// Ledger response
        output: Record,
    },
    /// Failed ledger write
    Error {
        /// Serialized record that was sent
        input: String,
        /// Stringified ledger error
        error: String,
    },
}

/// Object identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    /// Class of the object
    pub class_name: String,
    /// Identifier of the object
    pub object_id: String,
}

impl ObjectRef {
    /// Create object reference
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    /// Extract identity from a record's `className` / `objectId` fields
    pub fn from_record(record: &Record) -> Result<Self> {
        let field = |name: &str| {
            record
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::MalformedMessage(format!("missing string field `{}`", name)))
        };

        Ok(Self {
            class_name: field("className")?,
            object_id: field("objectId")?,
        })
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class_name, self.object_id)
    }
}

/// Parse a queue message into its identity and full record
pub fn parse_message(message: &str) -> Result<(ObjectRef, Record)> {
    let record: Record = serde_json::from_str(message)
        .map_err(|e| Error::MalformedMessage(format!("not a JSON object: {}", e)))?;
    let object = ObjectRef::from_record(&record)?;
    Ok((object, record))
}
