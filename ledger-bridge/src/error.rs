//! Error types for the bridge

use crate::types::BlockchainStatus;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge errors
#[derive(Error, Debug)]
pub enum Error {
    /// Component initialized twice
    #[error("The {0} is already initialized")]
    AlreadyInitialized(&'static str),

    /// Object unknown to the status store
    #[error("Object not found: {class_name}/{object_id}")]
    ObjectNotFound {
        /// Class of the object
        class_name: String,
        /// Identifier of the object
        object_id: String,
    },

    /// Status store failure (transient)
    #[error("Status store error: {0}")]
    Store(String),

    /// Status write that would move the state machine backwards
    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Persisted status
        from: Option<BlockchainStatus>,
        /// Requested status
        to: Option<BlockchainStatus>,
    },

    /// Ledger adapter error
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Queue protocol violation
    #[error("Queue error: {0}")]
    Queue(#[from] message_bus::Error),

    /// Queue message that cannot be turned into a record
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Write rejected by the trigger policy
    #[error("unauthorized: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ledger adapter errors
///
/// The worker branches on the kind: `NotFound` from `get` means an earlier
/// sender never completed its write, anything else is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No entry for this object identity on the ledger
    #[error("The object does not exist: {class_name}/{object_id}")]
    NotFound {
        /// Class of the object
        class_name: String,
        /// Identifier of the object
        object_id: String,
    },

    /// Ledger refused the write (reverted transaction, duplicate identity)
    #[error("Ledger rejected the request: {0}")]
    Rejected(String),

    /// Ledger could not be reached or timed out
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether the ledger reported the object as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}
