//! Ledger Bridge
//!
//! Mirrors newly created application records to an external ledger,
//! exactly once from the application's point of view.
//!
//! # Architecture
//!
//! - **Bridge**: trigger interceptor that guards the status fields and
//!   publishes each created record to the application's topic
//! - **Queue**: at-least-once delivery with explicit ack/nack (`message-bus`)
//! - **Worker**: idempotent `unset -> Sending -> Sent | Failed` state machine
//!   persisted on the record itself
//!
//! # Invariants
//!
//! - Status never regresses; only the worker's trusted path advances it
//! - Duplicate deliveries of a record with a terminal status are acked
//!   without touching the ledger
//! - A failed ledger write is recorded as `Failed`, never retried blindly

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod store;
pub mod types;
pub mod worker;

// Re-exports
pub use bridge::{Bridge, Interceptor, SaveRequest, TriggerChain, TriggerEvent};
pub use config::{Config, WorkerConfig};
pub use error::{Error, LedgerError, Result};
pub use ledger::{LedgerAdapter, MemoryLedger};
pub use store::{ClaimOutcome, MemoryStatusStore, StatusEntry, StatusStore};
pub use types::{BlockchainResult, BlockchainStatus, ObjectRef, Record};
pub use worker::{Decision, MessageProcessor, Worker};
