//! In-process message bus
//!
//! Provides topic-based pub/sub with:
//! - At-least-once delivery with explicit ack/nack per delivery
//! - Random load balancing across consumers of a topic
//! - Holding of messages published before the first consumer subscribes
//! - Redelivery of undecided messages when a consumer unsubscribes
//! - Observability via Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod adapter;
pub mod error;
pub mod memory;
pub mod metrics;

pub use adapter::{Acknowledger, Delivery, Listener, MqAdapter, Subscription};
pub use error::{Error, Result};
pub use memory::{MemoryMqAdapter, MemorySubscription};
