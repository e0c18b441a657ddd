//! Queue adapter contract
//!
//! A producer calls [`MqAdapter::publish`]; consumers register a
//! [`Listener`] with [`MqAdapter::consume`] and receive each message as a
//! [`Delivery`] they must settle exactly once with `ack` or `nack`.

use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Decision callbacks attached to one delivery attempt
pub trait Acknowledger: Send + Sync {
    /// Positive acknowledgement: the message is removed from the queue
    fn ack(&self) -> Result<()>;

    /// Negative acknowledgement: the message is published again
    fn nack(&self) -> Result<()>;
}

/// Consumer registration handle
pub trait Subscription: Send + Sync {
    /// Stop receiving messages; undecided deliveries are re-published
    fn unsubscribe(&self) -> Result<()>;
}

/// Listener invoked once per delivery
pub type Listener = Arc<dyn Fn(Delivery) + Send + Sync>;

/// Queue adapter
pub trait MqAdapter: Send + Sync {
    /// Publish a message to a topic
    fn publish(&self, topic: &str, message: String);

    /// Register a consumer on a topic
    fn consume(&self, topic: &str, listener: Listener) -> Box<dyn Subscription>;
}

/// A message handed to a consumer, together with its decision callbacks
#[derive(Clone)]
pub struct Delivery {
    message: Arc<str>,
    acknowledger: Arc<dyn Acknowledger>,
}

impl Delivery {
    /// Create a delivery (adapters and adapter wrappers only)
    pub fn new(message: impl Into<Arc<str>>, acknowledger: Arc<dyn Acknowledger>) -> Self {
        Self {
            message: message.into(),
            acknowledger,
        }
    }

    /// Message payload
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Acknowledge the delivery
    pub fn ack(&self) -> Result<()> {
        self.acknowledger.ack()
    }

    /// Reject the delivery and request redelivery
    pub fn nack(&self) -> Result<()> {
        self.acknowledger.nack()
    }

    /// Underlying decision callbacks
    pub fn acknowledger(&self) -> Arc<dyn Acknowledger> {
        Arc::clone(&self.acknowledger)
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
