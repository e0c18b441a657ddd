//! Error types for message bus

use thiserror::Error;

/// Message bus error
///
/// Every variant is a protocol violation by the caller: deciding twice on
/// the same delivery, or acting through a subscription that is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Delivery was already acknowledged
    #[error("The message is already acked")]
    AlreadyAcked,

    /// Delivery was already negatively acknowledged
    #[error("The message is already nacked")]
    AlreadyNacked,

    /// Owning consumer has unsubscribed
    #[error("The consumer is already unsubscribed")]
    AlreadyUnsubscribed,
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
