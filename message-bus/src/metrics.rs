//! Prometheus metrics for message bus

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    /// Total messages published
    pub static ref MESSAGE_PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_publish_total",
        "Total messages published",
        &["topic", "outcome"]
    )
    .unwrap();

    /// Delivery decisions taken by consumers
    pub static ref MESSAGE_DECISION_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_decision_total",
        "Total ack/nack decisions",
        &["topic", "decision"]
    )
    .unwrap();

    /// Messages scheduled for another publish
    pub static ref MESSAGE_REDELIVERY_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_redelivery_total",
        "Total messages re-published",
        &["topic", "reason"]
    )
    .unwrap();
}
