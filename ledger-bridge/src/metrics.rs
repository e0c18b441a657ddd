//! Prometheus metrics for the bridge worker

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Histogram,
};

lazy_static! {
    /// Messages handled by the worker, by outcome
    pub static ref WORKER_MESSAGES_TOTAL: CounterVec = register_counter_vec!(
        "ledger_bridge_messages_total",
        "Total messages handled by the worker",
        &["outcome"]
    )
    .unwrap();

    /// Ledger adapter calls
    pub static ref LEDGER_CALLS_TOTAL: CounterVec = register_counter_vec!(
        "ledger_bridge_ledger_calls_total",
        "Total ledger adapter calls",
        &["operation", "status"]
    )
    .unwrap();

    /// Message processing duration
    pub static ref PROCESS_DURATION: Histogram = register_histogram!(
        "ledger_bridge_process_duration_seconds",
        "Message processing duration in seconds"
    )
    .unwrap();
}
