//! Reliability worker
//!
//! Drives every bridged record through `unset -> Sending -> Sent | Failed`
//! exactly once in effect, even though deliveries may be duplicated and
//! every external call may fail.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   MqAdapter (topic listener) │
//! └──────────────┬───────────────┘
//!                │ Delivery
//!                ▼  mpsc::unbounded_channel
//! ┌──────────────────────────────┐
//! │  Worker task (single active) │
//! │  MessageProcessor::handle()  │──► StatusStore (find/claim/save)
//! └──────────────┬───────────────┘──► LedgerAdapter (send/get)
//!                │
//!                ▼
//!        ack() | nack()
//! ```
//!
//! Transient failures of the status store or of ledger `get` nack the
//! message (redelivery with linear backoff). A failed ledger `send` is
//! terminal: the record is marked `Failed` and the message acked, since an
//! automatic retry could write the record twice.

use crate::config::{Config, WorkerConfig};
use crate::ledger::LedgerAdapter;
use crate::metrics::{LEDGER_CALLS_TOTAL, PROCESS_DURATION, WORKER_MESSAGES_TOTAL};
use crate::store::{ClaimOutcome, StatusStore};
use crate::types::{
    parse_message, BlockchainResult, BlockchainStatus, GetInput, ObjectRef, Record,
};
use crate::{Error, Result};
use message_bus::{Delivery, Listener, MemoryMqAdapter, MqAdapter, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What the worker decided for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Record reached a terminal status in this run (ack)
    Completed,
    /// Record was already terminal (ack)
    AlreadyTerminal,
    /// Message cannot be parsed into a record (ack, redelivery cannot help)
    Malformed,
    /// Transient failure or contention (nack)
    Retry,
}

impl Decision {
    /// Whether the delivery is acknowledged
    pub fn is_ack(&self) -> bool {
        !matches!(self, Decision::Retry)
    }

    fn label(&self) -> &'static str {
        match self {
            Decision::Completed => "acked",
            Decision::AlreadyTerminal => "skipped",
            Decision::Malformed => "dropped",
            Decision::Retry => "nacked",
        }
    }
}

/// Per-message state machine
pub struct MessageProcessor {
    config: WorkerConfig,
    ledger: Arc<dyn LedgerAdapter>,
    store: Arc<dyn StatusStore>,
    fails: u32,
}

impl MessageProcessor {
    /// Create new processor
    pub fn new(
        config: WorkerConfig,
        ledger: Arc<dyn LedgerAdapter>,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            config: config.normalized(),
            ledger,
            store,
            fails: 0,
        }
    }

    /// Consecutive failures since the last fully handled message
    pub fn consecutive_failures(&self) -> u32 {
        self.fails
    }

    /// Process a delivery and settle it with ack or nack
    pub async fn handle(&mut self, delivery: Delivery) -> Decision {
        let decision = self.process(delivery.message()).await;

        let settled = if decision.is_ack() {
            delivery.ack()
        } else {
            delivery.nack()
        };
        if let Err(e) = settled {
            warn!(error = %e, ?decision, "Could not settle delivery");
        }

        decision
    }

    /// Run the state machine for one message
    pub async fn process(&mut self, message: &str) -> Decision {
        let start = Instant::now();
        let decision = self.process_inner(message).await;

        PROCESS_DURATION.observe(start.elapsed().as_secs_f64());
        WORKER_MESSAGES_TOTAL
            .with_label_values(&[decision.label()])
            .inc();
        decision
    }

    async fn process_inner(&mut self, message: &str) -> Decision {
        if self.fails > 0 {
            let delay = self.config.backoff(self.fails);
            debug!(fails = self.fails, ?delay, "Backing off");
            tokio::time::sleep(delay).await;
        }

        let (object, record) = match parse_message(message) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "Dropping malformed message");
                return Decision::Malformed;
            }
        };

        let mut status = None;
        let attempts = self.config.wait_sending_attempts;
        for attempt in 0..attempts {
            match self.store.find(&object).await {
                Err(e) => {
                    error!(%object, error = %e, "Could not get object status");
                    return self.retry();
                }
                Ok(None) => {
                    status = None;
                    break;
                }
                Ok(Some(BlockchainStatus::Sending)) => {
                    status = Some(BlockchainStatus::Sending);
                    warn!(%object, attempt, "Object is already being sent");
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.config.wait_sending_sleep()).await;
                    }
                }
                Ok(Some(terminal)) => {
                    info!(%object, status = %terminal, "Object already has a terminal status");
                    self.fails = 0;
                    return Decision::AlreadyTerminal;
                }
            }
        }

        let mut reconciled = None;
        if status == Some(BlockchainStatus::Sending) {
            match self.ledger.get(&object.class_name, &object.object_id).await {
                Ok(output) => {
                    LEDGER_CALLS_TOTAL.with_label_values(&["get", "success"]).inc();
                    info!(%object, "Stuck object found on the ledger");
                    reconciled = Some(BlockchainResult::Get {
                        input: GetInput {
                            class_name: object.class_name.clone(),
                            object_id: object.object_id.clone(),
                        },
                        output,
                    });
                }
                Err(e) if e.is_not_found() => {
                    LEDGER_CALLS_TOTAL.with_label_values(&["get", "not_found"]).inc();
                    warn!(%object, "Stuck object is not on the ledger, sending it");
                }
                Err(e) => {
                    LEDGER_CALLS_TOTAL.with_label_values(&["get", "error"]).inc();
                    error!(%object, error = %e, "Could not get object from the ledger");
                    return self.retry();
                }
            }
        } else {
            match self.store.claim(&object).await {
                Ok(ClaimOutcome::Claimed) => {
                    debug!(%object, "Claimed object for sending");
                }
                Ok(ClaimOutcome::Contended(current)) if current.is_terminal() => {
                    info!(%object, status = %current, "Object completed by another worker");
                    self.fails = 0;
                    return Decision::AlreadyTerminal;
                }
                Ok(ClaimOutcome::Contended(current)) => {
                    warn!(%object, status = %current, "Another worker claimed the object");
                    return Decision::Retry;
                }
                Err(e) => {
                    error!(
                        %object,
                        status = %BlockchainStatus::Sending,
                        error = %e,
                        "Could not update object status"
                    );
                    return self.retry();
                }
            }
        }

        let (final_status, result) = match reconciled {
            Some(result) => (BlockchainStatus::Sent, result),
            None => self.send(&object, &record).await,
        };

        if let Err(e) = self.store.save(&object, final_status, Some(&result)).await {
            error!(
                %object,
                status = %final_status,
                ?result,
                error = %e,
                "Could not update object status"
            );
            return self.retry();
        }

        info!(%object, status = %final_status, "Object status finalized");
        self.fails = 0;
        Decision::Completed
    }

    async fn send(&self, object: &ObjectRef, record: &Record) -> (BlockchainStatus, BlockchainResult) {
        let input = Value::Object(record.clone()).to_string();

        match self.ledger.send(record).await {
            Ok(output) => {
                LEDGER_CALLS_TOTAL.with_label_values(&["send", "success"]).inc();
                (BlockchainStatus::Sent, BlockchainResult::Send { input, output })
            }
            Err(e) => {
                LEDGER_CALLS_TOTAL.with_label_values(&["send", "error"]).inc();
                error!(%object, error = %e, "Could not send object");
                (
                    BlockchainStatus::Failed,
                    BlockchainResult::Error {
                        input,
                        error: e.to_string(),
                    },
                )
            }
        }
    }

    fn retry(&mut self) -> Decision {
        self.fails = self.fails.saturating_add(1);
        Decision::Retry
    }
}

struct Running {
    mq: Arc<dyn MqAdapter>,
    subscription: Box<dyn Subscription>,
    task: JoinHandle<()>,
}

/// Worker bound to the bridge topic of one application
///
/// Constructed and wired by the host; `initialize` may be called once.
pub struct Worker {
    config: WorkerConfig,
    topic: String,
    initialized: AtomicBool,
    running: Mutex<Option<Running>>,
}

impl Worker {
    /// Create new worker
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.worker.clone().normalized(),
            topic: config.topic(),
            initialized: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    /// Subscribe to the bridge topic and start processing
    ///
    /// Uses a fresh [`MemoryMqAdapter`] when `mq` is `None`. Must be called
    /// from within a Tokio runtime.
    pub fn initialize(
        &self,
        ledger: Arc<dyn LedgerAdapter>,
        store: Arc<dyn StatusStore>,
        mq: Option<Arc<dyn MqAdapter>>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("worker needs a Tokio runtime: {}", e)))?;

        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized("worker"));
        }

        let mq = mq.unwrap_or_else(|| Arc::new(MemoryMqAdapter::new()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();

        let listener: Listener = Arc::new(move |delivery: Delivery| {
            if tx.send(delivery).is_err() {
                warn!("Worker stopped, leaving delivery undecided");
            }
        });

        let mut processor =
            MessageProcessor::new(self.config.clone(), ledger, store);
        let task = runtime.spawn(async move {
            while let Some(delivery) = rx.recv().await {
                processor.handle(delivery).await;
            }
        });

        let subscription = mq.consume(&self.topic, listener);
        info!(topic = %self.topic, "Worker subscribed");

        *self.running.lock() = Some(Running {
            mq,
            subscription,
            task,
        });
        Ok(())
    }

    /// Queue adapter in use, once initialized
    pub fn mq_adapter(&self) -> Option<Arc<dyn MqAdapter>> {
        self.running
            .lock()
            .as_ref()
            .map(|running| Arc::clone(&running.mq))
    }

    /// Topic the worker consumes
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Unsubscribe and stop processing
    ///
    /// Messages delivered but not yet settled are handed back to the queue.
    pub fn shutdown(&self) -> Result<()> {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.subscription.unsubscribe()?;
            running.task.abort();
            info!(topic = %self.topic, "Worker stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::store::{MemoryStatusStore, StatusEntry};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const MESSAGE: &str = r#"{"className":"C","objectId":"o1","title":"hello"}"#;

    fn object() -> ObjectRef {
        ObjectRef::new("C", "o1")
    }

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            wait_sending_attempts: 3,
            wait_sending_sleep_ms: 10,
            backoff_step_ms: 1_000,
        }
    }

    struct FakeLedger {
        send_result: std::result::Result<Record, LedgerError>,
        get_result: std::result::Result<Record, LedgerError>,
        sends: AtomicUsize,
        gets: AtomicUsize,
    }

    impl FakeLedger {
        fn new(
            send_result: std::result::Result<Record, LedgerError>,
            get_result: std::result::Result<Record, LedgerError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                send_result,
                get_result,
                sends: AtomicUsize::new(0),
                gets: AtomicUsize::new(0),
            })
        }

        fn sending_ok() -> Arc<Self> {
            Self::new(
                Ok(record(json!({"tx": "0x1"}))),
                Err(LedgerError::NotFound {
                    class_name: "C".to_string(),
                    object_id: "o1".to_string(),
                }),
            )
        }
    }

    #[async_trait]
    impl LedgerAdapter for FakeLedger {
        async fn send(&self, record: &Record) -> std::result::Result<Record, LedgerError> {
            assert_eq!(record["objectId"], "o1");
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.send_result.clone()
        }

        async fn get(
            &self,
            _class_name: &str,
            _object_id: &str,
        ) -> std::result::Result<Record, LedgerError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.get_result.clone()
        }
    }

    /// Store whose reads and writes can be made to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStatusStore,
        failing_finds: AtomicUsize,
        failing_saves: AtomicUsize,
        failing_claims: AtomicUsize,
        stale_reads: AtomicBool,
        finds: AtomicUsize,
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl StatusStore for FlakyStore {
        async fn find(&self, object: &ObjectRef) -> Result<Option<BlockchainStatus>> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            if take_one(&self.failing_finds) {
                return Err(Error::Store("connection reset".to_string()));
            }
            if self.stale_reads.load(Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find(object).await
        }

        async fn claim(&self, object: &ObjectRef) -> Result<ClaimOutcome> {
            if take_one(&self.failing_claims) {
                return Err(Error::Store("down".to_string()));
            }
            self.inner.claim(object).await
        }

        async fn save(
            &self,
            object: &ObjectRef,
            status: BlockchainStatus,
            result: Option<&BlockchainResult>,
        ) -> Result<()> {
            if take_one(&self.failing_saves) {
                return Err(Error::Store("write timeout".to_string()));
            }
            self.inner.save(object, status, result).await
        }
    }

    fn store_with(status: Option<BlockchainStatus>) -> Arc<FlakyStore> {
        let store = FlakyStore::default();
        store.inner.insert_entry(
            object(),
            StatusEntry {
                status,
                result: None,
            },
        );
        Arc::new(store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_unset_object() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);

        let entry = store.inner.entry(&object()).unwrap();
        assert_eq!(entry.status, Some(BlockchainStatus::Sent));
        assert_eq!(
            entry.result,
            Some(BlockchainResult::Send {
                input: Value::Object(record(serde_json::from_str(MESSAGE).unwrap())).to_string(),
                output: record(json!({"tx": "0x1"})),
            })
        );
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_is_not_sent_again() {
        for status in [BlockchainStatus::Sent, BlockchainStatus::Failed] {
            let ledger = FakeLedger::sending_ok();
            let store = store_with(Some(status));
            let mut processor =
                MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

            assert_eq!(processor.process(MESSAGE).await, Decision::AlreadyTerminal);
            assert_eq!(ledger.sends.load(Ordering::SeqCst), 0);
            assert_eq!(store.inner.entry(&object()).unwrap().status, Some(status));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_sending_reconciled_with_get() {
        let ledger = FakeLedger::new(
            Ok(Record::new()),
            Ok(record(json!({"title": "hello"}))),
        );
        let store = store_with(Some(BlockchainStatus::Sending));
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        let start = tokio::time::Instant::now();
        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);

        // Sleeps between reads, not after the last one
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20) && elapsed < Duration::from_millis(30));
        assert_eq!(store.finds.load(Ordering::SeqCst), 3);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 0);

        let entry = store.inner.entry(&object()).unwrap();
        assert_eq!(entry.status, Some(BlockchainStatus::Sent));
        assert_eq!(
            serde_json::to_value(entry.result.unwrap()).unwrap(),
            json!({
                "type": "Get",
                "input": {"className": "C", "objectId": "o1"},
                "output": {"title": "hello"}
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_sending_not_on_ledger_is_sent() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(Some(BlockchainStatus::Sending));
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);
        assert_eq!(ledger.gets.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 1);

        let entry = store.inner.entry(&object()).unwrap();
        assert_eq!(entry.status, Some(BlockchainStatus::Sent));
        assert!(matches!(entry.result, Some(BlockchainResult::Send { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_sending_get_failure_is_retried() {
        let ledger = FakeLedger::new(
            Ok(Record::new()),
            Err(LedgerError::Unavailable("rpc down".to_string())),
        );
        let store = store_with(Some(BlockchainStatus::Sending));
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert_eq!(processor.consecutive_failures(), 1);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.inner.entry(&object()).unwrap().status,
            Some(BlockchainStatus::Sending)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_terminal() {
        let ledger = FakeLedger::new(
            Err(LedgerError::Rejected("execution reverted".to_string())),
            Ok(Record::new()),
        );
        let store = store_with(None);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);
        assert_eq!(processor.consecutive_failures(), 0);

        let entry = store.inner.entry(&object()).unwrap();
        assert_eq!(entry.status, Some(BlockchainStatus::Failed));
        match entry.result {
            Some(BlockchainResult::Error { error, .. }) => {
                assert_eq!(error, "Ledger rejected the request: execution reverted");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_read_failure_backs_off_linearly() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        store.failing_finds.store(2, Ordering::SeqCst);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert_eq!(processor.consecutive_failures(), 1);

        let start = tokio::time::Instant::now();
        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(processor.consecutive_failures(), 2);

        let start = tokio::time::Instant::now();
        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(processor.consecutive_failures(), 0);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_save_failure_is_retried_and_converges() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        store.failing_saves.store(1, Ordering::SeqCst);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert_eq!(
            store.inner.entry(&object()).unwrap().status,
            Some(BlockchainStatus::Sending)
        );

        // Redelivery sees `Sending`, polls, then reconciles via get. The fake
        // ledger still reports the object absent, so it is sent once more.
        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);
        assert_eq!(
            store.inner.entry(&object()).unwrap().status,
            Some(BlockchainStatus::Sent)
        );
        assert_eq!(ledger.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_write_failure_is_retried() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        store.failing_claims.store(1, Ordering::SeqCst);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert_eq!(processor.consecutive_failures(), 1);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.entry(&object()).unwrap().status, None);

        assert_eq!(processor.process(MESSAGE).await, Decision::Completed);
        assert_eq!(processor.consecutive_failures(), 0);
        assert_eq!(ledger.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sent_input_keeps_message_field_order() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        let message = r#"{"objectId":"o1","className":"C","zeta":1,"alpha":2}"#;
        assert_eq!(processor.process(message).await, Decision::Completed);

        match store.inner.entry(&object()).unwrap().result {
            Some(BlockchainResult::Send { input, .. }) => assert_eq!(input, message),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_claim_is_not_sent() {
        let ledger = FakeLedger::sending_ok();

        let store = store_with(Some(BlockchainStatus::Sending));
        store.stale_reads.store(true, Ordering::SeqCst);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());
        assert_eq!(processor.process(MESSAGE).await, Decision::Retry);
        assert_eq!(processor.consecutive_failures(), 0);

        let store = store_with(Some(BlockchainStatus::Sent));
        store.stale_reads.store(true, Ordering::SeqCst);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());
        assert_eq!(processor.process(MESSAGE).await, Decision::AlreadyTerminal);

        assert_eq!(ledger.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_message_is_dropped() {
        let ledger = FakeLedger::sending_ok();
        let store = store_with(None);
        let mut processor = MessageProcessor::new(fast_config(), ledger.clone(), store.clone());

        assert_eq!(processor.process("{not json").await, Decision::Malformed);
        assert_eq!(processor.process(r#"{"className":"C"}"#).await, Decision::Malformed);
        assert!(Decision::Malformed.is_ack());
        assert_eq!(store.finds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(Decision::Completed.label(), "acked");
        assert_eq!(Decision::AlreadyTerminal.label(), "skipped");
        assert_eq!(Decision::Malformed.label(), "dropped");
        assert_eq!(Decision::Retry.label(), "nacked");
    }

    #[tokio::test]
    async fn test_worker_initializes_once() {
        let worker = Worker::new(&Config::default());
        let ledger = FakeLedger::sending_ok();
        let store = Arc::new(MemoryStatusStore::new());

        worker.initialize(ledger.clone(), store.clone(), None).unwrap();
        assert!(worker.mq_adapter().is_some());

        let err = worker.initialize(ledger, store, None).unwrap_err();
        assert_eq!(err.to_string(), "The worker is already initialized");

        worker.shutdown().unwrap();
        assert!(worker.mq_adapter().is_none());
    }

    #[test]
    fn test_worker_requires_runtime() {
        let worker = Worker::new(&Config::default());
        let err = worker
            .initialize(
                FakeLedger::sending_ok(),
                Arc::new(MemoryStatusStore::new()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
