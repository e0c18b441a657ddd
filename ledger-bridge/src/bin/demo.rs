//! In-process bridge demo
//!
//! Wires the bridge, queue, worker, status store and ledger in one process,
//! creates a few records and prints their final ledger status.

use anyhow::{bail, Context};
use ledger_bridge::{
    Bridge, Config, MemoryLedger, MemoryStatusStore, ObjectRef, Record, SaveRequest,
    TriggerChain, TriggerEvent, Worker,
};
use message_bus::{MemoryMqAdapter, MqAdapter};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const RECORDS: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = Config::from_env().context("loading configuration")?;
    if config.class_names.is_empty() {
        config.class_names = vec!["Note".to_string()];
    }
    tracing::info!(topic = %config.topic(), "Starting ledger bridge demo");

    let mq = Arc::new(MemoryMqAdapter::new());
    let store = Arc::new(MemoryStatusStore::new());
    let ledger = Arc::new(MemoryLedger::new());

    let bridge = Arc::new(Bridge::new(&config));
    bridge.initialize(&config.class_names, mq.clone())?;
    let mut chain = TriggerChain::new();
    chain.register(bridge);

    let worker = Worker::new(&config);
    worker.initialize(ledger.clone(), store.clone(), Some(mq as Arc<dyn MqAdapter>))?;

    let class_name = config.class_names[0].clone();
    let mut objects = Vec::with_capacity(RECORDS);
    for i in 1..=RECORDS {
        let object = ObjectRef::new(class_name.clone(), format!("demo{}", i));
        let record = as_record(json!({
            "className": object.class_name,
            "objectId": object.object_id,
            "title": format!("Record #{}", i),
        }));

        let request = SaveRequest {
            class_name: class_name.clone(),
            record: record.clone(),
            dirty_keys: vec!["title".to_string()],
            original: None,
            is_master: false,
        };
        chain.dispatch(&TriggerEvent::BeforeSave(&request))?;
        store.insert(object.clone());
        chain.dispatch(&TriggerEvent::AfterSave {
            class_name: &class_name,
            record: &record,
            created: true,
        })?;
        objects.push(object);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let done = objects.iter().all(|object| {
            store
                .entry(object)
                .and_then(|entry| entry.status)
                .map_or(false, |status| status.is_terminal())
        });
        if done {
            break;
        }
        if Instant::now() >= deadline {
            bail!("records did not reach a terminal status in time");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    for object in &objects {
        let entry = store.entry(object).unwrap_or_default();
        println!(
            "{} {}",
            object,
            serde_json::to_string(&json!({
                "blockchainStatus": entry.status,
                "blockchainResult": entry.result,
            }))?
        );
    }
    tracing::info!(recorded = ledger.len(), "Ledger contents");

    worker.shutdown()?;
    Ok(())
}

fn as_record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}
