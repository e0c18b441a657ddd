//! Trigger policy and producer for bridged classes
//!
//! The host's data layer dispatches a [`TriggerEvent`] for every save and
//! delete through a [`TriggerChain`]. The [`Bridge`] interceptor:
//! - Rejects client writes to `blockchainStatus` / `blockchainResult`
//! - Only lets the trusted path advance the status one step at a time
//! - Rejects deletes of bridged records
//! - Publishes each newly created bridged record to the worker topic

use crate::config::Config;
use crate::types::{BlockchainStatus, Record, RESULT_FIELD, STATUS_FIELD};
use crate::{Error, Result};
use message_bus::MqAdapter;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Save about to be applied to a record
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Class of the record
    pub class_name: String,
    /// Record as it will be stored
    pub record: Record,
    /// Fields changed by this save
    pub dirty_keys: Vec<String>,
    /// Stored record before this save (`None` on create)
    pub original: Option<Record>,
    /// Whether the caller uses the trusted (master) path
    pub is_master: bool,
}

/// Data-layer event dispatched through the trigger chain
#[derive(Debug, Clone, Copy)]
pub enum TriggerEvent<'a> {
    /// Before a record is created or updated
    BeforeSave(&'a SaveRequest),
    /// After a record was stored
    AfterSave {
        /// Class of the record
        class_name: &'a str,
        /// Stored record
        record: &'a Record,
        /// Whether the save created the record
        created: bool,
    },
    /// Before a record is deleted
    BeforeDelete {
        /// Class of the record
        class_name: &'a str,
    },
}

/// Middleware run for every data-layer event
pub trait Interceptor: Send + Sync {
    /// Inspect an event; an error aborts the operation
    fn intercept(&self, event: &TriggerEvent<'_>) -> Result<()>;
}

/// Ordered interceptor chain
#[derive(Default, Clone)]
pub struct TriggerChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl TriggerChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor
    pub fn register(&mut self, interceptor: Arc<dyn Interceptor>) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Run every interceptor in order, stopping at the first rejection
    pub fn dispatch(&self, event: &TriggerEvent<'_>) -> Result<()> {
        self.interceptors
            .iter()
            .try_for_each(|interceptor| interceptor.intercept(event))
    }
}

struct Bound {
    class_names: HashSet<String>,
    mq: Arc<dyn MqAdapter>,
}

/// Bridge between the data layer and the worker topic
pub struct Bridge {
    topic: String,
    bound: RwLock<Option<Bound>>,
}

impl Bridge {
    /// Create new bridge
    pub fn new(config: &Config) -> Self {
        Self {
            topic: config.topic(),
            bound: RwLock::new(None),
        }
    }

    /// Bind the bridged classes and the queue adapter, once
    pub fn initialize(&self, class_names: &[String], mq: Arc<dyn MqAdapter>) -> Result<()> {
        let mut bound = self.bound.write();
        if bound.is_some() {
            return Err(Error::AlreadyInitialized("bridge"));
        }

        *bound = Some(Bound {
            class_names: class_names.iter().cloned().collect(),
            mq,
        });
        Ok(())
    }

    /// Whether records of `class_name` are mirrored to the ledger
    pub fn is_bridged(&self, class_name: &str) -> bool {
        self.bound
            .read()
            .as_ref()
            .map_or(false, |bound| bound.class_names.contains(class_name))
    }

    fn before_save(&self, request: &SaveRequest) -> Result<()> {
        match &request.original {
            None => {
                if has_value(&request.record, STATUS_FIELD) {
                    return Err(forbidden("cannot set blockchainStatus field"));
                }
                if has_value(&request.record, RESULT_FIELD) {
                    return Err(forbidden("cannot set blockchainResult field"));
                }
                Ok(())
            }
            Some(original) => {
                if request.is_master && is_trusted_transition(original, request) {
                    Ok(())
                } else {
                    warn!(
                        class_name = %request.class_name,
                        is_master = request.is_master,
                        "Rejected update of bridged object"
                    );
                    Err(forbidden("cannot update objects on blockchain bridge"))
                }
            }
        }
    }

    fn after_save(&self, class_name: &str, record: &Record) -> Result<()> {
        let mq = match self.bound.read().as_ref() {
            Some(bound) => Arc::clone(&bound.mq),
            None => return Ok(()),
        };

        let mut message = record.clone();
        message
            .entry("className".to_string())
            .or_insert_with(|| Value::from(class_name));

        debug!(class_name, topic = %self.topic, "Publishing created object");
        mq.publish(&self.topic, serde_json::to_string(&message)?);
        Ok(())
    }
}

impl Interceptor for Bridge {
    fn intercept(&self, event: &TriggerEvent<'_>) -> Result<()> {
        match *event {
            TriggerEvent::BeforeSave(request) if self.is_bridged(&request.class_name) => {
                self.before_save(request)
            }
            TriggerEvent::AfterSave {
                class_name,
                record,
                created: true,
            } if self.is_bridged(class_name) => self.after_save(class_name, record),
            TriggerEvent::BeforeDelete { class_name } if self.is_bridged(class_name) => {
                Err(forbidden("cannot delete objects on blockchain bridge"))
            }
            _ => Ok(()),
        }
    }
}

fn forbidden(reason: &str) -> Error {
    Error::Forbidden(reason.to_string())
}

fn has_value(record: &Record, field: &str) -> bool {
    record.get(field).map_or(false, |value| !value.is_null())
}

/// Absent or null is unset; an unknown value is an error
fn status_of(record: &Record) -> Result<Option<BlockchainStatus>> {
    match record.get(STATUS_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

/// Status-only updates the worker is allowed to make
fn is_trusted_transition(original: &Record, request: &SaveRequest) -> bool {
    let (from, to) = match (status_of(original), status_of(&request.record)) {
        (Ok(from), Ok(Some(to))) => (from, to),
        _ => return false,
    };
    if !BlockchainStatus::can_advance(from, to) {
        return false;
    }

    let allowed: &[&str] = if from.is_none() {
        &[STATUS_FIELD]
    } else {
        &[STATUS_FIELD, RESULT_FIELD]
    };
    request
        .dirty_keys
        .iter()
        .all(|key| allowed.contains(&key.as_str()))
}
