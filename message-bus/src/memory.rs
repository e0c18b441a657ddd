//! In-process queue adapter
//!
//! At-least-once delivery with explicit acknowledgement:
//! - Each publish goes to one consumer of the topic, chosen uniformly at random
//! - Messages published to a topic without consumers are held until one subscribes
//! - `nack` and `unsubscribe` hand the message back to the queue for a fresh publish
//!
//! Queue contents live in memory only and do not survive a restart.
//!
//! Re-publishing (nack, unsubscribe, held-message flush) never happens
//! inside the call that triggered it; it is deferred to a spawned task so a
//! listener is never re-entered from its own `ack`/`nack`.

use crate::{
    adapter::{Acknowledger, Delivery, Listener, MqAdapter, Subscription},
    metrics::{MESSAGE_DECISION_TOTAL, MESSAGE_PUBLISH_TOTAL, MESSAGE_REDELIVERY_TOTAL},
    Error, Result,
};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-memory queue adapter (cheap to clone; clones share state)
#[derive(Clone, Default)]
pub struct MemoryMqAdapter {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    topics: Mutex<HashMap<String, TopicState>>,
    next_consumer_id: AtomicU64,
    next_delivery_id: AtomicU64,
}

#[derive(Default)]
struct TopicState {
    consumers: Vec<Arc<Consumer>>,
    held: Vec<String>,
}

struct Consumer {
    id: u64,
    listener: Listener,
    state: Mutex<ConsumerState>,
}

struct ConsumerState {
    active: bool,
    in_flight: Vec<(u64, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Pending,
    Acked,
    Nacked,
}

/// Runtime association between one message and the consumer holding it
struct DeliveryAttempt {
    id: u64,
    topic: String,
    message: String,
    consumer: Arc<Consumer>,
    queue: Arc<Inner>,
    decision: Mutex<Decision>,
}

/// Subscription returned by [`MemoryMqAdapter::consume`]
pub struct MemorySubscription {
    topic: String,
    consumer: Arc<Consumer>,
    queue: Arc<Inner>,
}

impl MemoryMqAdapter {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting for a first consumer on `topic`
    pub fn held_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map_or(0, |state| state.held.len())
    }

    /// Active consumers on `topic`
    pub fn consumer_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map_or(0, |state| state.consumers.len())
    }

    /// Delivered but undecided messages on `topic`
    pub fn in_flight_count(&self, topic: &str) -> usize {
        self.inner.topics.lock().get(topic).map_or(0, |state| {
            state
                .consumers
                .iter()
                .map(|consumer| consumer.state.lock().in_flight.len())
                .sum()
        })
    }
}

impl MqAdapter for MemoryMqAdapter {
    fn publish(&self, topic: &str, message: String) {
        self.inner.publish(topic, message);
    }

    fn consume(&self, topic: &str, listener: Listener) -> Box<dyn Subscription> {
        Box::new(self.inner.consume(topic, listener))
    }
}

impl Inner {
    fn publish(self: &Arc<Self>, topic: &str, message: String) {
        let (consumer, delivery_id) = {
            let mut topics = self.topics.lock();
            let state = topics.entry(topic.to_string()).or_default();

            if state.consumers.is_empty() {
                debug!(topic, held = state.held.len() + 1, "No consumers, holding message");
                state.held.push(message);
                MESSAGE_PUBLISH_TOTAL.with_label_values(&[topic, "held"]).inc();
                return;
            }

            let index = rand::thread_rng().gen_range(0..state.consumers.len());
            let consumer = Arc::clone(&state.consumers[index]);
            let delivery_id = self.next_delivery_id.fetch_add(1, Ordering::Relaxed);

            // Registered under the topic lock so a concurrent unsubscribe
            // either sees this message or never had this consumer selected.
            consumer
                .state
                .lock()
                .in_flight
                .push((delivery_id, message.clone()));

            (consumer, delivery_id)
        };

        MESSAGE_PUBLISH_TOTAL.with_label_values(&[topic, "delivered"]).inc();
        debug!(topic, consumer = consumer.id, delivery = delivery_id, "Delivering message");

        let attempt = Arc::new(DeliveryAttempt {
            id: delivery_id,
            topic: topic.to_string(),
            message: message.clone(),
            consumer: Arc::clone(&consumer),
            queue: Arc::clone(self),
            decision: Mutex::new(Decision::Pending),
        });

        (consumer.listener)(Delivery::new(message, attempt));
    }

    fn consume(self: &Arc<Self>, topic: &str, listener: Listener) -> MemorySubscription {
        let consumer = Arc::new(Consumer {
            id: self.next_consumer_id.fetch_add(1, Ordering::Relaxed),
            listener,
            state: Mutex::new(ConsumerState {
                active: true,
                in_flight: Vec::new(),
            }),
        });

        self.topics
            .lock()
            .entry(topic.to_string())
            .or_default()
            .consumers
            .push(Arc::clone(&consumer));

        info!(topic, consumer = consumer.id, "Consumer subscribed");

        let flush_topic = topic.to_string();
        self.defer(move |queue| queue.flush_held(&flush_topic));

        MemorySubscription {
            topic: topic.to_string(),
            consumer,
            queue: Arc::clone(self),
        }
    }

    /// Re-publish every held message of `topic`
    fn flush_held(self: &Arc<Self>, topic: &str) {
        let held = match self.topics.lock().get_mut(topic) {
            Some(state) => std::mem::take(&mut state.held),
            None => return,
        };

        if !held.is_empty() {
            debug!(topic, count = held.len(), "Flushing held messages");
        }

        for message in held {
            MESSAGE_REDELIVERY_TOTAL
                .with_label_values(&[topic, "flush"])
                .inc();
            self.publish(topic, message);
        }
    }

    fn republish_later(self: &Arc<Self>, topic: &str, messages: Vec<String>, reason: &str) {
        if messages.is_empty() {
            return;
        }

        MESSAGE_REDELIVERY_TOTAL
            .with_label_values(&[topic, reason])
            .inc_by(messages.len() as f64);

        let topic = topic.to_string();
        self.defer(move |queue| {
            for message in messages {
                queue.publish(&topic, message);
            }
        });
    }

    /// Run `task` on the next scheduling tick
    fn defer<F>(self: &Arc<Self>, task: F)
    where
        F: FnOnce(Arc<Inner>) + Send + 'static,
    {
        let queue = Arc::clone(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { task(queue) });
            }
            Err(_) => {
                warn!("No Tokio runtime available, deferring on a helper thread");
                std::thread::spawn(move || task(queue));
            }
        }
    }
}

impl DeliveryAttempt {
    fn settle(&self, decision: Decision) -> Result<()> {
        let mut current = self.decision.lock();
        match *current {
            Decision::Acked => return Err(Error::AlreadyAcked),
            Decision::Nacked => return Err(Error::AlreadyNacked),
            Decision::Pending => {}
        }

        let mut consumer = self.consumer.state.lock();
        if !consumer.active {
            return Err(Error::AlreadyUnsubscribed);
        }
        consumer.in_flight.retain(|(id, _)| *id != self.id);
        *current = decision;
        Ok(())
    }
}

impl Acknowledger for DeliveryAttempt {
    fn ack(&self) -> Result<()> {
        self.settle(Decision::Acked)?;
        MESSAGE_DECISION_TOTAL
            .with_label_values(&[self.topic.as_str(), "ack"])
            .inc();
        debug!(topic = %self.topic, delivery = self.id, "Message acked");
        Ok(())
    }

    fn nack(&self) -> Result<()> {
        self.settle(Decision::Nacked)?;
        MESSAGE_DECISION_TOTAL
            .with_label_values(&[self.topic.as_str(), "nack"])
            .inc();
        debug!(topic = %self.topic, delivery = self.id, "Message nacked, scheduling redelivery");
        self.queue
            .republish_later(&self.topic, vec![self.message.clone()], "nack");
        Ok(())
    }
}

impl Subscription for MemorySubscription {
    fn unsubscribe(&self) -> Result<()> {
        let undecided = {
            let mut topics = self.queue.topics.lock();
            let state = topics.entry(self.topic.clone()).or_default();
            let position = state
                .consumers
                .iter()
                .position(|consumer| consumer.id == self.consumer.id)
                .ok_or(Error::AlreadyUnsubscribed)?;
            state.consumers.remove(position);

            let mut consumer = self.consumer.state.lock();
            consumer.active = false;
            std::mem::take(&mut consumer.in_flight)
        };

        info!(
            topic = %self.topic,
            consumer = self.consumer.id,
            undecided = undecided.len(),
            "Consumer unsubscribed"
        );

        let messages = undecided.into_iter().map(|(_, message)| message).collect();
        self.queue
            .republish_later(&self.topic, messages, "unsubscribe");
        Ok(())
    }
}
