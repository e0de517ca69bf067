//! Per-account event bus
//!
//! Each account gets its own broadcast topic. Device entities subscribe on
//! creation and drop their [`Subscription`] on removal; the push transport
//! publishes every decoded event to the topic of the account it belongs to.

use std::fmt;

use alexa_api::hide_email;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::command::PushCommand;
use crate::events::PushEvent;

/// Longest topic name the bus will produce
const MAX_TOPIC_LEN: usize = 32;

/// Default buffer for each topic before slow receivers start lagging
const DEFAULT_CAPACITY: usize = 256;

/// Name of an account's topic on the bus
///
/// Built from the obfuscated account email so topic names can appear in
/// logs as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountTopic(String);

impl AccountTopic {
    /// Topic for the account owning `email`
    pub fn for_account(email: &str) -> Self {
        let name: String = format!("alexa_media_{}", hide_email(email))
            .chars()
            .take(MAX_TOPIC_LEN)
            .collect();
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event together with the command kind that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct PushEnvelope {
    pub command: PushCommand,
    pub event: PushEvent,
}

impl PushEnvelope {
    pub fn new(command: PushCommand, event: PushEvent) -> Self {
        Self { command, event }
    }
}

/// Broadcast bus keyed by account topic
pub struct EventBus {
    topics: DashMap<AccountTopic, broadcast::Sender<PushEnvelope>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus whose topics buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a topic, creating it on first use
    pub fn subscribe(&self, topic: &AccountTopic) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(topic = %topic, "Subscribed to account topic");
        Subscription {
            topic: topic.clone(),
            receiver,
        }
    }

    /// Publish an envelope, returning how many subscribers received it
    pub fn publish(&self, topic: &AccountTopic, envelope: PushEnvelope) -> usize {
        let Some(sender) = self.topics.get(topic) else {
            trace!(topic = %topic, "No subscribers for topic, dropping event");
            return 0;
        };
        match sender.send(envelope) {
            Ok(count) => count,
            Err(_) => {
                trace!(topic = %topic, "All subscribers gone, dropping event");
                0
            }
        }
    }

    /// Number of live subscriptions on a topic
    pub fn subscriber_count(&self, topic: &AccountTopic) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription to one account topic
///
/// Dropping it unsubscribes.
pub struct Subscription {
    topic: AccountTopic,
    receiver: broadcast::Receiver<PushEnvelope>,
}

impl Subscription {
    pub fn topic(&self) -> &AccountTopic {
        &self.topic
    }

    /// Wait for the next envelope
    ///
    /// Returns `None` once the bus side of the topic is gone. Events missed
    /// because this receiver fell behind are skipped with a warning.
    pub async fn recv(&mut self) -> Option<PushEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
