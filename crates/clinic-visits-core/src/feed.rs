//! Live change feed for the visit table.
//!
//! A store publishes one [`ChangeEvent`] per committed mutation. Each
//! [`Subscription`] receives events in publish order; dropping it (or calling
//! [`Subscription::unsubscribe`]) detaches it from the feed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Deserialize;
use thiserror::Error;

use crate::models::VisitRecord;

/// Errors decoding a realtime payload.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid change payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown change event type: {0}")]
    UnknownEvent(String),

    #[error("change payload has no {0} row")]
    MissingRow(&'static str),
}

/// A single committed change to the visit table, carrying raw rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(VisitRecord),
    Update(VisitRecord),
    Delete { id: String },
}

#[derive(Deserialize)]
struct RealtimePayload {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    new: serde_json::Value,
    #[serde(default)]
    old: serde_json::Value,
}

#[derive(Deserialize)]
struct OldRow {
    id: String,
}

fn non_empty(value: serde_json::Value) -> Option<serde_json::Value> {
    match &value {
        serde_json::Value::Null => None,
        serde_json::Value::Object(map) if map.is_empty() => None,
        _ => Some(value),
    }
}

impl ChangeEvent {
    /// Decode a realtime payload of the form
    /// `{"eventType": "INSERT" | "UPDATE" | "DELETE", "new": {..}, "old": {..}}`.
    pub fn from_payload_json(json: &str) -> Result<Self, FeedError> {
        let payload: RealtimePayload = serde_json::from_str(json)?;

        match payload.event_type.as_str() {
            "INSERT" => {
                let row = non_empty(payload.new).ok_or(FeedError::MissingRow("new"))?;
                Ok(ChangeEvent::Insert(serde_json::from_value(row)?))
            }
            "UPDATE" => {
                let row = non_empty(payload.new).ok_or(FeedError::MissingRow("new"))?;
                Ok(ChangeEvent::Update(serde_json::from_value(row)?))
            }
            "DELETE" => {
                let row = non_empty(payload.old).ok_or(FeedError::MissingRow("old"))?;
                let old: OldRow = serde_json::from_value(row)?;
                Ok(ChangeEvent::Delete { id: old.id })
            }
            other => Err(FeedError::UnknownEvent(other.to_string())),
        }
    }

    /// Id of the affected visit.
    pub fn visit_id(&self) -> &str {
        match self {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => &record.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}

/// Fan-out of change events to live subscriptions.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<(u64, Sender<ChangeEvent>)>>,
    next_id: AtomicU64,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(u64, Sender<ChangeEvent>)>> {
        // A panicked publisher leaves the list itself intact.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a new subscription.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel();
        self.subscribers().push((id, sender));
        tracing::debug!(subscription = id, "change feed subscription opened");

        Subscription {
            id,
            receiver,
            feed: Arc::downgrade(self),
        }
    }

    /// Deliver an event to every live subscription.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers();
        subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn detach(&self, id: u64) {
        self.subscribers().retain(|(sub_id, _)| *sub_id != id);
        tracing::debug!(subscription = id, "change feed subscription closed");
    }
}

/// Receiving end of a [`ChangeFeed`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<ChangeEvent>,
    feed: Weak<ChangeFeed>,
}

impl Subscription {
    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// All pending events, in arrival order.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Detach from the feed.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.detach(self.id);
        }
    }
}
