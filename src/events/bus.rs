//! Bounded-queue pub/sub event bus (`spec.md` §4.F).
//!
//! Backed by `tokio::sync::broadcast`: every subscriber gets its own lagged
//! cursor into the ring buffer, so one slow WebSocket client cannot starve
//! another. A subscriber that falls behind the queue depth drops the
//! oldest events rather than blocking publishers — broadcast reports this
//! as `RecvError::Lagged`, counted below rather than propagated as an
//! error to callers that don't care about exact sequencing.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Typed runtime events, serialized as `{"type": "...", ...fields}` over
/// the WebSocket transport (`spec.md` §4.F, §4.G).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ProjectAdded { slug: String },
    ProjectRemoved { slug: String },
    PageAdded { project_slug: String, page_name: String },
    PageUpdated { project_slug: String, page_name: String },
    PageImageReady { project_slug: String, page_name: String, filename: String },
    RegionComplete { project_slug: String, page_name: String, region_id: String },
    WorkspaceUpdated { project_slug: String, workspace_slug: String },
    ScheduleUpdated { project_slug: String },
    NotesUpdated { project_slug: String },
    HeartbeatUpdated { project_slug: String },
    DirectiveChanged { directive_id: String },
}

/// Process-wide event bus. Cheap to clone; all clones share the same
/// broadcast channel and backpressure counter.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// `capacity` is the per-subscriber queue depth
    /// (`MAESTRO_EVENT_QUEUE_DEPTH`, default 256).
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        EventBus {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event to every current subscriber. A full channel with
    /// zero subscribers is not an error — events are simply discarded.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Total events dropped across all subscribers due to backpressure,
    /// exposed for observability (`spec.md` §4.F edge cases).
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A single subscriber's view into the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    dropped: Arc<AtomicU64>,
}

impl Subscription {
    /// Await the next event, transparently skipping past any events lost
    /// to lag and counting them in the shared backpressure counter.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped.fetch_add(skipped, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();
        bus.publish(Event::ProjectAdded { slug: "alpha".into() });
        let event = sub.recv().await.unwrap();
        matches!(event, Event::ProjectAdded { slug } if slug == "alpha");
    }

    #[tokio::test]
    async fn overflow_counts_as_dropped_not_an_error() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for i in 0..10 {
            bus.publish(Event::ScheduleUpdated { project_slug: format!("p{i}") });
        }
        let _ = sub.recv().await;
        assert!(bus.dropped_count() > 0);
    }

    #[tokio::test]
    async fn no_subscribers_does_not_error() {
        let bus = EventBus::new(4);
        bus.publish(Event::NotesUpdated { project_slug: "alpha".into() });
    }
}
