//! Process-wide event bus (C1). Topic-filtered pub/sub of [`StatusEvent`]
//! values with a bounded, drop-on-full delivery policy per subscriber.
//!
//! Grounded on the teacher's `Worker`/`TaskRouter` pair (per-key `Sender`
//! map behind an `RwLock`, bounded mpsc channel), simplified to a flat
//! subscriber map since this bus fans out to many independent readers
//! rather than routing work to a single task per key.

use std::collections::HashMap;
use std::sync::Arc;

use nebula_core::{ProjectId, StatusEvent};
use tokio::sync::{mpsc, RwLock};
use tracing::trace;

/// Bounded FIFO channel capacity per subscription. §4.1.
pub const SUBSCRIPTION_CAPACITY: usize = 100;

pub type SubscriberId = String;

struct Subscriber {
    sender: mpsc::Sender<StatusEvent>,
    /// `None` means match-all.
    project_filter: Option<ProjectId>,
}

/// A live subscription handle. Drop it (or call [`EventBus::unsubscribe`])
/// to stop receiving events.
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<StatusEvent>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// §4.1 `Subscribe`. An empty/`None` `project_filter` matches every
    /// event.
    pub async fn subscribe(
        &self,
        subscriber_id: impl Into<SubscriberId>,
        project_filter: Option<ProjectId>,
    ) -> Subscription {
        let id = subscriber_id.into();
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.subscribers.write().await.insert(
            id.clone(),
            Subscriber {
                sender,
                project_filter,
            },
        );
        Subscription { id, receiver }
    }

    /// §4.1 `Unsubscribe`. Idempotent: unsubscribing an unknown id is a
    /// no-op.
    pub async fn unsubscribe(&self, subscriber_id: &str) {
        self.subscribers.write().await.remove(subscriber_id);
    }

    /// §4.1 `Publish`. Never blocks: a full or closed subscriber channel
    /// silently drops the event for that subscriber (the slow-consumer
    /// policy). Holds only the read lock.
    pub async fn publish(&self, event: StatusEvent) {
        let subscribers = self.subscribers.read().await;
        for (id, subscriber) in subscribers.iter() {
            if !matches(subscriber, &event) {
                continue;
            }
            if subscriber.sender.try_send(event.clone()).is_err() {
                trace!(subscriber = %id, "dropping event for slow or closed subscriber");
            }
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

fn matches(subscriber: &Subscriber, event: &StatusEvent) -> bool {
    nebula_core::matches_filter(event, subscriber.project_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nebula_core::EventKind;

    fn event(project_id: ProjectId) -> StatusEvent {
        StatusEvent::new(EventKind::DeploymentStatus, project_id, "running", Utc::now())
    }

    #[tokio::test]
    async fn subscriber_receives_matching_events() {
        let bus = EventBus::new();
        let project = ProjectId::new();
        let mut sub = bus.subscribe("sub-1", Some(project)).await;

        bus.publish(event(project)).await;
        bus.publish(event(ProjectId::new())).await;

        let received = sub.receiver.recv().await.unwrap();
        assert_eq!(received.project_id, project);
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_filter_matches_every_project() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("sub-1", None).await;

        bus.publish(event(ProjectId::new())).await;
        bus.publish(event(ProjectId::new())).await;

        assert!(sub.receiver.recv().await.is_some());
        assert!(sub.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let bus = EventBus::new();
        let project = ProjectId::new();
        let sub = bus.subscribe("sub-1", Some(project)).await;
        bus.unsubscribe(&sub.id).await;
        bus.unsubscribe(&sub.id).await; // second call must not panic

        assert_eq!(bus.subscriber_count().await, 0);
    }

    /// Property 7 (§8): a slow subscriber's full channel causes drops, not
    /// a blocked publisher — publishing past capacity must still return.
    #[tokio::test]
    async fn full_channel_drops_events_without_blocking_publisher() {
        let bus = EventBus::new();
        let project = ProjectId::new();
        let sub = bus.subscribe("sub-1", Some(project)).await;

        for _ in 0..(SUBSCRIPTION_CAPACITY + 10) {
            bus.publish(event(project)).await;
        }

        drop(sub); // never drained; if publish blocked, the loop above would hang
    }

    #[tokio::test]
    async fn events_arrive_in_publication_order_per_subscriber() {
        let bus = EventBus::new();
        let project = ProjectId::new();
        let mut sub = bus.subscribe("sub-1", Some(project)).await;

        for i in 0..5 {
            let mut e = event(project);
            e.payload = i.to_string();
            bus.publish(e).await;
        }

        for i in 0..5 {
            let received = sub.receiver.recv().await.unwrap();
            assert_eq!(received.payload, i.to_string());
        }
    }
}
