//! Per-draft publish/subscribe.
//!
//! The protocol logic never talks to sockets. It publishes post-mutation
//! events to a [`DraftChannel`], and whatever transport sits above
//! subscribes on behalf of its connections.

use std::collections::HashMap;
use std::sync::Mutex;

use civdraft_draft::Draft;
use civdraft_protocol::{DraftId, ServerEvent};
use tokio::sync::broadcast;

/// An event as delivered to connections.
pub type Outbound = ServerEvent<Draft>;

/// Capacity of each draft's broadcast buffer. A subscriber that falls
/// further behind skips to the newest events; every `set gamestate`
/// carries the full state, so nothing is lost by skipping.
const CHANNEL_CAPACITY: usize = 32;

/// Fan-out of a draft's events to every subscribed connection.
pub trait DraftChannel: Send + Sync + 'static {
    /// Delivers `event` to every current subscriber of `draft_id`.
    fn publish(&self, draft_id: &DraftId, event: Outbound);

    /// Subscribes to `draft_id`. Only events published after this call
    /// are received.
    fn subscribe(&self, draft_id: &DraftId) -> broadcast::Receiver<Outbound>;

    /// Number of live subscriptions to `draft_id`.
    fn subscriber_count(&self, draft_id: &DraftId) -> usize;
}

/// A [`DraftChannel`] backed by one `tokio::sync::broadcast` channel per
/// draft.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    channels: Mutex<HashMap<DraftId, broadcast::Sender<Outbound>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drafts that currently have at least one subscriber.
    pub fn active_drafts(&self) -> usize {
        self.lock()
            .values()
            .filter(|sender| sender.receiver_count() > 0)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DraftId, broadcast::Sender<Outbound>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DraftChannel for BroadcastHub {
    fn publish(&self, draft_id: &DraftId, event: Outbound) {
        let mut channels = self.lock();
        let Some(sender) = channels.get(draft_id) else {
            return;
        };
        // `send` only fails when nobody is listening any more.
        if sender.send(event).is_err() {
            channels.remove(draft_id);
        }
    }

    fn subscribe(&self, draft_id: &DraftId) -> broadcast::Receiver<Outbound> {
        self.lock()
            .entry(draft_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn subscriber_count(&self, draft_id: &DraftId) -> usize {
        self.lock()
            .get(draft_id)
            .map_or(0, |sender| sender.receiver_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_of_that_draft() {
        let hub = BroadcastHub::new();
        let a = DraftId::new("1");
        let b = DraftId::new("2");
        let mut first = hub.subscribe(&a);
        let mut second = hub.subscribe(&a);
        let mut other = hub.subscribe(&b);

        hub.publish(&a, ServerEvent::Bug);

        assert_eq!(first.recv().await.unwrap(), ServerEvent::Bug);
        assert_eq!(second.recv().await.unwrap(), ServerEvent::Bug);
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let hub = BroadcastHub::new();
        let id = DraftId::new("3");
        hub.publish(&id, ServerEvent::Bug);
        assert_eq!(hub.active_drafts(), 0);

        let receiver = hub.subscribe(&id);
        assert_eq!(hub.active_drafts(), 1);
        assert_eq!(hub.subscriber_count(&id), 1);
        drop(receiver);
        assert_eq!(hub.subscriber_count(&id), 0);
        hub.publish(&id, ServerEvent::Bug);
        assert_eq!(hub.active_drafts(), 0);
    }
}
