//! Change notification for queue observers.
//!
//! After every mutating lifecycle operation, the controller publishes a
//! [`QueueSnapshot`] to all subscribers. Delivery is fire-and-forget over
//! bounded channels: publishing never blocks the transaction that just
//! committed, a full subscriber misses that snapshot, and a disconnected
//! subscriber is pruned on the next publish.

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::QueueSnapshot;

/// Handle identifying a subscription.
pub type SubscriberId = Uuid;

/// Per-subscriber channel capacity. Observers that fall this far behind
/// start missing intermediate snapshots; the next publish catches them up.
const CHANNEL_CAPACITY: usize = 16;

/// Publishes queue snapshots to interested observers.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: HashMap<SubscriberId, mpsc::Sender<QueueSnapshot>>,
}

impl ChangeNotifier {
    /// Create a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer, priming its channel with `initial` so it
    /// does not have to wait for the next mutation to learn the queue
    /// state.
    pub fn subscribe(&mut self, initial: QueueSnapshot) -> (SubscriberId, mpsc::Receiver<QueueSnapshot>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        // capacity is nonzero and the receiver is alive, so this cannot fail
        let _ = tx.try_send(initial);
        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber = %id, total = self.subscribers.len(), "observer subscribed");
        (id, rx)
    }

    /// Remove an observer. Dropping the receiver has the same effect at the
    /// next publish.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = %id, "observer unsubscribed");
        }
    }

    /// Best-effort delivery of `snapshot` to every subscriber.
    pub fn publish(&mut self, snapshot: &QueueSnapshot) {
        self.subscribers.retain(|id, tx| {
            match tx.try_send(snapshot.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = %id, "observer lagging, snapshot dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = %id, "observer disconnected, pruning");
                    false
                }
            }
        });
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
