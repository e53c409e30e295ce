//! Live notification registry.
//!
//! Tracks the set of live WebSocket channels per authenticated user and
//! fans order-status events out to them. The registry is an injected service
//! object constructed once at startup and shared through [`crate::state::AppState`];
//! nothing reaches it through a global.
//!
//! State here is process-local and ephemeral: it is lost on restart, which is
//! acceptable because this is a best-effort side channel, not a durable queue.
//! Delivery is fire-and-forget - a dead channel is disconnected and the event
//! is simply not seen by that session.
//!
//! Each channel is represented by the sending half of an unbounded mpsc
//! queue. The WebSocket side drains the queue on a dedicated task, which
//! keeps per-channel delivery ordered and decouples pushing (which never
//! blocks) from the socket write path (which may be slow and is bounded by a
//! timeout there).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;

use minimart_core::{Email, OrderId, OrderStatus};

/// An event pushed to connected clients.
///
/// Serializes as `{"type": "order_update", "order_id": "...", "new_status": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// An order's status changed.
    OrderUpdate {
        order_id: OrderId,
        new_status: OrderStatus,
    },
}

/// Identifies one live channel within its user's set.
///
/// A user may hold several channels at once (one per browser tab); the ID
/// lets disconnect target exactly the channel that died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelId(uuid::Uuid);

impl ChannelId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The sending half handed to the registry for each accepted channel.
pub type EventSender = mpsc::UnboundedSender<PushEvent>;

#[derive(Debug)]
struct Channel {
    id: ChannelId,
    tx: EventSender,
}

/// Registry of live notification channels, keyed by user identity.
#[derive(Debug, Default)]
pub struct NotificationRegistry {
    channels: Mutex<HashMap<Email, Vec<Channel>>>,
}

impl NotificationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly authenticated channel for `email`.
    ///
    /// Returns the ID the caller must hand back to [`Self::unsubscribe`]
    /// when the channel dies.
    pub fn subscribe(&self, email: &Email, tx: EventSender) -> ChannelId {
        let id = ChannelId::generate();
        let mut channels = self.lock();
        channels
            .entry(email.clone())
            .or_default()
            .push(Channel { id, tx });
        tracing::debug!(user = %email, "notification channel registered");
        id
    }

    /// Remove one channel from its user's set.
    ///
    /// Idempotent: unknown users and already-removed channels are no-ops.
    /// When the last channel for a user goes away, the user's entry is
    /// dropped entirely so the map never accumulates empty sets.
    pub fn unsubscribe(&self, email: &Email, id: ChannelId) {
        let mut channels = self.lock();
        if let Some(set) = channels.get_mut(email) {
            set.retain(|c| c.id != id);
            if set.is_empty() {
                channels.remove(email);
            }
            tracing::debug!(user = %email, "notification channel removed");
        }
    }

    /// Deliver `event` to every live channel registered for `email`.
    ///
    /// Fire-and-forget: a user with no channels is silently a no-op, and a
    /// channel whose send fails is disconnected without affecting delivery
    /// to the user's other channels. Never reports failure to the caller.
    pub fn push(&self, email: &Email, event: &PushEvent) {
        // Snapshot under the lock, send outside it, so a concurrent
        // disconnect cannot invalidate the iteration.
        let snapshot: Vec<(ChannelId, EventSender)> = {
            let channels = self.lock();
            match channels.get(email) {
                Some(set) => set.iter().map(|c| (c.id, c.tx.clone())).collect(),
                None => return,
            }
        };

        for (id, tx) in snapshot {
            if tx.send(event.clone()).is_err() {
                tracing::debug!(user = %email, "dropping dead notification channel");
                self.unsubscribe(email, id);
            }
        }
    }

    /// Number of live channels currently registered for `email`.
    #[must_use]
    pub fn channel_count(&self, email: &Email) -> usize {
        self.lock().get(email).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Email, Vec<Channel>>> {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn has_entry(&self, email: &Email) -> bool {
        self.lock().contains_key(email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn sample_event() -> PushEvent {
        PushEvent::OrderUpdate {
            order_id: OrderId::generate(),
            new_status: OrderStatus::Shipped,
        }
    }

    #[tokio::test]
    async fn test_push_fans_out_to_all_channels() {
        let registry = NotificationRegistry::new();
        let user = email("a@example.com");

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.subscribe(&user, tx1);
        registry.subscribe(&user, tx2);

        let event = sample_event();
        registry.push(&user, &event);

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_push_to_unknown_user_is_noop() {
        let registry = NotificationRegistry::new();
        // Must not panic or error.
        registry.push(&email("ghost@example.com"), &sample_event());
    }

    #[tokio::test]
    async fn test_dead_channel_is_removed_without_affecting_others() {
        let registry = NotificationRegistry::new();
        let user = email("a@example.com");

        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        registry.subscribe(&user, tx_dead);
        registry.subscribe(&user, tx_live);

        // Simulate a client that went away: its receiving half is gone.
        drop(rx_dead);

        let event = sample_event();
        registry.push(&user, &event);

        assert_eq!(rx_live.recv().await.unwrap(), event);
        assert_eq!(registry.channel_count(&user), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let registry = NotificationRegistry::new();
        let user = email("a@example.com");

        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.subscribe(&user, tx);

        registry.unsubscribe(&user, id);
        // Second removal of the same channel, and removal for a user with
        // no entry at all: both must be silent no-ops.
        registry.unsubscribe(&user, id);
        registry.unsubscribe(&email("ghost@example.com"), id);

        assert_eq!(registry.channel_count(&user), 0);
    }

    #[tokio::test]
    async fn test_no_leaked_empty_sets() {
        let registry = NotificationRegistry::new();
        let user = email("a@example.com");

        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.subscribe(&user, tx);
        assert!(registry.has_entry(&user));

        registry.unsubscribe(&user, id);
        assert!(!registry.has_entry(&user));
    }

    #[tokio::test]
    async fn test_events_arrive_in_push_order_per_channel() {
        let registry = NotificationRegistry::new();
        let user = email("a@example.com");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.subscribe(&user, tx);

        let order_id = OrderId::generate();
        let statuses = [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ];
        for status in statuses {
            registry.push(
                &user,
                &PushEvent::OrderUpdate {
                    order_id,
                    new_status: status,
                },
            );
        }

        for expected in statuses {
            match rx.recv().await.unwrap() {
                PushEvent::OrderUpdate { new_status, .. } => assert_eq!(new_status, expected),
            }
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let order_id = OrderId::generate();
        let event = PushEvent::OrderUpdate {
            order_id,
            new_status: OrderStatus::Shipped,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "order_update");
        assert_eq!(value["order_id"], order_id.to_string());
        assert_eq!(value["new_status"], "shipped");
    }
}
