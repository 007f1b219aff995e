//! Order change notifications
//!
//! Every successful orchestrated operation publishes an [`OrderChanged`]
//! event. Observers such as caches, dashboards and reports subscribe to it
//! instead of being invalidated by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use core_kernel::OrderId;
use domain_sales::OrderStatus;

use crate::engine::LedgerActionKind;

/// What happened to the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderChange {
    Created,
    StatusChanged { from: OrderStatus, to: OrderStatus },
    Edited,
    Deleted,
    Resynced,
}

/// Emitted after an order or its derived ledger entry changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanged {
    pub order_id: OrderId,
    pub change: OrderChange,
    pub ledger_action: LedgerActionKind,
    pub occurred_at: DateTime<Utc>,
}

impl OrderChanged {
    pub fn new(order_id: OrderId, change: OrderChange, ledger_action: LedgerActionKind) -> Self {
        Self {
            order_id,
            change,
            ledger_action,
            occurred_at: Utc::now(),
        }
    }
}

/// Sink for order change events
pub trait EventPublisher: Send + Sync {
    /// Publishes an event; never blocks and never fails the caller
    fn publish(&self, event: OrderChanged);
}

/// Publisher backed by a tokio broadcast channel
///
/// Slow subscribers miss events once the channel buffer is full; they see
/// a `Lagged` error on their next receive.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<OrderChanged>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChanged> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: OrderChanged) {
        if self.sender.send(event).is_err() {
            trace!("no subscribers for order change event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        let order_id = OrderId::new();

        publisher.publish(OrderChanged::new(order_id, OrderChange::Deleted, LedgerActionKind::Delete));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.order_id, order_id);
        assert_eq!(event.change, OrderChange::Deleted);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let publisher = BroadcastPublisher::new(1);
        publisher.publish(OrderChanged::new(OrderId::new(), OrderChange::Created, LedgerActionKind::NoOp));
    }

    #[test]
    fn test_event_json_shape() {
        let event = OrderChanged::new(
            OrderId::new(),
            OrderChange::StatusChanged { from: OrderStatus::Pending, to: OrderStatus::Delivered },
            LedgerActionKind::Create,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["change"]["type"], "status_changed");
        assert_eq!(json["change"]["to"], "delivered");
        assert_eq!(json["ledger_action"], "create");
    }
}
