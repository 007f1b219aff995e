//! Per-order serialisation of orchestrated operations

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::OrderId;

/// Keyed async locks, one per order id
///
/// Holding the guard returned by [`OrderLocks::lock`] excludes every other
/// orchestrated operation on the same order. Operations on different
/// orders never contend. Idle slots are pruned on each acquisition.
#[derive(Debug, Default)]
pub struct OrderLocks {
    slots: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`
    pub async fn lock(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            // A slot referenced only by the map has no holder and no waiter
            slots.retain(|id, slot| *id == order_id || Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(order_id).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of slots currently tracked
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
