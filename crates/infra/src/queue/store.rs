//! Order queue storage contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use ordersync_core::{ExternalOrderId, OrderId};
use ordersync_orders::{LocalOrder, SyncStatus};

/// Persisted collection of local orders awaiting (or done with) synchronization.
///
/// Implementations must make [`claim`](OrderQueueStore::claim) atomic: of any
/// number of concurrent callers for the same order, exactly one sees `true`.
#[async_trait]
pub trait OrderQueueStore: Send + Sync {
    /// Up to `limit` orders in `Pending` status, oldest first.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LocalOrder>, QueueStoreError>;

    /// Load a single order regardless of status.
    async fn get(&self, order_id: OrderId) -> Result<Option<LocalOrder>, QueueStoreError>;

    /// Move a `Pending` order to `Processing`. Returns `false` if it was not pending.
    async fn claim(&self, order_id: OrderId) -> Result<bool, QueueStoreError>;

    async fn mark_submitted(
        &self,
        order_id: OrderId,
        external_id: Option<ExternalOrderId>,
    ) -> Result<(), QueueStoreError>;

    async fn mark_failed(&self, order_id: OrderId, reason: &str) -> Result<(), QueueStoreError>;

    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), QueueStoreError>;
}

/// Order queue store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueStoreError {
    #[error("order not found: {0}")]
    NotFound(OrderId),
    #[error("order {order_id}: illegal status transition {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: SyncStatus,
        to: SyncStatus,
    },
    #[error("order already queued: {0}")]
    AlreadyExists(OrderId),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// In-memory order queue for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderQueueStore {
    orders: RwLock<HashMap<OrderId, LocalOrder>>,
}

impl InMemoryOrderQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add an order to the queue as-is.
    pub fn enqueue(&self, order: LocalOrder) -> Result<OrderId, QueueStoreError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(&order.id) {
            return Err(QueueStoreError::AlreadyExists(order.id));
        }
        let id = order.id;
        orders.insert(id, order);
        Ok(id)
    }

    /// Current status of an order, if known.
    pub fn status(&self, order_id: OrderId) -> Option<SyncStatus> {
        self.orders.read().unwrap().get(&order_id).map(|o| o.status)
    }

    fn apply(
        &self,
        order_id: OrderId,
        to: SyncStatus,
        update: impl FnOnce(&mut LocalOrder),
    ) -> Result<(), QueueStoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(&order_id)
            .ok_or(QueueStoreError::NotFound(order_id))?;

        let from = order.status;
        order.status = from
            .transition(to)
            .map_err(|_| QueueStoreError::InvalidTransition { order_id, from, to })?;
        update(order);
        Ok(())
    }
}

#[async_trait]
impl OrderQueueStore for InMemoryOrderQueueStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LocalOrder>, QueueStoreError> {
        let orders = self.orders.read().unwrap();
        let mut pending: Vec<_> = orders
            .values()
            .filter(|o| o.status == SyncStatus::Pending)
            .cloned()
            .collect();

        // FIFO; ids are time-ordered and break ties between equal timestamps.
        pending.sort_by_key(|o| (o.created_at, o.id));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<LocalOrder>, QueueStoreError> {
        Ok(self.orders.read().unwrap().get(&order_id).cloned())
    }

    async fn claim(&self, order_id: OrderId) -> Result<bool, QueueStoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(&order_id)
            .ok_or(QueueStoreError::NotFound(order_id))?;

        if order.status != SyncStatus::Pending {
            return Ok(false);
        }
        order.status = SyncStatus::Processing;
        Ok(true)
    }

    async fn mark_submitted(
        &self,
        order_id: OrderId,
        external_id: Option<ExternalOrderId>,
    ) -> Result<(), QueueStoreError> {
        self.apply(order_id, SyncStatus::Submitted, |order| {
            if external_id.is_some() {
                order.external_id = external_id;
            }
            order.failure_reason = None;
        })
    }

    async fn mark_failed(&self, order_id: OrderId, reason: &str) -> Result<(), QueueStoreError> {
        self.apply(order_id, SyncStatus::Failed, |order| {
            order.failure_reason = Some(reason.to_string());
        })
    }

    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), QueueStoreError> {
        self.apply(order_id, SyncStatus::Cancelled, |_| {})
    }
}

#[async_trait]
impl<S: OrderQueueStore + ?Sized> OrderQueueStore for Arc<S> {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LocalOrder>, QueueStoreError> {
        (**self).fetch_pending(limit).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<LocalOrder>, QueueStoreError> {
        (**self).get(order_id).await
    }

    async fn claim(&self, order_id: OrderId) -> Result<bool, QueueStoreError> {
        (**self).claim(order_id).await
    }

    async fn mark_submitted(
        &self,
        order_id: OrderId,
        external_id: Option<ExternalOrderId>,
    ) -> Result<(), QueueStoreError> {
        (**self).mark_submitted(order_id, external_id).await
    }

    async fn mark_failed(&self, order_id: OrderId, reason: &str) -> Result<(), QueueStoreError> {
        (**self).mark_failed(order_id, reason).await
    }

    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), QueueStoreError> {
        (**self).mark_cancelled(order_id).await
    }
}
