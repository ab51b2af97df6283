//! Order synchronization processor.
//!
//! Orchestrates fetch → claim → transform → submit → status write, one order at
//! a time. A failing order never aborts the batch; only a failure to fetch the
//! batch itself is surfaced to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use ordersync_core::{ExternalOrderId, OrderId};
use ordersync_orders::{
    CanonicalPayload, LocalOrder, OrderTransformer, RegionDirectory, StoreConfig,
    StoreConfigProvider, SyncStatus,
};

use crate::queue::{OrderQueueStore, QueueStoreError};
use crate::remote::{CancelOutcome, OrderTransport, RemoteError, RemoteOrderClient};

/// Default number of orders fetched per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The batch could not be fetched; nothing was processed.
    #[error("failed to fetch pending orders: {0}")]
    Fetch(#[source] QueueStoreError),
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),
    #[error("order {order_id} cannot be cancelled in status {status}")]
    NotCancellable { order_id: OrderId, status: SyncStatus },
    #[error("order {0} has no remote order id")]
    MissingExternalId(OrderId),
    #[error("remote order not found: {0}")]
    OrderNotFound(ExternalOrderId),
    #[error(transparent)]
    Store(#[from] QueueStoreError),
    #[error(transparent)]
    Remote(RemoteError),
}

/// Tally of one `process_pending` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub fetched: usize,
    pub submitted: usize,
    pub failed: usize,
    /// Claimed by another worker between fetch and claim.
    pub skipped: usize,
    /// Claim or status write failed; the order's status is whatever the store kept.
    pub store_errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderOutcome {
    Submitted,
    Failed,
    Skipped,
    StoreError,
}

/// Synchronizes pending local orders with the fulfillment service.
pub struct OrderSyncProcessor<S, T> {
    store: S,
    client: RemoteOrderClient<T>,
    store_config: Arc<dyn StoreConfigProvider>,
    regions: Arc<dyn RegionDirectory>,
    transformer: OrderTransformer,
    batch_size: usize,
}

impl<S: OrderQueueStore, T: OrderTransport> OrderSyncProcessor<S, T> {
    pub fn new(
        store: S,
        transport: T,
        store_config: Arc<dyn StoreConfigProvider>,
        regions: Arc<dyn RegionDirectory>,
    ) -> Self {
        Self {
            store,
            client: RemoteOrderClient::new(transport),
            store_config,
            regions,
            transformer: OrderTransformer::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process up to `batch_size` pending orders, oldest first.
    pub async fn process_pending(&self) -> Result<BatchReport, SyncError> {
        let orders = self
            .store
            .fetch_pending(self.batch_size)
            .await
            .map_err(SyncError::Fetch)?;

        let mut report = BatchReport {
            fetched: orders.len(),
            ..BatchReport::default()
        };

        for order in &orders {
            let span = info_span!("sync_order", order_id = %order.id, reference = %order.increment_id);
            match self.process_order(order).instrument(span).await {
                OrderOutcome::Submitted => report.submitted += 1,
                OrderOutcome::Failed => report.failed += 1,
                OrderOutcome::Skipped => report.skipped += 1,
                OrderOutcome::StoreError => report.store_errors += 1,
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                submitted = report.submitted,
                failed = report.failed,
                skipped = report.skipped,
                store_errors = report.store_errors,
                "order batch processed"
            );
        } else {
            debug!("no pending orders");
        }

        Ok(report)
    }

    async fn process_order(&self, order: &LocalOrder) -> OrderOutcome {
        match self.store.claim(order.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("order already claimed; skipping");
                return OrderOutcome::Skipped;
            }
            Err(e) => {
                warn!(error = %e, "failed to claim order");
                return OrderOutcome::StoreError;
            }
        }

        let attempt = match self.prepare(order) {
            Ok(payload) => self
                .client
                .submit_order(&payload)
                .await
                .map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };

        let written = match attempt {
            Ok(result) => {
                debug!(external_id = ?result.external_id, "order submitted");
                self.store
                    .mark_submitted(order.id, result.external_id)
                    .await
                    .map(|_| OrderOutcome::Submitted)
            }
            Err(reason) => {
                warn!(%reason, "order submission failed");
                self.store
                    .mark_failed(order.id, &reason)
                    .await
                    .map(|_| OrderOutcome::Failed)
            }
        };

        written.unwrap_or_else(|e| {
            error!(error = %e, "failed to record order outcome");
            OrderOutcome::StoreError
        })
    }

    fn prepare(&self, order: &LocalOrder) -> Result<CanonicalPayload, String> {
        let config = StoreConfig::resolve(
            self.store_config.as_ref(),
            self.regions.as_ref(),
            order.store_scope,
        )
        .map_err(|e| e.to_string())?;

        self.transformer
            .transform(order, &config)
            .map_err(|e| e.to_string())
    }

    /// Cancel a submitted order remotely and record the result.
    ///
    /// Returns `Ok(true)` when the remote accepted the cancellation (the order is
    /// now `Cancelled`), `Ok(false)` when it declined (status unchanged).
    pub async fn cancel(&self, order_id: OrderId) -> Result<bool, SyncError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(SyncError::UnknownOrder(order_id))?;

        if order.status != SyncStatus::Submitted {
            return Err(SyncError::NotCancellable {
                order_id,
                status: order.status,
            });
        }
        let external_id = order
            .external_id
            .ok_or(SyncError::MissingExternalId(order_id))?;

        match self.client.cancel_order(&external_id).await {
            Ok(CancelOutcome::Cancelled) => {
                self.store.mark_cancelled(order_id).await?;
                info!(%order_id, %external_id, "order cancelled");
                Ok(true)
            }
            Ok(CancelOutcome::NotAccepted(code)) => {
                info!(%order_id, %external_id, code, "cancellation not accepted");
                Ok(false)
            }
            Err(RemoteError::OrderNotFound(id)) => Err(SyncError::OrderNotFound(id)),
            Err(e) => Err(SyncError::Remote(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::queue::InMemoryOrderQueueStore;
    use crate::remote::{ApiResponse, TransportError};
    use crate::test_support::{order_created_at, test_regions, test_store_config, ScriptedTransport};

    fn processor(
        store: Arc<InMemoryOrderQueueStore>,
        transport: Arc<ScriptedTransport>,
    ) -> OrderSyncProcessor<Arc<InMemoryOrderQueueStore>, Arc<ScriptedTransport>> {
        OrderSyncProcessor::new(
            store,
            transport,
            Arc::new(test_store_config()),
            Arc::new(test_regions()),
        )
    }

    #[tokio::test]
    async fn created_marks_submitted_with_external_id() {
        let store = InMemoryOrderQueueStore::arc();
        let id = store.enqueue(order_created_at(Utc::now())).unwrap();
        let transport = ScriptedTransport::arc(vec![Ok(ApiResponse::new(201, r#"{"id":900}"#))]);

        let report = processor(store.clone(), transport.clone()).process_pending().await.unwrap();

        assert_eq!(report.submitted, 1);
        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, SyncStatus::Submitted);
        assert_eq!(order.external_id.unwrap().as_str(), "900");
        assert_eq!(transport.requests()[0].0, "orders");
    }

    #[tokio::test]
    async fn non_created_code_marks_failed_without_external_id() {
        for code in [200, 400, 409, 500] {
            let store = InMemoryOrderQueueStore::arc();
            let id = store.enqueue(order_created_at(Utc::now())).unwrap();
            let transport =
                ScriptedTransport::arc(vec![Ok(ApiResponse::new(code, r#"{"id":1}"#))]);

            let report = processor(store.clone(), transport).process_pending().await.unwrap();

            assert_eq!(report.failed, 1, "code {code}");
            let order = store.get(id).await.unwrap().unwrap();
            assert_eq!(order.status, SyncStatus::Failed);
            assert_eq!(order.external_id, None);
            assert!(order.failure_reason.unwrap().contains(&code.to_string()));
        }
    }

    #[tokio::test]
    async fn unresolvable_store_config_fails_only_that_order() {
        let store = InMemoryOrderQueueStore::arc();
        let mut order = order_created_at(Utc::now());
        order.store_scope = ordersync_core::StoreScope(99);
        let id = store.enqueue(order).unwrap();
        let transport = ScriptedTransport::arc(vec![]);

        let processor = OrderSyncProcessor::new(
            store.clone(),
            transport.clone(),
            Arc::new(crate::store_config::InMemoryStoreConfig::new()),
            Arc::new(test_regions()),
        );
        let report = processor.process_pending().await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(transport.requests().is_empty());
        let order = store.get(id).await.unwrap().unwrap();
        assert!(order.failure_reason.unwrap().contains("missing store configuration"));
    }

    #[tokio::test]
    async fn order_claimed_elsewhere_is_skipped() {
        let store = InMemoryOrderQueueStore::arc();
        let id = store.enqueue(order_created_at(Utc::now())).unwrap();
        let transport = ScriptedTransport::arc(vec![]);
        let processor = processor(store.clone(), transport.clone());

        let batch = store.fetch_pending(10).await.unwrap();
        assert!(store.claim(id).await.unwrap());

        let outcome = processor.process_order(&batch[0]).await;
        assert_eq!(outcome, OrderOutcome::Skipped);
        assert!(transport.requests().is_empty());
        assert_eq!(store.status(id), Some(SyncStatus::Processing));
    }

    #[tokio::test]
    async fn batch_size_limits_fetch() {
        let store = InMemoryOrderQueueStore::arc();
        for _ in 0..3 {
            store.enqueue(order_created_at(Utc::now())).unwrap();
        }
        let transport = ScriptedTransport::arc(vec![
            Ok(ApiResponse::new(201, r#"{"id":1}"#)),
            Ok(ApiResponse::new(201, r#"{"id":2}"#)),
        ]);

        let report = processor(store.clone(), transport)
            .with_batch_size(2)
            .process_pending()
            .await
            .unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(store.fetch_pending(10).await.unwrap().len(), 1);
    }

    async fn submitted_order(store: &InMemoryOrderQueueStore, external: &str) -> OrderId {
        let id = store.enqueue(order_created_at(Utc::now())).unwrap();
        store.claim(id).await.unwrap();
        store
            .mark_submitted(id, Some(external.parse().unwrap()))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn accepted_cancel_marks_cancelled() {
        let store = InMemoryOrderQueueStore::arc();
        let id = submitted_order(&store, "900").await;
        let transport = ScriptedTransport::arc(vec![Ok(ApiResponse::new(202, ""))]);

        let cancelled = processor(store.clone(), transport.clone()).cancel(id).await.unwrap();

        assert!(cancelled);
        assert_eq!(store.status(id), Some(SyncStatus::Cancelled));
        assert_eq!(transport.requests()[0], ("orders/900/cancel".to_string(), None));
    }

    #[tokio::test]
    async fn not_found_cancel_surfaces_error_and_keeps_status() {
        let store = InMemoryOrderQueueStore::arc();
        let id = submitted_order(&store, "900").await;
        let transport = ScriptedTransport::arc(vec![Ok(ApiResponse::new(404, ""))]);

        let err = processor(store.clone(), transport).cancel(id).await.unwrap_err();

        assert!(matches!(err, SyncError::OrderNotFound(ext) if ext.as_str() == "900"));
        assert_eq!(store.status(id), Some(SyncStatus::Submitted));
    }

    #[tokio::test]
    async fn refused_cancel_returns_false_and_keeps_status() {
        let store = InMemoryOrderQueueStore::arc();
        let id = submitted_order(&store, "900").await;
        let transport = ScriptedTransport::arc(vec![Ok(ApiResponse::new(409, ""))]);

        let cancelled = processor(store.clone(), transport).cancel(id).await.unwrap();

        assert!(!cancelled);
        assert_eq!(store.status(id), Some(SyncStatus::Submitted));
    }

    #[tokio::test]
    async fn cancel_transport_error_keeps_status() {
        let store = InMemoryOrderQueueStore::arc();
        let id = submitted_order(&store, "900").await;
        let transport = ScriptedTransport::arc(vec![Err(TransportError::Timeout)]);

        let err = processor(store.clone(), transport).cancel(id).await.unwrap_err();

        assert!(matches!(err, SyncError::Remote(RemoteError::Transport(TransportError::Timeout))));
        assert_eq!(store.status(id), Some(SyncStatus::Submitted));
    }

    #[tokio::test]
    async fn only_submitted_orders_are_cancellable() {
        let store = InMemoryOrderQueueStore::arc();
        let id = store.enqueue(order_created_at(Utc::now())).unwrap();
        let transport = ScriptedTransport::arc(vec![]);

        let err = processor(store.clone(), transport.clone()).cancel(id).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::NotCancellable { status: SyncStatus::Pending, .. }
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn cancel_without_external_id_is_rejected() {
        let store = InMemoryOrderQueueStore::arc();
        let id = store.enqueue(order_created_at(Utc::now())).unwrap();
        store.claim(id).await.unwrap();
        store.mark_submitted(id, None).await.unwrap();

        let err = processor(store, ScriptedTransport::arc(vec![]))
            .cancel(id)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingExternalId(missing) if missing == id));
    }

    #[tokio::test]
    async fn cancel_of_unknown_order_is_rejected() {
        let missing = OrderId::new();
        let err = processor(InMemoryOrderQueueStore::arc(), ScriptedTransport::arc(vec![]))
            .cancel(missing)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownOrder(id) if id == missing));
    }
}
