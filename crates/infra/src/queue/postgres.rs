//! Postgres-backed order queue.
//!
//! The order snapshot lives in a JSONB column; the synchronization columns
//! (`status`, `external_id`, `failure_reason`, `created_at`) are authoritative
//! and override whatever the snapshot carries.
//!
//! ## Claiming
//!
//! `claim` is a single conditional `UPDATE ... WHERE status = 'pending'`. Postgres
//! row locking guarantees that of two concurrent claims for the same row, the
//! second one re-evaluates the predicate after the first commits and matches
//! zero rows. No advisory locks or `SELECT ... FOR UPDATE` round trips are needed.
//!
//! ## Status writes
//!
//! Every status writer restricts its `UPDATE` to the source statuses that
//! [`SyncStatus::can_transition_to`] allows, so the database enforces the same
//! state machine as the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{instrument, Span};
use uuid::Uuid;

use ordersync_core::{ExternalOrderId, OrderId};
use ordersync_orders::{LocalOrder, SyncStatus};

use super::store::{OrderQueueStore, QueueStoreError};

const ALL_STATUSES: [SyncStatus; 5] = [
    SyncStatus::Pending,
    SyncStatus::Processing,
    SyncStatus::Submitted,
    SyncStatus::Failed,
    SyncStatus::Cancelled,
];

/// Postgres-backed [`OrderQueueStore`].
#[derive(Debug, Clone)]
pub struct PgOrderQueueStore {
    pool: Arc<PgPool>,
}

impl PgOrderQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the queue table and its pending index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), QueueStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_orders (
                id              UUID PRIMARY KEY,
                status          TEXT NOT NULL,
                external_id     TEXT NULL,
                failure_reason  TEXT NULL,
                created_at      TIMESTAMPTZ NOT NULL,
                updated_at      TIMESTAMPTZ NOT NULL,
                order_data      JSONB NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS sync_orders_pending_idx
                ON sync_orders (created_at, id)
                WHERE status = 'pending'
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        Ok(())
    }

    /// Insert an order into the queue.
    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    pub async fn enqueue(&self, order: &LocalOrder) -> Result<OrderId, QueueStoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_orders (
                id, status, external_id, failure_reason, created_at, updated_at, order_data
            )
            VALUES ($1, $2, $3, $4, $5, now(), $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.external_id.as_ref().map(|e| e.as_str().to_string()))
        .bind(order.failure_reason.as_deref())
        .bind(order.created_at)
        .bind(Json(order))
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                QueueStoreError::AlreadyExists(order.id)
            } else {
                map_sqlx_error("enqueue", e)
            }
        })?;

        Ok(order.id)
    }

    /// Move `order_id` to `to` if its current status allows it.
    async fn transition(
        &self,
        operation: &'static str,
        order_id: OrderId,
        to: SyncStatus,
        external_id: Option<&ExternalOrderId>,
        failure_reason: Option<&str>,
    ) -> Result<(), QueueStoreError> {
        let allowed_from: Vec<String> = ALL_STATUSES
            .iter()
            .filter(|from| from.can_transition_to(to))
            .map(|from| from.as_str().to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE sync_orders
            SET status = $2,
                external_id = COALESCE($3, external_id),
                failure_reason = $4,
                updated_at = now()
            WHERE id = $1 AND status = ANY($5)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(to.as_str())
        .bind(external_id.map(|e| e.as_str().to_string()))
        .bind(failure_reason)
        .bind(allowed_from)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the order is unknown or its status forbids the move.
        let current = self.current_status(order_id).await?;
        match current {
            None => Err(QueueStoreError::NotFound(order_id)),
            Some(from) => Err(QueueStoreError::InvalidTransition { order_id, from, to }),
        }
    }

    /// Take a pending row whose snapshot cannot be decoded out of the queue.
    ///
    /// Left pending, it would stay at the head of the queue and be re-read by
    /// every batch.
    async fn fail_undecodable(&self, row: &sqlx::postgres::PgRow, err: &QueueStoreError) {
        let id: Uuid = match row.try_get("id") {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "queued row has no readable id");
                return;
            }
        };
        let order_id = OrderId::from_uuid(id);
        tracing::error!(%order_id, error = %err, "queued order cannot be decoded; marking failed");

        let reason = format!("undecodable order snapshot: {err}");
        if let Err(e) = self
            .transition("fetch_pending", order_id, SyncStatus::Failed, None, Some(&reason))
            .await
        {
            tracing::error!(%order_id, error = %e, "failed to mark undecodable order");
        }
    }

    async fn current_status(&self, order_id: OrderId) -> Result<Option<SyncStatus>, QueueStoreError> {
        let row = sqlx::query("SELECT status FROM sync_orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("current_status", e))?;

        row.map(|r| {
            let status: String = r
                .try_get("status")
                .map_err(|e| QueueStoreError::Serialization(e.to_string()))?;
            status
                .parse::<SyncStatus>()
                .map_err(|e| QueueStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }
}

#[async_trait]
impl OrderQueueStore for PgOrderQueueStore {
    #[instrument(skip(self), fields(order_count = tracing::field::Empty), err)]
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LocalOrder>, QueueStoreError> {
        let span = Span::current();

        let rows = sqlx::query(
            r#"
            SELECT id, status, external_id, failure_reason, created_at, order_data
            FROM sync_orders
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_pending", e))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            match order_from_row(row) {
                Ok(order) => orders.push(order),
                Err(e) => self.fail_undecodable(row, &e).await,
            }
        }

        span.record("order_count", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn get(&self, order_id: OrderId) -> Result<Option<LocalOrder>, QueueStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, external_id, failure_reason, created_at, order_data
            FROM sync_orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn claim(&self, order_id: OrderId) -> Result<bool, QueueStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sync_orders
            SET status = 'processing', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(order_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("claim", e))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.current_status(order_id).await? {
            None => Err(QueueStoreError::NotFound(order_id)),
            Some(_) => Ok(false),
        }
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn mark_submitted(
        &self,
        order_id: OrderId,
        external_id: Option<ExternalOrderId>,
    ) -> Result<(), QueueStoreError> {
        self.transition(
            "mark_submitted",
            order_id,
            SyncStatus::Submitted,
            external_id.as_ref(),
            None,
        )
        .await
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn mark_failed(&self, order_id: OrderId, reason: &str) -> Result<(), QueueStoreError> {
        self.transition("mark_failed", order_id, SyncStatus::Failed, None, Some(reason))
            .await
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), QueueStoreError> {
        self.transition("mark_cancelled", order_id, SyncStatus::Cancelled, None, None)
            .await
    }
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<LocalOrder, QueueStoreError> {
    let decode = |e: sqlx::Error| QueueStoreError::Serialization(e.to_string());

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let external_id: Option<String> = row.try_get("external_id").map_err(decode)?;
    let failure_reason: Option<String> = row.try_get("failure_reason").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let Json(mut order): Json<LocalOrder> = row.try_get("order_data").map_err(decode)?;

    order.id = OrderId::from_uuid(id);
    order.status = status
        .parse()
        .map_err(|e: ordersync_core::DomainError| QueueStoreError::Serialization(e.to_string()))?;
    order.external_id = external_id
        .map(|e| e.parse())
        .transpose()
        .map_err(|e: ordersync_core::DomainError| QueueStoreError::Serialization(e.to_string()))?;
    order.failure_reason = failure_reason;
    order.created_at = created_at;
    Ok(order)
}

/// Map SQLx errors to queue store errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> QueueStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            QueueStoreError::Storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            QueueStoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            QueueStoreError::Serialization(format!("decode error in {}: {}", operation, err))
        }
        _ => QueueStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
