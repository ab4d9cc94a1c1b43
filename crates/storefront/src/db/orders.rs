//! Order persistence.
//!
//! An order, its line item snapshot, and its first history entry are written
//! in one transaction. Status changes append to `order_stage_history`; history
//! rows are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use frameshop_core::order::{Customer, LineItem};
use frameshop_core::{
    CurrencyCode, CustomerId, LineItemId, OrderId, OrderStatus, Price, StageHistoryId,
};

use super::{RepositoryError, upsert_customer};
use crate::models::{Order, OrderCustomer, OrderDetail, StageHistoryEntry, StoredLineItem};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.status, o.total_cents, o.currency_code, o.notes, o.created_at, o.updated_at,
           c.id AS customer_id, c.name AS customer_name, c.email AS customer_email,
           c.phone AS customer_phone
    FROM storefront.framing_order o
    JOIN storefront.customer c ON c.id = o.customer_id
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    status: OrderStatus,
    total_cents: i64,
    currency_code: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_id: CustomerId,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency_code: CurrencyCode = row
            .currency_code
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            customer: OrderCustomer {
                id: row.customer_id,
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
            },
            status: row.status,
            total: Price {
                cents: row.total_cents,
                currency_code,
            },
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    id: LineItemId,
    summary: String,
    snapshot: Json<LineItem>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: StageHistoryId,
    from_status: Option<OrderStatus>,
    to_status: OrderStatus,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for StageHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            from_status: row.from_status,
            to_status: row.to_status,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

/// Filter for [`OrderRepository::list`].
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
        }
    }
}

/// Repository for framing orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new repository with the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending order with a single line item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is
    /// persisted in that case.
    #[instrument(skip(self, customer, item, notes), fields(total = %item.total))]
    pub async fn create(
        &self,
        customer: &Customer,
        item: &LineItem,
        notes: Option<&str>,
    ) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer_id = upsert_customer(&mut tx, customer).await?;

        let order_id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.framing_order (customer_id, status, total_cents, currency_code, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(customer_id)
        .bind(OrderStatus::Pending)
        .bind(item.total.cents)
        .bind(item.total.currency_code.code())
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.line_item (order_id, summary, total_cents, snapshot)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(order_id)
        .bind(item.summary())
        .bind(item.total.cents)
        .bind(Json(item))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.order_stage_history (order_id, from_status, to_status, note)
            VALUES ($1, NULL, $2, 'Order placed')
            ",
        )
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, total = %item.total, "Order created");

        self.get(order_id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get an order with its line items and history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a stored row cannot be mapped.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let line_items = sqlx::query_as::<_, LineItemRow>(
            "SELECT id, summary, snapshot FROM storefront.line_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| StoredLineItem {
            id: row.id,
            summary: row.summary,
            item: row.snapshot.0,
        })
        .collect();

        let history = self.history(id).await?;

        Ok(Some(OrderDetail {
            order: row.try_into()?,
            line_items,
            history,
        }))
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{ORDER_SELECT} WHERE ($1::storefront.order_status IS NULL OR o.status = $1) \
             ORDER BY o.created_at DESC, o.id DESC LIMIT $2"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.status)
            .bind(filter.limit.clamp(1, 500))
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Stage history for an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(&self, id: OrderId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"
            SELECT id, from_status, to_status, note, created_at
            FROM storefront.order_stage_history
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move an order to `next`, appending a history entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::InvalidTransition` if the move is not allowed from
    /// the current status.
    #[instrument(skip(self, note), fields(order_id = %id, to = %next))]
    pub async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
        note: Option<&str>,
    ) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus = sqlx::query_scalar(
            "SELECT status FROM storefront.framing_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        sqlx::query(
            "UPDATE storefront.framing_order SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.order_stage_history (order_id, from_status, to_status, note)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}
