//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use frameshop_core::order::LineItem;
use frameshop_core::{CustomerId, LineItemId, OrderId, OrderStatus, Price, StageHistoryId};

/// Who placed an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A framing order (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer: OrderCustomer,
    pub status: OrderStatus,
    pub total: Price,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted line item snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLineItem {
    pub id: LineItemId,
    pub summary: String,
    #[serde(flatten)]
    pub item: LineItem,
}

/// One status change. Never updated or deleted once written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    pub id: StageHistoryId,
    /// `None` for the entry written when the order was created.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order with its line items and full history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub line_items: Vec<StoredLineItem>,
    pub history: Vec<StageHistoryEntry>,
}
