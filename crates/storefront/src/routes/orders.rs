//! Order route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use frameshop_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath};
use crate::models::OrderDetail;
use crate::state::AppState;

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// An order with its line items and stage history.
///
/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 if the order does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// Move an order to a new status and tell the customer.
///
/// POST /api/orders/{id}/status
///
/// # Errors
///
/// Returns 404 if the order does not exist, or 409 if the change is not
/// allowed from the current status.
#[instrument(skip(state, update), fields(status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    let note = update
        .note
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());

    let detail = OrderRepository::new(state.pool())
        .transition(id, update.status, note.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => not_found(id),
            other => other.into(),
        })?;

    add_breadcrumb(
        "order",
        "Status changed",
        Some(&[("order_id", &id.to_string()), ("status", update.status.as_str())]),
    );
    drop(
        state
            .notifier()
            .order_status_changed(detail.order.clone(), note),
    );

    Ok(Json(detail))
}

fn not_found(id: OrderId) -> AppError {
    AppError::NotFound(format!("order {id}"))
}
