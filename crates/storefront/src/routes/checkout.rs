//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use frameshop_core::order::{CheckoutRequest, assemble};
use frameshop_core::{OrderId, Price};

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb, set_sentry_user};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Longest accepted order note.
const MAX_NOTES_CHARS: usize = 2000;

/// A placed order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub total: Price,
}

/// Turn the customer's design into a pending order.
///
/// POST /api/checkout
///
/// The price is recomputed from the server's catalog; whatever total the
/// client showed is not trusted. An incomplete or stale design is rejected
/// with 422 so the configurator can keep the selection and let the customer
/// fix it.
///
/// # Errors
///
/// Returns 400 for bad contact details, 422 when the design cannot be
/// assembled, or 500 if the order cannot be saved.
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let customer = request.customer.validate()?;
    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        return Err(AppError::BadRequest(format!(
            "notes can be at most {MAX_NOTES_CHARS} characters"
        )));
    }

    let catalog = state.catalog().get().await;
    let item = assemble(&request.selection, &catalog)?;

    let detail = OrderRepository::new(state.pool())
        .create(&customer, &item, notes)
        .await?;

    set_sentry_user(&detail.order.customer.id, Some(customer.email.as_str()));
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &detail.order.id.to_string())]),
    );

    let response = CheckoutResponse {
        order_id: detail.order.id,
        total: detail.order.total,
    };

    // Emails go out in the background; the customer is not kept waiting.
    drop(state.notifier().order_placed(detail));

    Ok((StatusCode::CREATED, Json(response)))
}
