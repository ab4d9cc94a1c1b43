//! Designer pricing route handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use frameshop_core::Price;
use frameshop_core::design::DesignSelection;
use frameshop_core::pricing::{self, PriceBreakdown};

use crate::extract::ApiJson;
use crate::state::AppState;

/// Live price for the configurator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub breakdown: PriceBreakdown,
    pub total: Price,
    /// Human-readable total, e.g. `$213.00`.
    pub display: String,
}

/// Price a selection against the current catalog.
///
/// POST /api/designer/price
///
/// Incomplete selections are fine: missing or unknown options contribute
/// nothing to the total.
pub async fn price(
    State(state): State<AppState>,
    ApiJson(selection): ApiJson<DesignSelection>,
) -> Json<PriceResponse> {
    let catalog = state.catalog().get().await;
    let breakdown = pricing::calculate(&selection, &catalog);
    let total = breakdown.total();

    Json(PriceResponse {
        breakdown,
        total,
        display: total.display(),
    })
}
