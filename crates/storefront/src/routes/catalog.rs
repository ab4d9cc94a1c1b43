//! Catalog route handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::instrument;

use frameshop_core::catalog::Catalog;

use crate::state::AppState;

/// Everything the configurator can offer.
///
/// GET /api/catalog
///
/// Never fails: when the catalog cannot be loaded the lists are empty and
/// the configurator shows its "unavailable" state.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<Arc<Catalog>> {
    Json(state.catalog().get().await)
}
