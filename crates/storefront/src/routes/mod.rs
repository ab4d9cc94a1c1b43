//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (database)
//!
//! # Configurator
//! GET  /api/catalog                   - Frames, mats, glass, reveal sizes
//! POST /api/designer/price            - Price a selection
//! POST /api/recommendations           - Suggestions from a description
//! POST /api/recommendations/image     - Suggestions from an uploaded image
//!
//! # Orders
//! POST /api/checkout                  - Place an order
//! GET  /api/orders/{id}               - Order with line items and history
//! POST /api/orders/{id}/status        - Move an order to a new status
//!
//! # Appointments
//! GET  /api/appointments              - Upcoming appointments
//! POST /api/appointments              - Book an appointment
//! GET  /api/appointments/{id}         - Single appointment
//! POST /api/appointments/{id}/status  - Move an appointment to a new status
//!
//! # Blog
//! GET  /api/blog                      - Published posts
//! GET  /api/blog/{slug}               - Single post
//! ```

pub mod appointments;
pub mod blog;
pub mod catalog;
pub mod checkout;
pub mod designer;
pub mod health;
pub mod orders;
pub mod recommendations;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Largest accepted request body. Leaves room for multipart framing around
/// a maximum-size image upload.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Create the recommendation routes router.
pub fn recommendation_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(recommendations::from_description))
        .route("/image", post(recommendations::from_image))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

/// Create the appointment routes router.
pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(appointments::index).post(appointments::create))
        .route("/{id}", get(appointments::show))
        .route("/{id}/status", post(appointments::update_status))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{slug}", get(blog::show))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(catalog::show))
        .route("/designer/price", post(designer::price))
        .route("/checkout", post(checkout::create))
        .nest("/recommendations", recommendation_routes())
        .nest("/orders", order_routes())
        .nest("/appointments", appointment_routes())
        .nest("/blog", blog_routes())
}

/// Build the complete application with middleware applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
