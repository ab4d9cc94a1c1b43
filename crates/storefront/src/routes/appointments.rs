//! Appointment route handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use frameshop_core::order::CustomerContact;
use frameshop_core::{AppointmentId, AppointmentKind, AppointmentStatus, OrderId};

use crate::db::{AppointmentRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{Appointment, NewAppointment};
use crate::state::AppState;

/// Default page size for the upcoming list.
const DEFAULT_LIMIT: i64 = 50;

/// Booking request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub customer: CustomerContact,
    pub kind: AppointmentKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query for the upcoming list.
#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Start of the window; defaults to now.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
}

/// Book an appointment.
///
/// POST /api/appointments
///
/// # Errors
///
/// Returns 400 for bad contact details or times, 404 if the linked order
/// does not exist, or 409 if the slot overlaps an existing booking.
#[instrument(skip(state, request), fields(kind = %request.kind))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>)> {
    let customer = request.customer.validate()?;
    let booking = NewAppointment::new(
        customer,
        request.kind,
        request.starts_at,
        request.ends_at,
        Utc::now(),
    )?
    .with_order(request.order_id)
    .with_notes(request.notes);

    let appointment = AppointmentRepository::new(state.pool())
        .create(&booking)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(request.order_id.map_or_else(
                    || "order".to_string(),
                    |id| format!("order {id}"),
                ))
            }
            other => other.into(),
        })?;

    add_breadcrumb(
        "appointment",
        "Appointment booked",
        Some(&[("appointment_id", &appointment.id.to_string())]),
    );
    drop(state.notifier().appointment_booked(appointment.clone()));

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Upcoming scheduled and confirmed appointments, soonest first.
///
/// GET /api/appointments
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UpcomingQuery>,
) -> Result<Json<Vec<Appointment>>> {
    let from = query.from.unwrap_or_else(Utc::now);
    let appointments = AppointmentRepository::new(state.pool())
        .list_upcoming(from, query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(appointments))
}

/// A single appointment.
///
/// GET /api/appointments/{id}
///
/// # Errors
///
/// Returns 404 if the appointment does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<Json<Appointment>> {
    AppointmentRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// Move an appointment to a new status. Cancelling removes its calendar
/// event.
///
/// POST /api/appointments/{id}/status
///
/// # Errors
///
/// Returns 404 if the appointment does not exist, or 409 if the change is
/// not allowed from the current status.
#[instrument(skip(state, update), fields(status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .transition(id, update.status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => not_found(id),
            other => other.into(),
        })?;

    drop(
        state
            .notifier()
            .appointment_status_changed(appointment.clone()),
    );

    Ok(Json(appointment))
}

fn not_found(id: AppointmentId) -> AppError {
    AppError::NotFound(format!("appointment {id}"))
}
