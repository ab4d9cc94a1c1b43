//! Appointment domain types.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use frameshop_core::order::Customer;
use frameshop_core::{AppointmentId, AppointmentKind, AppointmentStatus, CustomerId, OrderId};

/// Longest bookable appointment.
pub const MAX_APPOINTMENT_HOURS: i64 = 4;

/// A booked appointment (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub order_id: Option<OrderId>,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
    /// Event ID in the shop calendar, once synced.
    pub calendar_event_id: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Error validating a booking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("appointment must end after it starts")]
    EndsBeforeStart,
    #[error("appointment must be in the future")]
    InThePast,
    #[error("appointments can be at most {MAX_APPOINTMENT_HOURS} hours long")]
    TooLong,
}

/// A validated booking, ready to insert.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub customer: Customer,
    pub kind: AppointmentKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub order_id: Option<OrderId>,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Validate the time range against `now`.
    ///
    /// # Errors
    ///
    /// Returns `BookingError` if the range is empty, in the past, or too long.
    pub fn new(
        customer: Customer,
        kind: AppointmentKind,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, BookingError> {
        if ends_at <= starts_at {
            return Err(BookingError::EndsBeforeStart);
        }
        if starts_at <= now {
            return Err(BookingError::InThePast);
        }
        if ends_at - starts_at > Duration::hours(MAX_APPOINTMENT_HOURS) {
            return Err(BookingError::TooLong);
        }
        Ok(Self {
            customer,
            kind,
            starts_at,
            ends_at,
            order_id: None,
            notes: None,
        })
    }

    #[must_use]
    pub const fn with_order(mut self, order_id: Option<OrderId>) -> Self {
        self.order_id = order_id;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}
