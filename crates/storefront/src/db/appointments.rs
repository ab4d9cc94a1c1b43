//! Appointment persistence.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use frameshop_core::{AppointmentId, AppointmentKind, AppointmentStatus, CustomerId, OrderId};

use super::{RepositoryError, upsert_customer};
use crate::models::{Appointment, NewAppointment};

const APPOINTMENT_SELECT: &str = r"
    SELECT a.id, a.customer_id, c.name AS customer_name, c.email AS customer_email,
           c.phone AS customer_phone, a.order_id, a.kind, a.status, a.starts_at, a.ends_at,
           a.notes, a.calendar_event_id, a.reminder_sent_at, a.created_at
    FROM storefront.appointment a
    JOIN storefront.customer c ON c.id = a.customer_id
";

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: AppointmentId,
    customer_id: CustomerId,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    order_id: Option<OrderId>,
    kind: AppointmentKind,
    status: AppointmentStatus,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    notes: Option<String>,
    calendar_event_id: Option<String>,
    reminder_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            order_id: row.order_id,
            kind: row.kind,
            status: row.status,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            notes: row.notes,
            calendar_event_id: row.calendar_event_id,
            reminder_sent_at: row.reminder_sent_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for in-store appointments.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    /// Create a new repository with the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Book an appointment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slot overlaps an active
    /// appointment, or `RepositoryError::NotFound` if the linked order does
    /// not exist.
    #[instrument(skip(self, booking), fields(kind = %booking.kind, starts_at = %booking.starts_at))]
    pub async fn create(&self, booking: &NewAppointment) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent bookings so the overlap check below holds.
        sqlx::query("LOCK TABLE storefront.appointment IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let overlaps: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.appointment
                WHERE status IN ('scheduled', 'confirmed')
                  AND starts_at < $2
                  AND ends_at > $1
            )
            ",
        )
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .fetch_one(&mut *tx)
        .await?;

        if overlaps {
            return Err(RepositoryError::Conflict(
                "that time slot is already booked".to_owned(),
            ));
        }

        if let Some(order_id) = booking.order_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM storefront.framing_order WHERE id = $1)",
            )
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(RepositoryError::NotFound);
            }
        }

        let customer_id = upsert_customer(&mut tx, &booking.customer).await?;

        let id: AppointmentId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.appointment
                (customer_id, order_id, kind, status, starts_at, ends_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(customer_id)
        .bind(booking.order_id)
        .bind(booking.kind)
        .bind(AppointmentStatus::Scheduled)
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .bind(booking.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(appointment_id = %id, kind = %booking.kind, starts_at = %booking.starts_at, "Appointment booked");

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get an appointment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Active appointments starting after `from`, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_upcoming(
        &self,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!(
            "{APPOINTMENT_SELECT} WHERE a.starts_at >= $1 AND a.status IN ('scheduled', 'confirmed') \
             ORDER BY a.starts_at LIMIT $2"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(from)
            .bind(limit.clamp(1, 500))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move an appointment to `next`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment does not
    /// exist, or `RepositoryError::InvalidTransition` if the move is not
    /// allowed from the current status.
    #[instrument(skip(self), fields(appointment_id = %id, to = %next))]
    pub async fn transition(
        &self,
        id: AppointmentId,
        next: AppointmentStatus,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: AppointmentStatus = sqlx::query_scalar(
            "SELECT status FROM storefront.appointment WHERE id = $1 FOR UPDATE",
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
            "UPDATE storefront.appointment SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(appointment_id = %id, from = %current, to = %next, "Appointment status changed");

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Record the calendar event created for an appointment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_calendar_event(
        &self,
        id: AppointmentId,
        event_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE storefront.appointment SET calendar_event_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(event_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Active appointments starting within `lead` of `now` that have not
    /// had a reminder yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn due_for_reminder(
        &self,
        now: DateTime<Utc>,
        lead: Duration,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!(
            "{APPOINTMENT_SELECT} WHERE a.reminder_sent_at IS NULL \
             AND a.status IN ('scheduled', 'confirmed') \
             AND a.starts_at > $1 AND a.starts_at <= $2 \
             ORDER BY a.starts_at"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(now)
            .bind(now + lead)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mark the reminder for an appointment as sent.
    ///
    /// Returns `false` if it had already been marked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_reminded(
        &self,
        id: AppointmentId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.appointment
            SET reminder_sent_at = $2, updated_at = NOW()
            WHERE id = $1 AND reminder_sent_at IS NULL
            ",
        )
        .bind(id)
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
