//! Fire-and-report notification dispatch.
//!
//! Request handlers hand finished orders and appointments to the
//! [`Notifier`], which spawns the email and calendar work and logs one
//! [`NotificationReport`] per channel. A failed or unconfigured channel is
//! reported, never propagated.

use std::fmt;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use frameshop_core::AppointmentStatus;

use super::calendar::CalendarClient;
use super::email::EmailService;
use crate::db::AppointmentRepository;
use crate::models::{Appointment, Order, OrderDetail};

/// Where a notification went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    CustomerEmail,
    ShopEmail,
    Calendar,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CustomerEmail => "customer_email",
            Self::ShopEmail => "shop_email",
            Self::Calendar => "calendar",
        })
    }
}

/// Outcome of one notification on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationReport {
    Sent {
        channel: Channel,
        event: &'static str,
    },
    Skipped {
        channel: Channel,
        event: &'static str,
        reason: &'static str,
    },
    Failed {
        channel: Channel,
        event: &'static str,
        error: String,
    },
}

impl NotificationReport {
    /// Whether the notification went out.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    fn from_result<E: fmt::Display>(
        channel: Channel,
        event: &'static str,
        result: Result<(), E>,
    ) -> Self {
        match result {
            Ok(()) => Self::Sent { channel, event },
            Err(e) => Self::Failed {
                channel,
                event,
                error: e.to_string(),
            },
        }
    }

    fn log(&self) {
        match self {
            Self::Sent { channel, event } => {
                info!(%channel, event, "Notification sent");
            }
            Self::Skipped {
                channel,
                event,
                reason,
            } => {
                info!(%channel, event, reason, "Notification skipped");
            }
            Self::Failed {
                channel,
                event,
                error,
            } => {
                warn!(%channel, event, error = %error, "Notification failed");
            }
        }
    }
}

const NO_EMAIL: &str = "email not configured";
const NO_CALENDAR: &str = "calendar not configured";

/// Dispatches order and appointment notifications in the background.
#[derive(Clone)]
pub struct Notifier {
    email: Option<EmailService>,
    calendar: Option<CalendarClient>,
    pool: PgPool,
}

impl Notifier {
    /// Create a notifier. Missing services are reported as skipped.
    #[must_use]
    pub const fn new(
        email: Option<EmailService>,
        calendar: Option<CalendarClient>,
        pool: PgPool,
    ) -> Self {
        Self {
            email,
            calendar,
            pool,
        }
    }

    /// Whether customer email is configured.
    #[must_use]
    pub const fn can_email(&self) -> bool {
        self.email.is_some()
    }

    /// Customer confirmation and shop notice for a new order.
    pub fn order_placed(&self, detail: OrderDetail) -> JoinHandle<Vec<NotificationReport>> {
        let this = self.clone();
        spawn_reports(async move {
            const EVENT: &str = "order_placed";
            let Some(email) = &this.email else {
                return vec![
                    skipped(Channel::CustomerEmail, EVENT, NO_EMAIL),
                    skipped(Channel::ShopEmail, EVENT, NO_EMAIL),
                ];
            };

            let customer = NotificationReport::from_result(
                Channel::CustomerEmail,
                EVENT,
                email.send_order_confirmation(&detail).await,
            );
            let shop = if email.has_shop_address() {
                NotificationReport::from_result(
                    Channel::ShopEmail,
                    EVENT,
                    email.send_new_order_notice(&detail).await,
                )
            } else {
                skipped(Channel::ShopEmail, EVENT, "no shop address")
            };
            vec![customer, shop]
        })
    }

    /// Tell the customer about a status change.
    pub fn order_status_changed(
        &self,
        order: Order,
        note: Option<String>,
    ) -> JoinHandle<Vec<NotificationReport>> {
        let this = self.clone();
        spawn_reports(async move {
            const EVENT: &str = "order_status_changed";
            let Some(email) = &this.email else {
                return vec![skipped(Channel::CustomerEmail, EVENT, NO_EMAIL)];
            };
            vec![NotificationReport::from_result(
                Channel::CustomerEmail,
                EVENT,
                email.send_status_update(&order, note.as_deref()).await,
            )]
        })
    }

    /// Confirmation email and calendar event for a new booking.
    pub fn appointment_booked(&self, appointment: Appointment) -> JoinHandle<Vec<NotificationReport>> {
        let this = self.clone();
        spawn_reports(async move {
            const EVENT: &str = "appointment_booked";
            let email = match &this.email {
                Some(email) => NotificationReport::from_result(
                    Channel::CustomerEmail,
                    EVENT,
                    email.send_appointment_confirmation(&appointment).await,
                ),
                None => skipped(Channel::CustomerEmail, EVENT, NO_EMAIL),
            };
            let calendar = this.sync_new_event(&appointment, EVENT).await;
            vec![email, calendar]
        })
    }

    /// Remove the calendar event when an appointment is cancelled.
    pub fn appointment_status_changed(
        &self,
        appointment: Appointment,
    ) -> JoinHandle<Vec<NotificationReport>> {
        let this = self.clone();
        spawn_reports(async move {
            const EVENT: &str = "appointment_cancelled";
            if appointment.status != AppointmentStatus::Cancelled {
                return Vec::new();
            }
            let Some(calendar) = &this.calendar else {
                return vec![skipped(Channel::Calendar, EVENT, NO_CALENDAR)];
            };
            let Some(event_id) = &appointment.calendar_event_id else {
                return vec![skipped(Channel::Calendar, EVENT, "no calendar event")];
            };
            vec![NotificationReport::from_result(
                Channel::Calendar,
                EVENT,
                calendar.cancel_event(event_id).await,
            )]
        })
    }

    /// Send a reminder email now. Used by the reminder job, which needs the
    /// outcome before marking the appointment.
    pub async fn send_reminder(&self, appointment: &Appointment) -> NotificationReport {
        const EVENT: &str = "appointment_reminder";
        let report = match &self.email {
            Some(email) => NotificationReport::from_result(
                Channel::CustomerEmail,
                EVENT,
                email.send_appointment_reminder(appointment).await,
            ),
            None => skipped(Channel::CustomerEmail, EVENT, NO_EMAIL),
        };
        report.log();
        report
    }

    async fn sync_new_event(&self, appointment: &Appointment, event: &'static str) -> NotificationReport {
        let Some(calendar) = &self.calendar else {
            return skipped(Channel::Calendar, event, NO_CALENDAR);
        };
        let event_id = match calendar.create_event(appointment).await {
            Ok(id) => id,
            Err(e) => {
                return NotificationReport::Failed {
                    channel: Channel::Calendar,
                    event,
                    error: e.to_string(),
                };
            }
        };
        let stored = AppointmentRepository::new(&self.pool)
            .set_calendar_event(appointment.id, Some(&event_id))
            .await;
        NotificationReport::from_result(Channel::Calendar, event, stored)
    }
}

const fn skipped(channel: Channel, event: &'static str, reason: &'static str) -> NotificationReport {
    NotificationReport::Skipped {
        channel,
        event,
        reason,
    }
}

fn spawn_reports<F>(work: F) -> JoinHandle<Vec<NotificationReport>>
where
    F: Future<Output = Vec<NotificationReport>> + Send + 'static,
{
    tokio::spawn(async move {
        let reports = work.await;
        for report in &reports {
            report.log();
        }
        if reports
            .iter()
            .any(|r| matches!(r, NotificationReport::Failed { .. }))
        {
            error!(
                failed = reports
                    .iter()
                    .filter(|r| matches!(r, NotificationReport::Failed { .. }))
                    .count(),
                "Some notifications failed"
            );
        }
        reports
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use frameshop_core::{
        AppointmentId, AppointmentKind, CustomerId, OrderId, OrderStatus, Price,
    };

    use crate::models::OrderCustomer;

    fn notifier() -> Notifier {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://frameshop@127.0.0.1:1/frameshop")
            .expect("lazy pool");
        Notifier::new(None, None, pool)
    }

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            customer: OrderCustomer {
                id: CustomerId::new(1),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
            },
            status: OrderStatus::Pending,
            total: Price::from_cents(21300),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn appointment(status: AppointmentStatus) -> Appointment {
        let starts_at = Utc::now() + ChronoDuration::days(1);
        Appointment {
            id: AppointmentId::new(3),
            customer_id: CustomerId::new(1),
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: None,
            order_id: None,
            kind: AppointmentKind::Consultation,
            status,
            starts_at,
            ends_at: starts_at + ChronoDuration::minutes(45),
            notes: None,
            calendar_event_id: Some("evt_1".to_string()),
            reminder_sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_channels_are_skipped() {
        let detail = OrderDetail {
            order: order(),
            line_items: Vec::new(),
            history: Vec::new(),
        };
        let reports = notifier().order_placed(detail).await.expect("join");
        assert_eq!(reports.len(), 2);
        assert!(
            reports
                .iter()
                .all(|r| matches!(r, NotificationReport::Skipped { reason, .. } if *reason == NO_EMAIL))
        );
    }

    #[tokio::test]
    async fn test_booking_reports_both_channels() {
        let reports = notifier()
            .appointment_booked(appointment(AppointmentStatus::Scheduled))
            .await
            .expect("join");
        assert_eq!(
            reports,
            vec![
                skipped(Channel::CustomerEmail, "appointment_booked", NO_EMAIL),
                skipped(Channel::Calendar, "appointment_booked", NO_CALENDAR),
            ]
        );
    }

    #[tokio::test]
    async fn test_only_cancellation_touches_calendar() {
        let n = notifier();
        let confirmed = n
            .appointment_status_changed(appointment(AppointmentStatus::Confirmed))
            .await
            .expect("join");
        assert!(confirmed.is_empty());

        let cancelled = n
            .appointment_status_changed(appointment(AppointmentStatus::Cancelled))
            .await
            .expect("join");
        assert_eq!(
            cancelled,
            vec![skipped(Channel::Calendar, "appointment_cancelled", NO_CALENDAR)]
        );
    }

    #[tokio::test]
    async fn test_reminder_without_email_is_not_sent() {
        let report = notifier()
            .send_reminder(&appointment(AppointmentStatus::Confirmed))
            .await;
        assert!(!report.is_sent());
    }

    #[test]
    fn test_from_result() {
        let failed = NotificationReport::from_result(
            Channel::ShopEmail,
            "order_placed",
            Err::<(), _>("smtp down"),
        );
        assert_eq!(
            failed,
            NotificationReport::Failed {
                channel: Channel::ShopEmail,
                event: "order_placed",
                error: "smtp down".to_string(),
            }
        );
    }
}
