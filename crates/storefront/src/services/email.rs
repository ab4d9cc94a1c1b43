//! Email service for order and appointment notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text
//! templates from `templates/email/`.

use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use frameshop_core::OrderStatus;

use crate::config::EmailConfig;
use crate::models::{Appointment, Order, OrderDetail};

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    base_url: &'a str,
    name: &'a str,
    order_id: i32,
    items: Vec<&'a str>,
    total: String,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    base_url: &'a str,
    name: &'a str,
    order_id: i32,
    items: Vec<&'a str>,
    total: String,
}

/// HTML template for the shop new-order notice email.
#[derive(Template)]
#[template(path = "email/new_order.html")]
struct NewOrderHtml<'a> {
    base_url: &'a str,
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    order_id: i32,
    items: Vec<&'a str>,
    total: String,
    notes: Option<&'a str>,
}

/// Plain text template for the shop new-order notice email.
#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderText<'a> {
    base_url: &'a str,
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    order_id: i32,
    items: Vec<&'a str>,
    total: String,
    notes: Option<&'a str>,
}

/// HTML template for the order status update email.
#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    base_url: &'a str,
    name: &'a str,
    order_id: i32,
    status: &'a str,
    note: Option<&'a str>,
}

/// Plain text template for the order status update email.
#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    base_url: &'a str,
    name: &'a str,
    order_id: i32,
    status: &'a str,
    note: Option<&'a str>,
}

/// HTML template for the appointment confirmation email.
#[derive(Template)]
#[template(path = "email/appointment_confirmation.html")]
struct AppointmentConfirmationHtml<'a> {
    base_url: &'a str,
    name: &'a str,
    kind: &'a str,
    when: String,
    minutes: i64,
}

/// Plain text template for the appointment confirmation email.
#[derive(Template)]
#[template(path = "email/appointment_confirmation.txt")]
struct AppointmentConfirmationText<'a> {
    base_url: &'a str,
    name: &'a str,
    kind: &'a str,
    when: String,
    minutes: i64,
}

/// HTML template for the appointment reminder email.
#[derive(Template)]
#[template(path = "email/appointment_reminder.html")]
struct AppointmentReminderHtml<'a> {
    base_url: &'a str,
    name: &'a str,
    kind: &'a str,
    when: String,
}

/// Plain text template for the appointment reminder email.
#[derive(Template)]
#[template(path = "email/appointment_reminder.txt")]
struct AppointmentReminderText<'a> {
    base_url: &'a str,
    name: &'a str,
    kind: &'a str,
    when: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_address: Option<String>,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_address: config.shop_address.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Whether new-order notices have somewhere to go.
    #[must_use]
    pub const fn has_shop_address(&self) -> bool {
        self.shop_address.is_some()
    }

    /// Send the customer their order confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(&self, detail: &OrderDetail) -> Result<(), EmailError> {
        let order = &detail.order;
        let items: Vec<&str> = detail.line_items.iter().map(|i| i.summary.as_str()).collect();
        let total = order.total.display();

        let html = OrderConfirmationHtml {
            base_url: &self.base_url,
            name: &order.customer.name,
            order_id: order.id.as_i32(),
            items: items.clone(),
            total: total.clone(),
        }
        .render()?;
        let text = OrderConfirmationText {
            base_url: &self.base_url,
            name: &order.customer.name,
            order_id: order.id.as_i32(),
            items,
            total,
        }
        .render()?;

        let subject = format!("Your framing order #{}", order.id);
        self.send_multipart_email(&order.customer.email, &subject, &text, &html)
            .await
    }

    /// Tell the shop about a new order. Does nothing without a shop address.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_new_order_notice(&self, detail: &OrderDetail) -> Result<(), EmailError> {
        let Some(shop_address) = &self.shop_address else {
            return Ok(());
        };
        let order = &detail.order;
        let items: Vec<&str> = detail.line_items.iter().map(|i| i.summary.as_str()).collect();
        let total = order.total.display();

        let html = NewOrderHtml {
            base_url: &self.base_url,
            name: &order.customer.name,
            email: &order.customer.email,
            phone: order.customer.phone.as_deref(),
            order_id: order.id.as_i32(),
            items: items.clone(),
            total: total.clone(),
            notes: order.notes.as_deref(),
        }
        .render()?;
        let text = NewOrderText {
            base_url: &self.base_url,
            name: &order.customer.name,
            email: &order.customer.email,
            phone: order.customer.phone.as_deref(),
            order_id: order.id.as_i32(),
            items,
            total,
            notes: order.notes.as_deref(),
        }
        .render()?;

        let subject = format!("New order #{} ({})", order.id, order.total);
        self.send_multipart_email(shop_address, &subject, &text, &html)
            .await
    }

    /// Tell the customer their order moved to a new status.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_status_update(
        &self,
        order: &Order,
        note: Option<&str>,
    ) -> Result<(), EmailError> {
        let status = status_label(order.status);

        let html = OrderStatusHtml {
            base_url: &self.base_url,
            name: &order.customer.name,
            order_id: order.id.as_i32(),
            status,
            note,
        }
        .render()?;
        let text = OrderStatusText {
            base_url: &self.base_url,
            name: &order.customer.name,
            order_id: order.id.as_i32(),
            status,
            note,
        }
        .render()?;

        let subject = format!("Order #{}: {status}", order.id);
        self.send_multipart_email(&order.customer.email, &subject, &text, &html)
            .await
    }

    /// Confirm a booking to the customer.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_appointment_confirmation(
        &self,
        appointment: &Appointment,
    ) -> Result<(), EmailError> {
        let kind = appointment.kind.label();
        let when = format_when(appointment.starts_at);
        let minutes = (appointment.ends_at - appointment.starts_at).num_minutes();

        let html = AppointmentConfirmationHtml {
            base_url: &self.base_url,
            name: &appointment.customer_name,
            kind,
            when: when.clone(),
            minutes,
        }
        .render()?;
        let text = AppointmentConfirmationText {
            base_url: &self.base_url,
            name: &appointment.customer_name,
            kind,
            when: when.clone(),
            minutes,
        }
        .render()?;

        let subject = format!("{kind} booked for {when}");
        self.send_multipart_email(&appointment.customer_email, &subject, &text, &html)
            .await
    }

    /// Remind the customer of an upcoming appointment.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_appointment_reminder(
        &self,
        appointment: &Appointment,
    ) -> Result<(), EmailError> {
        let kind = appointment.kind.label();
        let when = format_when(appointment.starts_at);

        let html = AppointmentReminderHtml {
            base_url: &self.base_url,
            name: &appointment.customer_name,
            kind,
            when: when.clone(),
        }
        .render()?;
        let text = AppointmentReminderText {
            base_url: &self.base_url,
            name: &appointment.customer_name,
            kind,
            when,
        }
        .render()?;

        let subject = format!("Reminder: {kind}");
        self.send_multipart_email(&appointment.customer_email, &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Customer-facing wording for an order status.
#[must_use]
pub const fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "received",
        OrderStatus::AwaitingPayment => "awaiting payment",
        OrderStatus::InProgress => "being framed",
        OrderStatus::Delayed => "delayed",
        OrderStatus::ReadyForPickup => "ready for pickup",
        OrderStatus::Completed => "complete",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn format_when(at: DateTime<Utc>) -> String {
    at.format("%A %-d %B %Y at %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_status_labels_are_distinct() {
        let mut labels: Vec<_> = OrderStatus::ALL.into_iter().map(status_label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), OrderStatus::ALL.len());
    }

    #[test]
    fn test_format_when() {
        let at = Utc.with_ymd_and_hms(2026, 11, 3, 14, 30, 0).single().expect("valid time");
        assert_eq!(format_when(at), "Tuesday 3 November 2026 at 14:30 UTC");
    }

    #[test]
    fn test_new_order_text_template() {
        let text = NewOrderText {
            base_url: "https://frameshop.test",
            name: "Ada Lovelace",
            email: "ada@example.com",
            phone: None,
            order_id: 42,
            items: vec!["16 x 20 in, Classic Oak frame, Ivory mat, Clear glass"],
            total: "$213.00".to_string(),
            notes: Some("Please call before starting"),
        }
        .render()
        .expect("render");
        assert!(text.contains("Order: #42"));
        assert!(text.contains("Ada Lovelace <ada@example.com>"));
        assert!(!text.contains("Phone:"));
        assert!(text.contains("Please call before starting"));
    }

    #[test]
    fn test_html_templates_escape_input() {
        let html = OrderStatusHtml {
            base_url: "https://frameshop.test",
            name: "<b>Ada</b>",
            order_id: 7,
            status: status_label(OrderStatus::ReadyForPickup),
            note: None,
        }
        .render()
        .expect("render");
        assert!(html.contains("&#60;b&#62;Ada") || html.contains("&lt;b&gt;Ada"));
        assert!(html.contains("ready for pickup"));
    }

    #[test]
    fn test_appointment_reminder_template() {
        let text = AppointmentReminderText {
            base_url: "https://frameshop.test",
            name: "Grace",
            kind: "Design consultation",
            when: "Tuesday 3 November 2026 at 14:30 UTC".to_string(),
        }
        .render()
        .expect("render");
        assert!(text.contains("your design consultation is on Tuesday"));
    }
}
