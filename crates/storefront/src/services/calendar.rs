//! Calendar API client for appointment events.
//!
//! Speaks the Google Calendar v3 events shape: `POST
//! {api_url}/calendars/{id}/events` and `DELETE .../events/{event_id}`, with
//! a bearer token supplied by configuration.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::CalendarConfig;
use crate::models::Appointment;

/// Errors that can occur when interacting with the calendar API.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client configuration is unusable.
    #[error("invalid calendar configuration: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: &'static str,
}

#[derive(Debug, Serialize)]
struct NewEvent {
    summary: String,
    description: String,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Calendar API client.
#[derive(Clone)]
pub struct CalendarClient {
    client: reqwest::Client,
    events_url: Url,
}

impl CalendarClient {
    /// Create a new calendar client.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Config` if the URL or token is unusable.
    pub fn new(config: &CalendarConfig) -> Result<Self, CalendarError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.access_token.expose_secret()
        ))
        .map_err(|e| CalendarError::Config(format!("Invalid access token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut events_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| CalendarError::Config(format!("Invalid CALENDAR_API_URL: {e}")))?;
        events_url
            .path_segments_mut()
            .map_err(|()| CalendarError::Config("CALENDAR_API_URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["calendars", config.calendar_id.as_str(), "events"]);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self { client, events_url })
    }

    /// Create an event for `appointment`, returning its event ID.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_event(&self, appointment: &Appointment) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(self.events_url.clone())
            .json(&event_for(appointment))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedEvent = response.json().await?;
        Ok(created.id)
    }

    /// Delete a previously created event. A missing event counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn cancel_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let mut url = self.events_url.clone();
        url.path_segments_mut()
            .map_err(|()| CalendarError::Config("events URL cannot be a base".to_string()))?
            .push(event_id);

        let response = self.client.delete(url).send().await?;
        let status = response.status();

        if status.is_success()
            || status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::GONE
        {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(CalendarError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn event_for(appointment: &Appointment) -> NewEvent {
    let mut description = format!(
        "Customer: {} <{}>",
        appointment.customer_name, appointment.customer_email
    );
    if let Some(phone) = &appointment.customer_phone {
        description.push_str(&format!("\nPhone: {phone}"));
    }
    if let Some(order_id) = appointment.order_id {
        description.push_str(&format!("\nOrder: #{order_id}"));
    }
    if let Some(notes) = &appointment.notes {
        description.push_str(&format!("\n\n{notes}"));
    }

    NewEvent {
        summary: format!(
            "{}: {}",
            appointment.kind.label(),
            appointment.customer_name
        ),
        description,
        start: EventTime {
            date_time: appointment.starts_at.to_rfc3339(),
            time_zone: "UTC",
        },
        end: EventTime {
            date_time: appointment.ends_at.to_rfc3339(),
            time_zone: "UTC",
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use secrecy::SecretString;

    use super::*;
    use frameshop_core::{AppointmentId, AppointmentKind, AppointmentStatus, CustomerId, OrderId};

    fn config(api_url: &str) -> CalendarConfig {
        CalendarConfig {
            api_url: api_url.to_string(),
            calendar_id: "shop@group.calendar.example".to_string(),
            access_token: SecretString::from("ya29.token".to_string()),
        }
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let client =
            CalendarClient::new(&config("https://calendar.example/v3/")).expect("client");
        assert_eq!(
            client.events_url.as_str(),
            "https://calendar.example/v3/calendars/shop@group.calendar.example/events"
        );
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(
            CalendarClient::new(&config("not a url")),
            Err(CalendarError::Config(_))
        ));
    }

    #[test]
    fn test_event_body() {
        let starts_at = Utc.with_ymd_and_hms(2026, 11, 3, 14, 0, 0).single().expect("time");
        let appointment = Appointment {
            id: AppointmentId::new(1),
            customer_id: CustomerId::new(1),
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: None,
            order_id: Some(OrderId::new(9)),
            kind: AppointmentKind::Pickup,
            status: AppointmentStatus::Scheduled,
            starts_at,
            ends_at: starts_at + Duration::minutes(30),
            notes: None,
            calendar_event_id: None,
            reminder_sent_at: None,
            created_at: starts_at,
        };
        let json = serde_json::to_value(event_for(&appointment)).expect("serialize");
        assert_eq!(json["summary"], "Order pickup: Ada");
        assert_eq!(json["start"]["dateTime"], "2026-11-03T14:00:00+00:00");
        assert!(json["description"].as_str().is_some_and(|d| d.contains("Order: #9")));
    }
}
