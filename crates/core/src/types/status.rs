//! Status enums for orders and appointments.
//!
//! Both lifecycles are append-only: a status change is validated here and
//! recorded as a new history entry by the storefront, never by rewriting or
//! deleting earlier rows.

use serde::{Deserialize, Serialize};

/// Error returned when parsing a status string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Custom framing order status.
///
/// The main line is `pending → in_progress → ready_for_pickup → completed`.
/// `awaiting_payment` and `delayed` are side states that return to the main
/// line; `cancelled` can be reached from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, not yet picked up by staff.
    #[default]
    Pending,
    /// Waiting on payment before work can start.
    AwaitingPayment,
    /// Being framed.
    InProgress,
    /// Work is held up (materials, rework).
    Delayed,
    /// Finished and waiting for the customer.
    ReadyForPickup,
    /// Handed over to the customer.
    Completed,
    /// Cancelled by staff or customer.
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::AwaitingPayment,
        Self::InProgress,
        Self::Delayed,
        Self::ReadyForPickup,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a valid transition.
    ///
    /// Staying in the same state is not a transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Self::Cancelled)
            | (Self::Pending, Self::AwaitingPayment | Self::InProgress)
            | (Self::AwaitingPayment, Self::Pending | Self::InProgress)
            | (Self::InProgress, Self::Delayed | Self::ReadyForPickup)
            | (Self::Delayed, Self::InProgress)
            | (Self::ReadyForPickup, Self::Completed) => true,
            _ => false,
        }
    }

    /// Snake-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingPayment => "awaiting_payment",
            Self::InProgress => "in_progress",
            Self::Delayed => "delayed",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError::new("order status", s))
    }
}

/// Appointment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.appointment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// All statuses.
    pub const ALL: [Self; 5] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Cancelled,
        Self::Completed,
        Self::NoShow,
    ];

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::NoShow)
    }

    /// Whether the appointment still occupies its time slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    /// Whether moving from `self` to `next` is a valid transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Confirmed | Self::Cancelled)
                | (
                    Self::Confirmed,
                    Self::Completed | Self::Cancelled | Self::NoShow
                )
        )
    }

    /// Snake-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError::new("appointment status", s))
    }
}

/// What an appointment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.appointment_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    /// In-store design consultation.
    Consultation,
    /// Review of a design before production.
    DesignReview,
    /// Collecting a finished order.
    Pickup,
}

impl AppointmentKind {
    /// Human-readable label for notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Consultation => "Design consultation",
            Self::DesignReview => "Design review",
            Self::Pickup => "Order pickup",
        }
    }
}

impl std::fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consultation => write!(f, "consultation"),
            Self::DesignReview => write!(f, "design_review"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}
