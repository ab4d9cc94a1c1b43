//! Business logic services for storefront.
//!
//! # Services
//!
//! - `catalog` - Cached option catalog
//! - `recommendations` - AI design recommendations (degrades, never fails)
//! - `email` - Transactional email (lettre + askama)
//! - `calendar` - Calendar events for appointments
//! - `notifications` - Fire-and-report dispatch over email and calendar

pub mod calendar;
pub mod catalog;
pub mod email;
pub mod notifications;
pub mod recommendations;

pub use calendar::{CalendarClient, CalendarError};
pub use catalog::CatalogService;
pub use email::{EmailError, EmailService};
pub use notifications::{Channel, NotificationReport, Notifier};
pub use recommendations::RecommendationService;
