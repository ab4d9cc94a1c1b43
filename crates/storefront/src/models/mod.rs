//! Domain models for storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod appointment;
pub mod order;

pub use appointment::{Appointment, NewAppointment};
pub use order::{Order, OrderCustomer, OrderDetail, StageHistoryEntry, StoredLineItem};
