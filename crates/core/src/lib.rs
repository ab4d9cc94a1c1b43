//! Frameshop Core - the custom framing configurator.
//!
//! This crate holds everything about a frame design that does not need I/O:
//! - catalog snapshots of frames, mats, glazing, and reveal sizes
//! - the pricing calculator
//! - the design state and its toggle rules
//! - recommendation prompts and response mapping
//! - order line item assembly
//!
//! # Architecture
//!
//! No database access, no HTTP clients. The `storefront` crate loads the
//! catalog, calls the model, and persists orders; everything here is pure
//! and synchronous.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, catalog codes, prices, emails, and statuses
//! - [`catalog`] - Option catalog
//! - [`pricing`] - Price calculation
//! - [`design`] - Design selection and state transitions
//! - [`recommendation`] - Recommendation requests and response mapping
//! - [`order`] - Line item assembly for checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod design;
pub mod order;
pub mod pricing;
pub mod recommendation;
pub mod types;

pub use types::*;
