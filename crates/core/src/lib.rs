//! Atelier Core - Shared domain types.
//!
//! This crate provides the value types used across all Atelier components:
//! - `storefront` - Session tracking and the cart/favorites store
//! - `cli` - Command-line driver for the store
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no async runtime, no
//! document store access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, variants, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
