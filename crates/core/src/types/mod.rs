//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod variant;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use variant::{Variant, VariantError};
